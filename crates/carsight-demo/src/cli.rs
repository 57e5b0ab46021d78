use carsight_core::{CropAndScale, Orientation};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "carsight-demo")]
#[command(
    author,
    version,
    about = "Drive the CarSight frame classifier with a simulated camera"
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Stream synthetic frames through a simulated classifier
    Run {
        /// Adapter config file (YAML)
        #[arg(short, long, default_value = "./carsight.yaml", env = "CARSIGHT_CONFIG")]
        config: String,

        /// Camera frames per second
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Number of frames to capture (0 = until Ctrl+C)
        #[arg(short, long, default_value = "300")]
        frames: u64,

        /// Frame width in pixels
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Frame height in pixels
        #[arg(long, default_value = "720")]
        height: u32,

        /// Mean simulated classification latency in milliseconds
        #[arg(short, long, default_value = "120")]
        latency_ms: u64,

        /// Maximum random latency added on top, in milliseconds
        #[arg(long, default_value = "40")]
        jitter_ms: u64,

        /// Probability that a classification fails (0.0-1.0)
        #[arg(long, default_value = "0.05", value_parser = parse_probability)]
        failure_rate: f64,

        /// Seed for the simulated classifier
        #[arg(long)]
        seed: Option<u64>,

        /// Skip capture while the classifier is busy instead of submitting
        #[arg(long)]
        skip_when_busy: bool,

        /// Override the configured orientation
        #[arg(long)]
        orientation: Option<Orientation>,

        /// Override the configured crop-and-scale option
        #[arg(long)]
        crop_and_scale: Option<CropAndScale>,

        /// Print the final metrics as JSON
        #[arg(long)]
        json: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// Print the effective adapter configuration as YAML
    PrintConfig {
        /// Adapter config file (YAML)
        #[arg(short, long, default_value = "./carsight.yaml", env = "CARSIGHT_CONFIG")]
        config: String,
    },
}

fn parse_probability(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{} is not between 0.0 and 1.0", value))
    }
}
