use carsight_classifiers::{AdapterConfig, Classifier, FrameClassifierAdapter, ModelConfig};
use carsight_core::Result as CoreResult;
use carsight_demo::camera::{stop_on, CameraFeed, FeedConfig, SyntheticCamera};
use carsight_demo::cli::{Cli, Commands};
use carsight_demo::mock::SimulatedClassifier;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            fps,
            frames,
            width,
            height,
            latency_ms,
            jitter_ms,
            failure_rate,
            seed,
            skip_when_busy,
            orientation,
            crop_and_scale,
            json,
            verbose,
        } => {
            init_logging(verbose);
            carsight_telemetry::metrics::describe();

            let mut adapter_config = AdapterConfig::load(&config)?;
            if let Some(orientation) = orientation {
                adapter_config.orientation = orientation;
            }
            if let Some(crop_and_scale) = crop_and_scale {
                adapter_config.crop_and_scale = crop_and_scale;
            }

            let loader = move |model: &ModelConfig| -> CoreResult<Arc<dyn Classifier>> {
                info!(model = %model.name, "Loading simulated classifier");
                let mut classifier = SimulatedClassifier::new(Duration::from_millis(latency_ms))
                    .with_jitter(Duration::from_millis(jitter_ms))
                    .with_failure_rate(failure_rate);
                if let Some(seed) = seed {
                    classifier = classifier.with_seed(seed);
                }
                Ok(Arc::new(classifier))
            };
            let adapter = FrameClassifierAdapter::load(&loader, &adapter_config).await?;

            println!();
            println!("  CarSight frame classifier demo");
            println!("  Model:        {}", adapter_config.model.name);
            println!("  Camera:       {}x{} @ {} fps", width, height, fps);
            println!("  Orientation:  {}", adapter_config.orientation);
            println!("  Crop/scale:   {:?}", adapter_config.crop_and_scale);
            let budget = if frames == 0 {
                "until Ctrl+C".to_string()
            } else {
                frames.to_string()
            };
            println!("  Frames:       {}", budget);
            println!();

            let reporter = tokio::spawn(report_results(adapter.subscribe()));

            let stop_rx = stop_on(tokio::signal::ctrl_c());

            let feed = CameraFeed::new(
                SyntheticCamera::new(width, height),
                adapter.clone(),
                FeedConfig {
                    fps,
                    frames,
                    skip_when_busy,
                },
            );
            let summary = feed.run(stop_rx).await;

            // Let the last admitted frame finish
            let settle = tokio::time::timeout(Duration::from_secs(10), async {
                while adapter.metrics_snapshot().in_flight() > 0 {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                }
            })
            .await;
            if settle.is_err() {
                warn!("Classification still in flight at shutdown");
            }

            let snapshot = adapter.metrics_snapshot();
            drop(adapter);
            reporter.abort();

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!();
                println!("  Capture ticks:      {}", summary.ticks);
                println!("  Skipped (busy):     {}", summary.skipped);
                println!("  Frames submitted:   {}", snapshot.frames_submitted);
                println!("  Frames admitted:    {}", snapshot.frames_admitted);
                println!(
                    "  Frames dropped:     {} ({:.1}%)",
                    snapshot.frames_dropped,
                    snapshot.drop_rate() * 100.0
                );
                println!("  Classified:         {}", snapshot.classifications_completed);
                println!("  Failed:             {}", snapshot.classifications_failed);
                println!(
                    "  Avg latency:        {:.1} ms",
                    snapshot.avg_latency_us() as f64 / 1000.0
                );
            }
        }

        Commands::PrintConfig { config } => {
            let adapter_config = AdapterConfig::load(&config)?;
            print!("{}", serde_yaml::to_string(&adapter_config)?);
        }
    }

    Ok(())
}

async fn report_results(
    mut results: broadcast::Receiver<Arc<carsight_core::ClassificationResponse>>,
) {
    loop {
        match results.recv().await {
            Ok(response) => match response.top() {
                Some(top) => info!(
                    frame_id = response.frame.id(),
                    label = %top.label,
                    confidence = top.confidence,
                    candidates = response.len(),
                    elapsed_ms = response.elapsed.as_millis() as u64,
                    "Recognized car"
                ),
                None => warn!(frame_id = response.frame.id(), "Empty response"),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Result reporter lagging");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "carsight_demo=debug,carsight_classifiers=debug"
    } else {
        "carsight_demo=info,carsight_classifiers=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
