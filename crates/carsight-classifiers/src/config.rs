//! Adapter and model configuration

use carsight_core::{CropAndScale, Error, InputSize, Orientation, RequestOptions, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration for a frame classifier adapter.
///
/// Every field is fixed at construction; nothing can be overridden per frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// The single model backing the adapter
    #[serde(default)]
    pub model: ModelConfig,

    /// How frames are fitted to the model input
    #[serde(default)]
    pub crop_and_scale: CropAndScale,

    /// Fixed orientation correction applied to every frame
    #[serde(default)]
    pub orientation: Orientation,

    /// Capacity of the result broadcast channel
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl AdapterConfig {
    /// Load configuration from a YAML file, or defaults if it doesn't exist
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        } else {
            debug!("No config at {}, using defaults", path.display());
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values the adapter relies on
    pub fn validate(&self) -> Result<()> {
        if self.model.name.trim().is_empty() {
            return Err(Error::config("model name must not be empty"));
        }
        if self.model.input_size.width == 0 || self.model.input_size.height == 0 {
            return Err(Error::config(format!(
                "model input size must be non-zero, got {}x{}",
                self.model.input_size.width, self.model.input_size.height
            )));
        }
        if self.broadcast_capacity == 0 {
            return Err(Error::config("broadcast_capacity must be at least 1"));
        }
        Ok(())
    }

    /// Options attached to every classification request
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            crop_and_scale: self.crop_and_scale,
            orientation: self.orientation,
            input_size: self.model.input_size,
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            crop_and_scale: CropAndScale::CenterCrop,
            orientation: Orientation::Right,
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

/// The model a classifier is built from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier
    pub name: String,

    /// Model artifact on disk, if the backend loads one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Expected input resolution
    #[serde(default)]
    pub input_size: InputSize,
}

impl ModelConfig {
    /// Model config with the given name and default input size
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            input_size: InputSize::default(),
        }
    }

    /// Set the model artifact path
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the expected input resolution
    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.input_size = InputSize::new(width, height);
        self
    }

    /// Path of the model artifact, checked to exist.
    ///
    /// Loaders call this so a missing artifact surfaces as
    /// [`Error::ClassifierUnavailable`].
    pub fn artifact_path(&self) -> Result<&Path> {
        let path = self.path.as_deref().ok_or_else(|| {
            Error::classifier_unavailable(format!("model '{}' has no artifact path", self.name))
        })?;

        if !path.exists() {
            return Err(Error::classifier_unavailable(format!(
                "model artifact for '{}' not found at {}",
                self.name,
                path.display()
            )));
        }

        Ok(path)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::named("car-recognition")
    }
}

fn default_broadcast_capacity() -> usize {
    16
}
