//! Classifier trait and model loading

use crate::config::ModelConfig;
use async_trait::async_trait;
use carsight_core::{preprocess, Frame, Observation, RequestOptions, Result};
use image::RgbImage;
use std::sync::Arc;

/// An image classification backend.
///
/// Implementations wrap an already-loaded model. `classify` runs on the
/// adapter's runtime; backends doing heavy CPU work should move it to
/// `tokio::task::spawn_blocking` themselves.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one frame, returning observations ranked best-first
    async fn classify(&self, request: ClassificationRequest) -> Result<Vec<Observation>>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// A frame together with the fixed preprocessing options
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
    pub frame: Frame,
    pub options: RequestOptions,
}

impl ClassificationRequest {
    pub fn new(frame: Frame, options: RequestOptions) -> Self {
        Self { frame, options }
    }

    /// The frame rotated upright and fitted to the model input
    pub fn prepared_image(&self) -> RgbImage {
        preprocess::prepare_input(&self.frame, &self.options)
    }
}

/// Builds a classifier from its model configuration.
///
/// Failure here is fatal for the adapter being constructed.
#[async_trait]
pub trait ClassifierLoader: Send + Sync {
    async fn load(&self, model: &ModelConfig) -> Result<Arc<dyn Classifier>>;
}

#[async_trait]
impl<F> ClassifierLoader for F
where
    F: Fn(&ModelConfig) -> Result<Arc<dyn Classifier>> + Send + Sync,
{
    async fn load(&self, model: &ModelConfig) -> Result<Arc<dyn Classifier>> {
        self(model)
    }
}
