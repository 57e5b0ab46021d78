//! CarSight Classifiers
//!
//! Binds a live camera feed to an image classifier.
//!
//! The [`FrameClassifierAdapter`] admits one frame at a time, hands it to a
//! [`Classifier`] with fixed preprocessing options (center-crop scaling and
//! a constant orientation by default), and publishes each result with the
//! time the classification took. Frames arriving while the classifier is
//! busy are dropped, never queued.
//!
//! The classifier itself is a black box supplied by a [`ClassifierLoader`];
//! this crate carries no model format or inference code.

pub mod adapter;
pub mod classifier;
pub mod config;

pub use adapter::{FrameClassifierAdapter, PendingClassification, ResultCallback, Submission};
pub use classifier::{ClassificationRequest, Classifier, ClassifierLoader};
pub use config::{AdapterConfig, ModelConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::adapter::{FrameClassifierAdapter, Submission};
    pub use crate::classifier::{ClassificationRequest, Classifier, ClassifierLoader};
    pub use crate::config::{AdapterConfig, ModelConfig};
    pub use carsight_core::prelude::*;
}
