//! CarSight Core
//!
//! Core types shared across CarSight components.
//!
//! This crate provides:
//! - Frames, raw classifier observations and normalized responses
//! - The fixed request options (crop-and-scale policy, orientation, input size)
//! - Error types and result handling
//! - Preprocessing helpers for classifier backends that consume raw pixels

pub mod error;
pub mod options;
pub mod preprocess;
pub mod types;

pub use error::{Error, Result};
pub use options::{CropAndScale, InputSize, Orientation, RequestOptions};
pub use types::{ClassificationResponse, Frame, Observation, RecognitionItem};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::options::{CropAndScale, InputSize, Orientation, RequestOptions};
    pub use crate::types::{ClassificationResponse, Frame, Observation, RecognitionItem};
}
