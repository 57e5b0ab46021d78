//! Core types for CarSight

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

static NEXT_FRAME_ID: AtomicU64 = AtomicU64::new(1);

/// One captured camera image.
///
/// Cloning is cheap: the pixel buffer is shared, so handing a frame to the
/// adapter and keeping it in a response never copies pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    id: u64,
    captured_at: DateTime<Utc>,
    image: Arc<RgbImage>,
}

impl Frame {
    /// Wrap an RGB image captured now
    pub fn new(image: RgbImage) -> Self {
        Self {
            id: NEXT_FRAME_ID.fetch_add(1, Ordering::Relaxed),
            captured_at: Utc::now(),
            image: Arc::new(image),
        }
    }

    /// Build a frame from packed RGB8 bytes
    pub fn from_rgb8(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(Error::frame(format!(
                "expected {} bytes for {}x{} RGB8, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }

        RgbImage::from_raw(width, height, data)
            .map(Self::new)
            .ok_or_else(|| Error::frame("pixel buffer does not match dimensions"))
    }

    /// Build a frame from any decoded image, converting to RGB8
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::new(image.to_rgb8())
    }

    /// Decode an image file (PNG or JPEG) into a frame
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let image = image::open(path)?;
        Ok(Self::from_dynamic(image))
    }

    /// Monotonic sequence number assigned at construction
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Capture timestamp
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the pixel data
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Display-ready copy of the frame
    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.image.as_ref().clone())
    }
}

/// Raw classifier output: one identifier with its confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub identifier: String,
    pub confidence: f32,
}

impl Observation {
    pub fn new(identifier: impl Into<String>, confidence: f32) -> Self {
        Self {
            identifier: identifier.into(),
            confidence,
        }
    }
}

/// A recognized label and its confidence (conventionally 0.0-1.0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionItem {
    pub label: String,
    pub confidence: f32,
}

impl RecognitionItem {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

impl From<Observation> for RecognitionItem {
    fn from(observation: Observation) -> Self {
        Self {
            label: observation.identifier,
            confidence: observation.confidence,
        }
    }
}

/// Normalized result of classifying one frame
#[derive(Debug, Clone)]
pub struct ClassificationResponse {
    /// Recognized labels in the classifier's ranking order
    pub items: Vec<RecognitionItem>,

    /// Time between admission and completion
    pub elapsed: Duration,

    /// The frame that was analyzed
    pub frame: Frame,

    /// Wall-clock completion time
    pub completed_at: DateTime<Utc>,
}

impl ClassificationResponse {
    /// Build a response from raw observations, keeping every entry in order
    pub fn from_observations(
        observations: Vec<Observation>,
        elapsed: Duration,
        frame: Frame,
    ) -> Self {
        Self {
            items: observations.into_iter().map(RecognitionItem::from).collect(),
            elapsed,
            frame,
            completed_at: Utc::now(),
        }
    }

    /// Highest-ranked item, as ordered by the classifier
    pub fn top(&self) -> Option<&RecognitionItem> {
        self.items.first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
