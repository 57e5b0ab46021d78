//! Fixed request options attached to every classification

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a frame is fitted to the model's input when aspect ratios differ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CropAndScale {
    /// Crop the centered region with the model's aspect ratio, then scale
    #[default]
    CenterCrop,
    /// Scale to fit inside the input and pad the remainder (letterbox)
    ScaleFit,
    /// Stretch to the input size, ignoring aspect ratio
    ScaleFill,
}

impl FromStr for CropAndScale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "center_crop" | "center-crop" => Ok(Self::CenterCrop),
            "scale_fit" | "scale-fit" => Ok(Self::ScaleFit),
            "scale_fill" | "scale-fill" => Ok(Self::ScaleFill),
            other => Err(format!("unknown crop-and-scale option: {}", other)),
        }
    }
}

/// Orientation of the encoded pixels relative to the intended display.
///
/// Follows EXIF orientation semantics: `Right` means the sensor data must be
/// rotated 90 degrees clockwise to appear upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    LeftMirrored,
    /// Portrait capture from a landscape sensor (back camera held upright)
    #[default]
    Right,
    RightMirrored,
    Left,
}

impl Orientation {
    /// EXIF tag value (1-8)
    pub fn exif_value(self) -> u8 {
        match self {
            Self::Up => 1,
            Self::UpMirrored => 2,
            Self::Down => 3,
            Self::DownMirrored => 4,
            Self::LeftMirrored => 5,
            Self::Right => 6,
            Self::RightMirrored => 7,
            Self::Left => 8,
        }
    }

    /// Whether width and height trade places once corrected
    pub fn swaps_dimensions(self) -> bool {
        matches!(
            self,
            Self::LeftMirrored | Self::Right | Self::RightMirrored | Self::Left
        )
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Self::Up),
            "up_mirrored" => Ok(Self::UpMirrored),
            "down" => Ok(Self::Down),
            "down_mirrored" => Ok(Self::DownMirrored),
            "left_mirrored" => Ok(Self::LeftMirrored),
            "right" => Ok(Self::Right),
            "right_mirrored" => Ok(Self::RightMirrored),
            "left" => Ok(Self::Left),
            other => Err(format!("unknown orientation: {}", other)),
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Up => "up",
            Self::UpMirrored => "up_mirrored",
            Self::Down => "down",
            Self::DownMirrored => "down_mirrored",
            Self::LeftMirrored => "left_mirrored",
            Self::Right => "right",
            Self::RightMirrored => "right_mirrored",
            Self::Left => "left",
        };
        f.write_str(name)
    }
}

/// Model input resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSize {
    pub width: u32,
    pub height: u32,
}

impl InputSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for InputSize {
    fn default() -> Self {
        Self::new(224, 224)
    }
}

/// Preprocessing options fixed at adapter construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestOptions {
    pub crop_and_scale: CropAndScale,
    pub orientation: Orientation,
    pub input_size: InputSize,
}
