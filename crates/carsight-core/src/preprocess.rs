//! Frame preprocessing: orientation correction and fitting to the model input
//!
//! Classifier backends that consume raw pixels call [`prepare_input`] to turn
//! a captured [`Frame`] into an upright image of exactly the model's input
//! size, using the options fixed on the adapter.

use crate::{CropAndScale, Frame, InputSize, Orientation, RequestOptions};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Rotate/flip an image so it appears upright
pub fn orient(image: &RgbImage, orientation: Orientation) -> RgbImage {
    match orientation {
        Orientation::Up => image.clone(),
        Orientation::UpMirrored => imageops::flip_horizontal(image),
        Orientation::Down => imageops::rotate180(image),
        Orientation::DownMirrored => imageops::flip_vertical(image),
        Orientation::LeftMirrored => imageops::flip_horizontal(&imageops::rotate90(image)),
        Orientation::Right => imageops::rotate90(image),
        Orientation::RightMirrored => imageops::flip_horizontal(&imageops::rotate270(image)),
        Orientation::Left => imageops::rotate270(image),
    }
}

/// Largest centered rectangle of `src` with the aspect ratio of `target`.
///
/// Returns `(x, y, width, height)`.
pub fn center_crop_rect(src_w: u32, src_h: u32, target: InputSize) -> (u32, u32, u32, u32) {
    if src_w == 0 || src_h == 0 || target.width == 0 || target.height == 0 {
        return (0, 0, src_w, src_h);
    }

    // Compare src_w / src_h against target.width / target.height without floats
    let src_ratio = src_w as u64 * target.height as u64;
    let target_ratio = target.width as u64 * src_h as u64;

    let (w, h) = if src_ratio > target_ratio {
        // Source is wider: keep full height
        let w = (src_h as u64 * target.width as u64 / target.height as u64) as u32;
        (w.max(1), src_h)
    } else {
        // Source is taller (or equal): keep full width
        let h = (src_w as u64 * target.height as u64 / target.width as u64) as u32;
        (src_w, h.max(1))
    };

    ((src_w - w) / 2, (src_h - h) / 2, w, h)
}

/// Fit an upright image to the model input according to the crop policy
pub fn fit(image: &RgbImage, policy: CropAndScale, target: InputSize) -> RgbImage {
    if target.width == 0 || target.height == 0 || image.width() == 0 || image.height() == 0 {
        return RgbImage::new(target.width, target.height);
    }

    match policy {
        CropAndScale::CenterCrop => {
            let (x, y, w, h) = center_crop_rect(image.width(), image.height(), target);
            let cropped = imageops::crop_imm(image, x, y, w, h).to_image();
            imageops::resize(&cropped, target.width, target.height, FilterType::Triangle)
        }
        CropAndScale::ScaleFill => {
            imageops::resize(image, target.width, target.height, FilterType::Triangle)
        }
        CropAndScale::ScaleFit => letterbox(image, target),
    }
}

fn letterbox(image: &RgbImage, target: InputSize) -> RgbImage {
    let (w, h) = (image.width() as f32, image.height() as f32);
    let scale = (target.width as f32 / w).min(target.height as f32 / h);
    let new_w = ((w * scale) as u32).clamp(1, target.width);
    let new_h = ((h * scale) as u32).clamp(1, target.height);

    let scaled = imageops::resize(image, new_w, new_h, FilterType::Triangle);
    let mut padded = RgbImage::from_pixel(target.width, target.height, Rgb([0, 0, 0]));
    let x_offset = (target.width - new_w) / 2;
    let y_offset = (target.height - new_h) / 2;
    imageops::replace(&mut padded, &scaled, x_offset as i64, y_offset as i64);

    padded
}

/// Orient and fit a frame for inference
pub fn prepare_input(frame: &Frame, options: &RequestOptions) -> RgbImage {
    let upright = orient(frame.image(), options.orientation);
    fit(&upright, options.crop_and_scale, options.input_size)
}
