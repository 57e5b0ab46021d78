use carsight_core::Frame;
use image::{Rgb, RgbImage};

/// Generates frames of a bright bar sweeping across a dark road.
///
/// Stands in for a capture device: each call to [`next_frame`](Self::next_frame)
/// yields the next image at the configured resolution.
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    tick: u64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            tick: 0,
        }
    }

    pub fn frames_captured(&self) -> u64 {
        self.tick
    }

    /// Capture the next frame
    pub fn next_frame(&mut self) -> Frame {
        let bar_width = (self.width / 8).max(1);
        let bar_x = ((self.tick * 7) % self.width as u64) as u32;
        self.tick += 1;

        let image = RgbImage::from_fn(self.width, self.height, |x, y| {
            let in_bar = x >= bar_x && x < bar_x.saturating_add(bar_width);
            if in_bar {
                Rgb([220, 30, 30])
            } else if y > self.height * 2 / 3 {
                Rgb([60, 60, 60])
            } else {
                Rgb([120, 160, 200])
            }
        });

        Frame::new(image)
    }
}

impl Iterator for SyntheticCamera {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        Some(self.next_frame())
    }
}
