//! Frame geometry: width-targeted resize and face box rescaling.

use image::imageops::{self, FilterType};
use image::RgbImage;

/// A frame downsampled for the recognizer, with the ratio back to the source.
pub struct ScaledFrame {
    pub image: RgbImage,
    /// `source_width / resized_width`; multiply resized coordinates by this.
    pub ratio: f32,
}

/// Face box in `(top, right, bottom, left)` pixel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceLocation {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceLocation {
    /// Map a box from resized-frame coordinates back to the source frame.
    ///
    /// Every edge is multiplied by `ratio` and rounded to the nearest pixel.
    pub fn rescale(&self, ratio: f32) -> FaceLocation {
        let scale = |v: u32| (v as f32 * ratio).round().max(0.0) as u32;
        FaceLocation {
            top: scale(self.top),
            right: scale(self.right),
            bottom: scale(self.bottom),
            left: scale(self.left),
        }
    }
}

/// Resize `frame` to `target_width`, preserving aspect ratio.
///
/// Height is `floor(h * target_width / w)`, never less than one row.
/// Frames narrower than the target are upscaled.
pub fn resize_to_width(frame: &RgbImage, target_width: u32) -> ScaledFrame {
    let (width, height) = frame.dimensions();
    if width == 0 || target_width == 0 || width == target_width {
        return ScaledFrame {
            image: frame.clone(),
            ratio: 1.0,
        };
    }

    let target_height = ((height as u64 * target_width as u64) / width as u64).max(1) as u32;
    let image = imageops::resize(frame, target_width, target_height, FilterType::Triangle);

    tracing::trace!(
        from = ?(width, height),
        to = ?(target_width, target_height),
        "resized frame"
    );

    ScaledFrame {
        image,
        ratio: width as f32 / target_width as f32,
    }
}
