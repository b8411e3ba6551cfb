//! Pixel normalization
//!
//! Turns a raw captured [`Frame`] into the [`StillImage`] form the muxer
//! consumes. GIF transparency is binary, so partially transparent capture
//! pixels are usually flattened to opaque here.

use crate::config::RecorderConfig;
use crate::frame::Frame;
use crate::result::{RecorderError, RecorderResult};
use image::RgbaImage;

/// Bits per color channel of every [`StillImage`]
pub const CHANNEL_BIT_DEPTH: u8 = 8;

/// Options controlling [`normalize`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    /// Force non-opaque pixels to full opacity
    pub flatten_transparency: bool,
    /// Alpha at or below `1.0 - alpha_epsilon` counts as not opaque
    pub alpha_epsilon: f32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            flatten_transparency: true,
            alpha_epsilon: 0.001,
        }
    }
}

impl NormalizeOptions {
    /// Build options from a recorder configuration
    #[must_use]
    pub fn from_config(config: &RecorderConfig) -> Self {
        Self {
            flatten_transparency: config.flatten_transparency,
            alpha_epsilon: config.alpha_epsilon,
        }
    }

    /// Whether an alpha value is considered fully opaque
    #[must_use]
    pub fn is_opaque(&self, alpha: u8) -> bool {
        f32::from(alpha) / 255.0 > 1.0 - self.alpha_epsilon
    }
}

/// A normalized in-memory RGBA image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillImage {
    pixels: RgbaImage,
    has_alpha: bool,
}

impl StillImage {
    /// Wrap an RGBA image, detecting whether any pixel is not fully opaque
    #[must_use]
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        let has_alpha = pixels.pixels().any(|px| px[3] < u8::MAX);
        Self { pixels, has_alpha }
    }

    /// Image width in pixels
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Image height in pixels
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Bits per color channel
    #[must_use]
    pub const fn bit_depth(&self) -> u8 {
        CHANNEL_BIT_DEPTH
    }

    /// Whether any pixel is not fully opaque
    #[must_use]
    pub const fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Borrow the pixel grid
    #[must_use]
    pub const fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Consume the image, returning its pixel grid
    #[must_use]
    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    /// Convert back into a raw frame
    #[must_use]
    pub fn into_frame(self) -> Frame {
        Frame::from_image(self.pixels)
    }
}

/// Convert a raw frame into a [`StillImage`]
///
/// Takes ownership of the frame; its buffer is reused for the image.
pub fn normalize(frame: Frame, options: &NormalizeOptions) -> RecorderResult<StillImage> {
    let (width, height) = (frame.width(), frame.height());
    let mut pixels =
        RgbaImage::from_raw(width, height, frame.into_data()).ok_or_else(|| {
            RecorderError::InvalidFrame {
                message: format!("Pixel buffer does not fit {width}x{height}"),
            }
        })?;

    if options.flatten_transparency {
        for px in pixels.pixels_mut() {
            if !options.is_opaque(px[3]) {
                px[3] = u8::MAX;
            }
        }
    }

    Ok(StillImage::from_rgba(pixels))
}
