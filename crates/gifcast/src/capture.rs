//! Capture sources
//!
//! The recorder does not know how pixels are read from a rendering surface;
//! it asks a [`CaptureSource`] for one region at a time.
//! [`FramebufferSource`] is the stock implementation over an RGBA surface
//! snapshot. Any `FnMut(CaptureRegion) -> RecorderResult<Frame>` closure is
//! also a source.

use crate::frame::Frame;
use crate::result::{RecorderError, RecorderResult};
use image::{imageops, RgbaImage};
use serde::{Deserialize, Serialize};

/// Default capture width and height in pixels
pub const DEFAULT_REGION_SIZE: u32 = 300;

/// Rectangle of the surface to record, in surface pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRegion {
    /// Left edge
    pub x: u32,
    /// Top edge (bottom edge for bottom-up surfaces)
    pub y: u32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Default for CaptureRegion {
    fn default() -> Self {
        Self::new(0, 0, DEFAULT_REGION_SIZE, DEFAULT_REGION_SIZE)
    }
}

impl CaptureRegion {
    /// Create a region
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole surface
    #[must_use]
    pub const fn full(surface_width: u32, surface_height: u32) -> Self {
        Self::new(0, 0, surface_width, surface_height)
    }

    /// A `width` x `height` region centered on the surface, shrunk to fit
    #[must_use]
    pub fn centered(surface_width: u32, surface_height: u32, width: u32, height: u32) -> Self {
        let width = width.min(surface_width);
        let height = height.min(surface_height);
        Self::new(
            (surface_width - width) / 2,
            (surface_height - height) / 2,
            width,
            height,
        )
    }

    /// Whether the region lies entirely inside a surface of the given size
    #[must_use]
    pub fn fits_within(&self, surface_width: u32, surface_height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= surface_width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= surface_height)
    }
}

/// Something that can produce a raw frame for a region
pub trait CaptureSource {
    /// Read the pixels of `region`
    ///
    /// # Errors
    ///
    /// Implementations return an error if the region cannot be read.
    fn capture(&mut self, region: CaptureRegion) -> RecorderResult<Frame>;
}

impl<F> CaptureSource for F
where
    F: FnMut(CaptureRegion) -> RecorderResult<Frame>,
{
    fn capture(&mut self, region: CaptureRegion) -> RecorderResult<Frame> {
        self(region)
    }
}

/// Capture source backed by an in-memory RGBA surface
///
/// Renderers copy their back buffer into the source with [`Self::update`]
/// once per tick. Surfaces whose rows are stored bottom-up (OpenGL read-back)
/// set [`Self::with_bottom_up`]; captured frames are then flipped so the
/// first row of every frame is the top of the image.
#[derive(Debug, Clone)]
pub struct FramebufferSource {
    surface: RgbaImage,
    bottom_up: bool,
}

impl FramebufferSource {
    /// Wrap a surface snapshot
    #[must_use]
    pub fn new(surface: RgbaImage) -> Self {
        Self {
            surface,
            bottom_up: false,
        }
    }

    /// Treat surface rows and region `y` as measured from the bottom edge
    #[must_use]
    pub fn with_bottom_up(mut self, bottom_up: bool) -> Self {
        self.bottom_up = bottom_up;
        self
    }

    /// Replace the surface contents
    pub fn update(&mut self, surface: RgbaImage) {
        self.surface = surface;
    }

    /// Surface size in pixels
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.surface.dimensions()
    }
}

impl CaptureSource for FramebufferSource {
    fn capture(&mut self, region: CaptureRegion) -> RecorderResult<Frame> {
        let (surface_width, surface_height) = self.surface.dimensions();
        if !region.fits_within(surface_width, surface_height) {
            return Err(RecorderError::InvalidFrame {
                message: format!(
                    "Capture region {region:?} outside {surface_width}x{surface_height} surface"
                ),
            });
        }

        let cropped = imageops::crop_imm(
            &self.surface,
            region.x,
            region.y,
            region.width,
            region.height,
        )
        .to_image();

        // Bottom-up rows: the stored top row is the visual bottom.
        let pixels = if self.bottom_up {
            imageops::flip_vertical(&cropped)
        } else {
            cropped
        };
        Ok(Frame::from_image(pixels))
    }
}
