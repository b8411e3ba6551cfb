//! Raw captured frames and the buffer that accumulates them during recording.

use crate::result::{RecorderError, RecorderResult};

/// One raw captured pixel buffer (RGBA8, row-major)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Create a frame from RGBA data
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::InvalidFrame`] if the buffer length is not
    /// `width * height * 4` or either dimension is zero.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> RecorderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RecorderError::InvalidFrame {
                message: format!("Frame has zero area ({width}x{height})"),
            });
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(RecorderError::InvalidFrame {
                message: format!(
                    "Expected {expected} bytes for {width}x{height} RGBA, got {}",
                    data.len()
                ),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Create a frame filled with one color
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::InvalidFrame`] if either dimension is zero.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> RecorderResult<Self> {
        let pixels = width as usize * height as usize;
        Self::new(rgba.repeat(pixels), width, height)
    }

    /// Build a frame from an RGBA image, whose buffer always matches its size
    pub(crate) fn from_image(image: image::RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            data: image.into_raw(),
            width,
            height,
        }
    }

    /// Frame width in pixels
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the frame, returning its RGBA bytes
    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}

/// Ordered frames captured during one recording session
///
/// The buffer has no frame-count cap; recording length is bounded by the
/// sampling cadence and how long the caller records.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    frames: Vec<Frame>,
}

impl FrameBuffer {
    /// Create an empty buffer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame at the end of the sequence
    pub fn append(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Remove and return every buffered frame in capture order
    #[must_use]
    pub fn drain_all(&mut self) -> Vec<Frame> {
        std::mem::take(&mut self.frames)
    }

    /// Discard all buffered frames
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Number of buffered frames
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the buffer holds no frames
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod frame_tests {
        use super::*;

        #[test]
        fn test_new_frame() {
            let frame = Frame::new(vec![255, 0, 0, 255], 1, 1).unwrap();
            assert_eq!(frame.width(), 1);
            assert_eq!(frame.height(), 1);
            assert_eq!(frame.data(), &[255, 0, 0, 255]);
        }

        #[test]
        fn test_wrong_length_rejected() {
            let err = Frame::new(vec![0; 15], 2, 2).unwrap_err();
            assert!(matches!(err, RecorderError::InvalidFrame { .. }));
        }

        #[test]
        fn test_zero_area_rejected() {
            assert!(Frame::new(Vec::new(), 0, 4).is_err());
        }

        #[test]
        fn test_filled() {
            let frame = Frame::filled(3, 2, [1, 2, 3, 4]).unwrap();
            assert_eq!(frame.data().len(), 24);
            assert!(frame.data().chunks_exact(4).all(|px| px == [1, 2, 3, 4]));
        }

        #[test]
        fn test_filled_zero_area_rejected() {
            for (width, height) in [(0, 0), (0, 3), (3, 0)] {
                let err = Frame::filled(width, height, [0, 0, 0, 255]).unwrap_err();
                assert!(matches!(err, RecorderError::InvalidFrame { .. }));
            }
        }
    }

    mod frame_buffer_tests {
        use super::*;

        #[test]
        fn test_append_preserves_order() {
            let mut buffer = FrameBuffer::new();
            for shade in 0..5u8 {
                buffer.append(Frame::filled(1, 1, [shade, 0, 0, 255]).unwrap());
            }
            assert_eq!(buffer.len(), 5);

            let frames = buffer.drain_all();
            let shades: Vec<u8> = frames.iter().map(|f| f.data()[0]).collect();
            assert_eq!(shades, vec![0, 1, 2, 3, 4]);
        }

        #[test]
        fn test_drain_leaves_buffer_empty() {
            let mut buffer = FrameBuffer::new();
            buffer.append(Frame::filled(2, 2, [0, 0, 0, 255]).unwrap());
            let _ = buffer.drain_all();
            assert!(buffer.is_empty());
            assert!(buffer.drain_all().is_empty());
        }

        #[test]
        fn test_clear() {
            let mut buffer = FrameBuffer::new();
            buffer.append(Frame::filled(2, 2, [0, 0, 0, 255]).unwrap());
            buffer.clear();
            assert!(buffer.is_empty());
        }
    }
}
