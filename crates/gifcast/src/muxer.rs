//! Animated GIF muxing
//!
//! Serializes an ordered sequence of [`StillImage`]s into one GIF89a stream.
//! Every frame gets the same delay and the "restore to background" disposal,
//! and each frame carries its own NeuQuant palette built at a fixed quantizer
//! speed for the whole sequence.
//!
//! Output is all-or-nothing: [`mux`] returns bytes only after the trailer is
//! written, and [`mux_to_temp`] writes into a temporary file that is deleted
//! unless the whole sequence was finalized.

use crate::config::RecorderConfig;
use crate::normalize::StillImage;
use crate::result::{RecorderError, RecorderResult};
use gif::{DisposalMethod, Encoder, Frame, Repeat};
use std::io::{BufWriter, Write};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Alpha at or above this is opaque when deriving the binary GIF mask
const ALPHA_MASK_THRESHOLD: u8 = 128;

/// Attempts at finding a free output name before giving up
pub(crate) const MAX_NAME_ATTEMPTS: u32 = 1000;

/// NeuQuant speeds accepted by the GIF encoder
pub const QUANTIZER_SPEED_RANGE: RangeInclusive<i32> = 1..=30;

/// Timing, looping, and quantization settings for one mux
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxSettings {
    /// Delay between frames in milliseconds
    pub frame_delay_ms: u32,
    /// Loop forever (`true`) or play once (`false`)
    pub loop_playback: bool,
    /// NeuQuant speed (1 = best quality, 30 = fastest)
    pub quantizer_speed: i32,
}

impl MuxSettings {
    /// Derive mux settings from a recorder configuration
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::InvalidFrameRate`] for a zero frame rate.
    pub fn from_config(config: &RecorderConfig) -> RecorderResult<Self> {
        Ok(Self {
            frame_delay_ms: config.frame_delay_millis()?,
            loop_playback: config.loop_playback,
            quantizer_speed: config.quantizer_speed(),
        })
    }

    /// Check values the encoder would otherwise reject by panicking
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Mux`] if `quantizer_speed` is outside
    /// [`QUANTIZER_SPEED_RANGE`].
    pub fn validate(&self) -> RecorderResult<()> {
        if !QUANTIZER_SPEED_RANGE.contains(&self.quantizer_speed) {
            return Err(RecorderError::mux(format!(
                "Quantizer speed {} outside {}..={}",
                self.quantizer_speed,
                QUANTIZER_SPEED_RANGE.start(),
                QUANTIZER_SPEED_RANGE.end()
            )));
        }
        Ok(())
    }

    /// Frame delay in GIF centiseconds, rounded, at least 1
    #[must_use]
    pub fn delay_centis(&self) -> u16 {
        let centis = (self.frame_delay_ms.saturating_add(5) / 10).max(1);
        u16::try_from(centis).unwrap_or(u16::MAX)
    }
}

/// Incremental GIF writer
///
/// The canvas size is taken from the first pushed image; later images must
/// match it exactly.
pub struct SequenceMuxer<W: Write> {
    writer: Option<W>,
    encoder: Option<Encoder<W>>,
    settings: MuxSettings,
    canvas: (u32, u32),
    frames_written: usize,
}

impl<W: Write> std::fmt::Debug for SequenceMuxer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceMuxer")
            .field("settings", &self.settings)
            .field("canvas", &self.canvas)
            .field("frames_written", &self.frames_written)
            .finish()
    }
}

impl<W: Write> SequenceMuxer<W> {
    /// Create a muxer writing into `writer`
    #[must_use]
    pub fn new(writer: W, settings: MuxSettings) -> Self {
        Self {
            writer: Some(writer),
            encoder: None,
            settings,
            canvas: (0, 0),
            frames_written: 0,
        }
    }

    /// Number of frames written so far
    #[must_use]
    pub const fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Append one image as the next frame
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::DimensionMismatch`] if the image size differs
    /// from the canvas, or [`RecorderError::Mux`] on invalid settings or
    /// encoder failure.
    pub fn push(&mut self, image: StillImage) -> RecorderResult<()> {
        let (width, height) = (image.width(), image.height());

        if self.encoder.is_none() {
            self.start(width, height)?;
        } else if (width, height) != self.canvas {
            return Err(RecorderError::DimensionMismatch {
                index: self.frames_written,
                expected_width: self.canvas.0,
                expected_height: self.canvas.1,
                found_width: width,
                found_height: height,
            });
        }

        let has_alpha = image.has_alpha();
        let mut rgba = image.into_rgba().into_raw();
        if has_alpha {
            apply_binary_mask(&mut rgba);
        }

        let mut frame = Frame::from_rgba_speed(
            width as u16,
            height as u16,
            &mut rgba,
            self.settings.quantizer_speed,
        );
        frame.delay = self.settings.delay_centis();
        frame.dispose = DisposalMethod::Background;

        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| RecorderError::mux("GIF encoder not initialized"))?;
        encoder
            .write_frame(&frame)
            .map_err(|e| RecorderError::mux(format!("Failed to write GIF frame: {e}")))?;

        self.frames_written += 1;
        Ok(())
    }

    /// Write the trailer and return the underlying writer with the frame count
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::EmptySequence`] if nothing was pushed.
    pub fn finish(mut self) -> RecorderResult<(W, usize)> {
        let encoder = self.encoder.take().ok_or(RecorderError::EmptySequence)?;
        let writer = encoder
            .into_inner()
            .map_err(|e| RecorderError::mux(format!("Failed to finalize GIF: {e}")))?;
        Ok((writer, self.frames_written))
    }

    fn start(&mut self, width: u32, height: u32) -> RecorderResult<()> {
        self.settings.validate()?;
        let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
            return Err(RecorderError::mux(format!(
                "Canvas {width}x{height} exceeds the GIF size limit"
            )));
        };
        let writer = self
            .writer
            .take()
            .ok_or_else(|| RecorderError::mux("GIF writer already consumed"))?;

        let mut encoder = Encoder::new(writer, w, h, &[])
            .map_err(|e| RecorderError::mux(format!("Failed to create GIF encoder: {e}")))?;

        // Without the looping extension viewers play the animation once.
        if self.settings.loop_playback {
            encoder
                .set_repeat(Repeat::Infinite)
                .map_err(|e| RecorderError::mux(format!("Failed to set GIF repeat: {e}")))?;
        }

        self.canvas = (width, height);
        self.encoder = Some(encoder);
        Ok(())
    }
}

/// Force every alpha value to fully transparent or fully opaque
fn apply_binary_mask(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        if px[3] >= ALPHA_MASK_THRESHOLD {
            px[3] = u8::MAX;
        } else {
            px.copy_from_slice(&[0, 0, 0, 0]);
        }
    }
}

/// Mux a sequence of images into an in-memory GIF
///
/// # Errors
///
/// Returns [`RecorderError::EmptySequence`] for an empty sequence,
/// [`RecorderError::DimensionMismatch`] for inconsistent sizes.
pub fn mux<I>(images: I, settings: MuxSettings) -> RecorderResult<Vec<u8>>
where
    I: IntoIterator<Item = StillImage>,
{
    let mut muxer = SequenceMuxer::new(Vec::new(), settings);
    for image in images {
        muxer.push(image)?;
    }
    let (bytes, _) = muxer.finish()?;
    Ok(bytes)
}

/// Mux lazily produced images into a temporary file inside `dir`
///
/// `images` is pulled one item at a time, so only one decoded image is held at
/// once. `on_frame` is called with the count of frames written after each
/// frame. The temporary file is removed on drop unless it is persisted, so an
/// error here never leaves partial output behind.
///
/// # Errors
///
/// Propagates the first error yielded by `images`, plus all [`mux`] errors.
pub fn mux_to_temp<I, F>(
    images: I,
    settings: MuxSettings,
    dir: &Path,
    mut on_frame: F,
) -> RecorderResult<(NamedTempFile, usize)>
where
    I: IntoIterator<Item = RecorderResult<StillImage>>,
    F: FnMut(usize),
{
    std::fs::create_dir_all(dir).map_err(|e| RecorderError::storage(dir, e))?;
    let mut temp = tempfile::Builder::new()
        .prefix(".recording-")
        .suffix(".gif.part")
        .tempfile_in(dir)
        .map_err(|e| RecorderError::storage(dir, e))?;

    let frame_count = {
        let mut muxer = SequenceMuxer::new(BufWriter::new(&mut temp), settings);
        for image in images {
            muxer.push(image?)?;
            on_frame(muxer.frames_written());
        }
        let (writer, frame_count) = muxer.finish()?;
        writer
            .into_inner()
            .map_err(|e| RecorderError::storage(dir, e.into_error()))?;
        frame_count
    };

    temp.as_file()
        .sync_all()
        .map_err(|e| RecorderError::storage(temp.path(), e))?;
    Ok((temp, frame_count))
}

/// Move a finished temporary file to `<dir>/<stem>.gif`, adding `-1`, `-2`, ...
/// to the stem if that name is taken. Existing files are never overwritten.
///
/// # Errors
///
/// Returns [`RecorderError::StorageIo`] if the rename fails or no free name is
/// found.
pub fn persist_unique(mut temp: NamedTempFile, dir: &Path, stem: &str) -> RecorderResult<PathBuf> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stem}.gif")
        } else {
            format!("{stem}-{attempt}.gif")
        };
        let path = dir.join(name);
        match temp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => temp = e.file,
            Err(e) => return Err(RecorderError::storage(path, e.error)),
        }
    }
    Err(RecorderError::storage(
        dir,
        std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free output name for {stem}"),
        ),
    ))
}
