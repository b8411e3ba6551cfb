//! Background GIF encoding
//!
//! An [`EncodeJob`] owns the frames drained from a recording and turns them
//! into one GIF file:
//!
//! 1. normalize and stage every frame as `frame<index>.png` (first half of
//!    the progress range),
//! 2. mux the staged frames back in index order (second half),
//! 3. move the finished file into the export directory and remove the
//!    staging directory.
//!
//! Any failure aborts the job; staged files and partial output are removed
//! before the error is returned.
//!
//! ## Toyota Way Application
//!
//! - **Muda**: staging keeps one decoded image in memory at a time
//! - **Jidoka**: bad frame rate or empty input stops the job before any I/O

use crate::config::RecorderConfig;
use crate::frame::Frame;
use crate::muxer::{mux_to_temp, persist_unique, MuxSettings};
use crate::normalize::{normalize, NormalizeOptions};
use crate::progress::Progress;
use crate::result::{EncodeResult, RecorderError, RecorderResult};
use crate::staging::{IntermediateArtifact, StagingArea};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use std::thread::JoinHandle;
use std::time::Duration;

/// Name of the worker thread running encode jobs
pub const ENCODER_THREAD_NAME: &str = "gifcast-encoder";

/// A finished GIF file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    /// Location of the GIF
    pub path: PathBuf,
    /// Number of frames encoded
    pub frame_count: usize,
    /// Playback length of one loop
    pub duration: Duration,
}

/// One conversion of captured frames into a GIF file
#[derive(Debug)]
pub struct EncodeJob {
    frames: Vec<Frame>,
    config: RecorderConfig,
    progress: Progress,
    started_at: DateTime<Local>,
}

impl EncodeJob {
    /// Create a job over `frames`, stamped with the current time
    #[must_use]
    pub fn new(frames: Vec<Frame>, config: RecorderConfig) -> Self {
        Self::with_start_time(frames, config, Local::now())
    }

    /// Create a job with an explicit start time
    #[must_use]
    pub fn with_start_time(
        frames: Vec<Frame>,
        config: RecorderConfig,
        started_at: DateTime<Local>,
    ) -> Self {
        Self {
            frames,
            config,
            progress: Progress::new(),
            started_at,
        }
    }

    /// Handle to this job's progress
    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    /// Number of frames the job will encode
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// File stem of the output, derived from the job start time
    #[must_use]
    pub fn output_stem(&self) -> String {
        format!("recording-{}", self.started_at.format("%Y%m%d-%H%M%S-%3f"))
    }

    /// Run the job on the current thread
    pub fn run(self) -> EncodeResult {
        let frame_count = self.frames.len();
        let span = tracing::info_span!("encode_job", frames = frame_count);
        let _guard = span.enter();

        let progress = self.progress.clone();
        match self.encode() {
            Ok(recording) => {
                progress.complete();
                tracing::info!(
                    path = %recording.path.display(),
                    frames = recording.frame_count,
                    duration_ms = recording.duration.as_millis() as u64,
                    "encode finished"
                );
                Ok(recording)
            }
            Err(e) => {
                tracing::warn!(error = %e, "encode failed");
                Err(e)
            }
        }
    }

    /// Run the job on a dedicated worker thread
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::Mux`] if the thread cannot be spawned.
    pub fn spawn(self) -> RecorderResult<EncodeHandle> {
        let progress = self.progress();
        let handle = std::thread::Builder::new()
            .name(ENCODER_THREAD_NAME.to_string())
            .spawn(move || self.run())
            .map_err(|e| RecorderError::mux(format!("Failed to spawn encoder thread: {e}")))?;
        Ok(EncodeHandle { handle, progress })
    }

    fn encode(self) -> EncodeResult {
        let settings = MuxSettings::from_config(&self.config)?;
        if self.frames.is_empty() {
            return Err(RecorderError::EmptySequence);
        }

        let stem = self.output_stem();
        let frame_count = self.frames.len();
        let step = 0.5 / frame_count as f32;
        let options = NormalizeOptions::from_config(&self.config);
        tracing::info!(stem = %stem, delay_ms = settings.frame_delay_ms, "encode started");

        // Dropping `staging` on an early return removes everything staged so far.
        let mut staging = StagingArea::create(&self.config.working_dir, &stem)?;
        for frame in self.frames {
            let image = normalize(frame, &options)?;
            staging.stage(&image)?;
            self.progress.advance(step);
        }

        let images = staging.artifacts().iter().map(IntermediateArtifact::load);
        let (temp, written) = mux_to_temp(images, settings, &self.config.export_dir, |_| {
            self.progress.advance(step);
        })?;
        let path = persist_unique(temp, &self.config.export_dir, &stem)?;

        if let Err(e) = staging.cleanup() {
            tracing::warn!(error = %e, "failed to remove staged frames");
        }

        Ok(Recording {
            path,
            frame_count: written,
            duration: Duration::from_millis(u64::from(settings.frame_delay_ms) * written as u64),
        })
    }
}

/// A job running on the worker thread
#[derive(Debug)]
pub struct EncodeHandle {
    handle: JoinHandle<EncodeResult>,
    progress: Progress,
}

impl EncodeHandle {
    /// Progress of the running job
    #[must_use]
    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Whether the worker has resolved
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the job resolves
    pub fn join(self) -> EncodeResult {
        self.handle
            .join()
            .unwrap_or_else(|_| Err(RecorderError::mux("Encoder thread panicked")))
    }
}
