//! Recording session state machine
//!
//! ```text
//!            start_recording            stop_and_save
//!   ┌──────┐ ─────────────► ┌───────────┐ ───────────► ┌──────────┐
//!   │ Idle │                │ Recording │              │ Encoding │
//!   └──────┘ ◄───────────── └───────────┘              └──────────┘
//!      ▲     cancel_recording                                │
//!      └─────────────────────────────────────────────────────┘
//!                 job resolved (observed by poll / tick / wait)
//! ```
//!
//! Requests that do not match a transition are ignored and reported by a
//! `false` return. Transition requests observe a finished encode first, so a
//! caller that never ticks can still start the next recording. The session is
//! driven from one thread (the render loop); only the encode job runs
//! elsewhere, and it owns the frames it was given.

use crate::capture::{CaptureRegion, CaptureSource};
use crate::config::RecorderConfig;
use crate::frame::{Frame, FrameBuffer};
use crate::job::{EncodeHandle, EncodeJob, Recording};
use crate::normalize::NormalizeOptions;
use crate::progress::Progress;
use crate::result::{RecorderError, RecorderResult};
use crate::sampler::FrameSampler;
use crate::screenshot::take_screenshot;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not recording, no encode running
    Idle,
    /// Accepting frames
    Recording,
    /// An encode job is running on the worker
    Encoding,
}

/// One recorder: buffers frames while recording and encodes them on stop
#[derive(Debug)]
pub struct RecordingSession {
    config: RecorderConfig,
    state: SessionState,
    buffer: FrameBuffer,
    sampler: FrameSampler,
    region: CaptureRegion,
    encode: Option<EncodeHandle>,
    progress: Progress,
    recording_started: Option<Instant>,
    last_recording: Option<Recording>,
    last_error: Option<RecorderError>,
}

impl RecordingSession {
    /// Create an idle session
    #[must_use]
    pub fn new(config: RecorderConfig) -> Self {
        let sampler = sampler_for(&config);
        Self {
            config,
            state: SessionState::Idle,
            buffer: FrameBuffer::new(),
            sampler,
            region: CaptureRegion::default(),
            encode: None,
            progress: Progress::new(),
            recording_started: None,
            last_recording: None,
            last_error: None,
        }
    }

    /// Set the capture region used by [`Self::tick`]
    #[must_use]
    pub fn with_region(mut self, region: CaptureRegion) -> Self {
        self.region = region;
        self
    }

    /// Current configuration
    #[must_use]
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Replace the configuration. Only allowed while idle.
    pub fn set_config(&mut self, config: RecorderConfig) -> bool {
        self.poll();
        if self.state != SessionState::Idle {
            tracing::debug!(state = ?self.state, "ignoring config change");
            return false;
        }
        self.sampler = sampler_for(&config);
        self.config = config;
        true
    }

    /// Capture region
    #[must_use]
    pub const fn region(&self) -> CaptureRegion {
        self.region
    }

    /// Move or resize the capture region
    pub fn set_region(&mut self, region: CaptureRegion) {
        self.region = region;
    }

    /// Last observed state; call [`Self::poll`] to pick up a finished encode
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether frames are being accepted
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    /// Whether an encode job is in flight
    #[must_use]
    pub fn is_encoding(&self) -> bool {
        self.state == SessionState::Encoding
    }

    /// Number of buffered frames
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.buffer.len()
    }

    /// Time since recording started, zero when not recording
    #[must_use]
    pub fn recording_time(&self) -> Duration {
        self.recording_started
            .map_or(Duration::ZERO, |started| started.elapsed())
    }

    /// Progress of the current or most recent encode job
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.progress.get()
    }

    /// Most recent successful recording
    #[must_use]
    pub fn last_recording(&self) -> Option<&Recording> {
        self.last_recording.as_ref()
    }

    /// Error of the most recent encode, cleared by the next success
    #[must_use]
    pub fn last_error(&self) -> Option<&RecorderError> {
        self.last_error.as_ref()
    }

    /// Take the most recent encode error
    pub fn take_last_error(&mut self) -> Option<RecorderError> {
        self.last_error.take()
    }

    /// `Idle -> Recording`. Discards anything left in the buffer.
    pub fn start_recording(&mut self) -> bool {
        self.poll();
        if self.state != SessionState::Idle {
            tracing::debug!(state = ?self.state, "ignoring start request");
            return false;
        }
        self.buffer.clear();
        self.sampler.reset();
        self.recording_started = Some(Instant::now());
        self.state = SessionState::Recording;
        tracing::info!("recording started");
        true
    }

    /// `Recording -> Idle`, dropping the buffered frames
    pub fn cancel_recording(&mut self) -> bool {
        if self.state != SessionState::Recording {
            tracing::debug!(state = ?self.state, "ignoring cancel request");
            return false;
        }
        let dropped = self.buffer.len();
        self.buffer.clear();
        self.recording_started = None;
        self.state = SessionState::Idle;
        tracing::info!(dropped, "recording discarded");
        true
    }

    /// `Recording -> Encoding`: drain the buffer and hand it to a new job
    ///
    /// The drained frames move into the job; nothing appended afterwards can
    /// reach it. If the worker cannot be started the error is published and
    /// the session returns to idle.
    pub fn stop_and_save(&mut self) -> bool {
        self.poll();
        if self.state != SessionState::Recording {
            tracing::debug!(state = ?self.state, "ignoring stop request");
            return false;
        }
        let frames = self.buffer.drain_all();
        self.recording_started = None;
        tracing::info!(frames = frames.len(), "recording stopped, encoding");

        let job = EncodeJob::new(frames, self.config.clone());
        self.progress = job.progress();
        match job.spawn() {
            Ok(handle) => {
                self.encode = Some(handle);
                self.state = SessionState::Encoding;
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not start encode");
                self.last_error = Some(e);
                self.state = SessionState::Idle;
            }
        }
        true
    }

    /// Buffer a frame; ignored unless recording
    pub fn append_frame(&mut self, frame: Frame) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }
        self.buffer.append(frame);
        true
    }

    /// Per-render-tick entry point
    ///
    /// Picks up a finished encode, then, while recording, captures the
    /// configured region on every sampled tick. Returns whether a frame was
    /// captured.
    ///
    /// # Errors
    ///
    /// Propagates capture errors from `source`; the session state is unchanged.
    pub fn tick<S>(&mut self, source: &mut S) -> RecorderResult<bool>
    where
        S: CaptureSource + ?Sized,
    {
        self.poll();
        if self.state != SessionState::Recording || !self.sampler.tick() {
            return Ok(false);
        }
        let frame = source.capture(self.region)?;
        Ok(self.append_frame(frame))
    }

    /// Observe the worker; `Encoding -> Idle` once the job has resolved
    pub fn poll(&mut self) -> SessionState {
        if self
            .encode
            .as_ref()
            .is_some_and(EncodeHandle::is_finished)
        {
            self.finish_encode();
        }
        self.state
    }

    /// Block until the running encode (if any) resolves
    ///
    /// Returns `true` if there was a job to wait for.
    pub fn wait_for_encode(&mut self) -> bool {
        if self.encode.is_none() {
            return false;
        }
        self.finish_encode();
        true
    }

    /// Capture the current region once as a PNG in the export directory
    ///
    /// # Errors
    ///
    /// Propagates capture and storage errors.
    pub fn take_screenshot<S>(&self, source: &mut S) -> RecorderResult<PathBuf>
    where
        S: CaptureSource + ?Sized,
    {
        take_screenshot(
            source,
            self.region,
            &NormalizeOptions::from_config(&self.config),
            &self.config.export_dir,
        )
    }

    fn finish_encode(&mut self) {
        let Some(handle) = self.encode.take() else {
            return;
        };
        match handle.join() {
            Ok(recording) => {
                self.last_recording = Some(recording);
                self.last_error = None;
            }
            Err(e) => self.last_error = Some(e),
        }
        self.state = SessionState::Idle;
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(handle) = self.encode.take() {
            if let Err(e) = handle.join() {
                tracing::warn!(error = %e, "encode failed during shutdown");
            }
        }
    }
}

fn sampler_for(config: &RecorderConfig) -> FrameSampler {
    FrameSampler::new(config.tick_rate, config.record_fps, config.speed_multiplier)
}
