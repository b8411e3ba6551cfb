//! gifcast: record a rendering surface to an animated GIF
//!
//! A [`RecordingSession`] is driven from the render loop. While recording it
//! samples frames from a [`CaptureSource`] at a fixed cadence; on stop it
//! hands the buffered frames to an [`EncodeJob`] running on a worker thread,
//! which stages them on disk and muxes them into one GIF file.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐ tick  ┌──────────────────┐ drain  ┌───────────────────┐
//! │ Render loop │──────►│ RecordingSession │───────►│ EncodeJob (worker)│
//! │             │       │  FrameSampler    │        │  normalize        │
//! │ CaptureSrc  │◄──────│  FrameBuffer     │        │  stage frameN.png │
//! └─────────────┘capture└──────────────────┘        │  SequenceMuxer    │
//!                              ▲   Progress (atomic)└─────────┬─────────┘
//!                              └──────────── EncodeResult ────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use gifcast::{CaptureRegion, FramebufferSource, RecorderConfig, RecordingSession};
//! use image::RgbaImage;
//!
//! let config = RecorderConfig::new("gifexport", ".gifimages").with_fps(10);
//! let mut session = RecordingSession::new(config).with_region(CaptureRegion::full(64, 64));
//! let mut source = FramebufferSource::new(RgbaImage::new(64, 64));
//!
//! session.start_recording();
//! for _ in 0..60 {
//!     session.tick(&mut source)?;
//! }
//! session.stop_and_save();
//! session.wait_for_encode();
//! println!("{:?}", session.last_recording());
//! # Ok::<(), gifcast::RecorderError>(())
//! ```

#![warn(missing_docs)]

mod capture;
mod config;
mod frame;
mod job;
mod logging;
mod muxer;
mod normalize;
mod progress;
mod result;
mod sampler;
mod screenshot;
mod session;
mod staging;

pub use capture::{CaptureRegion, CaptureSource, FramebufferSource, DEFAULT_REGION_SIZE};
pub use config::{frame_delay_millis, RecorderConfig};
pub use frame::{Frame, FrameBuffer};
pub use job::{EncodeHandle, EncodeJob, Recording, ENCODER_THREAD_NAME};
pub use logging::{init_json_tracing, init_tracing, DEFAULT_FILTER};
pub use muxer::{
    mux, mux_to_temp, persist_unique, MuxSettings, SequenceMuxer, QUANTIZER_SPEED_RANGE,
};
pub use normalize::{normalize, NormalizeOptions, StillImage, CHANNEL_BIT_DEPTH};
pub use progress::Progress;
pub use result::{EncodeResult, FailureKind, RecorderError, RecorderResult};
pub use sampler::FrameSampler;
pub use screenshot::take_screenshot;
pub use session::{RecordingSession, SessionState};
pub use staging::{IntermediateArtifact, StagingArea, ARTIFACT_EXTENSION};
