//! End-to-end recording scenarios through the public API.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use gifcast::{
    CaptureRegion, EncodeJob, FailureKind, Frame, FramebufferSource, RecorderConfig,
    RecordingSession, SessionState,
};
use image::RgbaImage;
use std::io::Cursor;
use std::path::{Path, PathBuf};

struct Workspace {
    _root: tempfile::TempDir,
    export: PathBuf,
    work: PathBuf,
}

fn workspace() -> Workspace {
    gifcast::init_tracing("gifcast=debug");
    let root = tempfile::tempdir().unwrap();
    Workspace {
        export: root.path().join("export"),
        work: root.path().join("work"),
        _root: root,
    }
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files = Vec::new();
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.is_dir() {
            files.extend(files_under(&path));
        } else {
            files.push(path);
        }
    }
    files
}

fn decode_frames(path: &Path) -> Vec<gif::Frame<'static>> {
    let bytes = std::fs::read(path).unwrap();
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::RGBA);
    let mut decoder = options.read_info(Cursor::new(bytes)).unwrap();
    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().unwrap() {
        frames.push(frame.clone());
    }
    frames
}

fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Frame {
    Frame::filled(width, height, rgba).unwrap()
}

fn noise(size: u32, seed: u32) -> Frame {
    let data = (0..size * size * 4)
        .map(|i: u32| (i.wrapping_mul(2_654_435_761).wrapping_add(seed) >> 7) as u8)
        .collect();
    Frame::new(data, size, size).unwrap()
}

fn assert_pixel_near(pixel: &[u8], expected: [u8; 4]) {
    for (got, want) in pixel.iter().zip(expected) {
        assert!(got.abs_diff(want) <= 8, "{pixel:?} not near {expected:?}");
    }
}

#[test]
fn three_frames_at_ten_fps_produce_one_gif() {
    let ws = workspace();
    let config = RecorderConfig::new(&ws.export, &ws.work).with_fps(10);
    let mut session = RecordingSession::new(config);

    session.start_recording();
    for color in [[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]] {
        assert!(session.append_frame(solid(10, 10, color)));
    }
    session.stop_and_save();
    session.wait_for_encode();

    let recording = session.last_recording().unwrap().clone();
    assert_eq!(files_under(&ws.export), vec![recording.path.clone()]);
    assert_eq!(recording.frame_count, 3);

    let frames = decode_frames(&recording.path);
    assert_eq!(frames.len(), 3);
    for frame in &frames {
        assert_eq!(frame.delay, 10);
        assert_eq!(frame.dispose, gif::DisposalMethod::Background);
        assert_eq!((frame.width, frame.height), (10, 10));
    }
    assert_pixel_near(&frames[1].buffer[0..4], [0, 255, 0, 255]);
    assert!(files_under(&ws.work).is_empty());
}

#[test]
fn zero_frames_fail_with_empty_sequence() {
    let ws = workspace();
    let mut session = RecordingSession::new(RecorderConfig::new(&ws.export, &ws.work));

    session.start_recording();
    session.stop_and_save();
    session.wait_for_encode();

    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(
        session.last_error().map(gifcast::RecorderError::kind),
        Some(FailureKind::EmptySequence)
    );
    assert!(files_under(&ws.export).is_empty());
    assert!(files_under(&ws.work).is_empty());
}

#[test]
fn half_transparent_frame_is_flattened() {
    let ws = workspace();
    let config = RecorderConfig::new(&ws.export, &ws.work)
        .with_fps(10)
        .with_flatten_transparency(true);
    let mut session = RecordingSession::new(config);

    session.start_recording();
    session.append_frame(solid(4, 4, [200, 40, 40, 255]));
    session.append_frame(solid(4, 4, [40, 200, 40, 128]));
    session.stop_and_save();
    session.wait_for_encode();

    let frames = decode_frames(&session.last_recording().unwrap().path);
    assert_eq!(frames[1].transparent, None);
    assert_pixel_near(&frames[1].buffer[0..4], [40, 200, 40, 255]);
}

#[test]
fn zero_fps_fails_before_staging() {
    let ws = workspace();
    let config = RecorderConfig::new(&ws.export, &ws.work).with_fps(0);
    let mut session = RecordingSession::new(config);

    session.start_recording();
    session.append_frame(solid(4, 4, [0, 0, 0, 255]));
    session.stop_and_save();
    session.wait_for_encode();

    assert_eq!(
        session.last_error().map(gifcast::RecorderError::kind),
        Some(FailureKind::InvalidFrameRate)
    );
    assert!(!ws.work.exists());
    assert!(!ws.export.exists());
}

#[test]
fn frames_after_stop_are_not_included() {
    let ws = workspace();
    let mut session =
        RecordingSession::new(RecorderConfig::new(&ws.export, &ws.work).with_fps(10));

    session.start_recording();
    session.append_frame(solid(4, 4, [1, 1, 1, 255]));
    session.append_frame(solid(4, 4, [2, 2, 2, 255]));
    session.stop_and_save();
    assert!(!session.append_frame(solid(4, 4, [3, 3, 3, 255])));
    session.wait_for_encode();

    assert_eq!(session.last_recording().unwrap().frame_count, 2);
}

#[test]
fn second_stop_while_encoding_produces_one_file() {
    let ws = workspace();
    let mut session =
        RecordingSession::new(RecorderConfig::new(&ws.export, &ws.work).with_fps(10));

    session.start_recording();
    for seed in 0..40 {
        session.append_frame(noise(160, seed));
    }
    assert!(session.stop_and_save());
    assert!(!session.stop_and_save());
    assert!(!session.start_recording());
    session.wait_for_encode();

    assert_eq!(files_under(&ws.export).len(), 1);
}

#[test]
fn each_job_starts_with_fresh_progress() {
    let ws = workspace();
    let config = RecorderConfig::new(&ws.export, &ws.work).with_fps(10);

    let first = EncodeJob::new(vec![solid(4, 4, [0, 0, 0, 255])], config.clone());
    let first_progress = first.progress();
    first.run().unwrap();
    assert_eq!(first_progress.get(), 1.0);

    let second = EncodeJob::new(vec![solid(4, 4, [0, 0, 0, 255])], config);
    assert_eq!(second.progress().get(), 0.0);
}

#[test]
fn recorder_can_restart_after_failure() {
    let ws = workspace();
    let mut session =
        RecordingSession::new(RecorderConfig::new(&ws.export, &ws.work).with_fps(10));

    session.start_recording();
    session.append_frame(solid(4, 4, [0, 0, 0, 255]));
    session.append_frame(solid(5, 4, [0, 0, 0, 255]));
    session.stop_and_save();
    session.wait_for_encode();
    assert_eq!(
        session.last_error().map(gifcast::RecorderError::kind),
        Some(FailureKind::DimensionMismatch)
    );
    assert!(files_under(&ws.work).is_empty());
    assert!(files_under(&ws.export).is_empty());

    assert!(session.start_recording());
    session.append_frame(solid(4, 4, [0, 0, 0, 255]));
    session.stop_and_save();
    session.wait_for_encode();
    assert!(session.last_recording().is_some());
}

#[test]
fn render_loop_drives_sampling_and_encoding() {
    let ws = workspace();
    let config = RecorderConfig::new(&ws.export, &ws.work)
        .with_fps(30)
        .with_tick_rate(60)
        .with_loop(false);
    let mut session =
        RecordingSession::new(config).with_region(CaptureRegion::centered(64, 48, 16, 16));
    let mut source = FramebufferSource::new(RgbaImage::new(64, 48));

    session.start_recording();
    for tick in 0..20u8 {
        source.update(RgbaImage::from_pixel(64, 48, image::Rgba([tick * 10, 0, 0, 255])));
        session.tick(&mut source).unwrap();
    }
    assert_eq!(session.frame_count(), 10);

    session.stop_and_save();
    loop {
        session.tick(&mut source).unwrap();
        if session.state() != SessionState::Encoding {
            break;
        }
        std::thread::yield_now();
    }

    let recording = session.last_recording().unwrap();
    assert_eq!(recording.frame_count, 10);
    let bytes = std::fs::read(&recording.path).unwrap();
    assert!(!bytes.windows(11).any(|w| w == b"NETSCAPE2.0"));
    assert_eq!(decode_frames(&recording.path)[0].width, 16);
}

#[test]
fn dropping_session_waits_for_encode() {
    let ws = workspace();
    {
        let mut session =
            RecordingSession::new(RecorderConfig::new(&ws.export, &ws.work).with_fps(10));
        session.start_recording();
        for _ in 0..5 {
            session.append_frame(solid(16, 16, [1, 2, 3, 255]));
        }
        session.stop_and_save();
    }
    assert_eq!(files_under(&ws.export).len(), 1);
    assert!(files_under(&ws.work).is_empty());
}
