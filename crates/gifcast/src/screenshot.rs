//! Single-frame PNG screenshots.

use crate::capture::{CaptureRegion, CaptureSource};
use crate::muxer::MAX_NAME_ATTEMPTS;
use crate::normalize::{normalize, NormalizeOptions, StillImage};
use crate::result::{RecorderError, RecorderResult};
use crate::staging::encode_png;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Capture `region` once and write it to `<export_dir>/screenshot-<millis>.png`
///
/// A numeric suffix is added if a screenshot with the same timestamp exists.
/// Existing files are never overwritten.
///
/// # Errors
///
/// Propagates capture errors and returns [`RecorderError::StorageIo`] if the
/// file cannot be written.
pub fn take_screenshot<S>(
    source: &mut S,
    region: CaptureRegion,
    options: &NormalizeOptions,
    export_dir: &Path,
) -> RecorderResult<PathBuf>
where
    S: CaptureSource + ?Sized,
{
    let image = normalize(source.capture(region)?, options)?;
    let stem = format!("screenshot-{}", chrono::Utc::now().timestamp_millis());
    let path = write_unique_png(export_dir, &stem, &image)?;
    tracing::debug!(path = %path.display(), "saved screenshot");
    Ok(path)
}

/// Write `image` to the first free name of `<stem>.png`, `<stem>-1.png`, ...
///
/// Names are claimed with `create_new`, so a file created concurrently under
/// the same name is skipped rather than replaced.
fn write_unique_png(dir: &Path, stem: &str, image: &StillImage) -> RecorderResult<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| RecorderError::storage(dir, e))?;

    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{stem}.png")
        } else {
            format!("{stem}-{attempt}.png")
        };
        let path = dir.join(name);
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(RecorderError::storage(path, e)),
        };
        if let Err(e) = encode_png(file, &path, image) {
            if let Err(remove) = std::fs::remove_file(&path) {
                tracing::warn!(error = %remove, "failed to remove partial screenshot");
            }
            return Err(e);
        }
        return Ok(path);
    }

    Err(RecorderError::storage(
        dir,
        std::io::Error::new(ErrorKind::AlreadyExists, format!("no free name for {stem}")),
    ))
}
