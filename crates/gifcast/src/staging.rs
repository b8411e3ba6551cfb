//! Intermediate frame staging
//!
//! Each encode job writes its normalized frames to a private directory under
//! the working directory as `frame<index>.png`, then reads them back one at a
//! time while muxing. The directory is removed when the [`StagingArea`] is
//! cleaned up or dropped.

use crate::normalize::StillImage;
use crate::result::{RecorderError, RecorderResult};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File extension of staged frames
pub const ARTIFACT_EXTENSION: &str = "png";

/// A still image staged on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntermediateArtifact {
    /// Position in capture order, starting at 0
    pub index: usize,
    /// Location of the staged file
    pub path: PathBuf,
}

impl IntermediateArtifact {
    /// Read the staged image back into memory
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::StorageIo`] if the file cannot be read or decoded.
    pub fn load(&self) -> RecorderResult<StillImage> {
        let decoded = image::open(&self.path).map_err(|e| {
            RecorderError::storage(
                &self.path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        Ok(StillImage::from_rgba(decoded.to_rgba8()))
    }
}

/// Job-scoped directory of staged frames
#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
    artifacts: Vec<IntermediateArtifact>,
    removed: bool,
}

impl StagingArea {
    /// Create a fresh staging directory under `working_dir`
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::StorageIo`] if the directory cannot be created.
    pub fn create(working_dir: &Path, job_label: &str) -> RecorderResult<Self> {
        let dir = working_dir.join(format!("{job_label}-{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&dir).map_err(|e| RecorderError::storage(&dir, e))?;
        tracing::debug!(dir = %dir.display(), "created staging directory");
        Ok(Self {
            dir,
            artifacts: Vec::new(),
            removed: false,
        })
    }

    /// Directory holding this job's intermediates
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifacts staged so far, in index order
    #[must_use]
    pub fn artifacts(&self) -> &[IntermediateArtifact] {
        &self.artifacts
    }

    /// Write the next image in sequence and return its artifact
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::StorageIo`] on any write failure.
    pub fn stage(&mut self, image: &StillImage) -> RecorderResult<&IntermediateArtifact> {
        let index = self.artifacts.len();
        let path = self.dir.join(format!("frame{index}.{ARTIFACT_EXTENSION}"));
        write_png(&path, image)?;
        self.artifacts.push(IntermediateArtifact { index, path });
        Ok(&self.artifacts[index])
    }

    /// Remove the staging directory and everything in it
    ///
    /// # Errors
    ///
    /// Returns [`RecorderError::StorageIo`] if the directory cannot be removed.
    pub fn cleanup(mut self) -> RecorderResult<()> {
        self.remove()
    }

    fn remove(&mut self) -> RecorderResult<()> {
        if self.removed {
            return Ok(());
        }
        self.removed = true;
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RecorderError::storage(&self.dir, e)),
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            tracing::warn!(error = %e, "failed to remove staging directory");
        }
    }
}

/// Encode an image as an 8-bit RGBA PNG at `path`
pub(crate) fn write_png(path: &Path, image: &StillImage) -> RecorderResult<()> {
    let file = File::create(path).map_err(|e| RecorderError::storage(path, e))?;
    encode_png(file, path, image)
}

/// Encode an image as an 8-bit RGBA PNG into an opened `file` located at `path`
pub(crate) fn encode_png(file: File, path: &Path, image: &StillImage) -> RecorderResult<()> {
    let mut encoder = png::Encoder::new(BufWriter::new(file), image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Fast);

    let png_error = |e: png::EncodingError| {
        RecorderError::storage(path, std::io::Error::new(std::io::ErrorKind::Other, e))
    };
    let mut writer = encoder.write_header().map_err(png_error)?;
    writer
        .write_image_data(image.pixels().as_raw())
        .map_err(png_error)?;
    writer.finish().map_err(png_error)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use image::RgbaImage;

    fn gradient(width: u32, height: u32) -> StillImage {
        StillImage::from_rgba(RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([(x * 20) as u8, (y * 20) as u8, 128, 255])
        }))
    }

    #[test]
    fn test_stage_names_frames_by_index() {
        let root = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::create(root.path(), "job").unwrap();

        for _ in 0..3 {
            staging.stage(&gradient(4, 4)).unwrap();
        }

        let names: Vec<_> = staging
            .artifacts()
            .iter()
            .map(|a| a.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["frame0.png", "frame1.png", "frame2.png"]);
        let indices: Vec<_> = staging.artifacts().iter().map(|a| a.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(staging.dir().starts_with(root.path()));
    }

    #[test]
    fn test_load_returns_same_pixels() {
        let root = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::create(root.path(), "job").unwrap();
        let image = gradient(6, 3);

        let artifact = staging.stage(&image).unwrap().clone();
        assert_eq!(artifact.load().unwrap(), image);
    }

    #[test]
    fn test_cleanup_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let mut staging = StagingArea::create(root.path(), "job").unwrap();
        staging.stage(&gradient(2, 2)).unwrap();
        let dir = staging.dir().to_path_buf();

        staging.cleanup().unwrap();
        assert!(!dir.exists());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = {
            let mut staging = StagingArea::create(root.path(), "job").unwrap();
            staging.stage(&gradient(2, 2)).unwrap();
            staging.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn test_separate_jobs_get_separate_directories() {
        let root = tempfile::tempdir().unwrap();
        let a = StagingArea::create(root.path(), "job").unwrap();
        let b = StagingArea::create(root.path(), "job").unwrap();
        assert_ne!(a.dir(), b.dir());
    }

    #[test]
    fn test_load_missing_file_is_storage_error() {
        let artifact = IntermediateArtifact {
            index: 0,
            path: PathBuf::from("/nonexistent/frame0.png"),
        };
        assert!(matches!(
            artifact.load(),
            Err(RecorderError::StorageIo { .. })
        ));
    }
}
