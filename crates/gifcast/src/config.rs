//! Recorder configuration
//!
//! Everything the recorder needs is passed in through [`RecorderConfig`] at
//! construction. A config can also be loaded from a YAML or JSON document.

use crate::result::{RecorderError, RecorderResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for a recorder instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Frames captured per second of recording
    pub record_fps: u32,
    /// Render ticks per second driving [`crate::RecordingSession::tick`]
    pub tick_rate: u32,
    /// Force partially transparent pixels to full opacity before encoding
    pub flatten_transparency: bool,
    /// Pixels with alpha at or below `1.0 - alpha_epsilon` count as not opaque
    pub alpha_epsilon: f32,
    /// Loop the resulting GIF forever (otherwise it plays once)
    pub loop_playback: bool,
    /// Quality level (1-100, affects palette quantization)
    pub quality: u8,
    /// Sampling speed multiplier; above 1.0 samples more often (slower playback)
    pub speed_multiplier: f32,
    /// Directory finished recordings are written to
    pub export_dir: PathBuf,
    /// Directory intermediate frames are staged under
    pub working_dir: PathBuf,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            record_fps: 30,
            tick_rate: 60,
            flatten_transparency: true,
            alpha_epsilon: 0.001,
            loop_playback: true,
            quality: 80,
            speed_multiplier: 1.0,
            export_dir: PathBuf::from("gifexport"),
            working_dir: PathBuf::from(".gifimages"),
        }
    }
}

impl RecorderConfig {
    /// Create a configuration writing to the given directories
    #[must_use]
    pub fn new(export_dir: impl Into<PathBuf>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            export_dir: export_dir.into(),
            working_dir: working_dir.into(),
            ..Default::default()
        }
    }

    /// Set frames per second. Zero is accepted here and rejected at encode time.
    #[must_use]
    pub const fn with_fps(mut self, fps: u32) -> Self {
        self.record_fps = fps;
        self
    }

    /// Set the render tick rate the sampler divides down from
    #[must_use]
    pub const fn with_tick_rate(mut self, tick_rate: u32) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    /// Enable or disable transparency flattening
    #[must_use]
    pub const fn with_flatten_transparency(mut self, flatten: bool) -> Self {
        self.flatten_transparency = flatten;
        self
    }

    /// Set the opacity tolerance used when flattening
    #[must_use]
    pub fn with_alpha_epsilon(mut self, epsilon: f32) -> Self {
        self.alpha_epsilon = epsilon.clamp(0.0, 0.999);
        self
    }

    /// Loop forever (`true`) or play once (`false`)
    #[must_use]
    pub const fn with_loop(mut self, loop_playback: bool) -> Self {
        self.loop_playback = loop_playback;
        self
    }

    /// Set quality (1-100)
    #[must_use]
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }

    /// Set the sampling speed multiplier
    #[must_use]
    pub fn with_speed_multiplier(mut self, multiplier: f32) -> Self {
        self.speed_multiplier = multiplier;
        self
    }

    /// Set the export directory
    #[must_use]
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = dir.into();
        self
    }

    /// Set the working directory for intermediates
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Delay between frames in milliseconds, `round(1000 / fps)`
    pub fn frame_delay_millis(&self) -> RecorderResult<u32> {
        frame_delay_millis(self.record_fps)
    }

    /// Convert quality (1-100) to GIF quantizer speed (1-30)
    #[must_use]
    pub fn quantizer_speed(&self) -> i32 {
        // quality 100 -> speed 1 (slowest, best quality)
        // quality 1 -> speed 30 (fastest, worst quality)
        let normalized = i32::from(100 - self.quality.clamp(1, 100));
        (normalized * 29 / 100 + 1).clamp(1, 30)
    }

    /// Check the configuration for values the recorder cannot work with
    pub fn validate(&self) -> RecorderResult<()> {
        if self.record_fps == 0 {
            return Err(RecorderError::InvalidFrameRate {
                fps: self.record_fps,
            });
        }
        if self.tick_rate == 0 {
            return Err(RecorderError::config("tick_rate must be positive"));
        }
        if !(0.0..1.0).contains(&self.alpha_epsilon) {
            return Err(RecorderError::config(format!(
                "alpha_epsilon must be in [0, 1), got {}",
                self.alpha_epsilon
            )));
        }
        if !self.speed_multiplier.is_finite() || self.speed_multiplier <= 0.0 {
            return Err(RecorderError::config(format!(
                "speed_multiplier must be positive, got {}",
                self.speed_multiplier
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(RecorderError::config(format!(
                "quality must be in 1..=100, got {}",
                self.quality
            )));
        }
        Ok(())
    }

    /// Parse a YAML document. Missing keys take their default values.
    pub fn from_yaml_str(yaml: &str) -> RecorderResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document. Missing keys take their default values.
    pub fn from_json_str(json: &str) -> RecorderResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> RecorderResult<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| RecorderError::storage(path, e))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            Some("yaml" | "yml") => Self::from_yaml_str(&text),
            other => Err(RecorderError::config(format!(
                "Unsupported config format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }
}

/// Delay between frames in milliseconds for a capture rate, `round(1000 / fps)`
pub fn frame_delay_millis(fps: u32) -> RecorderResult<u32> {
    if fps == 0 {
        return Err(RecorderError::InvalidFrameRate { fps });
    }
    Ok((1000 + fps / 2) / fps)
}
