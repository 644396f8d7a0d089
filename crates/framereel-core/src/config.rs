//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! pipeline, encoder, source and tool sub-configs. Every section defaults
//! sensibly so a completely empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::Error;

/// Pixel formats the encoder settings are allowed to request.
const KNOWN_PIXEL_FORMATS: &[&str] = &["yuv420p", "yuv422p", "yuv444p", "rgb24", "gray"];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub encoder: EncoderConfig,
    pub source: SourceConfig,
    pub tools: ToolsConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.encoder.fps == 0 {
            warnings.push("encoder.fps is 0; the output would have no duration".into());
        }

        if self.pipeline.concurrency == Some(0) {
            warnings.push("pipeline.concurrency is 0; one worker will be used".into());
        }

        if self.source.extensions.is_empty() {
            warnings.push("source.extensions is empty; no files will match".into());
        }

        if !KNOWN_PIXEL_FORMATS.contains(&self.encoder.pixel_format.as_str()) {
            warnings.push(format!(
                "encoder.pixel_format '{}' is not a recognized format (known: {})",
                self.encoder.pixel_format,
                KNOWN_PIXEL_FORMATS.join(", ")
            ));
        }

        if let Some(crf) = self.encoder.crf {
            if crf > 63 {
                warnings.push(format!("encoder.crf {crf} is outside the usual 0-63 range"));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Worker pool and result policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of decode workers. `None` uses the available hardware parallelism.
    pub concurrency: Option<usize>,
    /// Treat a run with skipped items as acceptable as long as something was
    /// written and the sink finalized.
    pub allow_partial: bool,
    /// Report an empty source as an error instead of an empty success.
    pub require_items: bool,
    /// Count the frames of the written video with ffprobe after composing.
    pub verify_output: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: None,
            allow_partial: false,
            require_items: true,
            verify_output: false,
        }
    }
}

/// Video encoder settings passed through to ffmpeg.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub fps: u32,
    /// ffmpeg video encoder name. `mpeg4` matches the classic `mp4v` fourcc.
    pub codec: String,
    pub pixel_format: String,
    pub crf: Option<u32>,
    pub preset: Option<String>,
    /// Scale frames whose size differs from the first frame instead of
    /// failing the run.
    pub resize_mismatched: bool,
    /// Extra arguments inserted before the output path.
    pub extra_args: Vec<String>,
}

fn default_fps() -> u32 {
    25
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            codec: "mpeg4".into(),
            pixel_format: "yuv420p".into(),
            crf: None,
            preset: None,
            resize_mismatched: true,
            extra_args: Vec::new(),
        }
    }
}

/// Image discovery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Accepted file extensions, matched case-insensitively.
    pub extensions: Vec<String>,
    /// Substring a sub-directory must contain to be picked up in batch mode.
    pub batch_pattern: String,
    /// Directory inside each batch sub-directory that holds the frames.
    pub batch_images_subdir: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".jpeg".into(), ".jpg".into(), ".png".into()],
            batch_pattern: "Video_".into(),
            batch_images_subdir: "imgs".into(),
        }
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
}
