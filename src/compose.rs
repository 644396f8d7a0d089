//! Composition driver: wires the image source, decoder, transforms and
//! ffmpeg sink into one pipeline run per directory.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use framereel_av::{
    count_video_frames, find_sub_dirs_with_pattern, FfmpegSink, ImageDirectory, ImageLoader,
    ToolRegistry, TransformChain,
};
use framereel_core::config::Config;
use framereel_pipeline::{CancellationToken, Orchestrator, PipelineResult, ProgressSender};
use serde::Serialize;

/// One directory to turn into one video.
#[derive(Debug, Clone, Serialize)]
pub struct ComposeJob {
    pub img_dir: PathBuf,
    pub output: PathBuf,
}

/// Everything the CLI reports about one composed video.
#[derive(Debug, Clone, Serialize)]
pub struct ComposeReport {
    pub img_dir: PathBuf,
    pub output: PathBuf,
    pub result: PipelineResult,
    /// Frame count read back with ffprobe when verification was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified_frames: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_error: Option<String>,
    pub elapsed_ms: u64,
}

impl ComposeReport {
    /// Whether this video counts as a success under `allow_partial`.
    pub fn is_acceptable(&self, allow_partial: bool) -> bool {
        self.result.is_acceptable(allow_partial) && self.verify_error.is_none()
    }

    /// Process exit code for this report.
    pub fn exit_code(&self, allow_partial: bool) -> i32 {
        if self.is_acceptable(allow_partial) {
            0
        } else if self.result.cancelled {
            130
        } else {
            1
        }
    }
}

/// Compose the images of `job.img_dir` into `job.output`.
///
/// Blocks until the video is finalized. Cancelling `cancel` stops the run
/// early; the partial video is still closed.
pub fn compose_dir(
    config: &Config,
    tools: &ToolRegistry,
    transforms: &TransformChain,
    job: &ComposeJob,
    cancel: CancellationToken,
) -> Result<ComposeReport> {
    let started = Instant::now();
    if !job.img_dir.is_dir() {
        anyhow::bail!("Image directory does not exist: {:?}", job.img_dir);
    }
    let ffmpeg = tools.require("ffmpeg")?.path.clone();

    let source = ImageDirectory::new(&job.img_dir, config.source.extensions.clone());
    let mut sink = FfmpegSink::new(ffmpeg, config.encoder.clone(), &job.output);

    let mut orchestrator = Orchestrator::new()
        .with_cancellation(cancel)
        .with_progress(progress_logger())
        .require_items(config.pipeline.require_items);
    if let Some(concurrency) = config.pipeline.concurrency {
        orchestrator = orchestrator.with_concurrency(concurrency);
    }

    tracing::info!(
        "Composing {:?} -> {:?} with {} workers",
        job.img_dir,
        job.output,
        orchestrator.concurrency()
    );

    let result = orchestrator
        .run(&source, &ImageLoader, transforms, &mut sink)
        .with_context(|| format!("Failed to compose {:?}", job.img_dir))?;

    let mut report = ComposeReport {
        img_dir: job.img_dir.clone(),
        output: job.output.clone(),
        result,
        verified_frames: None,
        verify_error: None,
        elapsed_ms: 0,
    };

    if config.pipeline.verify_output && report.result.items_written > 0 {
        verify(tools, &mut report);
    }

    report.elapsed_ms = started.elapsed().as_millis() as u64;
    Ok(report)
}

/// Compare the frame count of the written video against what was appended.
fn verify(tools: &ToolRegistry, report: &mut ComposeReport) {
    let outcome = tools
        .require("ffprobe")
        .and_then(|ffprobe| count_video_frames(&ffprobe.path, &report.output));
    match outcome {
        Ok(frames) => {
            report.verified_frames = Some(frames);
            if frames != report.result.items_written {
                report.verify_error = Some(format!(
                    "video has {frames} frames, expected {}",
                    report.result.items_written
                ));
            }
        }
        Err(e) => report.verify_error = Some(e.to_string()),
    }
    if let Some(ref e) = report.verify_error {
        tracing::error!("Verification of {:?} failed: {}", report.output, e);
    }
}

fn progress_logger() -> ProgressSender {
    ProgressSender::new(|written, total| {
        // Log roughly every tenth of the run plus the final frame.
        let step = (total / 10).max(1);
        if written % step == 0 || written == total {
            tracing::info!("Progress: {}/{} frames", written, total);
        }
    })
}

/// Batch mode: one job per sub-directory of `base_dir` whose path contains
/// `pattern`, reading images from `<sub>/<images_subdir>` and writing
/// `<out_dir>/<sub-name>.mp4`.
pub fn batch_jobs(
    base_dir: &Path,
    out_dir: &Path,
    pattern: &str,
    images_subdir: &str,
) -> Result<Vec<ComposeJob>> {
    let dirs = find_sub_dirs_with_pattern(base_dir, pattern)
        .with_context(|| format!("Failed to scan {:?}", base_dir))?;

    let jobs = dirs
        .into_iter()
        .filter_map(|dir| {
            let name = dir.file_name()?.to_string_lossy().into_owned();
            Some(ComposeJob {
                img_dir: dir.join(images_subdir),
                output: out_dir.join(format!("{name}.mp4")),
            })
        })
        .collect();
    Ok(jobs)
}
