use clap::{Args, Parser, Subcommand};
use framereel_av::FrameTransform;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "framereel")]
#[command(author, version, about = "Compose a video from a directory of still images")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compose one directory of images into a video
    Compose {
        /// Directory containing the frames, read in sorted name order
        #[arg(long, required = true)]
        img_dir: PathBuf,

        /// Output video file
        #[arg(short, long, required = true)]
        out: PathBuf,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Compose every matching sub-directory of a base directory
    Batch {
        /// Directory whose sub-directories hold one video each
        #[arg(long, required = true)]
        base_dir: PathBuf,

        /// Directory receiving one <name>.mp4 per sub-directory
        #[arg(long, required = true)]
        out_dir: PathBuf,

        /// Only sub-directories whose path contains this text
        #[arg(long)]
        pattern: Option<String>,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

/// Per-run overrides of the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct Tuning {
    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Number of decode workers (default: number of CPUs)
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// ffmpeg video encoder, e.g. mpeg4 or libx264
    #[arg(long)]
    pub codec: Option<String>,

    /// Frame transform, applied in the order given
    /// (identity, grayscale, flip-h, flip-v, resize=WxH)
    #[arg(long = "transform", value_name = "T")]
    pub transforms: Vec<FrameTransform>,

    /// Accept a video with some frames skipped
    #[arg(long)]
    pub allow_partial: bool,

    /// Count the frames of the written video with ffprobe
    #[arg(long)]
    pub verify: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl Tuning {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut framereel::config::Config) {
        if let Some(fps) = self.fps {
            config.encoder.fps = fps;
        }
        if let Some(concurrency) = self.concurrency {
            config.pipeline.concurrency = Some(concurrency);
        }
        if let Some(ref codec) = self.codec {
            config.encoder.codec = codec.clone();
        }
        if self.allow_partial {
            config.pipeline.allow_partial = true;
        }
        if self.verify {
            config.pipeline.verify_output = true;
        }
    }
}
