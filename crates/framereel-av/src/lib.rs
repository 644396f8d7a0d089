//! # framereel-av
//!
//! Image and video plumbing for the framereel pipeline.
//!
//! This crate provides:
//!
//! - **Sources** ([`ImageDirectory`]) -- sorted image files of a directory,
//!   plus the batch-mode sub-directory scan in [`listing`].
//! - **Loading** ([`ImageLoader`]) -- decode any supported image format into
//!   an 8-bit RGB frame.
//! - **Transforms** ([`FrameTransform`], [`TransformChain`]) -- per-frame
//!   operations applied inside the worker pool.
//! - **Encoding** ([`FfmpegSink`]) -- stream frames into an ffmpeg child
//!   process as raw video.
//! - **Tool discovery** ([`ToolRegistry`]) and output verification
//!   ([`probe::count_video_frames`]).

pub mod listing;
pub mod probe;
pub mod sink;
pub mod source;
pub mod tools;
pub mod transform;

pub use listing::{find_files_with_extensions, find_sub_dirs_with_pattern};
pub use probe::count_video_frames;
pub use sink::{encoder_args, FfmpegSink};
pub use source::{ImageDirectory, ImageLoader};
pub use tools::{ToolConfig, ToolInfo, ToolRegistry};
pub use transform::{FrameTransform, TransformChain};

pub use image::RgbImage;
