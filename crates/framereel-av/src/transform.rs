//! Built-in per-frame transforms.

use std::fmt;
use std::str::FromStr;

use framereel_core::{Error, FrameShape};
use framereel_pipeline::ItemTransform;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};

/// A single frame operation selectable from the command line or config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTransform {
    Identity,
    Grayscale,
    FlipHorizontal,
    FlipVertical,
    /// Scale to an exact size (aspect ratio is not preserved).
    Resize(FrameShape),
}

impl FrameTransform {
    pub fn apply(&self, frame: RgbImage) -> RgbImage {
        match self {
            Self::Identity => frame,
            Self::Grayscale => DynamicImage::ImageLuma8(imageops::grayscale(&frame)).to_rgb8(),
            Self::FlipHorizontal => {
                let mut frame = frame;
                imageops::flip_horizontal_in_place(&mut frame);
                frame
            }
            Self::FlipVertical => {
                let mut frame = frame;
                imageops::flip_vertical_in_place(&mut frame);
                frame
            }
            Self::Resize(shape) => {
                if frame.dimensions() == (shape.width, shape.height) {
                    frame
                } else {
                    imageops::resize(&frame, shape.width, shape.height, FilterType::Lanczos3)
                }
            }
        }
    }
}

impl FromStr for FrameTransform {
    type Err = Error;

    /// Parse `identity`, `grayscale`, `flip-h`, `flip-v` or `resize=WxH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        if let Some(size) = s.strip_prefix("resize=") {
            let (w, h) = size
                .split_once('x')
                .ok_or_else(|| Error::Validation(format!("resize expects WxH, got '{size}'")))?;
            let parse = |v: &str| {
                v.parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| Error::Validation(format!("invalid resize dimension '{v}'")))
            };
            return Ok(Self::Resize(FrameShape::new(parse(w)?, parse(h)?)));
        }
        match s.as_str() {
            "identity" | "none" => Ok(Self::Identity),
            "grayscale" | "gray" => Ok(Self::Grayscale),
            "flip-h" | "hflip" => Ok(Self::FlipHorizontal),
            "flip-v" | "vflip" => Ok(Self::FlipVertical),
            other => Err(Error::Validation(format!("unknown transform '{other}'"))),
        }
    }
}

impl fmt::Display for FrameTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => write!(f, "identity"),
            Self::Grayscale => write!(f, "grayscale"),
            Self::FlipHorizontal => write!(f, "flip-h"),
            Self::FlipVertical => write!(f, "flip-v"),
            Self::Resize(shape) => write!(f, "resize={shape}"),
        }
    }
}

/// Transforms applied left to right. An empty chain is the identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformChain(pub Vec<FrameTransform>);

impl TransformChain {
    pub fn is_identity(&self) -> bool {
        self.0.iter().all(|t| *t == FrameTransform::Identity)
    }
}

impl ItemTransform<RgbImage> for TransformChain {
    fn transform(&self, frame: RgbImage) -> RgbImage {
        self.0.iter().fold(frame, |frame, t| t.apply(frame))
    }
}

impl ItemTransform<RgbImage> for FrameTransform {
    fn transform(&self, frame: RgbImage) -> RgbImage {
        self.apply(frame)
    }
}
