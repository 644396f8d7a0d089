//! End-to-end encoding through a real ffmpeg, skipped when it is not installed.

use std::path::PathBuf;

use framereel_av::{count_video_frames, FfmpegSink, ImageDirectory, ImageLoader, TransformChain};
use framereel_core::config::EncoderConfig;
use framereel_pipeline::Orchestrator;
use image::{Rgb, RgbImage};

fn tool(name: &str) -> Option<PathBuf> {
    match which::which(name) {
        Ok(path) => Some(path),
        Err(_) => {
            eprintln!("{name} not installed, skipping");
            None
        }
    }
}

fn write_frames(dir: &std::path::Path, count: usize, width: u32, height: u32) {
    for i in 0..count {
        let shade = (i * 20 % 256) as u8;
        RgbImage::from_pixel(width, height, Rgb([shade, 255 - shade, 128]))
            .save(dir.join(format!("frame_{i:04}.png")))
            .unwrap();
    }
}

#[test]
fn composes_directory_into_video() {
    let Some(ffmpeg) = tool("ffmpeg") else { return };
    let tmp = tempfile::tempdir().unwrap();
    let frames = tmp.path().join("imgs");
    std::fs::create_dir(&frames).unwrap();
    write_frames(&frames, 12, 64, 48);
    let out = tmp.path().join("out").join("video.mp4");

    let source = ImageDirectory::new(&frames, vec![".png".into()]);
    let mut sink = FfmpegSink::new(&ffmpeg, EncoderConfig::default(), &out);
    let result = Orchestrator::new()
        .with_concurrency(4)
        .run(&source, &ImageLoader, &TransformChain::default(), &mut sink)
        .unwrap();

    assert!(result.succeeded, "{result:?}");
    assert_eq!(result.items_written, 12);
    assert_eq!(sink.frames_written(), 12);
    assert!(out.metadata().unwrap().len() > 0);

    if let Some(ffprobe) = tool("ffprobe") {
        assert_eq!(count_video_frames(&ffprobe, &out).unwrap(), 12);
    }
}

#[test]
fn odd_sized_frames_encode_with_padding() {
    let Some(ffmpeg) = tool("ffmpeg") else { return };
    let tmp = tempfile::tempdir().unwrap();
    write_frames(tmp.path(), 3, 33, 17);
    let out = tmp.path().join("odd.mp4");

    let source = ImageDirectory::new(tmp.path(), vec![".png".into()]);
    let mut sink = FfmpegSink::new(&ffmpeg, EncoderConfig::default(), &out);
    let result = Orchestrator::new()
        .run(&source, &ImageLoader, &TransformChain::default(), &mut sink)
        .unwrap();
    assert!(result.succeeded, "{result:?}");
}

#[test]
fn mismatched_frame_is_rejected_without_resize() {
    let Some(ffmpeg) = tool("ffmpeg") else { return };
    let tmp = tempfile::tempdir().unwrap();
    RgbImage::new(16, 16).save(tmp.path().join("a.png")).unwrap();
    RgbImage::new(32, 32).save(tmp.path().join("b.png")).unwrap();
    let out = tmp.path().join("mismatch.mp4");

    let settings = EncoderConfig {
        resize_mismatched: false,
        ..EncoderConfig::default()
    };
    let source = ImageDirectory::new(tmp.path(), vec![".png".into()]);
    let mut sink = FfmpegSink::new(&ffmpeg, settings, &out);
    let result = Orchestrator::new()
        .with_concurrency(1)
        .run(&source, &ImageLoader, &TransformChain::default(), &mut sink)
        .unwrap();

    assert!(!result.succeeded);
    assert!(result.fatal.is_some());
}
