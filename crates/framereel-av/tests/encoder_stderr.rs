//! Encoder lifecycle against stand-in "ffmpeg" scripts, so these run
//! without ffmpeg installed.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use framereel_av::FfmpegSink;
use framereel_core::config::EncoderConfig;
use framereel_core::Result;
use framereel_pipeline::Sink;
use image::{Rgb, RgbImage};

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn session(sink: &mut FfmpegSink, frames: usize) -> Result<()> {
    let frame = RgbImage::from_pixel(32, 24, Rgb([10, 20, 30]));
    sink.open(&frame)?;
    for index in 0..frames {
        sink.append(index, frame.clone())?;
    }
    sink.close()
}

/// Open, append `frames` small frames and close, failing the test if that
/// does not finish within `limit`.
fn encode_within(ffmpeg: PathBuf, output: PathBuf, frames: usize, limit: Duration) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        let mut sink = FfmpegSink::new(ffmpeg, EncoderConfig::default(), output);
        tx.send(session(&mut sink, frames)).unwrap();
    });
    let outcome = rx
        .recv_timeout(limit)
        .expect("encoder session did not finish");
    handle.join().unwrap();
    outcome
}

// One test so every script is written before any of them is executed.
#[test]
fn encoder_stderr_is_drained_and_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let noisy = write_script(
        tmp.path(),
        "noisy-ffmpeg",
        "head -c 200000 /dev/zero | tr '\\000' 'x' >&2\ncat > /dev/null",
    );
    let failing = write_script(
        tmp.path(),
        "failing-ffmpeg",
        "echo \"Unknown encoder 'nope'\" >&2\nexit 3",
    );

    // 200 KB of stderr is well past the pipe buffer; frame writes must not stall.
    encode_within(
        noisy,
        tmp.path().join("noisy.mp4"),
        200,
        Duration::from_secs(20),
    )
    .unwrap();

    let err = encode_within(
        failing,
        tmp.path().join("failing.mp4"),
        0,
        Duration::from_secs(20),
    )
    .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Unknown encoder 'nope'"), "got: {message}");
    assert!(message.contains("exited with"), "got: {message}");
}
