//! CLI end-to-end tests
//!
//! Tests for the framereel command-line interface.

use assert_cmd::prelude::*;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the framereel binary
#[allow(deprecated)]
fn framereel_cmd() -> Command {
    Command::cargo_bin("framereel").unwrap()
}

fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Config whose "ffmpeg" is an existing file that is never spawned, for
/// runs that stop before the encoder opens.
fn config_with_stand_in_ffmpeg(dir: &Path) -> PathBuf {
    let stand_in = std::env::current_exe().unwrap();
    let path = dir.join("framereel.toml");
    fs::write(
        &path,
        format!("[tools]\nffmpeg_path = {:?}\n", stand_in.display().to_string()),
    )
    .unwrap();
    path
}

fn write_frames(dir: &Path, count: usize) {
    fs::create_dir_all(dir).unwrap();
    for i in 0..count {
        RgbImage::from_pixel(32, 24, Rgb([(i * 30) as u8, 80, 160]))
            .save(dir.join(format!("{i:03}.png")))
            .unwrap();
    }
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = framereel_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = framereel_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("framereel"))
        .stdout(predicate::str::contains("compose"))
        .stdout(predicate::str::contains("batch"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = framereel_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_check_tools_command() {
    let mut cmd = framereel_cmd();
    // Exit code depends on what is installed; the listing does not.
    cmd.arg("check-tools")
        .assert()
        .stdout(predicate::str::contains("ffmpeg").and(predicate::str::contains("ffprobe")));
}

#[test]
fn test_cli_compose_help_lists_tuning_flags() {
    let mut cmd = framereel_cmd();
    cmd.args(["compose", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--img-dir"))
        .stdout(predicate::str::contains("--transform"))
        .stdout(predicate::str::contains("--allow-partial"));
}

#[test]
fn test_cli_validate_defaults() {
    let dir = tempdir().unwrap();
    let mut cmd = framereel_cmd();
    cmd.current_dir(dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("using defaults"))
        .stdout(predicate::str::contains("mpeg4 @ 25 fps"));
}

#[test]
fn test_cli_validate_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("framereel.toml");
    fs::write(&path, "[encoder]\nfps = 30\ncodec = \"libx264\"\n").unwrap();

    let mut cmd = framereel_cmd();
    cmd.arg("validate")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("libx264 @ 30 fps"));
}

#[test]
fn test_cli_validate_rejects_zero_fps() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("framereel.toml");
    fs::write(&path, "[encoder]\nfps = 0\n").unwrap();

    let mut cmd = framereel_cmd();
    cmd.arg("validate")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("fps"));
}

#[test]
fn test_cli_compose_rejects_unknown_transform() {
    let dir = tempdir().unwrap();
    let mut cmd = framereel_cmd();
    cmd.args(["compose", "--img-dir"])
        .arg(dir.path())
        .args(["--out", "x.mp4", "--transform", "sepia"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown transform"));
}

#[test]
fn test_cli_compose_missing_dir() {
    let dir = tempdir().unwrap();
    let mut cmd = framereel_cmd();
    cmd.args(["compose", "--img-dir"])
        .arg(dir.path().join("missing"))
        .arg("--out")
        .arg(dir.path().join("out.mp4"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_cli_compose_empty_dir_exits_3() {
    let dir = tempdir().unwrap();
    let config = config_with_stand_in_ffmpeg(dir.path());
    let imgs = dir.path().join("imgs");
    fs::create_dir(&imgs).unwrap();
    fs::write(imgs.join("readme.txt"), "not a frame").unwrap();

    let mut cmd = framereel_cmd();
    cmd.arg("--config")
        .arg(&config)
        .args(["compose", "--img-dir"])
        .arg(&imgs)
        .arg("--out")
        .arg(dir.path().join("out.mp4"))
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no items"));
    assert!(!dir.path().join("out.mp4").exists());
}

#[test]
fn test_cli_batch_without_matches_exits_3() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("Other")).unwrap();

    let mut cmd = framereel_cmd();
    cmd.args(["batch", "--base-dir"])
        .arg(dir.path())
        .arg("--out-dir")
        .arg(dir.path().join("out"))
        .assert()
        .code(3);
}

#[test]
fn test_cli_compose_json_report() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not installed, skipping");
        return;
    }
    let dir = tempdir().unwrap();
    let imgs = dir.path().join("imgs");
    write_frames(&imgs, 6);
    let out = dir.path().join("video.mp4");

    let output = framereel_cmd()
        .current_dir(dir.path())
        .args(["compose", "--img-dir"])
        .arg(&imgs)
        .arg("--out")
        .arg(&out)
        .args(["-j", "3", "--transform", "flip-h", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["result"]["succeeded"], true);
    assert_eq!(report["result"]["items_written"], 6);
    assert!(out.exists());
}

#[test]
fn test_cli_batch_composes_each_directory() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg not installed, skipping");
        return;
    }
    let dir = tempdir().unwrap();
    let base = dir.path().join("base");
    write_frames(&base.join("Video_1").join("imgs"), 3);
    write_frames(&base.join("Video_2").join("imgs"), 4);
    fs::create_dir_all(base.join("Ignored")).unwrap();
    let out = dir.path().join("out");

    let mut cmd = framereel_cmd();
    cmd.current_dir(dir.path())
        .args(["batch", "--base-dir"])
        .arg(&base)
        .arg("--out-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Batch complete: 2/2"));

    assert!(out.join("Video_1.mp4").exists());
    assert!(out.join("Video_2.mp4").exists());
    assert!(!out.join("Ignored.mp4").exists());
}
