//! Video sink that pipes raw RGB frames into an ffmpeg child process.
//!
//! The encoder is spawned lazily on [`Sink::open`], once the size of the
//! first frame is known. Frames are streamed as `rawvideo rgb24` on the
//! child's stdin; [`Sink::close`] ends the stream and waits for ffmpeg to
//! finish the container. ffmpeg's stderr is drained on a helper thread so a
//! chatty encoder can never fill the pipe and stall the frame writes.

use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};

use framereel_core::config::EncoderConfig;
use framereel_core::{Error, FrameShape, Result};
use framereel_pipeline::Sink;
use image::imageops::{self, FilterType};
use image::RgbImage;

/// Pixel formats whose chroma planes are subsampled horizontally or
/// vertically and therefore need even frame dimensions.
const SUBSAMPLED_FORMATS: &[&str] = &["yuv420p", "yuv422p", "nv12", "yuvj420p"];

/// How much of the end of ffmpeg's stderr is kept for error messages.
const STDERR_TAIL_BYTES: usize = 8 * 1024;

/// Build the ffmpeg argument list for encoding frames of `shape`.
///
/// The output path is not included; the caller appends it.
pub fn encoder_args(settings: &EncoderConfig, shape: FrameShape) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-loglevel".into(),
        "error".into(),
        "-y".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgb24".into(),
        "-s".into(),
        shape.to_string(),
        "-r".into(),
        settings.fps.to_string(),
        "-i".into(),
        "pipe:0".into(),
        "-c:v".into(),
        settings.codec.clone(),
    ];

    if let Some(crf) = settings.crf {
        args.push("-crf".into());
        args.push(crf.to_string());
    }
    if let Some(preset) = &settings.preset {
        args.push("-preset".into());
        args.push(preset.clone());
    }

    args.push("-pix_fmt".into());
    args.push(settings.pixel_format.clone());

    if shape.even() != shape && SUBSAMPLED_FORMATS.contains(&settings.pixel_format.as_str()) {
        args.push("-vf".into());
        args.push("pad=ceil(iw/2)*2:ceil(ih/2)*2".into());
    }

    args.extend(settings.extra_args.iter().cloned());
    args
}

struct Encoder {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    /// Yields the tail of stderr once ffmpeg closes it.
    stderr: Option<JoinHandle<String>>,
    shape: FrameShape,
}

impl Encoder {
    /// Wait for the stderr reader. Only returns once ffmpeg has exited or
    /// closed its stderr.
    fn stderr_tail(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default()
    }
}

/// Read `stderr` to EOF, keeping only the last [`STDERR_TAIL_BYTES`].
fn drain_stderr(mut stderr: impl Read) -> String {
    let mut tail = Vec::with_capacity(STDERR_TAIL_BYTES);
    let mut chunk = [0u8; 4096];
    loop {
        match stderr.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                tail.extend_from_slice(&chunk[..n]);
                if tail.len() > STDERR_TAIL_BYTES {
                    let excess = tail.len() - STDERR_TAIL_BYTES;
                    tail.drain(..excess);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                tracing::debug!(error = %e, "stopped reading ffmpeg stderr");
                break;
            }
        }
    }
    String::from_utf8_lossy(&tail).trim().to_string()
}

fn spawn_stderr_reader(stderr: ChildStderr) -> io::Result<JoinHandle<String>> {
    thread::Builder::new()
        .name("ffmpeg-stderr".into())
        .spawn(move || drain_stderr(stderr))
}

/// Writes frames to a video file through ffmpeg.
pub struct FfmpegSink {
    ffmpeg: PathBuf,
    settings: EncoderConfig,
    output: PathBuf,
    encoder: Option<Encoder>,
    frames_written: usize,
}

impl FfmpegSink {
    pub fn new(
        ffmpeg: impl Into<PathBuf>,
        settings: EncoderConfig,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            settings,
            output: output.into(),
            encoder: None,
            frames_written: 0,
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    /// Frame size fixed at open time, if the encoder is running.
    pub fn shape(&self) -> Option<FrameShape> {
        self.encoder.as_ref().map(|e| e.shape)
    }

    /// Kill ffmpeg and return whatever it wrote to stderr.
    fn kill(encoder: &mut Encoder) -> String {
        if let Err(e) = encoder.child.kill() {
            tracing::debug!(error = %e, "ffmpeg already exited");
        }
        let _ = encoder.child.wait();
        encoder.stderr_tail()
    }
}

impl Sink for FfmpegSink {
    type Item = RgbImage;

    fn open(&mut self, first: &RgbImage) -> Result<()> {
        if self.encoder.is_some() {
            return Err(Error::SinkOpen("encoder already open".into()));
        }
        let shape = FrameShape::new(first.width(), first.height());
        if shape.is_empty() {
            return Err(Error::SinkOpen(format!("cannot encode {shape} frames")));
        }

        if let Some(parent) = self.output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::SinkOpen(format!("cannot create {}: {e}", parent.display()))
            })?;
        }

        let args = encoder_args(&self.settings, shape);
        tracing::debug!(ffmpeg = %self.ffmpeg.display(), ?args, output = %self.output.display(), "spawning encoder");

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .arg(&self.output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::SinkOpen(format!("failed to spawn {}: {e}", self.ffmpeg.display()))
            })?;

        let (Some(stdin), Some(stderr)) = (child.stdin.take(), child.stderr.take()) else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(Error::SinkOpen("ffmpeg stdio unavailable".into()));
        };
        let stderr = match spawn_stderr_reader(stderr) {
            Ok(reader) => reader,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::SinkOpen(format!("cannot read ffmpeg stderr: {e}")));
            }
        };

        tracing::info!(
            output = %self.output.display(),
            %shape,
            fps = self.settings.fps,
            codec = %self.settings.codec,
            "encoder started"
        );

        self.encoder = Some(Encoder {
            child,
            stdin: BufWriter::with_capacity(shape.rgb24_len(), stdin),
            stderr: Some(stderr),
            shape,
        });
        Ok(())
    }

    fn append(&mut self, index: usize, frame: RgbImage) -> Result<()> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| Error::sink_append(index, "encoder not open"))?;
        let shape = encoder.shape;

        let frame = if frame.dimensions() == (shape.width, shape.height) {
            frame
        } else if self.settings.resize_mismatched {
            tracing::warn!(
                index,
                from = %FrameShape::new(frame.width(), frame.height()),
                to = %shape,
                "resizing mismatched frame"
            );
            imageops::resize(&frame, shape.width, shape.height, FilterType::Lanczos3)
        } else {
            return Err(Error::sink_append(
                index,
                format!(
                    "frame is {}x{}, expected {shape}",
                    frame.width(),
                    frame.height()
                ),
            ));
        };

        encoder
            .stdin
            .write_all(frame.as_raw())
            .map_err(|e| Error::sink_append(index, format!("writing to ffmpeg: {e}")))?;
        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(mut encoder) = self.encoder.take() else {
            return Ok(());
        };

        if let Err(e) = encoder.stdin.flush() {
            let stderr = Self::kill(&mut encoder);
            return Err(Error::SinkClose(format!(
                "flushing frames to ffmpeg: {e}: {stderr}"
            )));
        }

        let Encoder {
            mut child,
            stdin,
            stderr,
            ..
        } = encoder;
        // Closing stdin signals end of stream.
        drop(stdin);

        let status = child
            .wait()
            .map_err(|e| Error::SinkClose(format!("waiting for ffmpeg: {e}")))?;
        let stderr = stderr
            .and_then(|reader| reader.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(Error::SinkClose(format!(
                "ffmpeg exited with {status}: {stderr}"
            )));
        }

        tracing::info!(
            output = %self.output.display(),
            frames = self.frames_written,
            "encoder finished"
        );
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Some(mut encoder) = self.encoder.take() {
            tracing::warn!(output = %self.output.display(), "encoder dropped without close, killing ffmpeg");
            Self::kill(&mut encoder);
        }
    }
}
