//! Output verification through ffprobe.

use std::path::Path;
use std::process::Command;

use framereel_core::{Error, Result};

/// Count the video frames (packets of the first video stream) in `video`.
pub fn count_video_frames(ffprobe: &Path, video: &Path) -> Result<usize> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_packets",
            "-show_entries",
            "stream=nb_read_packets",
            "-of",
            "csv=p=0",
        ])
        .arg(video)
        .output()
        .map_err(|e| Error::tool("ffprobe", format!("failed to spawn: {e}")))?;

    if !output.status.success() {
        return Err(Error::tool(
            "ffprobe",
            format!(
                "exited with status {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        ));
    }

    parse_frame_count(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the `csv=p=0` output of a packet count query.
///
/// Some containers report a trailing separator (`"42,"`), which is ignored.
pub fn parse_frame_count(stdout: &str) -> Result<usize> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| Error::tool("ffprobe", "no video stream in output"))?;
    let value = line.trim_end_matches(',');
    value
        .parse()
        .map_err(|_| Error::tool("ffprobe", format!("unexpected frame count '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_plain_count() {
        assert_eq!(parse_frame_count("120\n").unwrap(), 120);
    }

    #[test]
    fn tolerates_trailing_separator_and_blank_lines() {
        assert_eq!(parse_frame_count("\n  42,\n").unwrap(), 42);
    }

    #[test]
    fn empty_output_is_a_tool_error() {
        assert_matches!(parse_frame_count(""), Err(Error::Tool { .. }));
        assert_matches!(parse_frame_count("N/A"), Err(Error::Tool { .. }));
    }

    #[test]
    fn missing_binary_is_a_tool_error() {
        let err = count_video_frames(Path::new("/no/such/ffprobe"), Path::new("x.mp4")).unwrap_err();
        assert_matches!(err, Error::Tool { ref tool, .. } if tool == "ffprobe");
    }
}
