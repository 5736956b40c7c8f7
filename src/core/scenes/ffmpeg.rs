//! FFmpeg diff-signal extraction
//!
//! Shells out to ffprobe for duration and to ffmpeg's scene-score metadata
//! for the per-frame difference signal the segmenter consumes.

use std::path::Path;
use std::process::Command;

use crate::core::{CoreError, CoreResult, TimeSec};

use super::DiffSample;

/// Gets the duration of a video file using FFprobe
pub fn video_duration<P: AsRef<Path>>(path: P) -> CoreResult<TimeSec> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CoreError::FileNotFound(path.to_string_lossy().to_string()));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .map_err(|e| CoreError::FFprobeError(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        return Err(CoreError::FFprobeError(
            "FFprobe failed to get duration".to_string(),
        ));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    duration_str
        .trim()
        .parse()
        .map_err(|_| CoreError::FFprobeError("Failed to parse duration".to_string()))
}

/// Extracts the frame-difference signal from a video file.
///
/// Runs ffmpeg's scene-score filter with metadata printing; every frame
/// after the first yields one `DiffSample`.
pub fn extract_diff_signal<P: AsRef<Path>>(path: P) -> CoreResult<Vec<DiffSample>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CoreError::FileNotFound(path.to_string_lossy().to_string()));
    }

    let output = Command::new("ffmpeg")
        .args([
            "-i",
            path.to_str().unwrap_or(""),
            "-filter:v",
            "select='gte(scene,0)',metadata=print",
            "-f",
            "null",
            "-",
        ])
        .output()
        .map_err(|e| CoreError::FFmpegError(format!("Failed to run ffmpeg: {}", e)))?;

    // FFmpeg prints filter metadata to stderr: a pts_time line per frame
    // followed by a lavfi.scene_score line.
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(parse_diff_signal(&stderr))
}

fn parse_diff_signal(stderr: &str) -> Vec<DiffSample> {
    let mut samples = Vec::new();
    let mut pending_time: Option<TimeSec> = None;

    for line in stderr.lines() {
        if let Some(time_str) = extract_field(line, "pts_time:") {
            pending_time = time_str.parse().ok();
        } else if let Some(score_str) = extract_field(line, "lavfi.scene_score=") {
            if let (Some(time), Ok(score)) = (pending_time.take(), score_str.parse::<f64>()) {
                samples.push(DiffSample { time, score });
            }
        }
    }

    samples.sort_by(|a, b| a.time.total_cmp(&b.time));
    samples
}

/// Extracts the numeric value following `marker` in an ffmpeg log line
fn extract_field<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let start = line.find(marker)? + marker.len();
    let rest = &line[start..];
    let end = rest.find(|c: char| !c.is_ascii_digit() && c != '.' && c != '-');
    match end {
        Some(end) => Some(&rest[..end]),
        None => Some(rest.trim()),
    }
}

/// Checks if FFmpeg is available on the system
pub fn is_ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

// =============================================================================
// Tests
// =============================================================================
