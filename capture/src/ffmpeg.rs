use std::path::Path;
use std::process::Stdio;

use drone_detector_common::frame::{color_frame_from_rgb24, rgb24_len, ColorFrame};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, warn};

use crate::CaptureError;

/// An ffmpeg child process decoding some input into packed rgb24 frames
/// on its stdout.
pub struct RawVideoReader {
    /// `None` when frames come from an in-memory reader.
    child: Option<Child>,
    stdout: Box<dyn AsyncRead + Unpin + Send>,
    width: u32,
    height: u32,
    frames_read: u64,
}

impl RawVideoReader {
    /// Spawn `ffmpeg <input_args> -f rawvideo -pix_fmt rgb24 [-vf scale] pipe:1`.
    ///
    /// `scale` forces the output size; without it the caller must already
    /// know the decoded size (see [`probe_dimensions`]).
    pub fn spawn(
        input_args: &[String],
        width: u32,
        height: u32,
        scale: bool,
    ) -> Result<Self, CaptureError> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin"])
            .args(input_args)
            .args(output_args(width, height, scale))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Keep the terminal's Ctrl+C away from the decoder; cancellation is
        // handled by the detection loop.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd
            .spawn()
            .map_err(|e| CaptureError::SourceUnavailable(format!("failed to spawn ffmpeg: {e}")))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            CaptureError::SourceUnavailable("could not get ffmpeg stdout handle".into())
        })?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        debug!(?input_args, width, height, scale, "ffmpeg decoder started");

        Ok(Self {
            child: Some(child),
            stdout: Box::new(stdout),
            width,
            height,
            frames_read: 0,
        })
    }

    /// Read packed rgb24 frames of the given size from any byte stream.
    #[cfg(any(test, feature = "test-util"))]
    pub fn from_reader<R>(reader: R, width: u32, height: u32) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self {
            child: None,
            stdout: Box::new(reader),
            width,
            height,
            frames_read: 0,
        }
    }

    /// Read the next frame. `Ok(None)` means ffmpeg closed its output
    /// cleanly on a frame boundary.
    pub async fn read_frame(&mut self) -> Result<Option<ColorFrame>, CaptureError> {
        let frame = read_rgb24_frame(&mut self.stdout, self.width, self.height).await?;
        if frame.is_some() {
            self.frames_read += 1;
        }
        Ok(frame)
    }

    /// Stop the decoder and reap it.
    pub async fn close(self) {
        let Some(mut child) = self.child else {
            return;
        };
        if let Ok(Some(status)) = child.try_wait() {
            debug!(%status, frames = self.frames_read, "ffmpeg decoder already exited");
            return;
        }
        if let Err(e) = child.kill().await {
            warn!(error = %e, "failed to stop ffmpeg decoder");
        } else {
            debug!(frames = self.frames_read, "ffmpeg decoder stopped");
        }
    }
}

fn output_args(width: u32, height: u32, scale: bool) -> Vec<String> {
    let mut args = Vec::with_capacity(8);
    if scale {
        args.push("-vf".to_string());
        args.push(format!("scale={width}:{height}"));
    }
    args.extend(
        ["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"]
            .iter()
            .map(|s| s.to_string()),
    );
    args
}

/// Read exactly one packed rgb24 frame from `reader`.
///
/// Returns `Ok(None)` when the stream ends before the first byte of a
/// frame, and [`CaptureError::TruncatedFrame`] when it ends part-way.
pub async fn read_rgb24_frame<R>(
    reader: &mut R,
    width: u32,
    height: u32,
) -> Result<Option<ColorFrame>, CaptureError>
where
    R: AsyncRead + Unpin,
{
    let expected = rgb24_len(width, height);
    let mut buf = vec![0u8; expected];
    let mut filled = 0;

    while filled < expected {
        let n = reader
            .read(&mut buf[filled..])
            .await
            .map_err(|e| CaptureError::Source(format!("failed to read decoded frame: {e}")))?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(CaptureError::TruncatedFrame {
                got: filled,
                expected,
            });
        }
        filled += n;
    }

    Ok(Some(color_frame_from_rgb24(width, height, buf)?))
}

/// Ask ffprobe for the size of the first video stream of `path`.
pub async fn probe_dimensions(path: &Path) -> Result<(u32, u32), CaptureError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0:s=x",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| CaptureError::SourceUnavailable(format!("failed to run ffprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaptureError::SourceUnavailable(format!(
            "ffprobe could not open {}: {}",
            path.display(),
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    parse_dimensions(&stdout).ok_or_else(|| {
        CaptureError::SourceUnavailable(format!(
            "no video stream found in {} (ffprobe said {:?})",
            path.display(),
            stdout.trim()
        ))
    })
}

/// Parse ffprobe's `WIDTHxHEIGHT` line. Zero sizes are rejected.
pub fn parse_dimensions(s: &str) -> Option<(u32, u32)> {
    let line = s.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (w, h) = line.split_once('x')?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().trim_end_matches('x').parse().ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    Some((w, h))
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(target: "ffmpeg", "{line}");
    }
}

/// Programs the sources shell out to: ffmpeg decodes every source,
/// ffprobe sizes video files.
pub const REQUIRED_TOOLS: [&str; 2] = ["ffmpeg", "ffprobe"];

/// Run `-version` on every required tool and warn about the ones that are
/// missing. Returns their names; an empty list means all are usable.
pub async fn check_tools_available() -> Vec<&'static str> {
    let mut missing = Vec::new();
    for tool in REQUIRED_TOOLS {
        if !tool_runs(tool).await {
            missing.push(tool);
        }
    }
    if !missing.is_empty() {
        warn!(
            ?missing,
            "camera and video sources will fail to open; install ffmpeg (with ffprobe)"
        );
    }
    missing
}

async fn tool_runs(program: &str) -> bool {
    let status = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    match status {
        Ok(status) if status.success() => {
            debug!(program, "tool is available");
            true
        }
        Ok(status) => {
            warn!(program, %status, "tool returned non-zero for -version");
            false
        }
        Err(e) => {
            warn!(program, error = %e, "tool not found on PATH");
            false
        }
    }
}
