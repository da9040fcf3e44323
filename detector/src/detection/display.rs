use std::io::ErrorKind;
use std::process::Stdio;

use drone_detector_common::frame::ColorFrame;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("failed to spawn ffplay: {0}")]
    Spawn(String),
    #[error("failed to write frame to ffplay stdin: {0}")]
    Write(String),
    #[error("frame size changed from {from_w}x{from_h} to {to_w}x{to_h}")]
    SizeChanged {
        from_w: u32,
        from_h: u32,
        to_w: u32,
        to_h: u32,
    },
}

/// What happened to a presented frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presented {
    Shown,
    /// The operator closed the output surface; treated as a stop request.
    Closed,
}

/// Where display frames go.
#[allow(async_fn_in_trait)]
pub trait FrameSink {
    async fn present(&mut self, frame: &ColorFrame) -> Result<Presented, DisplayError>;

    /// Tear the surface down. Safe to call more than once.
    async fn close(&mut self);
}

/// Discards every frame. Used when running headless.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl NullDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl FrameSink for NullDisplay {
    async fn present(&mut self, _frame: &ColorFrame) -> Result<Presented, DisplayError> {
        Ok(Presented::Shown)
    }

    async fn close(&mut self) {}
}

struct Window {
    child: Child,
    stdin: ChildStdin,
    width: u32,
    height: u32,
}

/// A window driven by an `ffplay` child reading rgb24 frames on stdin.
///
/// The window is opened on the first frame, once its size is known. Esc or
/// `q` in the window makes ffplay exit, which the next `present` reports
/// as [`Presented::Closed`].
pub struct FfplayDisplay {
    title: String,
    window: Option<Window>,
    closed: bool,
    frames: u64,
}

impl FfplayDisplay {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            window: None,
            closed: false,
            frames: 0,
        }
    }

    fn open(&self, width: u32, height: u32) -> Result<Window, DisplayError> {
        let mut cmd = Command::new("ffplay");
        cmd.args(ffplay_args(&self.title, width, height))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| DisplayError::Spawn(e.to_string()))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DisplayError::Spawn("could not get stdin handle".into()))?;

        info!(width, height, title = %self.title, "display window opened");
        Ok(Window {
            child,
            stdin,
            width,
            height,
        })
    }
}

impl FrameSink for FfplayDisplay {
    async fn present(&mut self, frame: &ColorFrame) -> Result<Presented, DisplayError> {
        if self.closed {
            return Ok(Presented::Closed);
        }
        if self.window.is_none() {
            self.window = Some(self.open(frame.width(), frame.height())?);
        }
        let Some(window) = self.window.as_mut() else {
            return Ok(Presented::Closed);
        };

        if (window.width, window.height) != frame.dimensions() {
            return Err(DisplayError::SizeChanged {
                from_w: window.width,
                from_h: window.height,
                to_w: frame.width(),
                to_h: frame.height(),
            });
        }

        if let Ok(Some(status)) = window.child.try_wait() {
            debug!(%status, "ffplay exited");
            self.closed = true;
            return Ok(Presented::Closed);
        }

        match window.stdin.write_all(frame.as_raw()).await {
            Ok(()) => {
                self.frames += 1;
                Ok(Presented::Shown)
            }
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("display window closed by operator");
                self.closed = true;
                Ok(Presented::Closed)
            }
            Err(e) => Err(DisplayError::Write(e.to_string())),
        }
    }

    async fn close(&mut self) {
        self.closed = true;
        let Some(mut window) = self.window.take() else {
            return;
        };
        drop(window.stdin);
        if let Ok(Some(_)) = window.child.try_wait() {
            debug!(frames = self.frames, "display already closed");
            return;
        }
        if let Err(e) = window.child.kill().await {
            warn!(error = %e, "failed to close display window");
        } else {
            debug!(frames = self.frames, "display window closed");
        }
    }
}

/// ffplay arguments for a raw rgb24 stream of the given size on stdin.
pub fn ffplay_args(title: &str, width: u32, height: u32) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pixel_format".to_string(),
        "rgb24".to_string(),
        "-video_size".to_string(),
        format!("{width}x{height}"),
        "-window_title".to_string(),
        title.to_string(),
        "-i".to_string(),
        "pipe:0".to_string(),
    ]
}
