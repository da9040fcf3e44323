//! Live camera input through the platform capture demuxer
//! (V4L2 on Linux, AVFoundation on macOS, DirectShow on Windows).

use drone_detector_common::frame::ColorFrame;
use tracing::{info, warn};

use crate::ffmpeg::RawVideoReader;
use crate::input::CaptureOptions;
use crate::{CaptureError, FrameSource};

/// A live stream. It never runs out on its own: `has_more` is always true
/// and the loop only stops on cancellation or an acquisition failure.
pub struct CameraSource {
    device: u32,
    reader: Option<RawVideoReader>,
    /// First frame, read while opening to prove the device works.
    pending: Option<ColorFrame>,
}

impl CameraSource {
    pub async fn open(device: u32, options: &CaptureOptions) -> Result<Self, CaptureError> {
        info!(device, "Use camera");

        let args = camera_input_args(device, options);
        let mut reader = RawVideoReader::spawn(&args, options.width, options.height, true)?;

        let first = match reader.read_frame().await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                reader.close().await;
                return Err(CaptureError::SourceUnavailable(format!(
                    "camera {device} produced no frames"
                )));
            }
            Err(e) => {
                reader.close().await;
                return Err(CaptureError::SourceUnavailable(format!(
                    "camera {device} failed to start: {e}"
                )));
            }
        };

        info!(
            device,
            width = options.width,
            height = options.height,
            framerate = options.framerate,
            "camera opened"
        );

        Ok(Self {
            device,
            reader: Some(reader),
            pending: Some(first),
        })
    }
}

impl FrameSource for CameraSource {
    fn has_more(&self) -> bool {
        true
    }

    async fn try_acquire(&mut self) -> Result<Option<ColorFrame>, CaptureError> {
        if let Some(frame) = self.pending.take() {
            return Ok(Some(frame));
        }
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| CaptureError::Source(format!("camera {} is closed", self.device)))?;
        match reader.read_frame().await {
            Ok(Some(frame)) => Ok(Some(frame)),
            Ok(None) => {
                warn!(device = self.device, "camera stream ended unexpectedly");
                Err(CaptureError::Source(format!(
                    "camera {} stopped delivering frames",
                    self.device
                )))
            }
            Err(e) => Err(e),
        }
    }

    async fn close(&mut self) {
        self.pending = None;
        if let Some(reader) = self.reader.take() {
            reader.close().await;
            info!(device = self.device, "camera released");
        }
    }

    fn name(&self) -> &str {
        "camera"
    }
}

/// ffmpeg input arguments for capture device `index` on this platform.
pub fn camera_input_args(index: u32, options: &CaptureOptions) -> Vec<String> {
    let framerate = options.framerate.to_string();
    let size = format!("{}x{}", options.width, options.height);
    let mut args = vec![
        "-f".to_string(),
        camera_format().to_string(),
        "-framerate".to_string(),
        framerate,
        "-video_size".to_string(),
        size,
    ];
    #[cfg(target_os = "windows")]
    {
        args.push("-video_device_number".to_string());
        args.push(index.to_string());
    }
    args.push("-i".to_string());
    args.push(camera_url(index, options));
    args
}

fn camera_format() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "dshow"
    }
    #[cfg(target_os = "macos")]
    {
        "avfoundation"
    }
    #[cfg(target_os = "linux")]
    {
        "v4l2"
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        "video4linux2"
    }
}

#[allow(unused_variables)]
fn camera_url(index: u32, options: &CaptureOptions) -> String {
    #[cfg(target_os = "windows")]
    {
        format!(
            "video={}",
            options.device_name.as_deref().unwrap_or("Integrated Camera")
        )
    }
    #[cfg(target_os = "macos")]
    {
        format!("{index}")
    }
    #[cfg(target_os = "linux")]
    {
        format!("/dev/video{index}")
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        format!("{index}")
    }
}
