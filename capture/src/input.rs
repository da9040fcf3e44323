use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use drone_detector_common::config::SourceConfig;

use crate::{CameraSource, CaptureError, FileSource, Source};

/// What to read frames from: a capture device id or a video file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDescriptor {
    Camera(u32),
    File(PathBuf),
}

impl Default for InputDescriptor {
    fn default() -> Self {
        InputDescriptor::Camera(0)
    }
}

impl fmt::Display for InputDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputDescriptor::Camera(id) => write!(f, "camera {id}"),
            InputDescriptor::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

/// A non-negative integer is a device id, any other non-empty text a path.
impl FromStr for InputDescriptor {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CaptureError::UnsupportedInputType(
                "empty input descriptor".into(),
            ));
        }
        if let Ok(id) = s.parse::<u32>() {
            return Ok(InputDescriptor::Camera(id));
        }
        if s.parse::<i64>().is_ok() {
            return Err(CaptureError::UnsupportedInputType(format!(
                "{s} is not a valid camera device id"
            )));
        }
        Ok(InputDescriptor::File(PathBuf::from(s)))
    }
}

impl TryFrom<&SourceConfig> for InputDescriptor {
    type Error = CaptureError;

    fn try_from(config: &SourceConfig) -> Result<Self, Self::Error> {
        match config.kind.trim().to_ascii_lowercase().as_str() {
            "camera" => Ok(InputDescriptor::Camera(config.device)),
            "file" | "video" => config
                .file
                .clone()
                .map(InputDescriptor::File)
                .ok_or_else(|| {
                    CaptureError::UnsupportedInputType(
                        "source kind \"file\" needs a file path".into(),
                    )
                }),
            other => Err(CaptureError::UnsupportedInputType(format!(
                "unknown source kind {other:?}, expected \"camera\" or \"file\""
            ))),
        }
    }
}

/// Capture parameters that only apply to live devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    /// DirectShow device name; other platforms address devices by index.
    pub device_name: Option<String>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::from(&SourceConfig::default())
    }
}

impl From<&SourceConfig> for CaptureOptions {
    fn from(config: &SourceConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            framerate: config.framerate,
            device_name: config.device_name.clone(),
        }
    }
}

/// Open the source matching `input`: a camera for a device id, a file
/// reader for a path. Failing to open is fatal; nothing is retried.
pub async fn open_source(
    input: &InputDescriptor,
    options: &CaptureOptions,
) -> Result<Source, CaptureError> {
    match input {
        InputDescriptor::Camera(id) => Ok(Source::Camera(CameraSource::open(*id, options).await?)),
        InputDescriptor::File(path) => Ok(Source::File(FileSource::open(path).await?)),
    }
}
