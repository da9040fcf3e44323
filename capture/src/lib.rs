//! Frame acquisition for the detector: a live camera or a recorded file,
//! both decoded by an ffmpeg child process.

pub mod camera;
pub mod ffmpeg;
pub mod file;
pub mod input;

use drone_detector_common::frame::{ColorFrame, FrameError};

pub use camera::CameraSource;
pub use file::FileSource;
pub use input::{open_source, CaptureOptions, InputDescriptor};

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("source error: {0}")]
    Source(String),
    #[error("unsupported input type: {0}")]
    UnsupportedInputType(String),
    #[error("decoder output ended mid-frame: got {got} bytes, expected {expected}")]
    TruncatedFrame { got: usize, expected: usize },
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Something the detection loop can pull frames from.
///
/// `has_more` is the loop condition; `try_acquire` advances the read
/// position and never rewinds. `Ok(None)` is returned once, when a finite
/// source runs out, after which `has_more` is false.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    fn has_more(&self) -> bool;

    async fn try_acquire(&mut self) -> Result<Option<ColorFrame>, CaptureError>;

    /// Release the underlying resource. Safe to call more than once.
    async fn close(&mut self);

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// The two concrete acquisition variants, selected by [`open_source`].
pub enum Source {
    Camera(CameraSource),
    File(FileSource),
}

impl FrameSource for Source {
    fn has_more(&self) -> bool {
        match self {
            Source::Camera(camera) => camera.has_more(),
            Source::File(file) => file.has_more(),
        }
    }

    async fn try_acquire(&mut self) -> Result<Option<ColorFrame>, CaptureError> {
        match self {
            Source::Camera(camera) => camera.try_acquire().await,
            Source::File(file) => file.try_acquire().await,
        }
    }

    async fn close(&mut self) {
        match self {
            Source::Camera(camera) => camera.close().await,
            Source::File(file) => file.close().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Source::Camera(camera) => camera.name(),
            Source::File(file) => file.name(),
        }
    }
}
