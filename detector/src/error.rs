use drone_detector_capture::CaptureError;
use drone_detector_common::config::ValidationError;
use drone_detector_common::frame::FrameError;

use crate::detection::display::DisplayError;

/// Anything that ends a detector run with a failure exit status.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("invalid detection config: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("display failed: {0}")]
    Display(#[from] DisplayError),
}
