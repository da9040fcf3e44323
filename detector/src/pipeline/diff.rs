use drone_detector_common::frame::{ensure_not_empty, FrameError, GrayFrame};
use image::Luma;
use tracing::trace;

/// Frame differencing against the last processed sample.
///
/// Holds at most one prepared frame. The first call only seeds it; every
/// later call returns `|previous - current|` and then replaces `previous`.
/// Frames dropped by decimation never reach this type.
#[derive(Debug, Default)]
pub struct DiffEngine {
    previous: Option<GrayFrame>,
}

impl DiffEngine {
    pub fn new() -> Self {
        Self { previous: None }
    }

    pub fn diff(&mut self, current: GrayFrame) -> Result<Option<GrayFrame>, FrameError> {
        ensure_not_empty(current.width(), current.height())?;

        let Some(previous) = self.previous.as_ref() else {
            trace!("first sample, seeding previous frame");
            self.previous = Some(current);
            return Ok(None);
        };

        if previous.dimensions() != current.dimensions() {
            return Err(FrameError::DimensionMismatch {
                got_w: current.width(),
                got_h: current.height(),
                expected_w: previous.width(),
                expected_h: previous.height(),
            });
        }

        let diff = GrayFrame::from_fn(current.width(), current.height(), |x, y| {
            let a = previous.get_pixel(x, y).0[0];
            let b = current.get_pixel(x, y).0[0];
            Luma([a.abs_diff(b)])
        });

        self.previous = Some(current);
        Ok(Some(diff))
    }
}
