use drone_detector_common::frame::{ensure_not_empty, ColorFrame, FrameError, GrayFrame};
use image::imageops;
use imageproc::filter::separable_filter_equal;

/// 5-tap Gaussian used when the sigma is derived from a 5x5 kernel size
/// (sigma = 0.3 * ((5 - 1) * 0.5 - 1) + 0.8 = 1.1). These are the
/// binomial weights 1-4-6-4-1 over 16.
const KERNEL: [f32; 5] = [0.0625, 0.25, 0.375, 0.25, 0.0625];

/// Left-right flip of an acquired frame, for a mirror-like display.
pub fn mirror(frame: &ColorFrame) -> ColorFrame {
    imageops::flip_horizontal(frame)
}

/// Convert to single-channel intensity, then smooth with a 5x5 Gaussian
/// so sensor noise does not dominate the per-pixel difference.
pub fn prepare(frame: &ColorFrame) -> Result<GrayFrame, FrameError> {
    ensure_not_empty(frame.width(), frame.height())?;
    let gray = imageops::grayscale(frame);
    Ok(separable_filter_equal(&gray, &KERNEL))
}
