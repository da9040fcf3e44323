use drone_detector_common::frame::{ensure_not_empty, BoundingBox, ColorFrame, FrameError};
use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const STROKE: u32 = 2;

/// Outline every box on the display frame, in place. The stroke is drawn
/// inside the box so the outline never covers pixels outside the region.
pub fn annotate(frame: &mut ColorFrame, boxes: &[BoundingBox]) -> Result<(), FrameError> {
    ensure_not_empty(frame.width(), frame.height())?;

    for bbox in boxes {
        for inset in 0..STROKE {
            let (Some(width), Some(height)) = (
                bbox.width.checked_sub(2 * inset).filter(|w| *w > 0),
                bbox.height.checked_sub(2 * inset).filter(|h| *h > 0),
            ) else {
                break;
            };
            let rect = Rect::at((bbox.x + inset) as i32, (bbox.y + inset) as i32)
                .of_size(width, height);
            draw_hollow_rect_mut(frame, rect, BOX_COLOR);
        }
    }
    Ok(())
}
