use image::{GrayImage, RgbImage};

/// A 3-channel RGB frame as delivered by a source and shown on the display.
pub type ColorFrame = RgbImage;

/// A single-channel intensity frame (prepared frames and difference maps).
pub type GrayFrame = GrayImage;

/// Number of bytes in one packed rgb24 frame.
pub fn rgb24_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

/// Wrap a packed rgb24 buffer (row-major, no padding) as a [`ColorFrame`].
pub fn color_frame_from_rgb24(
    width: u32,
    height: u32,
    data: Vec<u8>,
) -> Result<ColorFrame, FrameError> {
    if width == 0 || height == 0 {
        return Err(FrameError::Empty);
    }
    let expected = rgb24_len(width, height);
    if data.len() != expected {
        return Err(FrameError::BufferSize {
            got: data.len(),
            expected,
        });
    }
    RgbImage::from_raw(width, height, data).ok_or(FrameError::BufferSize {
        got: 0,
        expected,
    })
}

/// Reject frames with no pixels before they reach a processing stage.
pub fn ensure_not_empty(width: u32, height: u32) -> Result<(), FrameError> {
    if width == 0 || height == 0 {
        Err(FrameError::Empty)
    } else {
        Ok(())
    }
}

/// Axis-aligned rectangle around a changed region, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest box containing every `(x, y)` point, or `None` for no points.
    /// Like a pixel bounding rect, both ends are inclusive.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (u32, u32)>,
    {
        let mut points = points.into_iter();
        let (x0, y0) = points.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for (x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    /// Exclusive right edge.
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame: image has no pixels")]
    Empty,
    #[error("invalid frame: buffer holds {got} bytes, expected {expected}")]
    BufferSize { got: usize, expected: usize },
    #[error("invalid frame: {got_w}x{got_h} does not match {expected_w}x{expected_h}")]
    DimensionMismatch {
        got_w: u32,
        got_h: u32,
        expected_w: u32,
        expected_h: u32,
    },
}
