use drone_detector_common::frame::{ensure_not_empty, FrameError, GrayFrame};
use imageproc::morphology::{grayscale_dilate, Mask};

/// Half-width of the square structuring element (5x5, all ones).
const RADIUS: u8 = 2;

/// One pass of grayscale dilation with a 5x5 square: every output pixel is
/// the maximum of its neighbourhood. Grows changed pixels into contiguous
/// blobs before thresholding. Pixels outside the image are ignored.
pub fn dilate(diff_map: &GrayFrame) -> Result<GrayFrame, FrameError> {
    ensure_not_empty(diff_map.width(), diff_map.height())?;
    Ok(grayscale_dilate(diff_map, &Mask::square(RADIUS)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn single_pixel_grows_to_5x5() {
        let mut map = GrayFrame::new(11, 11);
        map.put_pixel(5, 5, Luma([40]));
        let out = dilate(&map).unwrap();

        let lit: Vec<(u32, u32)> = out
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[0] > 0)
            .map(|(x, y, _)| (x, y))
            .collect();
        assert_eq!(lit.len(), 25);
        assert!(lit.iter().all(|&(x, y)| (3..=7).contains(&x) && (3..=7).contains(&y)));
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 40));
    }

    #[test]
    fn takes_neighbourhood_maximum() {
        let mut map = GrayFrame::new(8, 1);
        map.put_pixel(0, 0, Luma([10]));
        map.put_pixel(3, 0, Luma([30]));
        let out = dilate(&map).unwrap();
        let row: Vec<u8> = (0..8).map(|x| out.get_pixel(x, 0).0[0]).collect();
        assert_eq!(row, vec![10, 30, 30, 30, 30, 30, 0, 0]);
    }

    #[test]
    fn merges_nearby_fragments() {
        let mut map = GrayFrame::new(12, 5);
        map.put_pixel(3, 2, Luma([100]));
        map.put_pixel(7, 2, Luma([100]));
        let out = dilate(&map).unwrap();
        assert!((1..=9).all(|x| out.get_pixel(x, 2).0[0] == 100));
    }

    #[test]
    fn thresholding_commutes_with_dilation() {
        use imageproc::distance_transform::Norm;

        let mut map = GrayFrame::new(23, 17);
        for (i, (x, y)) in [(2, 3), (9, 9), (15, 4), (20, 15), (11, 1)].into_iter().enumerate() {
            map.put_pixel(x, y, Luma([15 + 10 * i as u8]));
        }
        let on = |m: &GrayFrame| {
            GrayFrame::from_fn(m.width(), m.height(), |x, y| {
                Luma([if m.get_pixel(x, y).0[0] > 20 { 255 } else { 0 }])
            })
        };
        let dilated_then_binary = on(&dilate(&map).unwrap());
        let binary_then_dilated = imageproc::morphology::dilate(&on(&map), Norm::LInf, RADIUS);
        assert_eq!(dilated_then_binary, binary_then_dilated);
    }

    #[test]
    fn empty_map_is_invalid() {
        assert_eq!(dilate(&GrayFrame::new(0, 3)), Err(FrameError::Empty));
    }
}
