use drone_detector_common::config::DetectionConfig;
use drone_detector_common::frame::{ensure_not_empty, BoundingBox, FrameError, GrayFrame};
use image::Luma;
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point;
use tracing::{debug, trace};

const ON: u8 = 255;
const OFF: u8 = 0;

/// Turn a (dilated) difference map into boxes around the changed regions
/// that are large enough to report.
///
/// 1. hard threshold: `> diff_threshold` is on, everything else off;
/// 2. outer contours of the on-regions, compressed to their corner points;
/// 3. contours enclosing no more than `contour_area_threshold` are dropped;
/// 4. the bounding rectangle of each survivor, in discovery order.
pub fn extract(
    diff_map: &GrayFrame,
    config: &DetectionConfig,
) -> Result<Vec<BoundingBox>, FrameError> {
    ensure_not_empty(diff_map.width(), diff_map.height())?;

    let binary = binarize(diff_map, config.diff_threshold());
    let min_area = f64::from(config.contour_area_threshold());

    let boxes: Vec<BoundingBox> = external_contours(&binary)
        .into_iter()
        .filter_map(|contour| {
            let area = contour_area(&contour);
            if area <= min_area {
                trace!(area, min_area, "contour too small, skipped");
                return None;
            }
            BoundingBox::enclosing(contour.iter().map(|p| (p.x as u32, p.y as u32)))
        })
        .collect();

    if !boxes.is_empty() {
        debug!(count = boxes.len(), "{} contours have been detected", boxes.len());
    }
    Ok(boxes)
}

/// Binary threshold: pixels strictly brighter than `threshold` become 255.
pub fn binarize(map: &GrayFrame, threshold: u8) -> GrayFrame {
    GrayFrame::from_fn(map.width(), map.height(), |x, y| {
        if map.get_pixel(x, y).0[0] > threshold {
            Luma([ON])
        } else {
            Luma([OFF])
        }
    })
}

/// Outer boundaries of the top-level on-regions. Holes, and anything
/// nested inside a hole, are left out.
pub fn external_contours(binary: &GrayFrame) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(binary)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| compress_chain(&c.points))
        .collect()
}

/// Keep only the points where the boundary changes direction, so straight
/// horizontal, vertical and diagonal runs collapse to their end points.
pub fn compress_chain(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let mut points = points.to_vec();
    points.dedup();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    let n = points.len();
    if n < 3 {
        return points;
    }
    let step = |from: Point<i32>, to: Point<i32>| (to.x - from.x, to.y - from.y);

    let corners: Vec<Point<i32>> = (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect();

    if corners.is_empty() {
        points
    } else {
        corners
    }
}

/// Area enclosed by a closed polygon (shoelace formula), always >= 0.
/// Vertices sit on pixel centres, so a filled w x h rectangle encloses
/// (w - 1) * (h - 1).
pub fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| i64::from(a.x) * i64::from(b.y) - i64::from(b.x) * i64::from(a.y))
        .sum();
    twice.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(map: &mut GrayFrame, x0: u32, y0: u32, w: u32, h: u32, value: u8) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                map.put_pixel(x, y, Luma([value]));
            }
        }
    }

    fn config(area: i64, threshold: i64) -> DetectionConfig {
        DetectionConfig::new(area, threshold).unwrap()
    }

    #[test]
    fn binarize_is_strictly_greater() {
        let mut map = GrayFrame::new(3, 1);
        map.put_pixel(0, 0, Luma([19]));
        map.put_pixel(1, 0, Luma([20]));
        map.put_pixel(2, 0, Luma([21]));
        let binary = binarize(&map, 20);
        let row: Vec<u8> = (0..3).map(|x| binary.get_pixel(x, 0).0[0]).collect();
        assert_eq!(row, vec![0, 0, 255]);
    }

    #[test]
    fn rectangle_contour_is_four_corners() {
        let mut map = GrayFrame::new(20, 20);
        fill(&mut map, 3, 4, 6, 5, 255);
        let contours = external_contours(&map);
        assert_eq!(contours.len(), 1);
        let corners = &contours[0];
        assert_eq!(corners.len(), 4);
        for corner in [(3, 4), (8, 4), (8, 8), (3, 8)] {
            assert!(corners.contains(&Point::new(corner.0, corner.1)));
        }
        assert_eq!(contour_area(corners), 20.0);
    }

    #[test]
    fn compression_keeps_area() {
        let mut map = GrayFrame::new(30, 30);
        fill(&mut map, 5, 5, 10, 4, 255);
        fill(&mut map, 5, 9, 4, 8, 255);
        let full = find_contours::<i32>(&map);
        let outer = full
            .iter()
            .find(|c| matches!(c.border_type, BorderType::Outer))
            .unwrap();
        let compressed = compress_chain(&outer.points);
        assert!(compressed.len() < outer.points.len());
        assert_eq!(contour_area(&compressed), contour_area(&outer.points));
    }

    #[test]
    fn blob_above_threshold_yields_one_box() {
        // 11x11 block, enclosed area 10 * 10 = 100
        let mut map = GrayFrame::new(40, 40);
        fill(&mut map, 12, 7, 11, 11, 200);
        let boxes = extract(&map, &config(99, 20)).unwrap();
        assert_eq!(boxes, vec![BoundingBox::new(12, 7, 11, 11)]);
    }

    #[test]
    fn blob_at_or_below_threshold_is_dropped() {
        let mut map = GrayFrame::new(40, 40);
        fill(&mut map, 12, 7, 11, 11, 200);
        assert!(extract(&map, &config(100, 20)).unwrap().is_empty());
        assert!(extract(&map, &config(101, 20)).unwrap().is_empty());
    }

    #[test]
    fn faint_change_is_not_a_region() {
        let mut map = GrayFrame::new(40, 40);
        fill(&mut map, 5, 5, 20, 20, 20);
        assert!(extract(&map, &config(1, 20)).unwrap().is_empty());
        fill(&mut map, 5, 5, 20, 20, 21);
        assert_eq!(extract(&map, &config(1, 20)).unwrap().len(), 1);
    }

    #[test]
    fn boxes_keep_discovery_order() {
        let mut map = GrayFrame::new(50, 50);
        fill(&mut map, 30, 2, 10, 10, 255);
        fill(&mut map, 2, 30, 12, 12, 255);
        let boxes = extract(&map, &config(10, 20)).unwrap();
        assert_eq!(
            boxes,
            vec![BoundingBox::new(30, 2, 10, 10), BoundingBox::new(2, 30, 12, 12)]
        );
    }

    #[test]
    fn small_and_large_mixed() {
        let mut map = GrayFrame::new(50, 50);
        fill(&mut map, 2, 2, 3, 3, 255); // area 4
        fill(&mut map, 20, 20, 15, 15, 255); // area 196
        let boxes = extract(&map, &config(50, 20)).unwrap();
        assert_eq!(boxes, vec![BoundingBox::new(20, 20, 15, 15)]);
    }

    #[test]
    fn regions_inside_holes_are_not_external() {
        let mut map = GrayFrame::new(40, 40);
        fill(&mut map, 5, 5, 21, 21, 255);
        fill(&mut map, 8, 8, 15, 15, 0);
        fill(&mut map, 13, 13, 5, 5, 255);
        let boxes = extract(&map, &config(1, 20)).unwrap();
        assert_eq!(boxes, vec![BoundingBox::new(5, 5, 21, 21)]);
    }

    #[test]
    fn quiet_map_has_no_boxes() {
        let map = GrayFrame::new(32, 24);
        assert!(extract(&map, &DetectionConfig::default()).unwrap().is_empty());
    }

    #[test]
    fn degenerate_contours_have_no_area() {
        assert_eq!(contour_area(&[]), 0.0);
        assert_eq!(contour_area(&[Point::new(1, 1), Point::new(4, 1)]), 0.0);
        assert_eq!(compress_chain(&[Point::new(2, 2)]), vec![Point::new(2, 2)]);
    }

    #[test]
    fn empty_map_is_invalid() {
        assert_eq!(
            extract(&GrayFrame::new(0, 0), &DetectionConfig::default()),
            Err(FrameError::Empty)
        );
    }
}
