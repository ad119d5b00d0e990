//! Grid snapping for dragged layers.

use kurbo::{Point, Size};

/// Grid spacing in canvas units (matches the rendered grid).
pub const GRID_SIZE: f64 = 50.0;

/// Snap distance in screen pixels.
pub const SNAP_THRESHOLD_PX: f64 = 10.0;

/// A transient alignment line at a grid value, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnapGuide {
    /// Vertical line at `x`.
    Vertical(f64),
    /// Horizontal line at `y`.
    Horizontal(f64),
}

/// Result of snapping a candidate layer position.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapResult {
    /// The adjusted top-left position.
    pub position: Point,
    /// Guides for the axes that snapped (at most one per axis).
    pub guides: Vec<SnapGuide>,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(position: Point) -> Self {
        Self {
            position,
            guides: Vec::new(),
        }
    }
}

/// Snap a value to the nearest grid multiple.
pub fn snap_to_grid(value: f64, grid_size: f64) -> f64 {
    (value / grid_size).round() * grid_size
}

/// Find the first of the edge offsets (start, middle, end) that lies within
/// `threshold` of a grid line. Returns the corrected origin and the line.
fn snap_axis(origin: f64, extent: f64, grid_size: f64, threshold: f64) -> Option<(f64, f64)> {
    [0.0, extent / 2.0, extent].into_iter().find_map(|offset| {
        let edge = origin + offset;
        let line = snap_to_grid(edge, grid_size);
        ((line - edge).abs() < threshold).then_some((origin + (line - edge), line))
    })
}

/// Snap a dragged layer's candidate top-left position to the grid.
///
/// `threshold` is in canvas units; callers convert from screen pixels by
/// dividing by the current zoom.
pub fn snap_layer_position(
    candidate: Point,
    size: Size,
    grid_size: f64,
    threshold: f64,
) -> SnapResult {
    if grid_size <= 0.0 || threshold <= 0.0 {
        return SnapResult::none(candidate);
    }

    let mut result = SnapResult::none(candidate);
    if let Some((x, line)) = snap_axis(candidate.x, size.width, grid_size, threshold) {
        result.position.x = x;
        result.guides.push(SnapGuide::Vertical(line));
    }
    if let Some((y, line)) = snap_axis(candidate.y, size.height, grid_size, threshold) {
        result.position.y = y;
        result.guides.push(SnapGuide::Horizontal(line));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_left_edge() {
        let r = snap_layer_position(Point::new(47.0, 200.0), Size::new(100.0, 100.0), GRID_SIZE, 10.0);
        assert_eq!(r.position, Point::new(50.0, 200.0));
        assert_eq!(r.guides, vec![SnapGuide::Vertical(50.0), SnapGuide::Horizontal(200.0)]);
    }

    #[test]
    fn test_snap_center() {
        // Left edge 23 is 23 away from 0 and 27 from 50; center 53 is 3 from 50
        let r = snap_layer_position(Point::new(23.0, 0.0), Size::new(60.0, 60.0), GRID_SIZE, 10.0);
        assert_eq!(r.position.x, 20.0);
        assert_eq!(r.guides[0], SnapGuide::Vertical(50.0));
    }

    #[test]
    fn test_snap_right_edge() {
        // Left 12, center 32, right 52
        let r = snap_layer_position(Point::new(12.0, 25.0), Size::new(40.0, 40.0), GRID_SIZE, 5.0);
        assert_eq!(r.position.x, 10.0);
        assert_eq!(r.guides, vec![SnapGuide::Vertical(50.0)]);
        assert_eq!(r.position.y, 25.0);
    }

    #[test]
    fn test_outside_threshold_unchanged() {
        let candidate = Point::new(20.0, 120.0);
        let r = snap_layer_position(candidate, Size::new(100.0, 100.0), GRID_SIZE, 10.0);
        assert_eq!(r.position, candidate);
        assert!(r.guides.is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let r = snap_layer_position(Point::new(40.0, 20.0), Size::new(100.0, 100.0), GRID_SIZE, 10.0);
        assert_eq!(r.position.x, 40.0);
    }

    #[test]
    fn test_snap_to_grid() {
        assert_eq!(snap_to_grid(74.0, 50.0), 50.0);
        assert_eq!(snap_to_grid(76.0, 50.0), 100.0);
        assert_eq!(snap_to_grid(-26.0, 50.0), -50.0);
    }
}
