//! Small geometry helpers shared by the router and the gesture code.

use kurbo::{Point, Rect, Vec2};

/// Boxes narrower and shorter than this are treated as not laid out yet.
pub const DEGENERATE_EPSILON: f64 = 1e-6;

pub fn distance(a: Point, b: Point) -> f64 {
    a.distance(b)
}

/// Mean of the given points, `None` for an empty slice.
pub fn centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vec2::ZERO, |acc, point| acc + point.to_vec2());
    Some((sum / points.len() as f64).to_point())
}

pub fn left_mid(rect: Rect) -> Point {
    Point::new(rect.x0, rect.y0 + rect.height() / 2.0)
}

pub fn right_mid(rect: Rect) -> Point {
    Point::new(rect.x1, rect.y0 + rect.height() / 2.0)
}

/// A zero-sized box, which is what measuring an element that was never
/// realized produces.
pub fn is_degenerate(rect: Rect) -> bool {
    rect.width().abs() < DEGENERATE_EPSILON && rect.height().abs() < DEGENERATE_EPSILON
}

/// Re-express a client-space rect relative to `origin`.
pub fn to_local(rect: Rect, origin: Point) -> Rect {
    rect - origin.to_vec2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_between_touches() {
        assert!((distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0)) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn centroid_of_two_points_is_midpoint() {
        let c = centroid(&[Point::new(10.0, 20.0), Point::new(30.0, 40.0)]).unwrap();
        assert_eq!(c, Point::new(20.0, 30.0));
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn edge_midpoints() {
        let rect = Rect::new(10.0, 20.0, 110.0, 60.0);
        assert_eq!(left_mid(rect), Point::new(10.0, 40.0));
        assert_eq!(right_mid(rect), Point::new(110.0, 40.0));
    }

    #[test]
    fn degenerate_and_local() {
        assert!(is_degenerate(Rect::ZERO));
        assert!(!is_degenerate(Rect::new(0.0, 0.0, 0.0, 5.0)));
        let local = to_local(Rect::new(15.0, 25.0, 20.0, 30.0), Point::new(5.0, 5.0));
        assert_eq!(local, Rect::new(10.0, 20.0, 15.0, 25.0));
    }
}
