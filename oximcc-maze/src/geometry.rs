//! 2-D primitives for the maze world: points and wall
//! segments, with exact segment-segment intersection and
//! point-segment distance. All math is double precision;
//! angles elsewhere in the crate are radians.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A wall segment between two endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    pub fn new(a: Point, b: Point) -> Segment {
        Segment { a, b }
    }

    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }

    /// Returns the intersection point of two segments, or
    /// `None` if they do not cross. Parallel and collinear
    /// segments never intersect here; the decoder does not
    /// produce overlapping collinear walls, and a ray
    /// grazing along a wall reads as unobstructed.
    pub fn intersection(&self, other: &Segment) -> Option<Point> {
        let r = (self.b.x - self.a.x, self.b.y - self.a.y);
        let s = (other.b.x - other.a.x, other.b.y - other.a.y);
        let denominator = r.0 * s.1 - r.1 * s.0;
        if denominator == 0.0 {
            return None;
        }
        let qp = (other.a.x - self.a.x, other.a.y - self.a.y);
        let t = (qp.0 * s.1 - qp.1 * s.0) / denominator;
        let u = (qp.0 * r.1 - qp.1 * r.0) / denominator;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            Some(Point::new(self.a.x + t * r.0, self.a.y + t * r.1))
        } else {
            None
        }
    }

    /// Distance from a point to the nearest point on the
    /// segment.
    pub fn distance_to_point(&self, point: Point) -> f64 {
        let d = (self.b.x - self.a.x, self.b.y - self.a.y);
        let length_squared = d.0 * d.0 + d.1 * d.1;
        if length_squared == 0.0 {
            return self.a.distance(point);
        }
        let t = (((point.x - self.a.x) * d.0 + (point.y - self.a.y) * d.1) / length_squared)
            .clamp(0.0, 1.0);
        point.distance(Point::new(self.a.x + t * d.0, self.a.y + t * d.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_segments_intersect() {
        let first = Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let second = Segment::new(Point::new(0.0, 10.0), Point::new(10.0, 0.0));
        let intersection = first.intersection(&second).unwrap();
        assert!((intersection.x - 5.0).abs() < 1e-12);
        assert!((intersection.y - 5.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_segments_do_not_intersect() {
        let first = Segment::new(Point::new(0.0, 0.0), Point::new(1.0, 0.0));
        let second = Segment::new(Point::new(2.0, -1.0), Point::new(2.0, 1.0));
        assert!(first.intersection(&second).is_none());
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        let first = Segment::new(Point::new(0.0, 0.0), Point::new(5.0, 0.0));
        let second = Segment::new(Point::new(0.0, 1.0), Point::new(5.0, 1.0));
        assert!(first.intersection(&second).is_none());
    }

    #[test]
    fn endpoint_touch_counts_as_intersection() {
        let first = Segment::new(Point::new(0.0, 0.0), Point::new(4.0, 0.0));
        let second = Segment::new(Point::new(4.0, 0.0), Point::new(4.0, 3.0));
        assert_eq!(first.intersection(&second), Some(Point::new(4.0, 0.0)));
    }

    #[test]
    fn point_distance_projects_onto_the_segment() {
        let segment = Segment::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert_eq!(segment.distance_to_point(Point::new(5.0, 3.0)), 3.0);
        // Beyond an endpoint the distance is to the endpoint.
        assert_eq!(segment.distance_to_point(Point::new(13.0, 4.0)), 5.0);
    }

    #[test]
    fn degenerate_segment_distance_is_endpoint_distance() {
        let segment = Segment::new(Point::new(1.0, 1.0), Point::new(1.0, 1.0));
        assert_eq!(segment.distance_to_point(Point::new(4.0, 5.0)), 5.0);
    }
}
