use nalgebra::Vector2;

/// A line segment between two points.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LineSegment {
    pub begin: Vector2<f32>,
    pub end: Vector2<f32>,
}

impl LineSegment {
    #[inline]
    pub fn new(begin: Vector2<f32>, end: Vector2<f32>) -> Self {
        Self { begin, end }
    }

    /// Returns the point on the segment closest to the given point.
    pub fn closest_point(&self, point: Vector2<f32>) -> Vector2<f32> {
        let edge = self.end - self.begin;
        let length_squared = edge.norm_squared();
        if length_squared <= f32::EPSILON {
            return self.begin;
        }
        let t = ((point - self.begin).dot(&edge) / length_squared).clamp(0.0, 1.0);
        self.begin + edge * t
    }

    /// Distance from the given point to the segment.
    #[inline]
    pub fn distance_to_point(&self, point: Vector2<f32>) -> f32 {
        (point - self.closest_point(point)).norm()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn closest_point_is_clamped_to_endpoints() {
        let segment = LineSegment::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0));

        assert_eq!(
            segment.closest_point(Vector2::new(-5.0, 3.0)),
            Vector2::new(0.0, 0.0)
        );
        assert_eq!(
            segment.closest_point(Vector2::new(15.0, 3.0)),
            Vector2::new(10.0, 0.0)
        );
        assert_eq!(
            segment.closest_point(Vector2::new(4.0, 3.0)),
            Vector2::new(4.0, 0.0)
        );
    }

    #[test]
    fn distance_to_interior_point() {
        let segment = LineSegment::new(Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0));
        assert!((segment.distance_to_point(Vector2::new(5.0, 2.0)) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_segment_measures_from_begin() {
        let segment = LineSegment::new(Vector2::new(1.0, 1.0), Vector2::new(1.0, 1.0));
        assert!((segment.distance_to_point(Vector2::new(4.0, 5.0)) - 5.0).abs() < 1e-6);
    }
}
