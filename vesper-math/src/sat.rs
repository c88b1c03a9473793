//! Separating-axis overlap test for convex shapes in 2D.
//!
//! A shape enters the test as a set of unit-length axes (the normals of its
//! edges) and a set of pivot points (its transformed vertices). All pivots of
//! both shapes are projected onto every axis; if any axis shows a non-positive
//! overlap the shapes are disjoint, otherwise the axis of smallest positive
//! overlap yields the minimum translation vector.

use crate::perpendicular;
use arrayvec::ArrayVec;
use nalgebra::Vector2;

/// Upper bound on axes/pivots a single convex shape can contribute.
pub const MAX_SHAPE_VERTICES: usize = 8;

/// A convex shape prepared for the separating-axis test.
#[derive(Clone, Debug, Default)]
pub struct SatShape {
    /// Unit-length edge normals.
    pub axes: ArrayVec<Vector2<f32>, MAX_SHAPE_VERTICES>,
    /// Transformed vertices.
    pub pivots: ArrayVec<Vector2<f32>, MAX_SHAPE_VERTICES>,
    /// Transformed center, used to orient the translation vector.
    pub center: Vector2<f32>,
}

impl SatShape {
    /// Adds an edge running from `from` to `to`, storing its unit normal as a
    /// test axis. Degenerate edges contribute no axis.
    pub fn push_edge_axis(&mut self, from: Vector2<f32>, to: Vector2<f32>) {
        if let Some(direction) = (to - from).try_normalize(f32::EPSILON) {
            self.axes.push(perpendicular(direction));
        }
    }
}

/// Outcome of the separating-axis test.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SatResult {
    /// True if the shapes overlap.
    pub intersects: bool,
    /// Minimum translation vector. Moving shape 1 by this offset separates the
    /// shapes; it points from shape 2 towards shape 1. Zero if disjoint.
    pub mtv: Vector2<f32>,
}

impl SatResult {
    pub const DISJOINT: SatResult = SatResult {
        intersects: false,
        mtv: Vector2::new(0.0, 0.0),
    };
}

fn project(pivots: &[Vector2<f32>], axis: Vector2<f32>) -> (f32, f32) {
    let mut left = f32::INFINITY;
    let mut right = f32::NEG_INFINITY;
    for pivot in pivots {
        let projection = axis.dot(pivot);
        left = left.min(projection);
        right = right.max(projection);
    }
    (left, right)
}

/// Runs the separating-axis test between two prepared shapes.
pub fn sat(shape1: &SatShape, shape2: &SatShape) -> SatResult {
    if shape1.pivots.is_empty() || shape2.pivots.is_empty() {
        return SatResult::DISJOINT;
    }

    let mut smallest_overlap = f32::MAX;
    let mut offset = Vector2::default();

    for axis in shape1.axes.iter().chain(shape2.axes.iter()) {
        let (left1, right1) = project(&shape1.pivots, *axis);
        let (left2, right2) = project(&shape2.pivots, *axis);

        let overlap = right1.min(right2) - left1.max(left2);

        if overlap <= 0.0 {
            return SatResult::DISJOINT;
        }
        if overlap < smallest_overlap {
            smallest_overlap = overlap;
            offset = *axis * overlap;
        }
    }

    // Orient the translation vector from shape 2 towards shape 1.
    if (shape1.center - shape2.center).dot(&offset) < 0.0 {
        offset = -offset;
    }

    SatResult {
        intersects: true,
        mtv: offset,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn axis_aligned_box(x: f32, y: f32, w: f32, h: f32) -> SatShape {
        let mut shape = SatShape::default();
        let corners = [
            Vector2::new(x, y),
            Vector2::new(x + w, y),
            Vector2::new(x + w, y + h),
            Vector2::new(x, y + h),
        ];
        for corner in corners {
            shape.pivots.push(corner);
        }
        shape.push_edge_axis(corners[0], corners[1]);
        shape.push_edge_axis(corners[0], corners[3]);
        shape.center = Vector2::new(x + w / 2.0, y + h / 2.0);
        shape
    }

    #[test]
    fn overlapping_boxes_produce_minimal_offset() {
        let a = axis_aligned_box(0.0, 0.0, 10.0, 10.0);
        let b = axis_aligned_box(8.0, 0.0, 10.0, 10.0);

        let result = sat(&a, &b);
        assert!(result.intersects);
        assert!((result.mtv.x - (-2.0)).abs() < 1e-4);
        assert!(result.mtv.y.abs() < 1e-4);
    }

    #[test]
    fn mtv_is_antisymmetric() {
        let a = axis_aligned_box(0.0, 0.0, 10.0, 10.0);
        let b = axis_aligned_box(6.0, 4.0, 10.0, 10.0);

        let ab = sat(&a, &b);
        let ba = sat(&b, &a);
        assert!(ab.intersects && ba.intersects);
        assert!((ab.mtv + ba.mtv).norm() < 1e-4);
    }

    #[test]
    fn disjoint_boxes_do_not_intersect() {
        let a = axis_aligned_box(0.0, 0.0, 10.0, 10.0);
        let b = axis_aligned_box(20.0, 20.0, 5.0, 5.0);

        assert_eq!(sat(&a, &b), SatResult::DISJOINT);
    }

    #[test]
    fn translating_by_mtv_separates() {
        let a = axis_aligned_box(0.0, 0.0, 10.0, 10.0);
        let b = axis_aligned_box(8.0, 1.0, 10.0, 10.0);

        let result = sat(&a, &b);
        assert!(result.intersects);

        let mut moved = a.clone();
        for pivot in moved.pivots.iter_mut() {
            *pivot += result.mtv;
        }
        moved.center += result.mtv;

        assert!(!sat(&moved, &b).intersects);
    }
}
