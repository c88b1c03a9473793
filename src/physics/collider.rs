// Copyright (c) 2019-present Vesper Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! 2D collider shapes.
//!
//! A collider is one of three tagged variants. Rotated rects and convex
//! polygons are solid convex shapes, an edge chain is a thin open polyline.
//! For the separating-axis test a rect or polygon is a single convex shape,
//! while an edge chain contributes one run of the test per edge.

use crate::{
    core::math::{
        rotate_around, same_side,
        sat::SatShape,
        segment::LineSegment,
        Rect,
    },
    scene::transform::TransformComponent,
};
use crate::core::algebra::Vector2;
use serde::{Deserialize, Serialize};

/// Maximum number of points a polygonal collider can carry. Together with the
/// two coordinates per point this bounds the parameter block of any collider
/// variant to twelve floats.
pub const MAX_COLLIDER_POINTS: usize = 6;

/// Distance below which a point counts as touching an edge chain.
const EDGE_CHAIN_EPSILON: f32 = 1.0;

/// See module docs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Collider {
    /// An axis-aligned rect given by two opposite corners, rotated by an angle
    /// (in radians) around its center.
    RotatedRect {
        up_left: Vector2<f32>,
        down_right: Vector2<f32>,
        rotation: f32,
    },
    /// A convex polygon with counter-clockwise winding.
    ConvexPolygon { points: Vec<Vector2<f32>> },
    /// An open polyline; collides with its edges only.
    EdgeChain { points: Vec<Vector2<f32>> },
}

impl Collider {
    pub fn rotated_rect(up_left: Vector2<f32>, down_right: Vector2<f32>, rotation: f32) -> Self {
        Self::RotatedRect {
            up_left,
            down_right,
            rotation,
        }
    }

    pub fn convex_polygon(points: Vec<Vector2<f32>>) -> Self {
        debug_assert!(points.len() <= MAX_COLLIDER_POINTS);
        Self::ConvexPolygon { points }
    }

    pub fn edge_chain(points: Vec<Vector2<f32>>) -> Self {
        debug_assert!(points.len() <= MAX_COLLIDER_POINTS);
        Self::EdgeChain { points }
    }

    /// Geometric center of the collider in local coordinates. The open edge
    /// chain has no meaningful center and yields zero.
    pub fn center(&self) -> Vector2<f32> {
        match self {
            Collider::RotatedRect {
                up_left,
                down_right,
                ..
            } => up_left + (down_right - up_left).scale(0.5),
            Collider::ConvexPolygon { points } => crate::core::math::polygon_centroid(points),
            Collider::EdgeChain { .. } => Vector2::default(),
        }
    }

    /// Rotation of a rotated rect. For other variants this is zero.
    pub fn rotation(&self) -> f32 {
        debug_assert!(matches!(self, Collider::RotatedRect { .. }));
        match self {
            Collider::RotatedRect { rotation, .. } => *rotation,
            _ => 0.0,
        }
    }

    /// Points of a polygonal collider. For a rotated rect this is empty.
    pub fn points(&self) -> &[Vector2<f32>] {
        debug_assert!(!matches!(self, Collider::RotatedRect { .. }));
        match self {
            Collider::ConvexPolygon { points } | Collider::EdgeChain { points } => points,
            Collider::RotatedRect { .. } => &[],
        }
    }

    /// Moves the collider in local coordinates.
    pub fn move_by(&mut self, offset: Vector2<f32>) {
        match self {
            Collider::RotatedRect {
                up_left,
                down_right,
                ..
            } => {
                *up_left += offset;
                *down_right += offset;
            }
            Collider::ConvexPolygon { points } | Collider::EdgeChain { points } => {
                for point in points.iter_mut() {
                    *point += offset;
                }
            }
        }
    }

    /// Corner points of the collider in layer coordinates, with the entity
    /// transform and (for rects) the own rotation applied.
    fn world_points(&self, transform: &TransformComponent) -> Vec<Vector2<f32>> {
        match self {
            Collider::RotatedRect {
                up_left,
                down_right,
                rotation,
            } => {
                // Rotation happens in the local frame around the rect center,
                // the entity transform is applied afterwards.
                let center = self.center();
                let corners = [
                    *up_left,
                    Vector2::new(down_right.x, up_left.y),
                    *down_right,
                    Vector2::new(up_left.x, down_right.y),
                ];
                corners
                    .iter()
                    .map(|corner| {
                        transform.transform_point(rotate_around(*corner, center, *rotation))
                    })
                    .collect()
            }
            Collider::ConvexPolygon { points } | Collider::EdgeChain { points } => points
                .iter()
                .map(|point| transform.transform_point(*point))
                .collect(),
        }
    }

    /// Axis-aligned bounding box in layer coordinates.
    pub fn bounding_box(&self, transform: &TransformComponent) -> Rect<f32> {
        let points = self.world_points(transform);
        let Some(first) = points.first() else {
            return Rect::default();
        };
        let mut bounds = Rect {
            position: *first,
            size: Vector2::default(),
        };
        for point in &points[1..] {
            bounds.push(*point);
        }
        bounds
    }

    /// Number of separating-axis runs this collider participates in. A run per
    /// edge for chains, a single run otherwise.
    pub fn sat_runs(&self) -> usize {
        match self {
            Collider::RotatedRect { .. } | Collider::ConvexPolygon { .. } => 1,
            Collider::EdgeChain { points } => points.len().saturating_sub(1),
        }
    }

    /// Prepares the axes and pivots of the given run for the separating-axis
    /// test. A rect contributes two axes and four pivots, a polygon one axis
    /// and pivot per point, an edge chain one axis and two pivots per run.
    pub fn sat_shape(&self, transform: &TransformComponent, run: usize) -> SatShape {
        let mut shape = SatShape::default();
        match self {
            Collider::RotatedRect { .. } => {
                let points = self.world_points(transform);
                for point in &points {
                    shape.pivots.push(*point);
                }
                shape.push_edge_axis(points[0], points[1]);
                shape.push_edge_axis(points[0], points[3]);
                shape.center = transform.transform_point(self.center());
            }
            Collider::ConvexPolygon { .. } => {
                let points = self.world_points(transform);
                for point in &points {
                    shape.pivots.push(*point);
                }
                for (i, point) in points.iter().enumerate() {
                    let next = points[(i + 1) % points.len()];
                    shape.push_edge_axis(*point, next);
                }
                shape.center = transform.transform_point(self.center());
            }
            Collider::EdgeChain { points } => {
                if run + 1 < points.len() {
                    let begin = transform.transform_point(points[run]);
                    let end = transform.transform_point(points[run + 1]);
                    shape.pivots.push(begin);
                    shape.pivots.push(end);
                    shape.push_edge_axis(begin, end);
                    shape.center = (begin + end).scale(0.5);
                }
            }
        }
        shape
    }

    /// Tests whether the given layer-space point lies inside (or, for edge
    /// chains, close to) the collider.
    pub fn contains_point(&self, transform: &TransformComponent, point: Vector2<f32>) -> bool {
        match self {
            Collider::RotatedRect {
                up_left,
                down_right,
                rotation,
            } => {
                // Undo the entity transform, then the own rotation, and test
                // against the local rectangle.
                let mut local = Vector2::new(
                    (point.x - transform.position.x) / transform.scale.x,
                    (point.y - transform.position.y) / transform.scale.y,
                );
                if *rotation != 0.0 {
                    local = rotate_around(local, self.center(), -rotation);
                }
                local.x >= up_left.x
                    && local.y >= up_left.y
                    && local.x <= down_right.x
                    && local.y <= down_right.y
            }
            Collider::ConvexPolygon { points } => {
                if points.len() < 3 {
                    return false;
                }
                let world = self.world_points(transform);
                let center = transform.transform_point(self.center());
                world.iter().enumerate().all(|(i, current)| {
                    let next = world[(i + 1) % world.len()];
                    same_side(point, *current, next, center)
                })
            }
            Collider::EdgeChain { points } => points.windows(2).any(|edge| {
                let segment = LineSegment::new(
                    transform.transform_point(edge[0]),
                    transform.transform_point(edge[1]),
                );
                segment.distance_to_point(point) <= EDGE_CHAIN_EPSILON
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::math::sat::sat;

    fn identity() -> TransformComponent {
        TransformComponent::default()
    }

    #[test]
    fn rect_bounding_box_is_tight_without_rotation() {
        let collider =
            Collider::rotated_rect(Vector2::new(0.0, 0.0), Vector2::new(10.0, 4.0), 0.0);
        let bounds = collider.bounding_box(&identity());
        assert_eq!(bounds, Rect::new(0.0, 0.0, 10.0, 4.0));
    }

    #[test]
    fn rotated_rect_bounding_box_grows() {
        let collider = Collider::rotated_rect(
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 10.0),
            std::f32::consts::FRAC_PI_4,
        );
        let bounds = collider.bounding_box(&identity());
        assert!(bounds.size.x > 10.0);
        assert!(bounds.size.y > 10.0);
    }

    #[test]
    fn overlapping_rects_resolve_along_x() {
        let a = Collider::rotated_rect(Vector2::new(0.0, 0.0), Vector2::new(10.0, 10.0), 0.0);
        let b = Collider::rotated_rect(Vector2::new(0.0, 0.0), Vector2::new(10.0, 10.0), 0.0);

        let ta = identity();
        let mut tb = identity();
        tb.position = Vector2::new(8.0, 0.0);

        let result = sat(&a.sat_shape(&ta, 0), &b.sat_shape(&tb, 0));
        assert!(result.intersects);
        assert!((result.mtv.x + 2.0).abs() < 1e-4);
        assert!(result.mtv.y.abs() < 1e-4);

        // Translating by the mtv separates the shapes.
        let mut moved = ta.clone();
        moved.position += result.mtv;
        assert!(!sat(&a.sat_shape(&moved, 0), &b.sat_shape(&tb, 0)).intersects);
    }

    #[test]
    fn polygon_contains_its_centroid() {
        let collider = Collider::convex_polygon(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 10.0),
        ]);
        assert!(collider.contains_point(&identity(), Vector2::new(5.0, 5.0)));
        assert!(!collider.contains_point(&identity(), Vector2::new(15.0, 5.0)));
    }

    #[test]
    fn rotated_rect_contains_accounts_for_rotation() {
        let collider = Collider::rotated_rect(
            Vector2::new(-5.0, -1.0),
            Vector2::new(5.0, 1.0),
            std::f32::consts::FRAC_PI_2,
        );
        // Rotated by 90 degrees the long axis is vertical now.
        assert!(collider.contains_point(&identity(), Vector2::new(0.0, 4.0)));
        assert!(!collider.contains_point(&identity(), Vector2::new(4.0, 0.0)));
    }

    #[test]
    fn edge_chain_contains_points_near_edges_only() {
        let collider = Collider::edge_chain(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
        ]);
        assert!(collider.contains_point(&identity(), Vector2::new(5.0, 0.5)));
        assert!(!collider.contains_point(&identity(), Vector2::new(5.0, 5.0)));
    }

    #[test]
    fn edge_chain_runs_once_per_edge() {
        let collider = Collider::edge_chain(vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
        ]);
        assert_eq!(collider.sat_runs(), 2);
        let shape = collider.sat_shape(&identity(), 1);
        assert_eq!(shape.pivots.len(), 2);
        assert_eq!(shape.axes.len(), 1);
    }
}
