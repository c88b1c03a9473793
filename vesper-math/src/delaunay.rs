//! Incremental Delaunay triangulation (Bowyer-Watson) over a 2D point set.
//!
//! The triangulation starts from a super-triangle enclosing the given bounds,
//! inserts points one at a time, re-triangulating the cavity formed by every
//! triangle whose circumcircle contains the new point, and finally drops all
//! triangles touching the super-triangle vertices.

use crate::rect::Rect;
use nalgebra::Vector2;

/// A triangle referencing vertices of the triangulated point set by index.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Triangle {
    pub vertices: [usize; 3],
}

impl Triangle {
    /// Edges in index order, each normalized so the smaller vertex comes first.
    pub fn edges(&self) -> [(usize, usize); 3] {
        let [a, b, c] = self.vertices;
        [ordered(a, b), ordered(b, c), ordered(c, a)]
    }
}

#[inline]
fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[derive(Copy, Clone, Debug)]
struct Circumcircle {
    center: Vector2<f32>,
    radius: f32,
}

impl Circumcircle {
    fn of(a: Vector2<f32>, b: Vector2<f32>, c: Vector2<f32>) -> Self {
        let ab = a.norm_squared();
        let cd = b.norm_squared();
        let ef = c.norm_squared();

        let denom_x = 2.0 * (a.x * (c.y - b.y) + b.x * (a.y - c.y) + c.x * (b.y - a.y));
        let denom_y = 2.0 * (a.y * (c.x - b.x) + b.y * (a.x - c.x) + c.y * (b.x - a.x));

        if denom_x.abs() <= f32::EPSILON || denom_y.abs() <= f32::EPSILON {
            // Degenerate (collinear) triangle, use an unbounded circle so it is
            // always re-triangulated away.
            return Self {
                center: a,
                radius: f32::INFINITY,
            };
        }

        let center = Vector2::new(
            (ab * (c.y - b.y) + cd * (a.y - c.y) + ef * (b.y - a.y)) / denom_x,
            (ab * (c.x - b.x) + cd * (a.x - c.x) + ef * (b.x - a.x)) / denom_y,
        );

        Self {
            center,
            radius: (a - center).norm(),
        }
    }

    #[inline]
    fn contains(&self, point: Vector2<f32>) -> bool {
        (point - self.center).norm() <= self.radius
    }
}

/// Result of a triangulation run. Triangle vertex indices refer to the input
/// point slice.
#[derive(Clone, Debug, Default)]
pub struct Triangulation {
    pub triangles: Vec<Triangle>,
}

/// Triangulates the given point set. `bounds` must enclose all points; it is
/// used to construct the initial super-triangle.
pub fn triangulate(points: &[Vector2<f32>], bounds: Rect<f32>) -> Triangulation {
    if points.len() < 3 {
        return Triangulation::default();
    }

    // Vertices of the enclosing super-triangle live past the real points.
    let super_base = points.len();
    let margin = (bounds.w() + bounds.h()).max(1.0);
    let super_vertices = [
        Vector2::new(bounds.position.x - margin, bounds.position.y - margin),
        Vector2::new(
            bounds.position.x + 2.0 * bounds.w() + 3.0 * margin,
            bounds.position.y - margin,
        ),
        Vector2::new(
            bounds.position.x - margin,
            bounds.position.y + 2.0 * bounds.h() + 3.0 * margin,
        ),
    ];

    let vertex = |index: usize| -> Vector2<f32> {
        if index < super_base {
            points[index]
        } else {
            super_vertices[index - super_base]
        }
    };

    let mut triangles: Vec<(Triangle, Circumcircle)> = Vec::with_capacity(points.len() * 2);
    triangles.push((
        Triangle {
            vertices: [super_base, super_base + 1, super_base + 2],
        },
        Circumcircle::of(super_vertices[0], super_vertices[1], super_vertices[2]),
    ));

    let mut polygon: Vec<(usize, usize)> = Vec::new();

    for (point_index, point) in points.iter().enumerate() {
        polygon.clear();

        // Collect the boundary of the cavity. Edges shared between two bad
        // triangles cancel each other and never reach the boundary set.
        let mut index = 0;
        while index < triangles.len() {
            if triangles[index].1.contains(*point) {
                let (bad, _) = triangles.swap_remove(index);
                for edge in bad.edges() {
                    if let Some(position) = polygon.iter().position(|e| *e == edge) {
                        polygon.swap_remove(position);
                    } else {
                        polygon.push(edge);
                    }
                }
            } else {
                index += 1;
            }
        }

        for (v0, v1) in polygon.iter().copied() {
            let triangle = Triangle {
                vertices: [v0, v1, point_index],
            };
            let circumcircle = Circumcircle::of(vertex(v0), vertex(v1), *point);
            triangles.push((triangle, circumcircle));
        }
    }

    Triangulation {
        triangles: triangles
            .into_iter()
            .map(|(t, _)| t)
            .filter(|t| t.vertices.iter().all(|v| *v < super_base))
            .collect(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn square_produces_two_triangles() {
        let points = [
            Vector2::new(0.0, 0.0),
            Vector2::new(10.0, 0.0),
            Vector2::new(10.0, 10.0),
            Vector2::new(0.0, 10.0),
        ];
        let result = triangulate(&points, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(result.triangles.len(), 2);

        // Both triangles together must reference every vertex.
        let mut seen = [false; 4];
        for triangle in &result.triangles {
            for v in triangle.vertices {
                seen[v] = true;
            }
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn triangulation_is_delaunay() {
        let points = [
            Vector2::new(0.0, 0.0),
            Vector2::new(8.0, 1.0),
            Vector2::new(4.0, 6.0),
            Vector2::new(9.0, 9.0),
            Vector2::new(1.0, 8.0),
        ];
        let result = triangulate(&points, Rect::new(0.0, 0.0, 9.0, 9.0));
        assert!(!result.triangles.is_empty());

        // No point may lie strictly inside any triangle's circumcircle.
        for triangle in &result.triangles {
            let [a, b, c] = triangle.vertices;
            let circle = Circumcircle::of(points[a], points[b], points[c]);
            for (i, p) in points.iter().enumerate() {
                if i != a && i != b && i != c {
                    assert!((p - circle.center).norm() >= circle.radius - 1e-3);
                }
            }
        }
    }

    #[test]
    fn too_few_points_yield_empty_result() {
        let points = [Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0)];
        let result = triangulate(&points, Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(result.triangles.is_empty());
    }
}
