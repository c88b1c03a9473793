// Clippy complains about normal mathematical symbols like A, B, C for quadratic equation.
#![allow(clippy::many_single_char_names)]

pub mod delaunay;
pub mod rect;
pub mod sat;
pub mod segment;

use nalgebra::Vector2;

pub use rect::Rect;

/// An epsilon below which a vector is considered to have no direction.
pub const DIRECTION_EPSILON: f32 = f32::EPSILON;

#[inline]
pub fn lerpf(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    let two_pi = 2.0 * std::f32::consts::PI;

    if angle > 0.0 {
        angle % two_pi
    } else {
        (angle + two_pi) % two_pi
    }
}

/// Returns the vector perpendicular to `v`, rotated 90 degrees counter-clockwise
/// in a y-down coordinate system.
#[inline]
pub fn perpendicular(v: Vector2<f32>) -> Vector2<f32> {
    Vector2::new(-v.y, v.x)
}

/// Normalizes the vector, or returns a zero vector if its length is negligible.
#[inline]
pub fn normalize_or_zero(v: Vector2<f32>) -> Vector2<f32> {
    v.try_normalize(DIRECTION_EPSILON).unwrap_or_default()
}

/// Caps the magnitude of the vector at `max_magnitude`, preserving direction.
#[inline]
pub fn truncate(v: Vector2<f32>, max_magnitude: f32) -> Vector2<f32> {
    let magnitude = v.norm();
    if magnitude > max_magnitude && magnitude > DIRECTION_EPSILON {
        v * (max_magnitude / magnitude)
    } else {
        v
    }
}

/// Rotates the vector by the given angle in radians.
#[inline]
pub fn rotate_vector(v: Vector2<f32>, angle: f32) -> Vector2<f32> {
    let (sin, cos) = angle.sin_cos();
    Vector2::new(v.x * cos - v.y * sin, v.x * sin + v.y * cos)
}

/// Rotates `point` around `pivot` by the given angle in radians.
#[inline]
pub fn rotate_around(point: Vector2<f32>, pivot: Vector2<f32>, angle: f32) -> Vector2<f32> {
    pivot + rotate_vector(point - pivot, angle)
}

#[inline]
pub fn get_signed_triangle_area(v1: Vector2<f32>, v2: Vector2<f32>, v3: Vector2<f32>) -> f32 {
    0.5 * (v1.x * (v3.y - v2.y) + v2.x * (v1.y - v3.y) + v3.x * (v2.y - v1.y))
}

#[inline]
pub fn is_point_inside_triangle(
    point: Vector2<f32>,
    pt_a: Vector2<f32>,
    pt_b: Vector2<f32>,
    pt_c: Vector2<f32>,
) -> bool {
    let ba = pt_b - pt_a;
    let ca = pt_c - pt_a;

    let vp = point - pt_a;

    let ba_dot_ba = ba.dot(&ba);
    let ca_dot_ba = ca.dot(&ba);
    let ca_dot_ca = ca.dot(&ca);

    let dot_02 = ca.dot(&vp);
    let dot_12 = ba.dot(&vp);

    let inv_denom = 1.0 / (ca_dot_ca * ba_dot_ba - ca_dot_ba.powi(2));

    // Calculate barycentric coordinates.
    let u = (ba_dot_ba * dot_02 - ca_dot_ba * dot_12) * inv_denom;
    let v = (ca_dot_ca * dot_12 - ca_dot_ba * dot_02) * inv_denom;

    (u >= 0.0) && (v >= 0.0) && (u + v < 1.0)
}

/// Returns true if `point` lies on the same side of the directed line `a -> b`
/// as the interior of a counter-clockwise polygon would.
#[inline]
pub fn same_side(point: Vector2<f32>, a: Vector2<f32>, b: Vector2<f32>, reference: Vector2<f32>) -> bool {
    let edge = b - a;
    let cross_point = edge.x * (point.y - a.y) - edge.y * (point.x - a.x);
    let cross_reference = edge.x * (reference.y - a.y) - edge.y * (reference.x - a.x);
    cross_point * cross_reference >= 0.0
}

/// Centroid of an arbitrary simple polygon via the shoelace formula. Falls back
/// to the point average for degenerate inputs.
pub fn polygon_centroid(points: &[Vector2<f32>]) -> Vector2<f32> {
    match points.len() {
        0 => Vector2::default(),
        1 => points[0],
        2 => (points[0] + points[1]).scale(0.5),
        _ => {
            let mut area = 0.0f32;
            let mut center = Vector2::default();
            for (i, current) in points.iter().enumerate() {
                let next = points[(i + 1) % points.len()];
                let area_diff = current.x * next.y - current.y * next.x;
                area += area_diff;
                center.x += (current.x + next.x) * area_diff;
                center.y += (current.y + next.y) * area_diff;
            }
            area /= 2.0;
            if area.abs() <= f32::EPSILON {
                let sum = points.iter().fold(Vector2::default(), |acc, p| acc + p);
                return sum.scale(1.0 / points.len() as f32);
            }
            center.scale(1.0 / (6.0 * area))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn truncate_caps_magnitude() {
        let v = truncate(Vector2::new(3.0, 4.0), 1.0);
        assert!((v.norm() - 1.0).abs() < 1e-5);
        assert!(v.x > 0.0 && v.y > 0.0);

        let short = Vector2::new(0.3, 0.4);
        assert_eq!(truncate(short, 1.0), short);
    }

    #[test]
    fn perpendicular_is_orthogonal() {
        let v = Vector2::new(2.5, -1.0);
        assert_eq!(perpendicular(v).dot(&v), 0.0);
    }

    #[test]
    fn centroid_of_square() {
        let points = [
            Vector2::new(0.0, 0.0),
            Vector2::new(2.0, 0.0),
            Vector2::new(2.0, 2.0),
            Vector2::new(0.0, 2.0),
        ];
        let c = polygon_centroid(&points);
        assert!((c.x - 1.0).abs() < 1e-5 && (c.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn point_in_triangle() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(4.0, 0.0);
        let c = Vector2::new(0.0, 4.0);
        assert!(is_point_inside_triangle(Vector2::new(1.0, 1.0), a, b, c));
        assert!(!is_point_inside_triangle(Vector2::new(3.0, 3.0), a, b, c));
    }
}
