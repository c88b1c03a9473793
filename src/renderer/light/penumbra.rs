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

//! Soft-shadow geometry of one light against one convex occluder.
//!
//! The light is a disk, not a point, so the shadow of an occluder splits into
//! the umbra (no part of the disk visible), two penumbra wedges at the
//! silhouette vertices (the disk partially visible, brightness fades linearly
//! across the wedge) and, for occluders smaller than the disk, an antumbra
//! behind the point where the umbra pinches off and light re-emerges.

use crate::core::{
    algebra::Vector2,
    math::{normalize_or_zero, perpendicular, polygon_centroid},
};

/// A penumbra wedge rooted at a silhouette vertex. Brightness fades linearly
/// from `light_brightness` at the light edge to `dark_brightness` at the dark
/// edge; the shader renders the wedge as a quad extended along both edges.
#[derive(Clone, Debug, PartialEq)]
pub struct Penumbra {
    /// Silhouette vertex the wedge is rooted at.
    pub source: Vector2<f32>,
    /// Unit direction of the fully lit boundary of the wedge.
    pub light_edge: Vector2<f32>,
    /// Unit direction of the fully shadowed boundary of the wedge.
    pub dark_edge: Vector2<f32>,
    pub light_brightness: f32,
    pub dark_brightness: f32,
    /// Distance from the light center to the silhouette vertex.
    pub distance: f32,
}

/// Umbra region behind the occluder, as a quad: the two silhouette vertices
/// and their dark edges extended outwards.
#[derive(Clone, Debug, PartialEq)]
pub struct UmbraQuad {
    pub near: [Vector2<f32>; 2],
    pub far: [Vector2<f32>; 2],
}

/// Region behind a small occluder where the umbra has pinched off and light
/// from both sides of the disk re-emerges.
#[derive(Clone, Debug, PartialEq)]
pub struct Antumbra {
    /// Point where the two dark edges cross.
    pub apex: Vector2<f32>,
    /// Distance from the light center to the apex.
    pub distance: f32,
}

/// Complete shadow geometry of one light/occluder pair.
#[derive(Clone, Debug, Default)]
pub struct ShadowGeometry {
    pub penumbras: Vec<Penumbra>,
    pub umbra: Option<UmbraQuad>,
    pub antumbra: Option<Antumbra>,
}

impl ShadowGeometry {
    pub fn is_empty(&self) -> bool {
        self.penumbras.is_empty() && self.umbra.is_none()
    }
}

/// Computes the shadow geometry cast by a convex occluder (counter-clockwise
/// points in world coordinates) lit by a disk light at `source` with the given
/// radius. `shadow_extend` stretches the produced edges past the occluder.
pub fn shadow_geometry(
    source: Vector2<f32>,
    radius: f32,
    shadow_extend: f32,
    occluder: &[Vector2<f32>],
) -> ShadowGeometry {
    if occluder.len() < 2 {
        return ShadowGeometry::default();
    }

    let centroid = polygon_centroid(occluder);

    // Classify each edge: front-facing edges see the light.
    let front: Vec<bool> = occluder
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let next = occluder[(i + 1) % occluder.len()];
            let normal = perpendicular(next - point);
            normal.dot(&(source - point)) > 0.0
        })
        .collect();

    // Silhouette vertices sit where the facing flips between the incoming and
    // the outgoing edge. A convex occluder with the light outside has two.
    let mut silhouette = Vec::new();
    for i in 0..occluder.len() {
        let prev = (i + occluder.len() - 1) % occluder.len();
        if front[prev] != front[i] {
            silhouette.push(occluder[i]);
        }
    }
    if silhouette.len() != 2 {
        // The light is inside the occluder (or the shape is degenerate);
        // there is no meaningful silhouette to build wedges from.
        return ShadowGeometry::default();
    }

    let mut geometry = ShadowGeometry::default();
    let mut dark_rays = Vec::with_capacity(2);

    for vertex in silhouette {
        let to_vertex = vertex - source;
        let distance = to_vertex.norm();
        if distance <= f32::EPSILON {
            continue;
        }

        // Offset on the light disk pointing towards the occluder body; the
        // ray from there past the vertex bounds the fully lit region, the ray
        // from the opposite disk edge bounds the full shadow.
        let side = perpendicular(normalize_or_zero(to_vertex));
        let towards_center = if side.dot(&(centroid - vertex)) >= 0.0 {
            side * radius
        } else {
            -side * radius
        };

        let light_edge = normalize_or_zero(vertex - (source + towards_center));
        let dark_edge = normalize_or_zero(vertex - (source - towards_center));

        dark_rays.push((vertex, dark_edge));
        geometry.penumbras.push(Penumbra {
            source: vertex,
            light_edge,
            dark_edge,
            light_brightness: 1.0,
            dark_brightness: 0.0,
            distance,
        });
    }

    if let [(near_a, dark_a), (near_b, dark_b)] = dark_rays[..] {
        let reach = shadow_extend * (radius + (centroid - source).norm());
        geometry.umbra = Some(UmbraQuad {
            near: [near_a, near_b],
            far: [near_a + dark_a * reach, near_b + dark_b * reach],
        });

        // The umbra pinches off where the dark edges cross; past that point
        // light from both sides of the disk re-emerges.
        if let Some(t) = ray_intersection(near_a, dark_a, near_b, dark_b) {
            let apex = near_a + dark_a * t;
            if t < reach {
                geometry.antumbra = Some(Antumbra {
                    distance: (apex - source).norm(),
                    apex,
                });
            }
        }
    }

    geometry
}

/// Parameter `t` along the first ray at which it crosses the second, if both
/// parameters are positive.
fn ray_intersection(
    origin_a: Vector2<f32>,
    direction_a: Vector2<f32>,
    origin_b: Vector2<f32>,
    direction_b: Vector2<f32>,
) -> Option<f32> {
    let denominator = direction_a.x * (-direction_b.y) - direction_a.y * (-direction_b.x);
    if denominator.abs() <= f32::EPSILON {
        return None;
    }
    let delta = origin_b - origin_a;
    let t = (delta.x * (-direction_b.y) - delta.y * (-direction_b.x)) / denominator;
    let u = (direction_a.x * delta.y - direction_a.y * delta.x) / denominator;
    (t > 0.0 && u > 0.0).then_some(t)
}

#[cfg(test)]
mod test {
    use super::*;

    fn square(x: f32, y: f32, side: f32) -> Vec<Vector2<f32>> {
        vec![
            Vector2::new(x, y),
            Vector2::new(x + side, y),
            Vector2::new(x + side, y + side),
            Vector2::new(x, y + side),
        ]
    }

    #[test]
    fn occluder_casts_two_penumbras_and_an_umbra() {
        let geometry = shadow_geometry(
            Vector2::new(0.0, 50.0),
            5.0,
            1.4,
            &square(40.0, 40.0, 20.0),
        );

        assert_eq!(geometry.penumbras.len(), 2);
        assert!(geometry.umbra.is_some());
        for penumbra in &geometry.penumbras {
            assert_eq!(penumbra.light_brightness, 1.0);
            assert_eq!(penumbra.dark_brightness, 0.0);
            assert!(penumbra.distance > 0.0);
            // Both edges point away from the light.
            assert!(penumbra.light_edge.x > 0.0);
            assert!(penumbra.dark_edge.x > 0.0);
        }
    }

    #[test]
    fn small_occluder_produces_antumbra() {
        let geometry = shadow_geometry(
            Vector2::new(0.0, 50.0),
            20.0,
            2.0,
            &square(60.0, 48.0, 4.0),
        );
        let antumbra = geometry.antumbra.expect("dark edges must converge");
        assert!(antumbra.apex.x > 60.0);
        assert!(antumbra.distance > 60.0);
    }

    #[test]
    fn large_occluder_has_no_antumbra() {
        let geometry = shadow_geometry(
            Vector2::new(0.0, 50.0),
            2.0,
            1.4,
            &square(30.0, 10.0, 80.0),
        );
        assert!(geometry.umbra.is_some());
        assert!(geometry.antumbra.is_none());
    }

    #[test]
    fn light_inside_occluder_casts_nothing() {
        let geometry = shadow_geometry(
            Vector2::new(50.0, 50.0),
            5.0,
            1.4,
            &square(40.0, 40.0, 20.0),
        );
        assert!(geometry.is_empty());
    }

    #[test]
    fn penumbra_wedge_widens_with_light_radius() {
        let narrow = shadow_geometry(
            Vector2::new(0.0, 50.0),
            1.0,
            1.4,
            &square(40.0, 40.0, 20.0),
        );
        let wide = shadow_geometry(
            Vector2::new(0.0, 50.0),
            10.0,
            1.4,
            &square(40.0, 40.0, 20.0),
        );

        let wedge = |geometry: &ShadowGeometry| {
            let p = &geometry.penumbras[0];
            p.light_edge.dot(&p.dark_edge)
        };
        // A smaller dot product means a wider angle between the edges.
        assert!(wedge(&wide) < wedge(&narrow));
    }
}
