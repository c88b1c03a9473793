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

//! Per-frame light composition.
//!
//! Lighting uses four auxiliary render targets. Each frame the composition
//! target is cleared to the ambient color; every visible light renders its
//! sprite into the light target, attenuates it with the penumbra wedges of
//! nearby occluders, renders re-emerging antumbra light, and is then
//! additively blended into the composition, which finally multiplies over the
//! scene. This module produces that sequence as data; a graphics backend
//! executes it with the configured shaders.

use super::penumbra::{shadow_geometry, ShadowGeometry};
use super::{LightCollider, PointLight};
use crate::{
    core::{algebra::Vector2, color::Color, math::Rect},
    scene::transform::TransformComponent,
};

/// The auxiliary render targets of the lighting pass.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LightTarget {
    Light,
    Emission,
    Antumbra,
    Composition,
}

/// One light ready for rendering, with the shadow geometry of every occluder
/// that intersects its reach.
#[derive(Clone, Debug)]
pub struct LightDraw {
    pub center: Vector2<f32>,
    pub bounds: Rect<f32>,
    pub color: Color,
    pub radius: f32,
    pub shadows: Vec<ShadowGeometry>,
    /// Occluder outlines that stay lit themselves (light-over-shape).
    pub lit_shapes: Vec<Vec<Vector2<f32>>>,
}

/// The ordered lighting work of one frame.
#[derive(Clone, Debug, Default)]
pub struct LightFrame {
    /// Color the composition target is cleared to.
    pub ambient: Color,
    /// Lights in render order; each is additively blended into the
    /// composition after its shadow passes.
    pub lights: Vec<LightDraw>,
}

/// Builds the draw data of one light against the active occluders near it.
/// Occluders whose bounding box does not intersect the light's are skipped.
pub fn build_light_draw(
    light: &PointLight,
    light_transform: &TransformComponent,
    occluders: &[(&LightCollider, &TransformComponent)],
) -> LightDraw {
    let bounds = light.bounding_box(light_transform);
    let center = light.cast_center(light_transform);

    let mut shadows = Vec::new();
    let mut lit_shapes = Vec::new();
    for (collider, collider_transform) in occluders {
        if !collider.is_active() {
            continue;
        }
        if !collider.bounding_box(collider_transform).intersects(bounds) {
            continue;
        }

        let points = collider.world_points(collider_transform);
        let geometry = shadow_geometry(
            center,
            light.radius(),
            light.shadow_extend_multiplier(),
            &points,
        );
        if !geometry.is_empty() {
            if collider.light_over_shape() {
                lit_shapes.push(points);
            }
            shadows.push(geometry);
        }
    }

    LightDraw {
        center,
        bounds,
        color: light.color(),
        radius: light.radius(),
        shadows,
        lit_shapes,
    }
}

/// Ambient light with smooth interpolation. Interpolation speed is expressed
/// the way the handlers consume it: each update moves every channel by
/// `difference / strength`, with the fractional remainder carried between
/// frames so slow fades still make progress on 8-bit channels.
#[derive(Clone, Debug)]
pub struct AmbientLight {
    color: Color,
    carry: Vector2<f32>,
    carry_b: f32,
}

impl Default for AmbientLight {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            carry: Vector2::default(),
            carry_b: 0.0,
        }
    }
}

impl AmbientLight {
    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
        self.carry = Vector2::default();
        self.carry_b = 0.0;
    }

    /// Advances the ambient color one step towards the target.
    pub fn interpolate(&mut self, target: Color, strength: f32) {
        let strength = strength.max(1.0);

        let (r, carry_r) = step_channel(self.color.r, target.r, self.carry.x, strength);
        let (g, carry_g) = step_channel(self.color.g, target.g, self.carry.y, strength);
        let (b, carry_b) = step_channel(self.color.b, target.b, self.carry_b, strength);

        self.color.r = r;
        self.color.g = g;
        self.color.b = b;
        self.carry = Vector2::new(carry_r, carry_g);
        self.carry_b = carry_b;
    }
}

fn step_channel(current: u8, target: u8, mut carry: f32, strength: f32) -> (u8, f32) {
    let mut value = current;
    carry += (target as f32 - current as f32) / strength;
    if carry > 1.0 {
        carry -= 1.0;
        value = value.saturating_add(1);
    } else if carry < -1.0 {
        carry += 1.0;
        value = value.saturating_sub(1);
    }
    (value, carry)
}

/// See module docs.
#[derive(Clone, Debug, Default)]
pub struct LightPipeline {
    pub ambient: AmbientLight,
}

impl LightPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the lighting work of a new frame: the composition target is
    /// cleared to the current ambient color.
    pub fn begin_frame(&self) -> LightFrame {
        LightFrame {
            ambient: self.ambient.color(),
            lights: Vec::new(),
        }
    }

    /// See [`AmbientLight::interpolate`].
    pub fn interpolate_ambient_light(&mut self, target: Color, strength: f32) {
        self.ambient.interpolate(target, strength);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ambient_reaches_target_within_expected_frames() {
        let mut ambient = AmbientLight::default();
        ambient.set_color(Color::opaque(0, 0, 0));

        let strength = 4.0;
        let target = Color::opaque(255, 255, 255);
        // Each channel needs to climb 255 steps at ~1/strength per frame.
        let frame_budget = (256.0 * strength) as usize;

        let mut frames = 0;
        while ambient.color() != target {
            ambient.interpolate(target, strength);
            frames += 1;
            assert!(frames <= frame_budget, "interpolation failed to converge");
        }
        assert!(frames > 0);
    }

    #[test]
    fn interpolation_carries_fractions_for_slow_fades() {
        let mut ambient = AmbientLight::default();
        ambient.set_color(Color::opaque(0, 0, 0));

        // A single step at strength 100 moves less than one channel unit, so
        // nothing changes yet.
        let target = Color::opaque(50, 50, 50);
        ambient.interpolate(target, 100.0);
        assert_eq!(ambient.color(), Color::opaque(0, 0, 0));

        // After enough steps the carry spills over.
        for _ in 0..100 {
            ambient.interpolate(target, 100.0);
        }
        assert!(ambient.color().r > 0);
    }

    #[test]
    fn light_draw_skips_far_occluders() {
        let light = PointLight::default();
        let light_transform = TransformComponent::default();

        let near = LightCollider::new(vec![
            Vector2::new(4.0, -2.0),
            Vector2::new(8.0, -2.0),
            Vector2::new(8.0, 2.0),
            Vector2::new(4.0, 2.0),
        ]);
        let far = LightCollider::new(vec![
            Vector2::new(500.0, 500.0),
            Vector2::new(510.0, 500.0),
            Vector2::new(510.0, 510.0),
            Vector2::new(500.0, 510.0),
        ]);
        let transform = TransformComponent::default();

        let draw = build_light_draw(
            &light,
            &light_transform,
            &[(&near, &transform), (&far, &transform)],
        );
        assert_eq!(draw.shadows.len(), 1);
    }

    #[test]
    fn inactive_occluders_cast_nothing() {
        let light = PointLight::default();
        let transform = TransformComponent::default();

        let mut collider = LightCollider::new(vec![
            Vector2::new(4.0, -2.0),
            Vector2::new(8.0, -2.0),
            Vector2::new(8.0, 2.0),
            Vector2::new(4.0, 2.0),
        ]);
        collider.set_active(false);

        let draw = build_light_draw(&light, &transform, &[(&collider, &transform)]);
        assert!(draw.shadows.is_empty());
    }
}
