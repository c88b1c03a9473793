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

//! Point lights, light colliders and per-entity light effects.

pub mod penumbra;
pub mod pipeline;

use crate::{
    core::{
        algebra::Vector2,
        color::Color,
        math::Rect,
        rand::{self, Rng},
    },
    resource::Texture,
    scene::transform::TransformComponent,
};
use vesper_resource::Asset;

/// Default radius of the emitting disk of a point light.
pub const DEFAULT_RADIUS: f32 = 10.0;
/// Default factor by which shadows extend past the edges of light colliders.
pub const DEFAULT_SHADOW_EXTEND_MULTIPLIER: f32 = 1.4;

/// A light source emitting from a point with a disk radius; shadows cast
/// against light colliders get natural penumbras and antumbras.
#[derive(Clone, Debug)]
pub struct PointLight {
    active: bool,
    color: Color,
    /// Origin of the cast in local coordinates.
    source_point: Vector2<f32>,
    scale: Vector2<f32>,
    radius: f32,
    shadow_extend_multiplier: f32,
    texture: Option<Asset<Texture>>,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            active: true,
            color: Color::WHITE,
            source_point: Vector2::default(),
            scale: Vector2::new(1.0, 1.0),
            radius: DEFAULT_RADIUS,
            shadow_extend_multiplier: DEFAULT_SHADOW_EXTEND_MULTIPLIER,
            texture: None,
        }
    }
}

impl PointLight {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn toggle_active(&mut self) {
        self.active = !self.active;
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }

    #[inline]
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    #[inline]
    pub fn source_point(&self) -> Vector2<f32> {
        self.source_point
    }

    #[inline]
    pub fn set_source_point(&mut self, source: Vector2<f32>) {
        self.source_point = source;
    }

    #[inline]
    pub fn scale(&self) -> Vector2<f32> {
        self.scale
    }

    #[inline]
    pub fn set_scale(&mut self, scale: Vector2<f32>) {
        self.scale = scale;
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius;
    }

    #[inline]
    pub fn shadow_extend_multiplier(&self) -> f32 {
        self.shadow_extend_multiplier
    }

    #[inline]
    pub fn set_shadow_extend_multiplier(&mut self, multiplier: f32) {
        self.shadow_extend_multiplier = multiplier;
    }

    #[inline]
    pub fn texture(&self) -> Option<&Asset<Texture>> {
        self.texture.as_ref()
    }

    pub fn set_texture(&mut self, texture: Asset<Texture>) {
        self.texture = Some(texture);
    }

    /// The transformed source point of the light.
    pub fn cast_center(&self, transform: &TransformComponent) -> Vector2<f32> {
        transform.transform_point(self.source_point)
    }

    /// World-space area the light can reach, derived from the texture size
    /// scaled by the light and entity scale.
    pub fn bounding_box(&self, transform: &TransformComponent) -> Rect<f32> {
        let texture_size = self
            .texture
            .as_ref()
            .map(|texture| texture.get().size())
            .unwrap_or_else(|| Vector2::new(2.0 * self.radius, 2.0 * self.radius));
        let size = Vector2::new(
            texture_size.x * self.scale.x * transform.scale().x,
            texture_size.y * self.scale.y * transform.scale().y,
        );
        let center = self.cast_center(transform);
        Rect {
            position: center - size.scale(0.5),
            size,
        }
    }
}

/// A convex occluder for lights; causes the casting of shadows.
#[derive(Clone, Debug, Default)]
pub struct LightCollider {
    points: Vec<Vector2<f32>>,
    active: bool,
    /// If set, the shape itself stays lit and only the space behind it
    /// darkens.
    light_over_shape: bool,
}

impl LightCollider {
    pub fn new(points: Vec<Vector2<f32>>) -> Self {
        Self {
            points,
            active: true,
            light_over_shape: false,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[inline]
    pub fn light_over_shape(&self) -> bool {
        self.light_over_shape
    }

    #[inline]
    pub fn set_light_over_shape(&mut self, light_over_shape: bool) {
        self.light_over_shape = light_over_shape;
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn set_point(&mut self, index: usize, point: Vector2<f32>) {
        if let Some(slot) = self.points.get_mut(index) {
            *slot = point;
        }
    }

    pub fn set_points(&mut self, points: Vec<Vector2<f32>>) {
        self.points = points;
    }

    #[inline]
    pub fn points(&self) -> &[Vector2<f32>] {
        &self.points
    }

    /// Occluder points in layer coordinates.
    pub fn world_points(&self, transform: &TransformComponent) -> Vec<Vector2<f32>> {
        self.points
            .iter()
            .map(|point| transform.transform_point(*point))
            .collect()
    }

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
}

/// Entity component holding exactly one point light.
#[derive(Clone, Debug, Default)]
pub struct LightEmitterComponent {
    pub light: PointLight,
}

/// Entity component that blocks light and casts shadows.
#[derive(Clone, Debug, Default)]
pub struct ShadowEmitterComponent {
    pub collider: LightCollider,
}

/// A per-entity effect applied to the entity's light every frame.
pub struct LightAffectorComponent {
    active: bool,
    effect: Box<dyn LightEffect>,
}

impl LightAffectorComponent {
    pub fn new(effect: Box<dyn LightEffect>) -> Self {
        Self {
            active: true,
            effect,
        }
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn apply(&mut self, delta: f32, light: &mut PointLight) {
        if self.active {
            self.effect.update(delta, light);
        }
    }
}

impl std::fmt::Debug for LightAffectorComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightAffectorComponent")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// An effect mutating a light over time, for example flicker.
pub trait LightEffect {
    fn update(&mut self, delta: f32, light: &mut PointLight);
}

/// Continuous flicker: the light scale oscillates between its original value
/// and `1 - strength` of it with the given period (in seconds). The bounding
/// box never grows beyond the original state, so the quadtree does not have
/// to be updated while flickering.
pub struct LightFlickering {
    direction: bool,
    period: f32,
    strength: f32,
    timer: f32,
    base_scale: Option<Vector2<f32>>,
}

impl LightFlickering {
    pub fn new(period: f32, strength: f32) -> Self {
        Self {
            direction: true,
            period: period.max(f32::EPSILON),
            strength: strength.clamp(0.0, 1.0),
            timer: 0.0,
            base_scale: None,
        }
    }
}

impl LightEffect for LightFlickering {
    fn update(&mut self, delta: f32, light: &mut PointLight) {
        let base = *self.base_scale.get_or_insert_with(|| light.scale());
        self.timer += delta;
        while self.timer >= self.period {
            self.timer -= self.period;
            self.direction = !self.direction;
        }

        let phase = self.timer / self.period;
        let dim = if self.direction { phase } else { 1.0 - phase };
        let factor = 1.0 - self.strength * dim;
        light.set_scale(base.scale(factor));
    }
}

/// Flicker with a period resampled randomly each cycle.
pub struct RandomizedFlickering {
    inner: LightFlickering,
    base_period: f32,
}

impl RandomizedFlickering {
    pub fn new(period: f32, strength: f32) -> Self {
        Self {
            inner: LightFlickering::new(period, strength),
            base_period: period.max(f32::EPSILON),
        }
    }
}

impl LightEffect for RandomizedFlickering {
    fn update(&mut self, delta: f32, light: &mut PointLight) {
        let before = self.inner.direction;
        self.inner.update(delta, light);
        if self.inner.direction != before {
            // A new half-cycle started, roll a fresh period around the base.
            self.inner.period = rand::thread_rng()
                .gen_range(0.5 * self.base_period..=1.5 * self.base_period);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flickering_never_grows_the_light() {
        let mut light = PointLight::default();
        light.set_scale(Vector2::new(2.0, 2.0));

        let mut flicker = LightFlickering::new(0.5, 0.3);
        for _ in 0..100 {
            flicker.update(0.016, &mut light);
            assert!(light.scale().x <= 2.0 + 1e-5);
            assert!(light.scale().x >= 2.0 * 0.7 - 1e-5);
        }
    }

    #[test]
    fn affector_respects_active_flag() {
        let mut light = PointLight::default();
        let original = light.scale();

        let mut affector =
            LightAffectorComponent::new(Box::new(LightFlickering::new(0.1, 0.5)));
        affector.set_active(false);
        affector.apply(0.3, &mut light);
        assert_eq!(light.scale(), original);
    }

    #[test]
    fn bounding_box_is_centered_on_cast_center() {
        let light = PointLight::default();
        let transform = TransformComponent::default();
        let bounds = light.bounding_box(&transform);
        let center = bounds.center();
        let cast = light.cast_center(&transform);
        assert!((center.x - cast.x).abs() < 1e-5);
        assert!((center.y - cast.y).abs() < 1e-5);
    }
}
