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

//! The 2d camera: view center and size, zoom, dead-zone entity follow, and
//! time-bounded affectors for screen shake, smooth zoom and smooth movement.
//!
//! For parallax rendering the camera derives a per-layer view: the view
//! center is pulled towards the layer container's position by the layer's
//! render depth, so depth-1 layers track the camera exactly and smaller
//! depths scroll slower.

use crate::core::{
    algebra::Vector2,
    math::{lerpf, Rect},
    rand::{self, Rng},
    signal::Signal,
};

const DEFAULT_DEAD_ZONE_RADIUS: f32 = 50.0;
const DEFAULT_SCROLL_SPEED: f32 = 2.5;
/// Distance at which a dead-zone scroll snaps onto the target.
const SCROLL_LOCK: f32 = 1.0;

/// See module docs.
pub struct Camera {
    center: Vector2<f32>,
    default_size: Vector2<f32>,
    zoom: f32,
    /// Additional view offset written by screen shake.
    noise: Vector2<f32>,
    dead_zone_radius: f32,
    scroll_speed: f32,
    moving: bool,
    affectors: Vec<Box<dyn CameraAffector>>,
    pub view_center_changed: Signal<Vector2<f32>>,
    pub view_size_changed: Signal<Vector2<f32>>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vector2::new(800.0, 600.0))
    }
}

impl Camera {
    pub fn new(view_size: Vector2<f32>) -> Self {
        Self {
            center: Vector2::default(),
            default_size: view_size,
            zoom: 1.0,
            noise: Vector2::default(),
            dead_zone_radius: DEFAULT_DEAD_ZONE_RADIUS,
            scroll_speed: DEFAULT_SCROLL_SPEED,
            moving: false,
            affectors: Vec::new(),
            view_center_changed: Signal::new(),
            view_size_changed: Signal::new(),
        }
    }

    #[inline]
    pub fn center(&self) -> Vector2<f32> {
        self.center
    }

    /// Current view size: the window size scaled by zoom.
    #[inline]
    pub fn view_size(&self) -> Vector2<f32> {
        self.default_size.scale(self.zoom)
    }

    /// The world rect currently visible, including shake noise.
    pub fn view(&self) -> Rect<f32> {
        let size = self.view_size();
        Rect {
            position: self.center + self.noise - size.scale(0.5),
            size,
        }
    }

    /// The view of a parallax layer owned by a container at
    /// `container_position`: the view center moves towards the container by
    /// the layer depth, the size is unchanged.
    pub fn layer_view(&self, container_position: Vector2<f32>, render_depth: f32) -> Rect<f32> {
        let scaled_diff = (self.center - container_position).scale(render_depth);
        let center = container_position + scaled_diff + self.noise;
        let size = self.view_size();
        Rect {
            position: center - size.scale(0.5),
            size,
        }
    }

    /// Centers the view on the given position.
    pub fn look_at(&mut self, position: Vector2<f32>) {
        self.center = position;
        self.view_center_changed.emit(&self.center);
    }

    /// Translates the view center.
    pub fn translate(&mut self, offset: Vector2<f32>) {
        self.look_at(self.center + offset);
    }

    #[inline]
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.max(f32::EPSILON);
        self.view_size_changed.emit(&self.view_size());
    }

    /// Reacts to a window resize: the unzoomed view size changes, center and
    /// zoom stay.
    pub fn set_view_size(&mut self, view_size: Vector2<f32>) {
        self.default_size = view_size;
        self.view_size_changed.emit(&self.view_size());
    }

    pub fn set_dead_zone_radius(&mut self, radius: f32) {
        self.dead_zone_radius = radius.max(f32::EPSILON);
    }

    pub fn set_scroll_speed(&mut self, speed: f32) {
        self.scroll_speed = speed;
    }

    #[inline]
    pub fn noise(&self) -> Vector2<f32> {
        self.noise
    }

    pub fn set_noise(&mut self, noise: Vector2<f32>) {
        self.noise = noise;
    }

    /// Attaches a time-bounded affector.
    pub fn attach_affector(&mut self, mut affector: Box<dyn CameraAffector>) {
        affector.init(self);
        self.affectors.push(affector);
    }

    /// Advances affectors and the dead-zone follow of the locked target (its
    /// world center, when following an entity).
    pub fn update(&mut self, delta: f32, follow_target: Option<Vector2<f32>>) {
        let mut affectors = std::mem::take(&mut self.affectors);
        affectors.retain_mut(|affector| {
            if affector.advance(delta) {
                affector.update(self, delta);
                true
            } else {
                affector.stop(self);
                false
            }
        });
        // Keep affectors attached from within an affector update.
        affectors.append(&mut self.affectors);
        self.affectors = affectors;

        let Some(target) = follow_target else {
            return;
        };

        let distance = (target - self.center).norm();
        if !self.moving && distance > self.dead_zone_radius {
            self.moving = true;
        }
        if self.moving {
            // Move towards the target, slightly faster the greater the
            // distance.
            let multiplier = delta * self.scroll_speed;
            self.look_at(self.center + (target - self.center).scale(multiplier));
            if distance < SCROLL_LOCK {
                self.moving = false;
            }
        }
    }

    pub fn make_screen_shake(duration: f32, frequency: f32, amplitude: f32) -> Box<dyn CameraAffector> {
        Box::new(ScreenShake::new(duration, frequency, amplitude))
    }

    pub fn make_smooth_zoom(duration: f32, target_zoom: f32) -> Box<dyn CameraAffector> {
        Box::new(SmoothZoom::new(duration, target_zoom))
    }

    pub fn make_smooth_move(duration: f32, target: Vector2<f32>) -> Box<dyn CameraAffector> {
        Box::new(SmoothMove::new(duration, target))
    }
}

/// A time-bounded camera effect.
pub trait CameraAffector {
    /// Called when the affector is attached.
    fn init(&mut self, camera: &mut Camera);

    /// Advances the internal timer; returning false ends the affector.
    fn advance(&mut self, delta: f32) -> bool;

    fn update(&mut self, camera: &mut Camera, delta: f32);

    /// Called once when the affector expires, to restore camera state.
    fn stop(&mut self, camera: &mut Camera);
}

/// Damped-sinusoid screen shake: random noise samples at the given frequency,
/// linearly interpolated, with the amplitude falling off over the duration.
pub struct ScreenShake {
    duration: f32,
    frequency: f32,
    amplitude: f32,
    timer: f32,
    samples_x: Vec<f32>,
    samples_y: Vec<f32>,
    restore_noise: Vector2<f32>,
}

impl ScreenShake {
    fn new(duration: f32, frequency: f32, amplitude: f32) -> Self {
        Self {
            duration: duration.max(f32::EPSILON),
            frequency: frequency.max(f32::EPSILON),
            amplitude,
            timer: 0.0,
            samples_x: Vec::new(),
            samples_y: Vec::new(),
            restore_noise: Vector2::default(),
        }
    }
}

impl CameraAffector for ScreenShake {
    fn init(&mut self, camera: &mut Camera) {
        self.restore_noise = camera.noise();

        let sample_count = (self.duration * self.frequency).ceil() as usize + 2;
        let mut rng = rand::thread_rng();
        for _ in 0..sample_count {
            self.samples_x.push(rng.gen_range(-1.0..=1.0));
            self.samples_y.push(rng.gen_range(-1.0..=1.0));
        }
    }

    fn advance(&mut self, delta: f32) -> bool {
        self.timer += delta;
        self.timer <= self.duration
    }

    fn update(&mut self, camera: &mut Camera, _delta: f32) {
        let s = self.timer * self.frequency;
        let s0 = (s.floor() as usize).min(self.samples_x.len() - 2);
        let t = s - s0 as f32;

        let falloff = (self.duration - self.timer) / self.duration;
        let x = self.amplitude * lerpf(self.samples_x[s0], self.samples_x[s0 + 1], t) * falloff;
        let y = self.amplitude * lerpf(self.samples_y[s0], self.samples_y[s0 + 1], t) * falloff;
        camera.set_noise(Vector2::new(x, y));
    }

    fn stop(&mut self, camera: &mut Camera) {
        camera.set_noise(self.restore_noise);
    }
}

/// Interpolates the zoom level towards a target over a duration.
pub struct SmoothZoom {
    duration: f32,
    target_zoom: f32,
    original_zoom: f32,
    timer: f32,
}

impl SmoothZoom {
    fn new(duration: f32, target_zoom: f32) -> Self {
        Self {
            duration: duration.max(f32::EPSILON),
            target_zoom,
            original_zoom: 1.0,
            timer: 0.0,
        }
    }
}

impl CameraAffector for SmoothZoom {
    fn init(&mut self, camera: &mut Camera) {
        self.original_zoom = camera.zoom();
    }

    fn advance(&mut self, delta: f32) -> bool {
        self.timer += delta;
        self.timer <= self.duration
    }

    fn update(&mut self, camera: &mut Camera, _delta: f32) {
        let t = self.timer / self.duration;
        camera.set_zoom(lerpf(self.original_zoom, self.target_zoom, t));
    }

    fn stop(&mut self, camera: &mut Camera) {
        camera.set_zoom(self.target_zoom);
    }
}

/// Interpolates the view center towards a target over a duration, with
/// per-axis progress so diagonal moves stay straight.
pub struct SmoothMove {
    duration: f32,
    target: Vector2<f32>,
    origin: Vector2<f32>,
    timer: f32,
}

impl SmoothMove {
    fn new(duration: f32, target: Vector2<f32>) -> Self {
        Self {
            duration: duration.max(f32::EPSILON),
            target,
            origin: Vector2::default(),
            timer: 0.0,
        }
    }
}

impl CameraAffector for SmoothMove {
    fn init(&mut self, camera: &mut Camera) {
        self.origin = camera.center();
    }

    fn advance(&mut self, delta: f32) -> bool {
        self.timer += delta;
        self.timer <= self.duration
    }

    fn update(&mut self, camera: &mut Camera, _delta: f32) {
        let t = self.timer / self.duration;
        camera.look_at(Vector2::new(
            lerpf(self.origin.x, self.target.x, t),
            lerpf(self.origin.y, self.target.y, t),
        ));
    }

    fn stop(&mut self, camera: &mut Camera) {
        camera.look_at(self.target);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layer_view_applies_parallax_depth() {
        let mut camera = Camera::new(Vector2::new(100.0, 100.0));
        camera.look_at(Vector2::new(200.0, 0.0));

        let container = Vector2::new(0.0, 0.0);

        // Depth 1 tracks the camera exactly.
        let near = camera.layer_view(container, 1.0);
        assert_eq!(near.center(), Vector2::new(200.0, 0.0));

        // Depth 0.5 scrolls at half speed.
        let far = camera.layer_view(container, 0.5);
        assert_eq!(far.center(), Vector2::new(100.0, 0.0));

        // View size is unaffected by depth.
        assert_eq!(near.size, far.size);
    }

    #[test]
    fn zoom_scales_view_size() {
        let mut camera = Camera::new(Vector2::new(100.0, 50.0));
        camera.set_zoom(2.0);
        assert_eq!(camera.view_size(), Vector2::new(200.0, 100.0));
    }

    #[test]
    fn dead_zone_follow_only_moves_outside_radius() {
        let mut camera = Camera::new(Vector2::new(100.0, 100.0));
        camera.set_dead_zone_radius(50.0);

        // Target inside the dead zone: no movement.
        camera.update(0.016, Some(Vector2::new(10.0, 0.0)));
        assert_eq!(camera.center(), Vector2::default());

        // Target outside: the camera starts scrolling towards it.
        camera.update(0.016, Some(Vector2::new(100.0, 0.0)));
        assert!(camera.center().x > 0.0);
        assert!(camera.center().x < 100.0);
    }

    #[test]
    fn screen_shake_restores_noise_when_done() {
        let mut camera = Camera::new(Vector2::new(100.0, 100.0));
        camera.attach_affector(Camera::make_screen_shake(0.1, 30.0, 5.0));

        let mut shaken = false;
        for _ in 0..20 {
            camera.update(0.016, None);
            if camera.noise() != Vector2::default() {
                shaken = true;
            }
        }
        assert!(shaken);
        assert_eq!(camera.noise(), Vector2::default());
    }

    #[test]
    fn smooth_zoom_converges_to_target() {
        let mut camera = Camera::new(Vector2::new(100.0, 100.0));
        camera.attach_affector(Camera::make_smooth_zoom(0.1, 3.0));
        for _ in 0..20 {
            camera.update(0.016, None);
        }
        assert!((camera.zoom() - 3.0).abs() < 1e-5);
    }
}
