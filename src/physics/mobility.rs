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

//! Steering-behavior style movement.
//!
//! A mobility unit accumulates steering forces into its acceleration vector
//! over the frame. [`mobilize`] then caps the acceleration at the maximum
//! force, integrates it into the velocity, caps the velocity at the maximum
//! speed and zeroes the acceleration for the next frame.

use crate::core::{
    algebra::Vector2,
    math::{normalize_or_zero, truncate},
    rand::{self, Rng},
};

/// Velocities below this magnitude snap to zero.
pub const VELOCITY_EPSILON: f32 = 0.1;

/// Velocity and per-frame accumulated acceleration of a moving entity.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MobilityUnit {
    pub velocity: Vector2<f32>,
    pub acceleration: Vector2<f32>,
}

/// Adds a steering force along `direction` scaled by `speed`.
#[inline]
pub fn accelerate(unit: &mut MobilityUnit, direction: Vector2<f32>, speed: f32) {
    unit.acceleration += direction * speed;
}

/// Drops all motion immediately.
pub fn stop(unit: &mut MobilityUnit) {
    unit.velocity = Vector2::default();
    reset_acceleration(unit);
}

pub fn is_moving(unit: &MobilityUnit) -> bool {
    unit.velocity.x != 0.0 || unit.velocity.y != 0.0
}

/// Steers with full speed towards the target.
pub fn seek(
    unit: &mut MobilityUnit,
    current_position: Vector2<f32>,
    target_position: Vector2<f32>,
    speed: f32,
) {
    let desired = normalize_or_zero(target_position - current_position);
    accelerate(unit, desired, speed);
}

/// Steers with full speed away from the target.
pub fn flee(
    unit: &mut MobilityUnit,
    current_position: Vector2<f32>,
    target_position: Vector2<f32>,
    speed: f32,
) {
    let desired = normalize_or_zero(current_position - target_position);
    accelerate(unit, desired, speed);
}

/// Steers towards the target, slowing down quadratically once within the
/// given radius.
pub fn arrival(
    unit: &mut MobilityUnit,
    current_position: Vector2<f32>,
    target_position: Vector2<f32>,
    speed: f32,
    radius: f32,
) {
    let to_target = target_position - current_position;
    let magnitude = to_target.norm();
    if magnitude != 0.0 {
        let mut desired = to_target.scale(1.0 / magnitude);
        if magnitude <= radius {
            let slow = magnitude / radius;
            desired = desired * slow * slow;
        }
        accelerate(unit, desired, speed);
    }
}

/// Chases a moving prey by steering towards its predicted future position.
#[allow(clippy::too_many_arguments)]
pub fn pursuit(
    unit: &mut MobilityUnit,
    prey: &MobilityUnit,
    current_position: Vector2<f32>,
    target_position: Vector2<f32>,
    target_max_velocity: f32,
    speed: f32,
    radius: f32,
    damp: f32,
) {
    let distance = (target_position - current_position).norm();
    let estimated =
        target_position + prey.velocity.scale(damp * (distance / target_max_velocity));
    arrival(unit, current_position, estimated, speed, radius);
}

/// Flees from a pursuer's predicted position, but only while it is within the
/// evade distance.
#[allow(clippy::too_many_arguments)]
pub fn evade(
    unit: &mut MobilityUnit,
    pursuer: &MobilityUnit,
    current_position: Vector2<f32>,
    target_position: Vector2<f32>,
    target_max_velocity: f32,
    speed: f32,
    evade_distance: f32,
    damp: f32,
) {
    let to_target = target_position - current_position;
    let magnitude = to_target.norm();
    if magnitude == 0.0 {
        return;
    }
    let estimated =
        target_position + pursuer.velocity.scale(damp * (magnitude / target_max_velocity));
    if magnitude <= evade_distance {
        flee(unit, current_position, estimated, speed);
    }
}

/// Adds a wandering force: the current velocity direction perturbed by a
/// random angle within the given range.
pub fn displace(unit: &mut MobilityUnit, speed: f32, circle_distance: f32, angle_range: f32) {
    let mut circle = unit.velocity;
    if circle.x == 0.0 && circle.y == 0.0 {
        circle = Vector2::new(1.0, 1.0);
    }
    circle = normalize_or_zero(circle);

    // Angle of the current heading against the x-axis, perturbed randomly.
    let mut angle = circle.x.acos();
    angle += rand::thread_rng().gen_range(-angle_range..=angle_range);
    let displacement = Vector2::new(angle.cos(), angle.sin());

    let force = normalize_or_zero(circle * circle_distance + displacement);
    accelerate(unit, force, speed);
}

/// Converts accumulated acceleration into motion: truncate the acceleration
/// to `max_force`, integrate, truncate the velocity to `max_velocity` and
/// snap tiny velocities to zero.
pub fn mobilize(unit: &mut MobilityUnit, max_force: f32, max_velocity: f32) {
    let acceleration = truncate(unit.acceleration, max_force);
    unit.velocity += acceleration;

    if unit.velocity.norm() < VELOCITY_EPSILON {
        unit.velocity = Vector2::default();
    } else {
        unit.velocity = truncate(unit.velocity, max_velocity);
    }
}

#[inline]
pub fn reset_acceleration(unit: &mut MobilityUnit) {
    unit.acceleration = Vector2::default();
}

/// Movement state attached to an entity.
#[derive(Clone, Debug)]
pub struct MobilityComponent {
    pub unit: MobilityUnit,
    pub base_speed: f32,
    pub max_force: f32,
    pub max_velocity: f32,
}

impl Default for MobilityComponent {
    fn default() -> Self {
        Self {
            unit: MobilityUnit::default(),
            base_speed: crate::engine::settings::DEFAULT_BASE_SPEED,
            max_force: crate::engine::settings::DEFAULT_MAX_FORCE,
            max_velocity: crate::engine::settings::DEFAULT_MAX_VELOCITY,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mobilize_caps_velocity() {
        let mut unit = MobilityUnit::default();
        accelerate(&mut unit, Vector2::new(1.0, 0.0), 100.0);
        mobilize(&mut unit, 50.0, 1.0);
        assert!(unit.velocity.norm() <= 1.0 + 1e-5);
    }

    #[test]
    fn mobilize_snaps_small_velocities_to_zero() {
        let mut unit = MobilityUnit::default();
        accelerate(&mut unit, Vector2::new(1.0, 0.0), 0.01);
        mobilize(&mut unit, 1.0, 1.0);
        assert_eq!(unit.velocity, Vector2::default());
    }

    #[test]
    fn reset_acceleration_zeroes() {
        let mut unit = MobilityUnit::default();
        accelerate(&mut unit, Vector2::new(1.0, 1.0), 2.0);
        reset_acceleration(&mut unit);
        assert_eq!(unit.acceleration, Vector2::default());
    }

    #[test]
    fn seek_reduces_distance_monotonically() {
        let mut unit = MobilityUnit::default();
        let target = Vector2::new(100.0, 40.0);
        let mut position = Vector2::new(0.0, 0.0);
        let mut last_distance = (target - position).norm();

        for _ in 0..50 {
            seek(&mut unit, position, target, 0.5);
            mobilize(&mut unit, 1.0, 1.0);
            reset_acceleration(&mut unit);
            position += unit.velocity;

            let distance = (target - position).norm();
            assert!(distance < last_distance);
            last_distance = distance;
        }
    }

    #[test]
    fn arrival_slows_down_inside_radius() {
        let mut far = MobilityUnit::default();
        arrival(&mut far, Vector2::new(0.0, 0.0), Vector2::new(100.0, 0.0), 1.0, 10.0);

        let mut near = MobilityUnit::default();
        arrival(&mut near, Vector2::new(95.0, 0.0), Vector2::new(100.0, 0.0), 1.0, 10.0);

        assert!(near.acceleration.norm() < far.acceleration.norm());
    }

    #[test]
    fn evade_is_inert_outside_evade_distance() {
        let mut unit = MobilityUnit::default();
        let pursuer = MobilityUnit {
            velocity: Vector2::new(1.0, 0.0),
            acceleration: Vector2::default(),
        };
        evade(
            &mut unit,
            &pursuer,
            Vector2::new(0.0, 0.0),
            Vector2::new(500.0, 0.0),
            1.0,
            1.0,
            100.0,
            1.0,
        );
        assert_eq!(unit.acceleration, Vector2::default());
    }

    #[test]
    fn displace_produces_bounded_force() {
        let mut unit = MobilityUnit {
            velocity: Vector2::new(1.0, 0.0),
            acceleration: Vector2::default(),
        };
        displace(&mut unit, 2.0, 1.0, 0.5);
        assert!(unit.acceleration.norm() <= 2.0 + 1e-4);
        assert!(unit.acceleration.norm() > 0.0);
    }
}
