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

//! Spatial audio: bounded-slot sound dispatch and distance-culled music
//! mixing, both scaled against a listener position.

pub mod music;
pub mod sound;

use crate::core::algebra::Vector2;

/// Default distance at which an emitter becomes inaudible.
pub const DEFAULT_DISTANCE_CAP: f32 = 500.0;

/// The listener sounds are scaled against. The engine keeps its position on
/// the active camera center, so volume follows the view.
#[derive(Copy, Clone, Debug, Default)]
pub struct Listener {
    position: Vector2<f32>,
}

impl Listener {
    pub fn new(position: Vector2<f32>) -> Self {
        Self { position }
    }

    #[inline]
    pub fn world_position(&self) -> Vector2<f32> {
        self.position
    }

    pub fn set_position(&mut self, position: Vector2<f32>) {
        self.position = position;
    }

    /// Volume scaling in [0, 1] for an emission point: 1 at the listener,
    /// 0 at or beyond the cap, linear in between.
    pub fn scaling(&self, emission: Vector2<f32>, cap: f32) -> f32 {
        if cap <= f32::EPSILON {
            return 0.0;
        }
        let distance = (emission - self.position).norm();
        (1.0 - distance / cap).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scaling_is_linear_between_listener_and_cap() {
        let listener = Listener::new(Vector2::new(0.0, 0.0));
        assert_eq!(listener.scaling(Vector2::new(0.0, 0.0), 100.0), 1.0);
        assert!((listener.scaling(Vector2::new(50.0, 0.0), 100.0) - 0.5).abs() < 1e-6);
        assert_eq!(listener.scaling(Vector2::new(100.0, 0.0), 100.0), 0.0);
        assert_eq!(listener.scaling(Vector2::new(500.0, 0.0), 100.0), 0.0);
    }
}
