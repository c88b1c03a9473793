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

//! A rigidbody bundles a collider with an active flag inside one collision
//! context. An entity can carry several rigidbodies per context
//! (multi-rigidbody); they are stored as an ordered sequence.

use crate::physics::collider::Collider;
use serde::{Deserialize, Serialize};

/// Number of independent collision contexts. Bodies only collide with bodies
/// of the same context.
pub const COLLISION_CONTEXTS: usize = 2;

/// Context conventionally used for movement blocking.
pub const MOVEMENT_COLLISION_CONTEXT: usize = 0;

/// See module docs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rigidbody {
    collider: Collider,
    active: bool,
}

impl Rigidbody {
    pub fn new(collider: Collider) -> Self {
        Self {
            collider,
            active: true,
        }
    }

    #[inline]
    pub fn collider(&self) -> &Collider {
        &self.collider
    }

    #[inline]
    pub fn collider_mut(&mut self) -> &mut Collider {
        &mut self.collider
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}
