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

//! Spatial state of an entity: position, scale and the local bounding
//! rectangle spanned by the entity's contents.
//!
//! The local rectangle runs from the upper bound (left-top) to the lower bound
//! (right-bottom); the invariant `lower >= upper` holds component-wise. All
//! mutations go through the owning world node, which fires the change signals
//! and keeps the layer quadtree up to date - the component itself only exposes
//! read access and the raw state.

use crate::core::{
    algebra::Vector2,
    math::Rect,
};

/// See module docs.
#[derive(Clone, Debug)]
pub struct TransformComponent {
    pub(crate) position: Vector2<f32>,
    pub(crate) scale: Vector2<f32>,
    /// Left-top corner of the local content rectangle.
    pub(crate) upper_bound: Vector2<f32>,
    /// Right-bottom corner of the local content rectangle.
    pub(crate) lower_bound: Vector2<f32>,
    /// Local y-offsets of the left and right anchor points, measured upwards
    /// from the lower bound. Used to sort render order along a baseline.
    pub(crate) baseline_offsets: Vector2<f32>,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: Vector2::default(),
            scale: Vector2::new(1.0, 1.0),
            upper_bound: Vector2::default(),
            lower_bound: Vector2::default(),
            baseline_offsets: Vector2::default(),
        }
    }
}

impl TransformComponent {
    /// Maps a point from entity-local into layer-local coordinates.
    #[inline]
    pub fn transform_point(&self, point: Vector2<f32>) -> Vector2<f32> {
        self.position + self.scale.component_mul(&point)
    }

    /// Position of the left-top corner of the world bounds.
    #[inline]
    pub fn position(&self) -> Vector2<f32> {
        self.transform_point(self.upper_bound)
    }

    #[inline]
    pub fn scale(&self) -> Vector2<f32> {
        self.scale
    }

    /// Size of the world bounds.
    #[inline]
    pub fn size(&self) -> Vector2<f32> {
        Vector2::new(
            self.scale.x * (self.lower_bound.x - self.upper_bound.x),
            self.scale.y * (self.lower_bound.y - self.upper_bound.y),
        )
    }

    /// Center of the world bounds.
    #[inline]
    pub fn center_position(&self) -> Vector2<f32> {
        self.transform_point((self.lower_bound + self.upper_bound).scale(0.5))
    }

    /// World bounds: the local rectangle transformed by position and scale.
    #[inline]
    pub fn bounds(&self) -> Rect<f32> {
        Rect {
            position: self.position(),
            size: self.size(),
        }
    }

    #[inline]
    pub fn upper_bounds(&self) -> Vector2<f32> {
        self.upper_bound
    }

    #[inline]
    pub fn lower_bounds(&self) -> Vector2<f32> {
        self.lower_bound
    }

    #[inline]
    pub fn baseline_offsets(&self) -> Vector2<f32> {
        self.baseline_offsets
    }

    /// World position of the left baseline anchor.
    #[inline]
    pub fn left_anchor(&self) -> Vector2<f32> {
        self.transform_point(Vector2::new(
            self.upper_bound.x,
            self.lower_bound.y - self.baseline_offsets.x,
        ))
    }

    /// World position of the right baseline anchor.
    #[inline]
    pub fn right_anchor(&self) -> Vector2<f32> {
        self.transform_point(Vector2::new(
            self.lower_bound.x,
            self.lower_bound.y - self.baseline_offsets.y,
        ))
    }

    /// Grows the local rectangle so it contains the given content rect.
    /// Returns true if the rectangle changed.
    pub(crate) fn grow_to_contain(&mut self, content: Rect<f32>) -> bool {
        let mut changed = false;
        if content.position.x < self.upper_bound.x {
            self.upper_bound.x = content.position.x;
            changed = true;
        }
        if content.position.y < self.upper_bound.y {
            self.upper_bound.y = content.position.y;
            changed = true;
        }
        if content.position.x + content.size.x > self.lower_bound.x {
            self.lower_bound.x = content.position.x + content.size.x;
            changed = true;
        }
        if content.position.y + content.size.y > self.lower_bound.y {
            self.lower_bound.y = content.position.y + content.size.y;
            changed = true;
        }
        changed
    }

    /// Replaces the local rectangle by the union of the given content rects.
    /// With no contents left the rectangle collapses to a zero rect at the
    /// local origin. Returns true if the rectangle changed in any direction.
    pub(crate) fn refit_to_contents<I>(&mut self, mut contents: I) -> bool
    where
        I: Iterator<Item = Rect<f32>>,
    {
        let Some(first) = contents.next() else {
            let changed =
                self.upper_bound != Vector2::default() || self.lower_bound != Vector2::default();
            self.upper_bound = Vector2::default();
            self.lower_bound = Vector2::default();
            return changed;
        };

        // Seed the union from the first rect; an accumulator starting at
        // zero would pull the origin into the bounds of every entity whose
        // contents lie away from it.
        let mut upper = first.position;
        let mut lower = first.position + first.size;
        for rect in contents {
            upper.x = upper.x.min(rect.position.x);
            upper.y = upper.y.min(rect.position.y);
            lower.x = lower.x.max(rect.position.x + rect.size.x);
            lower.y = lower.y.max(rect.position.y + rect.size.y);
        }
        let changed = upper != self.upper_bound || lower != self.lower_bound;
        self.upper_bound = upper;
        self.lower_bound = lower;
        changed
    }
}
