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

//! A render layer: a named 2d surface with a depth value that controls its
//! virtual z-position. The depth acts as parallax multiplier at render time;
//! layers at depth 1 track the camera exactly, smaller depths scroll slower.
//! Each layer embeds a quadtree of the entities living on it.

use crate::{
    core::{algebra::Vector2, math::Rect, quadtree::QuadTree},
    scene::entity::Entity,
};

/// See module docs.
#[derive(Debug)]
pub struct RenderLayer {
    name: String,
    /// Parallax multiplier in (0, 1].
    render_depth: f32,
    size: Vector2<f32>,
    quadtree: QuadTree<Entity>,
}

impl RenderLayer {
    pub fn new<S: Into<String>>(name: S, render_depth: f32, size: Vector2<f32>) -> Self {
        Self {
            name: name.into(),
            render_depth: render_depth.clamp(f32::EPSILON, 1.0),
            size,
            quadtree: QuadTree::new(Rect {
                position: Vector2::default(),
                size,
            }),
        }
    }

    pub(crate) fn with_limits<S: Into<String>>(
        name: S,
        render_depth: f32,
        size: Vector2<f32>,
        max_capacity: usize,
        max_level: u32,
    ) -> Self {
        Self {
            name: name.into(),
            render_depth: render_depth.clamp(f32::EPSILON, 1.0),
            size,
            quadtree: QuadTree::with_limits(
                Rect {
                    position: Vector2::default(),
                    size,
                },
                max_capacity,
                max_level,
            ),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    #[inline]
    pub fn render_depth(&self) -> f32 {
        self.render_depth
    }

    pub fn set_render_depth(&mut self, render_depth: f32) {
        self.render_depth = render_depth.clamp(f32::EPSILON, 1.0);
    }

    /// Size of the layer, unaffected by render depth.
    #[inline]
    pub fn size(&self) -> Vector2<f32> {
        self.size
    }

    /// Size of the layer as projected through its render depth.
    #[inline]
    pub fn transformed_size(&self) -> Vector2<f32> {
        self.size.scale(self.render_depth)
    }

    /// Resizes the layer. The embedded quadtree is rebuilt; entities that no
    /// longer fit are reported back to the caller.
    pub(crate) fn set_size(&mut self, size: Vector2<f32>) -> Vec<Entity> {
        self.size = size;
        self.quadtree.set_bounds(Rect {
            position: Vector2::default(),
            size,
        })
    }

    #[inline]
    pub fn quadtree(&self) -> &QuadTree<Entity> {
        &self.quadtree
    }

    #[inline]
    pub(crate) fn quadtree_mut(&mut self) -> &mut QuadTree<Entity> {
        &mut self.quadtree
    }
}
