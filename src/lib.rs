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

//! Vesper - a layered 2d game engine runtime.
//!
//! The engine streams a graph of adjacent worlds around a reference position,
//! simulates entities on depth-ordered parallax layers with quadtree spatial
//! indexing, resolves collisions through a separating-axis engine, composes
//! soft-shadow lighting, mixes spatial audio against the camera listener and
//! drives script-agnostic per-entity behaviors. Rendering and audio stop at
//! data-level boundaries that a host backend executes.

#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

/// Core data structures: pools, quadtrees, signals, logging, tasks.
pub use vesper_core as core;
/// Asset management.
pub use vesper_resource as asset;
/// Sound decoding and playback primitives.
pub use vesper_sound as sound;

pub mod ai;
pub mod audio;
pub mod behavior;
pub mod engine;
pub mod physics;
pub mod renderer;
pub mod resource;
pub mod scene;
pub mod utils;

/// Commonly used types, ready for a glob import.
pub mod prelude {
    pub use crate::{
        audio::{music::MusicEmitterComponent, sound::SoundHandler, Listener},
        behavior::{BehaviorContext, BehaviorManager, BehaviorSource, CallbackKind},
        core::{
            algebra::Vector2,
            color::Color,
            math::Rect,
            pool::Handle,
            quadtree::QuadTree,
        },
        engine::{input::InputEvent, settings::Settings, Engine},
        physics::{
            collider::Collider,
            mobility::MobilityComponent,
            path::{FollowPolicy, Path},
            rigidbody::Rigidbody,
        },
        renderer::{light::PointLight, RenderFrame, Renderer},
        scene::{
            camera::Camera,
            entity::{Entity, EntityBuilder, VisualComponent},
            graph::WorldGraph,
            layer::RenderLayer,
            node::WorldNode,
        },
    };
}
