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

//! Collision detection of one context.
//!
//! The broad phase queries the layer quadtree with every moving entity's
//! bounds and collects deduplicated candidate pairs; the narrow phase runs the
//! separating-axis test per collider pair and produces contacts carrying the
//! minimum translation vector. Begin/end events come from two alternating
//! per-frame pair sets: pairs new this frame begin, pairs gone since the last
//! frame end.
//!
//! Listeners must not mutate the quadtree that is being iterated; reactions
//! (like the default displacement) are applied after detection from the
//! returned event set.

use crate::{
    core::{
        math::sat::sat,
        pool::Pool,
        quadtree::QuadTree,
        signal::Signal,
    },
    scene::entity::{Entity, EntityData},
};
use crate::core::algebra::Vector2;
use fxhash::FxHashSet;

/// One overlapping collider pair, with the translation resolving it.
#[derive(Clone, Debug)]
pub struct Contact {
    pub first: Entity,
    pub second: Entity,
    /// Minimum translation vector; moving `first` by it separates the pair.
    pub mtv: Vector2<f32>,
    /// Collider indices within the respective rigidbody sequences.
    pub first_collider: usize,
    pub second_collider: usize,
}

/// All collision events of one context and frame.
#[derive(Clone, Debug, Default)]
pub struct CollisionEvents {
    pub contacts: Vec<Contact>,
    /// Pairs that started touching this frame.
    pub begins: Vec<(Entity, Entity)>,
    /// Pairs that stopped touching since the previous frame.
    pub ends: Vec<(Entity, Entity)>,
}

/// See module docs.
pub struct CollisionModule {
    context: usize,
    /// Double-buffered sets of colliding pairs; `active` indexes the set of
    /// the frame currently being built.
    buffers: [FxHashSet<(Entity, Entity)>; 2],
    active: usize,
    pub on_collision: Signal<Contact>,
    pub on_collision_begin: Signal<(Entity, Entity)>,
    pub on_collision_end: Signal<(Entity, Entity)>,
}

impl CollisionModule {
    pub fn new(context: usize) -> Self {
        Self {
            context,
            buffers: [FxHashSet::default(), FxHashSet::default()],
            active: 0,
            on_collision: Signal::new(),
            on_collision_begin: Signal::new(),
            on_collision_end: Signal::new(),
        }
    }

    #[inline]
    pub fn context(&self) -> usize {
        self.context
    }

    /// Drops all pair state, for example when a node unloads.
    pub fn clear(&mut self) {
        self.buffers[0].clear();
        self.buffers[1].clear();
    }

    /// Removes a destroyed entity from both pair buffers so no end event
    /// fires against a dead handle.
    pub fn forget_entity(&mut self, entity: Entity) {
        for buffer in self.buffers.iter_mut() {
            buffer.retain(|(a, b)| *a != entity && *b != entity);
        }
    }

    /// Broad and narrow phase over one layer. Contacts are appended to the
    /// event set and the current pair buffer; call [`Self::finish_frame`]
    /// once all layers of the frame are done.
    pub fn run(
        &mut self,
        quadtree: &QuadTree<Entity>,
        entities: &Pool<EntityData>,
        events: &mut CollisionEvents,
    ) {
        let mut candidates = Vec::new();
        let mut seen_pairs: FxHashSet<(Entity, Entity)> = FxHashSet::default();

        for (first, data) in entities.pair_iter() {
            // Only moving entities seed the broad phase; static-static pairs
            // never produce meaningful events.
            if data.mobility().is_none() {
                continue;
            }
            if data.rigidbodies(self.context).is_empty() {
                continue;
            }
            if quadtree.owner(first).is_none() {
                continue;
            }

            quadtree.retrieve(data.transform().bounds(), &mut candidates);
            for second in candidates.iter().copied() {
                if second == first {
                    continue;
                }
                let pair = ordered(first, second);
                if !seen_pairs.insert(pair) {
                    continue;
                }

                let Some(other) = entities.try_borrow(second) else {
                    continue;
                };
                if other.rigidbodies(self.context).is_empty() {
                    continue;
                }

                self.narrow_phase(first, data, second, other, events);
            }
        }
    }

    fn narrow_phase(
        &mut self,
        first: Entity,
        first_data: &EntityData,
        second: Entity,
        second_data: &EntityData,
        events: &mut CollisionEvents,
    ) {
        let mut touched = false;

        for (first_index, first_body) in first_data.rigidbodies(self.context).iter().enumerate() {
            if !first_body.is_active() {
                continue;
            }
            for (second_index, second_body) in
                second_data.rigidbodies(self.context).iter().enumerate()
            {
                if !second_body.is_active() {
                    continue;
                }

                let mut best: Option<Vector2<f32>> = None;
                for first_run in 0..first_body.collider().sat_runs() {
                    let first_shape = first_body
                        .collider()
                        .sat_shape(first_data.transform(), first_run);
                    for second_run in 0..second_body.collider().sat_runs() {
                        let second_shape = second_body
                            .collider()
                            .sat_shape(second_data.transform(), second_run);
                        let result = sat(&first_shape, &second_shape);
                        if result.intersects
                            && best.map_or(true, |mtv| result.mtv.norm_squared() < mtv.norm_squared())
                        {
                            best = Some(result.mtv);
                        }
                    }
                }

                if let Some(mtv) = best {
                    touched = true;
                    let contact = Contact {
                        first,
                        second,
                        mtv,
                        first_collider: first_index,
                        second_collider: second_index,
                    };
                    self.on_collision.emit(&contact);
                    events.contacts.push(contact);
                }
            }
        }

        if touched {
            let pair = ordered(first, second);
            self.buffers[self.active].insert(pair);
        }
    }

    /// Diffs the pair buffers into begin/end events and swaps them for the
    /// next frame.
    pub fn finish_frame(&mut self, events: &mut CollisionEvents) {
        let previous = 1 - self.active;

        for pair in self.buffers[self.active].iter() {
            if !self.buffers[previous].contains(pair) {
                events.begins.push(*pair);
            }
        }
        for pair in self.buffers[previous].iter() {
            if !self.buffers[self.active].contains(pair) {
                events.ends.push(*pair);
            }
        }

        for pair in &events.begins {
            self.on_collision_begin.emit(pair);
        }
        for pair in &events.ends {
            self.on_collision_end.emit(pair);
        }

        self.active = previous;
        self.buffers[self.active].clear();
    }
}

#[inline]
fn ordered(a: Entity, b: Entity) -> (Entity, Entity) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
