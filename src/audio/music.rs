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

//! Distance-culled music mixing.
//!
//! Entities carry looping music emitters; the mixer binds the closest active
//! ones to a small fixed pool of streams. When every stream is taken, an
//! incoming emitter preempts the bound emitter with the greatest listener
//! distance, provided that distance exceeds its own. Bound emitters whose
//! distance grows past their cap are stopped and unbound.

use crate::{
    audio::{Listener, DEFAULT_DISTANCE_CAP},
    core::{algebra::Vector2, math::Rect},
    scene::{entity::Entity, graph::WorldGraph},
};
use std::path::PathBuf;
use vesper_resource::Asset;
use vesper_sound::{buffer::SoundBuffer, AudioOutput, VoiceId};

/// Number of concurrent music streams.
pub const MUSIC_PLAY_CAP: usize = 5;

/// Music voices live above the sound-slot voice range.
const MUSIC_VOICE_BASE: u32 = 1000;

/// An entity-attached looping music track.
#[derive(Clone, Debug)]
pub struct MusicEmitterComponent {
    buffer: Option<Asset<SoundBuffer>>,
    file_path: PathBuf,
    volume: f32,
    distance_cap: f32,
    active: bool,
    /// Written by the mixer while the emitter occupies a stream.
    bound: bool,
}

impl Default for MusicEmitterComponent {
    fn default() -> Self {
        Self {
            buffer: None,
            file_path: PathBuf::new(),
            volume: 1.0,
            distance_cap: DEFAULT_DISTANCE_CAP,
            active: true,
            bound: false,
        }
    }
}

impl MusicEmitterComponent {
    /// Attaches the music buffer loaded from the given path.
    pub fn load(&mut self, buffer: Asset<SoundBuffer>) {
        self.file_path = buffer.path().to_path_buf();
        self.buffer = Some(buffer);
    }

    #[inline]
    pub fn file_path(&self) -> &PathBuf {
        &self.file_path
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.buffer.as_ref().is_some_and(|buffer| buffer.is_loaded())
    }

    #[inline]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    #[inline]
    pub fn distance_cap(&self) -> f32 {
        self.distance_cap
    }

    pub fn set_distance_cap(&mut self, cap: f32) {
        self.distance_cap = cap;
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.bound
    }
}

#[derive(Copy, Clone, Debug)]
struct MusicSlot {
    node: usize,
    entity: Entity,
}

/// See module docs.
pub struct MusicEmitterMixer {
    slots: [Option<MusicSlot>; MUSIC_PLAY_CAP],
    /// Side length of the listener-centered query square.
    max_distance_cap: f32,
    mute: bool,
}

impl Default for MusicEmitterMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl MusicEmitterMixer {
    pub fn new() -> Self {
        Self {
            slots: [None; MUSIC_PLAY_CAP],
            max_distance_cap: 2.0 * DEFAULT_DISTANCE_CAP,
            mute: false,
        }
    }

    pub fn set_max_distance_cap(&mut self, cap: f32) {
        self.max_distance_cap = cap;
    }

    /// Stops and unbinds every stream.
    pub fn mute_all(&mut self, graph: &mut WorldGraph, output: &mut dyn AudioOutput) {
        for index in 0..MUSIC_PLAY_CAP {
            self.release_slot(index, graph, output);
        }
    }

    /// Mutes the mixer, stopping everything currently bound.
    pub fn set_mute_sound(
        &mut self,
        mute: bool,
        graph: &mut WorldGraph,
        output: &mut dyn AudioOutput,
    ) {
        self.mute = mute;
        if mute {
            self.mute_all(graph, output);
        }
    }

    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn bound_entities(&self) -> Vec<Entity> {
        self.slots
            .iter()
            .flatten()
            .map(|slot| slot.entity)
            .collect()
    }

    fn release_slot(
        &mut self,
        index: usize,
        graph: &mut WorldGraph,
        output: &mut dyn AudioOutput,
    ) {
        if let Some(slot) = self.slots[index].take() {
            output.stop(VoiceId(MUSIC_VOICE_BASE + index as u32));
            if let Some(data) = graph.node_mut(slot.node).try_entity_mut(slot.entity) {
                if let Some(emitter) = data.music_emitter_mut() {
                    emitter.bound = false;
                }
            }
        }
    }

    fn slot_distance(&self, slot: MusicSlot, graph: &WorldGraph, listener: &Listener) -> f32 {
        let node = graph.node(slot.node);
        match node.try_entity(slot.entity) {
            Some(data) => {
                let center = node.map_to_global_position(data.transform().center_position());
                (center - listener.world_position()).norm()
            }
            None => f32::INFINITY,
        }
    }

    /// One mixer step: binds unbound emitters in listener range (preempting
    /// the farthest bound emitter when out of streams), then culls or
    /// re-scales the bound ones.
    pub fn update(
        &mut self,
        graph: &mut WorldGraph,
        listener: &Listener,
        output: &mut dyn AudioOutput,
    ) {
        if self.mute {
            return;
        }

        let query_size = self.max_distance_cap;
        let listener_position = listener.world_position();

        let loaded: Vec<usize> = graph.loaded_nodes().collect();
        for node_index in loaded {
            // The quadtrees store node-local bounds; rebase the query square.
            let local_listener = graph.node(node_index).map_to_local_position(listener_position);
            let query = Rect::new(
                local_listener.x - query_size * 0.5,
                local_listener.y - query_size * 0.5,
                query_size,
                query_size,
            );

            let mut candidates = Vec::new();
            let mut in_range = Vec::new();
            for (_, layer) in graph.node(node_index).active_layers() {
                layer.quadtree().retrieve(query, &mut candidates);
                in_range.extend(candidates.iter().copied());
            }

            for entity in in_range {
                let node = graph.node(node_index);
                let Some(data) = node.try_entity(entity) else {
                    continue;
                };
                let Some(emitter) = data.music_emitter() else {
                    continue;
                };
                if !emitter.is_active() || emitter.is_bound() || !emitter.is_loaded() {
                    continue;
                }

                let center = node.map_to_global_position(data.transform().center_position());
                let distance = (center - listener_position).norm();
                let cap = emitter.distance_cap();
                if distance >= cap {
                    continue;
                }

                // A free stream, or the bound stream with the greatest
                // distance beyond our own.
                let mut max_distance = distance;
                let mut index_to_use = None;
                for (index, slot) in self.slots.iter().enumerate() {
                    match slot {
                        None => {
                            index_to_use = Some(index);
                            break;
                        }
                        Some(slot) => {
                            let other = self.slot_distance(*slot, graph, listener);
                            if other > max_distance {
                                max_distance = other;
                                index_to_use = Some(index);
                            }
                        }
                    }
                }

                if let Some(index) = index_to_use {
                    self.release_slot(index, graph, output);

                    let data = graph
                        .node_mut(node_index)
                        .try_entity_mut(entity)
                        .expect("candidate was alive above");
                    let emitter = data.music_emitter_mut().expect("checked above");
                    emitter.bound = true;
                    let volume = emitter.volume();
                    let buffer = emitter.buffer.as_ref().map(|b| b.get());

                    let scaling = listener.scaling(center, cap);
                    if let Some(buffer) = buffer {
                        output.play(
                            VoiceId(MUSIC_VOICE_BASE + index as u32),
                            &buffer,
                            volume * scaling,
                            1.0,
                        );
                    }
                    self.slots[index] = Some(MusicSlot {
                        node: node_index,
                        entity,
                    });
                }
            }
        }

        // Cull or re-scale the bound streams.
        for index in 0..MUSIC_PLAY_CAP {
            let Some(slot) = self.slots[index] else {
                continue;
            };
            let node = graph.node(slot.node);
            let Some(data) = node.try_entity(slot.entity) else {
                self.release_slot(index, graph, output);
                continue;
            };
            let Some(emitter) = data.music_emitter() else {
                self.release_slot(index, graph, output);
                continue;
            };

            let center = node.map_to_global_position(data.transform().center_position());
            let distance = (center - listener_position).norm();
            if distance > emitter.distance_cap() {
                self.release_slot(index, graph, output);
            } else {
                let volume = emitter.volume() * listener.scaling(center, emitter.distance_cap());
                output.set_volume(VoiceId(MUSIC_VOICE_BASE + index as u32), volume);
            }
        }
    }

}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        core::task::TaskPool,
        scene::{camera::Camera, entity::EntityBuilder},
    };
    use std::sync::Arc;
    use vesper_resource::{AssetStore, LoadPolicy};
    use vesper_sound::NullOutput;

    fn store() -> AssetStore<SoundBuffer> {
        AssetStore::new(Arc::new(TaskPool::new()))
    }

    fn loaded_buffer(store: &AssetStore<SoundBuffer>, name: &str) -> Asset<SoundBuffer> {
        store.insert(name, SoundBuffer::from_samples(vec![0.0; 44100], 1, 44100))
    }

    fn graph_with_emitters(
        store: &AssetStore<SoundBuffer>,
        positions: &[f32],
    ) -> (WorldGraph, Vec<Entity>) {
        let mut graph = WorldGraph::new(Camera::new(Vector2::new(100.0, 100.0)));
        let node = graph.create_node("N", Rect::new(0.0, 0.0, 1000.0, 1000.0));
        graph.node_mut(node).add_layer("main", 1.0);
        graph.update_reference_position(Vector2::new(500.0, 500.0));

        let mut entities = Vec::new();
        for (i, x) in positions.iter().enumerate() {
            let mut emitter = MusicEmitterComponent::default();
            emitter.load(loaded_buffer(store, &format!("track{}.ogg", i)));
            emitter.set_distance_cap(600.0);
            let entity = graph.node_mut(node).create_entity(
                0,
                EntityBuilder::new()
                    .with_position(Vector2::new(*x, 500.0))
                    .with_music_emitter(emitter),
            );
            entities.push(entity);
        }
        (graph, entities)
    }

    #[test]
    fn emitters_in_range_bind_to_free_streams() {
        let store = store();
        let (mut graph, entities) = graph_with_emitters(&store, &[400.0, 450.0]);
        let listener = Listener::new(Vector2::new(500.0, 500.0));
        let mut mixer = MusicEmitterMixer::new();
        let mut output = NullOutput;

        mixer.update(&mut graph, &listener, &mut output);
        assert_eq!(mixer.bound_count(), 2);
        for entity in &entities {
            assert!(graph.node(0).entity(*entity).music_emitter().unwrap().is_bound());
        }
    }

    #[test]
    fn closer_emitter_preempts_the_farthest_when_streams_are_full() {
        let store = store();
        // Five emitters at equal distance occupy every stream, a sixth one
        // closer to the listener preempts the farthest of them.
        let (mut graph, entities) =
            graph_with_emitters(&store, &[200.0, 200.0, 200.0, 200.0, 200.0, 480.0]);
        let listener = Listener::new(Vector2::new(500.0, 500.0));
        let mut mixer = MusicEmitterMixer::new();
        let mut output = NullOutput;

        mixer.update(&mut graph, &listener, &mut output);

        let close = *entities.last().unwrap();
        assert_eq!(mixer.bound_count(), MUSIC_PLAY_CAP);
        assert!(mixer.bound_entities().contains(&close));
        // Exactly one of the distant emitters was displaced.
        let distant_bound = entities[..5]
            .iter()
            .filter(|entity| {
                graph
                    .node(0)
                    .entity(**entity)
                    .music_emitter()
                    .unwrap()
                    .is_bound()
            })
            .count();
        assert_eq!(distant_bound, MUSIC_PLAY_CAP - 1);
    }

    #[test]
    fn bound_emitters_past_their_cap_are_released() {
        let store = store();
        let (mut graph, entities) = graph_with_emitters(&store, &[400.0]);
        let listener = Listener::new(Vector2::new(500.0, 500.0));
        let mut mixer = MusicEmitterMixer::new();
        let mut output = NullOutput;

        mixer.update(&mut graph, &listener, &mut output);
        assert_eq!(mixer.bound_count(), 1);

        // Walk the emitter out of its own distance cap.
        graph
            .node_mut(0)
            .set_entity_position(entities[0], Vector2::new(-400.0, 500.0));
        mixer.update(&mut graph, &listener, &mut output);
        assert_eq!(mixer.bound_count(), 0);
        assert!(!graph
            .node(0)
            .entity(entities[0])
            .music_emitter()
            .unwrap()
            .is_bound());
    }

    #[test]
    fn muted_mixer_binds_nothing() {
        let store = store();
        let (mut graph, _) = graph_with_emitters(&store, &[450.0]);
        let listener = Listener::new(Vector2::new(500.0, 500.0));
        let mut mixer = MusicEmitterMixer::new();
        let mut output = NullOutput;

        mixer.set_mute_sound(true, &mut graph, &mut output);
        mixer.update(&mut graph, &listener, &mut output);
        assert_eq!(mixer.bound_count(), 0);
    }

    #[test]
    fn unloaded_emitters_do_not_bind() {
        let mut graph = WorldGraph::new(Camera::new(Vector2::new(100.0, 100.0)));
        let node = graph.create_node("N", Rect::new(0.0, 0.0, 1000.0, 1000.0));
        graph.node_mut(node).add_layer("main", 1.0);
        graph.update_reference_position(Vector2::new(500.0, 500.0));

        // An emitter whose buffer is still a failed/pending load.
        let pending = store().load("does-not-exist.ogg", LoadPolicy::Sync);
        let mut emitter = MusicEmitterComponent::default();
        emitter.load(pending);
        graph.node_mut(node).create_entity(
            0,
            EntityBuilder::new()
                .with_position(Vector2::new(450.0, 500.0))
                .with_music_emitter(emitter),
        );

        let listener = Listener::new(Vector2::new(500.0, 500.0));
        let mut mixer = MusicEmitterMixer::new();
        let mut output = NullOutput;
        mixer.update(&mut graph, &listener, &mut output);
        assert_eq!(mixer.bound_count(), 0);
    }
}
