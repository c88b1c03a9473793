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

//! The engine: owner of every subsystem and driver of the frame loop.
//!
//! The per-frame order is fixed: input routing, world-graph streaming and
//! out-of-bounds transfer, camera update, then per loaded node the scripted
//! behaviors, steering and path following, transform writes with quadtree
//! rebalancing and the collision phases with their events; afterwards the
//! audio mixers, the asset-store callback queues, and finally frame assembly
//! with the lighting composite last. All of it runs on the main thread; the
//! only asynchronous work is asset loading on the shared task pool, whose
//! results surface through the store update calls inside this loop.

pub mod error;
pub mod input;
pub mod settings;

use crate::{
    ai::NavMesh,
    audio::{music::MusicEmitterMixer, sound::SoundHandler, Listener},
    behavior::{BehaviorManager, BehaviorSource, CallbackKind},
    core::{algebra::Vector2, math::Rect, task::TaskPool},
    physics::collision::CollisionEvents,
    renderer::{RenderFrame, Renderer},
    resource::Texture,
    scene::{
        camera::Camera,
        entity::Entity,
        graph::{EntityTransfer, WorldGraph},
        loader,
    },
};
use error::EngineError;
use fxhash::FxHashMap;
use input::{InputEvent, InputRouter};
use settings::Settings;
use std::{path::Path, sync::Arc};
use vesper_resource::AssetStore;
use vesper_sound::{buffer::SoundBuffer, AudioOutput};

/// Everything one frame produced besides mutated state: the draw data and
/// the events a host may want to inspect.
pub struct FrameReport {
    pub frame: RenderFrame,
    /// Per loaded node, the collision events of every context.
    pub collisions: Vec<(usize, Vec<CollisionEvents>)>,
    /// Out-of-bounds transfers performed this frame.
    pub transfers: Vec<EntityTransfer>,
}

/// See module docs.
pub struct Engine {
    pub settings: Settings,
    pub task_pool: Arc<TaskPool>,
    pub textures: AssetStore<Texture>,
    pub sound_buffers: AssetStore<SoundBuffer>,
    pub graph: WorldGraph,
    pub behaviors: BehaviorManager,
    pub sound: SoundHandler,
    pub music: MusicEmitterMixer,
    pub listener: Listener,
    pub input: InputRouter,
    pub renderer: Renderer,
    navmeshes: FxHashMap<usize, NavMesh>,
    camera_follow: Option<(usize, Entity)>,
    audio_output: Box<dyn AudioOutput>,
}

impl Engine {
    pub fn new(
        settings: Settings,
        behavior_source: Box<dyn BehaviorSource>,
        audio_output: Box<dyn AudioOutput>,
        window_size: Vector2<f32>,
    ) -> Self {
        let task_pool = Arc::new(TaskPool::new());
        let camera = Camera::new(window_size);
        let graph = WorldGraph::with_distance(camera, settings.neighborhood_distance);

        Self {
            task_pool: task_pool.clone(),
            textures: AssetStore::new(task_pool.clone()),
            sound_buffers: AssetStore::new(task_pool),
            graph,
            behaviors: BehaviorManager::new(behavior_source),
            sound: SoundHandler::new(),
            music: MusicEmitterMixer::new(),
            listener: Listener::default(),
            input: InputRouter::new(window_size),
            renderer: Renderer::new(),
            navmeshes: FxHashMap::default(),
            camera_follow: None,
            audio_output,
            settings,
        }
    }

    /// Creates a world-graph node configured with the engine's quadtree
    /// limits.
    pub fn add_world_node<S: Into<String>>(&mut self, name: S, bounds: Rect<f32>) -> usize {
        let index = self.graph.create_node(name, bounds);
        self.graph.node_mut(index).set_quadtree_limits(
            self.settings.quadtree_max_capacity,
            self.settings.quadtree_max_level,
        );
        index
    }

    /// Loads a world graph file and replaces the current graph.
    pub fn load_world<P: AsRef<Path>>(&mut self, path: P) -> Result<(), EngineError> {
        let def = loader::load_graph_def(path)?;
        let camera = Camera::new(self.input_window_size());
        self.graph = loader::build_graph(&def, camera);
        self.navmeshes.clear();
        self.camera_follow = None;
        Ok(())
    }

    /// Loads the node's data file into the node, resolving fixups.
    pub fn load_node_content(&mut self, index: usize) -> Result<loader::DeserialMemory, EngineError> {
        let path = self.graph.node(index).data_path().clone();
        let def = loader::load_node_def(path)?;
        let memory = loader::apply_node_def(
            self.graph.node_mut(index),
            &def,
            &self.behaviors,
            &self.textures,
            &self.sound_buffers,
        );
        Ok(memory)
    }

    fn input_window_size(&self) -> Vector2<f32> {
        self.graph.camera().view_size().scale(1.0 / self.graph.camera().zoom())
    }

    /// Builds (or rebuilds) the navigation mesh of a node from its static
    /// obstacle colliders in the movement context.
    pub fn build_nav_mesh(&mut self, index: usize, agent_radius: f32) {
        let node = self.graph.node(index);
        let mut obstacles = Vec::new();
        for entity in node.entities() {
            let data = node.entity(entity);
            if !data.is_static() {
                continue;
            }
            for body in data.rigidbodies(crate::physics::rigidbody::MOVEMENT_COLLISION_CONTEXT) {
                obstacles.push((body.collider().clone(), data.transform().clone()));
            }
        }
        let bounds = Rect {
            position: Vector2::default(),
            size: node.size(),
        };
        self.navmeshes
            .insert(index, NavMesh::build(bounds, &obstacles, agent_radius));
    }

    pub fn nav_mesh(&self, index: usize) -> Option<&NavMesh> {
        self.navmeshes.get(&index)
    }

    /// Locks the camera onto an entity; the view follows it with the
    /// dead-zone rule.
    pub fn set_camera_follow(&mut self, target: Option<(usize, Entity)>) {
        self.camera_follow = target;
    }

    /// Moves the streaming reference (usually the player position in world
    /// coordinates) and performs the resulting load/unload diff.
    pub fn set_reference_position(&mut self, position: Vector2<f32>) -> crate::scene::graph::NodeDiff {
        self.graph.update_reference_position(position)
    }

    /// Plays a sound of an entity's profile, scaled by listener distance.
    pub fn play_entity_sound(
        &mut self,
        node: usize,
        entity: Entity,
        index: usize,
        volume_setting: usize,
        pitch: f32,
    ) {
        let node_ref = self.graph.node(node);
        let Some(data) = node_ref.try_entity(entity) else {
            return;
        };
        let Some(emitter) = data.sound_emitter() else {
            return;
        };
        let center = node_ref.map_to_global_position(data.transform().center_position());
        let scaling = self.listener.scaling(center, emitter.distance_cap);
        let profile = emitter.profile.clone();
        self.sound.play_sound(
            self.audio_output.as_mut(),
            &profile,
            index,
            scaling,
            volume_setting,
            pitch,
        );
    }

    /// Advances the whole simulation by `delta` seconds, consuming the
    /// window events of the frame, and returns the assembled frame data.
    pub fn update(&mut self, delta: f32, events: &[InputEvent]) -> FrameReport {
        // Input routing through the double-buffered hover/click trackers.
        for event in events {
            let routed = self.input.handle_event(*event, &self.graph);
            if let Some((width, height)) = routed.resized {
                self.graph
                    .camera_mut()
                    .set_view_size(Vector2::new(width as f32, height as f32));
            }
            if let Some(active) = self.graph.active_node() {
                let node = self.graph.node_mut(active);
                for entity in routed.entered {
                    node.run_behavior_on(&self.behaviors, entity, CallbackKind::OnMouseEnter, delta);
                }
                for entity in routed.exited {
                    node.run_behavior_on(&self.behaviors, entity, CallbackKind::OnMouseExit, delta);
                }
                for entity in routed.clicked {
                    node.run_behavior_on(&self.behaviors, entity, CallbackKind::OnMouseClick, delta);
                }
                for entity in routed.released {
                    node.run_behavior_on(
                        &self.behaviors,
                        entity,
                        CallbackKind::OnMouseReleased,
                        delta,
                    );
                }
            }
        }

        // World-graph streaming: out-of-bounds entities change nodes.
        let transfers = self.graph.check_out_of_bounds();
        for transfer in &transfers {
            self.graph.transfer_entity(*transfer);
        }

        // Camera follow target, expressed in active-node coordinates.
        let follow = self.camera_follow.and_then(|(node_index, entity)| {
            let active = self.graph.active_node()?;
            let node = self.graph.node(node_index);
            let data = node.try_entity(entity)?;
            let offset = node.position() - self.graph.node(active).position();
            Some(data.transform().center_position() + offset)
        });
        self.graph.camera_mut().update(delta, follow);

        // Per-node simulation in neighborhood order.
        let loaded: Vec<usize> = self.graph.loaded_nodes().collect();
        let mut collisions = Vec::with_capacity(loaded.len());
        for index in loaded {
            let events = {
                let navmesh = self.navmeshes.get(&index);
                self.graph
                    .node_mut(index)
                    .update(&self.behaviors, navmesh, delta)
            };

            // Begin/end events feed the scripted collision callbacks.
            let node = self.graph.node_mut(index);
            for context_events in &events {
                for (first, second) in &context_events.begins {
                    node.run_behavior_on(&self.behaviors, *first, CallbackKind::OnCollisionBegin, delta);
                    node.run_behavior_on(&self.behaviors, *second, CallbackKind::OnCollisionBegin, delta);
                }
                for (first, second) in &context_events.ends {
                    node.run_behavior_on(&self.behaviors, *first, CallbackKind::OnCollisionEnd, delta);
                    node.run_behavior_on(&self.behaviors, *second, CallbackKind::OnCollisionEnd, delta);
                }
            }
            collisions.push((index, events));
        }

        // Audio follows the camera.
        if let Some(active) = self.graph.active_node() {
            let listener_position =
                self.graph.camera().center() + self.graph.node(active).position();
            self.listener.set_position(listener_position);
        }
        self.music
            .update(&mut self.graph, &self.listener, self.audio_output.as_mut());
        self.sound.update(delta, self.audio_output.as_mut());

        // Asset stores invoke the callbacks of loads that settled.
        self.textures.update();
        self.sound_buffers.update();

        // Frame assembly; lighting composites multiplicatively at the end.
        let frame = self.renderer.assemble_frame(&self.graph);

        FrameReport {
            frame,
            collisions,
            transfers,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::behavior::{BehaviorDefinition, BehaviorError, CallbackTable, Environment};
    use crate::scene::entity::{EntityBuilder, VisualComponent};
    use vesper_sound::NullOutput;

    struct NullBehaviors;

    impl BehaviorSource for NullBehaviors {
        fn load(&self, _path: &Path) -> Result<BehaviorDefinition, BehaviorError> {
            Ok(BehaviorDefinition {
                name: "null".to_string(),
                statics: Environment::default(),
                global: CallbackTable::default(),
                states: Vec::new(),
            })
        }
    }

    fn engine() -> Engine {
        Engine::new(
            Settings::default(),
            Box::new(NullBehaviors),
            Box::new(NullOutput),
            Vector2::new(200.0, 200.0),
        )
    }

    #[test]
    fn frame_loop_runs_through_all_phases() {
        let mut engine = engine();
        let n1 = engine.add_world_node("N1", Rect::new(0.0, 0.0, 100.0, 100.0));
        let n2 = engine.add_world_node("N2", Rect::new(100.0, 0.0, 100.0, 100.0));
        engine.graph.connect(n1, n2);
        engine.graph.node_mut(n1).add_layer("main", 1.0);
        engine.graph.node_mut(n2).add_layer("main", 1.0);
        engine.set_reference_position(Vector2::new(50.0, 50.0));

        let entity = engine.graph.node_mut(n1).create_entity(
            0,
            EntityBuilder::new()
                .with_position(Vector2::new(50.0, 50.0))
                .with_mobility(Default::default())
                .with_visual(VisualComponent::new(Rect::new(0.0, 0.0, 8.0, 8.0))),
        );

        let report = engine.update(0.016, &[]);
        assert_eq!(report.collisions.len(), 2);
        assert!(report.transfers.is_empty());
        assert!(!report.frame.layers.is_empty());
        assert!(engine.graph.node(n1).is_alive(entity));
    }

    #[test]
    fn oob_transfer_happens_inside_the_frame_loop() {
        let mut engine = engine();
        let n1 = engine.add_world_node("N1", Rect::new(0.0, 0.0, 100.0, 100.0));
        let n2 = engine.add_world_node("N2", Rect::new(100.0, 0.0, 100.0, 100.0));
        engine.graph.connect(n1, n2);
        engine.graph.node_mut(n1).add_layer("main", 1.0);
        engine.graph.node_mut(n2).add_layer("main", 1.0);
        engine.set_reference_position(Vector2::new(50.0, 50.0));

        let entity = engine.graph.node_mut(n1).create_entity(
            0,
            EntityBuilder::new()
                .with_position(Vector2::new(50.0, 50.0))
                .with_mobility(Default::default())
                .with_visual(VisualComponent::new(Rect::new(0.0, 0.0, 8.0, 8.0))),
        );
        engine
            .graph
            .node_mut(n1)
            .move_entity(entity, Vector2::new(80.0, 0.0));

        let report = engine.update(0.016, &[]);
        assert_eq!(report.transfers.len(), 1);
        assert_eq!(report.transfers[0].from, n1);
        assert_eq!(report.transfers[0].to, n2);
        assert!(!engine.graph.node(n1).is_alive(entity));
        assert_eq!(engine.graph.node(n2).entity_count(), 1);
    }

    #[test]
    fn path_followers_traverse_waypoints_through_the_frame_loop() {
        use crate::physics::{mobility::MobilityComponent, path::FollowPolicy, path::Path as WaypointPath};

        let mut engine = engine();
        let n1 = engine.add_world_node("N1", Rect::new(0.0, 0.0, 1000.0, 1000.0));
        engine.graph.node_mut(n1).add_layer("main", 1.0);
        engine.set_reference_position(Vector2::new(500.0, 500.0));

        let walker = engine.graph.node_mut(n1).create_entity(
            0,
            EntityBuilder::new()
                .with_position(Vector2::new(500.0, 500.0))
                .with_mobility(MobilityComponent {
                    base_speed: 60.0,
                    max_force: 60.0,
                    max_velocity: 120.0,
                    ..Default::default()
                }),
        );
        engine.graph.node_mut(n1).set_entity_path(
            walker,
            WaypointPath::explicit(vec![
                Vector2::new(500.0, 500.0),
                Vector2::new(600.0, 500.0),
                Vector2::new(700.0, 500.0),
            ]),
            FollowPolicy::Patrol,
            60.0,
            30.0,
        );

        let mut highest_x: f32 = 0.0;
        let mut turned_back = false;
        for _ in 0..400 {
            engine.update(0.016, &[]);
            let x = engine
                .graph
                .node(n1)
                .entity(walker)
                .transform()
                .center_position()
                .x;
            highest_x = highest_x.max(x);
            if highest_x - x > 30.0 {
                turned_back = true;
            }
        }

        // The walker made it to the far waypoint's reach radius and the
        // patrol policy sent it back.
        assert!(highest_x > 640.0, "walker stalled at x = {}", highest_x);
        assert!(turned_back);
        // Patrol paths never deactivate.
        assert!(engine
            .graph
            .node(n1)
            .entity(walker)
            .path_finder()
            .unwrap()
            .active);
    }

    #[test]
    fn asset_callbacks_drain_during_the_frame_loop() {
        let mut engine = engine();
        let n1 = engine.add_world_node("N1", Rect::new(0.0, 0.0, 100.0, 100.0));
        engine.graph.node_mut(n1).add_layer("main", 1.0);
        engine.set_reference_position(Vector2::new(50.0, 50.0));

        let texture = engine
            .textures
            .load("missing.png", vesper_resource::LoadPolicy::Async);
        let (sender, receiver) = std::sync::mpsc::channel();
        texture.get_with(move |data| {
            let _ = sender.send((data.width(), data.height()));
        });

        // Loads of missing files settle quickly; the callback runs with the
        // default texture during one of the next frame updates.
        let mut received = None;
        for _ in 0..200 {
            engine.update(0.016, &[]);
            if let Ok(size) = receiver.try_recv() {
                received = Some(size);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert_eq!(received, Some((1, 1)));
    }

    #[test]
    fn camera_follow_tracks_entities_across_updates() {
        let mut engine = engine();
        let n1 = engine.add_world_node("N1", Rect::new(0.0, 0.0, 1000.0, 1000.0));
        engine.graph.node_mut(n1).add_layer("main", 1.0);
        engine.set_reference_position(Vector2::new(500.0, 500.0));

        let entity = engine.graph.node_mut(n1).create_entity(
            0,
            EntityBuilder::new()
                .with_position(Vector2::new(500.0, 500.0))
                .with_visual(VisualComponent::new(Rect::new(0.0, 0.0, 8.0, 8.0))),
        );
        engine.set_camera_follow(Some((n1, entity)));

        for _ in 0..600 {
            engine.update(0.016, &[]);
        }
        let center = engine.graph.camera().center();
        assert!((center - Vector2::new(504.0, 504.0)).norm() < 60.0);
    }
}
