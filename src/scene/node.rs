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

//! A world-graph node: one streamable world.
//!
//! A node owns a disjoint entity universe, an ordered stack of render layers
//! sharing the node's world-space rectangle, and the collision state of its
//! contexts. Layer reorderings are queued and flushed at the start of the
//! node update so render order never changes mid-frame.
//!
//! All entity transform mutations go through the node: they fire the change
//! signals and keep the layer quadtree synchronized with the entity's world
//! bounds.

use crate::{
    ai::NavMesh,
    behavior::{BehaviorManager, CallbackKind},
    core::{
        algebra::Vector2,
        log::Log,
        math::Rect,
        pool::Pool,
        signal::Signal,
    },
    physics::{
        collision::{CollisionEvents, CollisionModule},
        mobility,
        path::Path,
        rigidbody::COLLISION_CONTEXTS,
    },
    scene::{
        entity::{Entity, EntityBuilder, EntityData},
        layer::RenderLayer,
    },
};
use std::{collections::VecDeque, path::PathBuf};

/// Change signals fired by the transform handler of a node.
#[derive(Default)]
pub struct TransformSignals {
    pub position_changed: Signal<(Entity, Vector2<f32>)>,
    pub size_changed: Signal<(Entity, Vector2<f32>)>,
    pub scale_changed: Signal<(Entity, Vector2<f32>)>,
}

/// See module docs.
pub struct WorldNode {
    name: String,
    data_path: PathBuf,
    bounds: Rect<f32>,
    loaded: bool,
    entities: Pool<EntityData>,
    layers: Vec<(RenderLayer, bool)>,
    reorder_queue: VecDeque<(usize, bool)>,
    collision: [CollisionModule; COLLISION_CONTEXTS],
    signals: TransformSignals,
    quadtree_capacity: usize,
    quadtree_max_level: u32,
}

impl WorldNode {
    pub fn new<S: Into<String>>(name: S, bounds: Rect<f32>) -> Self {
        Self {
            name: name.into(),
            data_path: PathBuf::new(),
            bounds,
            loaded: false,
            entities: Pool::new(),
            layers: Vec::new(),
            reorder_queue: VecDeque::new(),
            collision: std::array::from_fn(CollisionModule::new),
            signals: TransformSignals::default(),
            quadtree_capacity: crate::core::quadtree::DEFAULT_MAX_CAPACITY,
            quadtree_max_level: crate::core::quadtree::DEFAULT_MAX_LEVEL,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn data_path(&self) -> &PathBuf {
        &self.data_path
    }

    pub fn set_data_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.data_path = path.into();
    }

    #[inline]
    pub fn bounds(&self) -> Rect<f32> {
        self.bounds
    }

    #[inline]
    pub fn position(&self) -> Vector2<f32> {
        self.bounds.position
    }

    #[inline]
    pub fn size(&self) -> Vector2<f32> {
        self.bounds.size
    }

    pub fn set_position(&mut self, position: Vector2<f32>) {
        self.bounds.position = position;
    }

    pub fn move_by(&mut self, offset: Vector2<f32>) {
        self.bounds.position += offset;
    }

    /// Resizes the node and all its layers. A costly operation when layers
    /// have content: every quadtree is rebuilt. Entities that no longer fit
    /// stay linked at their tree's root and are subject to out-of-bounds
    /// transfer.
    pub fn set_size(&mut self, size: Vector2<f32>) {
        self.bounds.size = size;
        for (layer, _) in self.layers.iter_mut() {
            let dropped = layer.set_size(size);
            if !dropped.is_empty() {
                Log::warn(format!(
                    "{} entities left the bounds of layer {} after a resize.",
                    dropped.len(),
                    layer.name()
                ));
            }
        }
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Marks the node loaded. Content is brought in by the scene loader.
    pub fn load(&mut self) {
        self.loaded = true;
    }

    /// Drops all content and marks the node unloaded. The node keeps its
    /// identity, bounds and layer definitions so it can be reloaded.
    pub fn unload(&mut self) {
        self.loaded = false;
        self.entities.clear();
        for (layer, _) in self.layers.iter_mut() {
            layer.quadtree_mut().clear();
        }
        for module in self.collision.iter_mut() {
            module.clear();
        }
    }

    /// Maps a position local to this node into global world coordinates.
    #[inline]
    pub fn map_to_global_position(&self, position: Vector2<f32>) -> Vector2<f32> {
        position + self.bounds.position
    }

    /// Maps a global position into coordinates local to this node.
    #[inline]
    pub fn map_to_local_position(&self, position: Vector2<f32>) -> Vector2<f32> {
        position - self.bounds.position
    }

    pub(crate) fn set_quadtree_limits(&mut self, capacity: usize, max_level: u32) {
        self.quadtree_capacity = capacity;
        self.quadtree_max_level = max_level;
    }

    // ------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------

    /// Registers a new render layer at the end of the stack and returns its
    /// index. The layer is sized to the node.
    pub fn add_layer<S: Into<String>>(&mut self, name: S, render_depth: f32) -> usize {
        self.layers.push((
            RenderLayer::with_limits(
                name,
                render_depth,
                self.bounds.size,
                self.quadtree_capacity,
                self.quadtree_max_level,
            ),
            true,
        ));
        self.layers.len() - 1
    }

    #[inline]
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn layer(&self, index: usize) -> &RenderLayer {
        &self.layers[index].0
    }

    #[inline]
    pub(crate) fn layer_mut(&mut self, index: usize) -> &mut RenderLayer {
        &mut self.layers[index].0
    }

    pub fn layer_by_name(&self, name: &str) -> Option<usize> {
        self.layers
            .iter()
            .position(|(layer, _)| layer.name() == name)
    }

    #[inline]
    pub fn is_layer_active(&self, index: usize) -> bool {
        self.layers[index].1
    }

    pub fn set_layer_active(&mut self, index: usize, active: bool) {
        if let Some(slot) = self.layers.get_mut(index) {
            slot.1 = active;
        }
    }

    /// Active layers in render order.
    pub fn active_layers(&self) -> impl Iterator<Item = (usize, &RenderLayer)> {
        self.layers
            .iter()
            .enumerate()
            .filter(|(_, (_, active))| *active)
            .map(|(index, (layer, _))| (index, layer))
    }

    /// Queues moving the layer one position towards the end of the stack.
    /// Flushed at the start of the next update.
    pub fn move_layer_up(&mut self, index: usize) {
        self.reorder_queue.push_back((index, true));
    }

    /// Queues moving the layer one position towards the front of the stack.
    pub fn move_layer_down(&mut self, index: usize) {
        self.reorder_queue.push_back((index, false));
    }

    fn flush_layer_reorders(&mut self) {
        while let Some((index, up)) = self.reorder_queue.pop_front() {
            if up {
                if index + 1 < self.layers.len() {
                    self.layers.swap(index, index + 1);
                }
            } else if index > 0 {
                self.layers.swap(index, index - 1);
            }
        }
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Creates an entity on the given layer. The transform's content bounds
    /// are fitted to the components of the builder before the entity enters
    /// the layer quadtree.
    pub fn create_entity(&mut self, layer: usize, builder: EntityBuilder) -> Entity {
        let mut data = builder.into_data();
        data.layer = layer;
        let rects = data.content_rects();
        data.transform.refit_to_contents(rects.into_iter());
        let bounds = data.transform.bounds();

        let entity = self.entities.spawn(data);
        if !self.layers[layer].0.quadtree_mut().insert(entity, bounds) {
            Log::warn(format!(
                "Entity {} was spawned outside the bounds of layer {}.",
                entity,
                self.layers[layer].0.name()
            ));
        }
        entity
    }

    /// Destroys the entity, removing it from its layer quadtree. Only the
    /// universe of a node may destroy its entities.
    pub fn destroy_entity(&mut self, entity: Entity) {
        let Some(data) = self.entities.try_borrow(entity) else {
            return;
        };
        let layer = data.layer;
        self.layers[layer].0.quadtree_mut().remove(entity);
        for module in self.collision.iter_mut() {
            module.forget_entity(entity);
        }
        let _ = self.entities.free(entity);
    }

    /// Removes the entity's record from this universe without dropping it,
    /// for transfer into another node.
    pub(crate) fn extract_entity(&mut self, entity: Entity) -> Option<EntityData> {
        let data = self.entities.try_borrow(entity)?;
        let layer = data.layer;
        self.layers[layer].0.quadtree_mut().remove(entity);
        for module in self.collision.iter_mut() {
            module.forget_entity(entity);
        }
        self.entities.try_free(entity)
    }

    /// Adopts an entity record extracted from another node. The record lands
    /// on the layer with the given index, clamped to the available stack.
    pub(crate) fn adopt_entity(&mut self, mut data: EntityData) -> Entity {
        let layer = data.layer.min(self.layers.len().saturating_sub(1));
        data.layer = layer;
        let bounds = data.transform.bounds();
        let entity = self.entities.spawn(data);
        self.layers[layer].0.quadtree_mut().insert(entity, bounds);
        entity
    }

    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_valid_handle(entity)
    }

    #[inline]
    pub fn entity(&self, entity: Entity) -> &EntityData {
        self.entities.borrow(entity)
    }

    #[inline]
    pub fn entity_mut(&mut self, entity: Entity) -> &mut EntityData {
        self.entities.borrow_mut(entity)
    }

    #[inline]
    pub fn try_entity(&self, entity: Entity) -> Option<&EntityData> {
        self.entities.try_borrow(entity)
    }

    #[inline]
    pub fn try_entity_mut(&mut self, entity: Entity) -> Option<&mut EntityData> {
        self.entities.try_borrow_mut(entity)
    }

    /// Snapshot of all entity handles; safe to iterate while mutating.
    pub fn entities(&self) -> Vec<Entity> {
        self.entities.handles()
    }

    #[inline]
    pub fn entity_count(&self) -> u32 {
        self.entities.alive_count()
    }

    // ------------------------------------------------------------------
    // Transform handler
    // ------------------------------------------------------------------

    #[inline]
    pub fn transform_signals(&self) -> &TransformSignals {
        &self.signals
    }

    /// Sets the entity position, fires the position signal and rebalances the
    /// quadtree.
    pub fn set_entity_position(&mut self, entity: Entity, position: Vector2<f32>) {
        let data = self.entities.borrow_mut(entity);
        data.transform.position = position;
        let bounds = data.transform.bounds();
        let layer = data.layer;
        self.layers[layer]
            .0
            .quadtree_mut()
            .changed_properties(entity, bounds);
        self.signals.position_changed.emit(&(entity, position));
    }

    /// Moves the entity, fires the position signal and rebalances the
    /// quadtree.
    pub fn move_entity(&mut self, entity: Entity, offset: Vector2<f32>) {
        let data = self.entities.borrow_mut(entity);
        data.transform.position += offset;
        let position = data.transform.position();
        let bounds = data.transform.bounds();
        let layer = data.layer;
        self.layers[layer]
            .0
            .quadtree_mut()
            .changed_properties(entity, bounds);
        self.signals.position_changed.emit(&(entity, position));
    }

    /// Sets the entity scale, fires scale and size signals and rebalances the
    /// quadtree.
    pub fn set_entity_scale(&mut self, entity: Entity, scale: Vector2<f32>) {
        let data = self.entities.borrow_mut(entity);
        data.transform.scale = scale;
        let size = data.transform.size();
        let bounds = data.transform.bounds();
        let layer = data.layer;
        self.layers[layer]
            .0
            .quadtree_mut()
            .changed_properties(entity, bounds);
        self.signals.size_changed.emit(&(entity, size));
        self.signals.scale_changed.emit(&(entity, scale));
    }

    pub fn set_entity_baseline_offsets(&mut self, entity: Entity, offsets: Vector2<f32>) {
        self.entities.borrow_mut(entity).transform.baseline_offsets = offsets;
    }

    /// Called when a content-reporting component (visual, collider, shadow
    /// emitter) changed its local bounds. Growth is applied directly; a
    /// potential shrink re-fits the bounds against all remaining reporters.
    /// Size signal and quadtree rebalance fire only if the union changed.
    pub fn notify_content_changed(&mut self, entity: Entity, content: Rect<f32>) {
        let data = self.entities.borrow_mut(entity);
        let grew = data.transform.grow_to_contain(content);
        let shrank = if grew {
            false
        } else {
            let rects = data.content_rects();
            data.transform.refit_to_contents(rects.into_iter())
        };

        if grew || shrank {
            let size = data.transform.size();
            let bounds = data.transform.bounds();
            let layer = data.layer;
            self.layers[layer]
                .0
                .quadtree_mut()
                .changed_properties(entity, bounds);
            self.signals.size_changed.emit(&(entity, size));
        }
    }

    /// Called after a content-reporting component was removed. Re-fits the
    /// bounds; fires only on an actual shrink.
    pub fn notify_content_removed(&mut self, entity: Entity) {
        let data = self.entities.borrow_mut(entity);
        let rects = data.content_rects();
        if data.transform.refit_to_contents(rects.into_iter()) {
            let size = data.transform.size();
            let bounds = data.transform.bounds();
            let layer = data.layer;
            self.layers[layer]
                .0
                .quadtree_mut()
                .changed_properties(entity, bounds);
            self.signals.size_changed.emit(&(entity, size));
        }
    }

    /// Attaches a collider to the entity in the given collision context and
    /// reports its bounds to the transform handler.
    pub fn add_rigidbody(
        &mut self,
        entity: Entity,
        context: usize,
        body: crate::physics::rigidbody::Rigidbody,
    ) {
        let content = {
            let local = crate::scene::transform::TransformComponent::default();
            let content = body.collider().bounding_box(&local);
            self.entities.borrow_mut(entity).rigidbodies[context].push(body);
            content
        };
        self.notify_content_changed(entity, content);
    }

    /// Removes all colliders of the entity in the given context, shrinking
    /// the content bounds accordingly.
    pub fn clear_rigidbodies(&mut self, entity: Entity, context: usize) {
        self.entities.borrow_mut(entity).rigidbodies[context].clear();
        self.notify_content_removed(entity);
    }

    /// Attaches a light-blocking collider and reports its bounds.
    pub fn add_shadow_emitter(
        &mut self,
        entity: Entity,
        emitter: crate::renderer::light::ShadowEmitterComponent,
    ) {
        let content = {
            let local = crate::scene::transform::TransformComponent::default();
            let content = emitter.collider.bounding_box(&local);
            self.entities.borrow_mut(entity).shadow_emitters.push(emitter);
            content
        };
        self.notify_content_changed(entity, content);
    }

    // ------------------------------------------------------------------
    // Per-frame update
    // ------------------------------------------------------------------

    /// Runs the given behavior callback on every scripted entity.
    pub fn run_behaviors(&mut self, manager: &BehaviorManager, kind: CallbackKind, delta: f32) {
        for entity in self.entities.handles() {
            if let Some(data) = self.entities.try_borrow_mut(entity) {
                if let Some(instance) = data.behavior.as_mut() {
                    manager.run(kind, instance, entity, delta);
                }
            }
        }
    }

    /// Runs one behavior callback on a single entity, if it is scripted.
    pub fn run_behavior_on(
        &mut self,
        manager: &BehaviorManager,
        entity: Entity,
        kind: CallbackKind,
        delta: f32,
    ) {
        if let Some(data) = self.entities.try_borrow_mut(entity) {
            if let Some(instance) = data.behavior.as_mut() {
                manager.run(kind, instance, entity, delta);
            }
        }
    }

    /// Steers every active path follower towards its current waypoint and
    /// advances traversal state when waypoints are reached.
    pub fn update_path_followers(&mut self, navmesh: Option<&NavMesh>, delta: f32) {
        for entity in self.entities.handles() {
            let Some(data) = self.entities.try_borrow_mut(entity) else {
                continue;
            };
            let center = data.transform.center_position();
            let EntityData {
                path_finder,
                mobility: mobility_component,
                ..
            } = data;
            let (Some(path_finder), Some(mobility_component)) =
                (path_finder.as_mut(), mobility_component.as_mut())
            else {
                continue;
            };
            if !path_finder.active {
                continue;
            }
            let Some(waypoint) = path_finder
                .path
                .as_ref()
                .and_then(|path| path.current_waypoint(navmesh))
            else {
                continue;
            };

            path_finder.time_past += delta;
            mobility::seek(
                &mut mobility_component.unit,
                center,
                waypoint,
                path_finder.speed,
            );

            if (waypoint - center).norm() < path_finder.radius {
                path_finder.waypoint_reached();
            }
        }
    }

    /// Converts accumulated steering into motion and writes the transforms,
    /// rebalancing quadtrees along the way. Acceleration is zeroed for the
    /// next frame.
    pub fn update_mobility(&mut self, delta: f32) {
        for entity in self.entities.handles() {
            let Some(data) = self.entities.try_borrow_mut(entity) else {
                continue;
            };
            let Some(component) = data.mobility.as_mut() else {
                continue;
            };
            mobility::mobilize(
                &mut component.unit,
                component.max_force,
                component.max_velocity,
            );
            let velocity = component.unit.velocity;
            mobility::reset_acceleration(&mut component.unit);

            if velocity.x != 0.0 || velocity.y != 0.0 {
                self.move_entity(entity, velocity * delta);
            }
        }
    }

    /// Applies every active light affector to its paired light.
    pub fn update_light_affectors(&mut self, delta: f32) {
        for data in self.entities.iter_mut() {
            let EntityData {
                light_emitters,
                light_affectors,
                ..
            } = data;
            for (affector, emitter) in light_affectors.iter_mut().zip(light_emitters.iter_mut()) {
                affector.apply(delta, &mut emitter.light);
            }
        }
    }

    /// Runs broad and narrow phase of the given collision context over all
    /// active layers and returns this frame's contact and begin/end events.
    pub fn check_collisions(&mut self, context: usize) -> CollisionEvents {
        let mut module = std::mem::replace(&mut self.collision[context], CollisionModule::new(context));
        let mut events = CollisionEvents::default();
        for (layer, active) in self.layers.iter() {
            if *active {
                module.run(layer.quadtree(), &self.entities, &mut events);
            }
        }
        module.finish_frame(&mut events);
        self.collision[context] = module;
        events
    }

    /// Default collision reaction: translate the first entity of every
    /// contact by the minimum translation vector, which prevents
    /// interpenetration without simulating restitution.
    pub fn resolve_contacts(&mut self, events: &CollisionEvents) {
        for contact in &events.contacts {
            if self
                .try_entity(contact.first)
                .is_some_and(|data| data.mobility.is_some())
            {
                self.move_entity(contact.first, contact.mtv);
            }
        }
    }

    /// Per-frame node work that precedes rendering, in the fixed frame order.
    pub fn update(
        &mut self,
        manager: &BehaviorManager,
        navmesh: Option<&NavMesh>,
        delta: f32,
    ) -> Vec<CollisionEvents> {
        self.flush_layer_reorders();
        self.run_behaviors(manager, CallbackKind::OnUpdate, delta);
        self.update_path_followers(navmesh, delta);
        self.update_mobility(delta);
        self.update_light_affectors(delta);

        let mut all_events = Vec::with_capacity(COLLISION_CONTEXTS);
        for context in 0..COLLISION_CONTEXTS {
            let events = self.check_collisions(context);
            if context == crate::physics::rigidbody::MOVEMENT_COLLISION_CONTEXT {
                self.resolve_contacts(&events);
            }
            all_events.push(events);
        }
        all_events
    }

    /// Stops an entity that follows a path, clearing the path.
    pub fn clear_entity_path(&mut self, entity: Entity) {
        if let Some(data) = self.entities.try_borrow_mut(entity) {
            if let Some(path_finder) = data.path_finder.as_mut() {
                path_finder.path = None;
                path_finder.active = false;
            }
        }
    }

    /// Assigns a path to an entity.
    pub fn set_entity_path(
        &mut self,
        entity: Entity,
        path: Path,
        policy: crate::physics::path::FollowPolicy,
        speed: f32,
        radius: f32,
    ) {
        if let Some(data) = self.entities.try_borrow_mut(entity) {
            let path_finder = data.path_finder.get_or_insert_with(Default::default);
            path_finder.set_path(path, policy, speed, radius);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scene::entity::EntityBuilder;

    fn test_node() -> WorldNode {
        let mut node = WorldNode::new("test", Rect::new(0.0, 0.0, 1000.0, 1000.0));
        node.add_layer("main", 1.0);
        node
    }

    #[test]
    fn entity_lives_in_its_layer_quadtree() {
        let mut node = test_node();
        let entity = node.create_entity(
            0,
            EntityBuilder::new()
                .with_position(crate::core::algebra::Vector2::new(100.0, 100.0))
                .with_visual(crate::scene::entity::VisualComponent::new(Rect::new(
                    0.0, 0.0, 32.0, 32.0,
                ))),
        );

        assert!(node.is_alive(entity));
        assert!(node.layer(0).quadtree().owner(entity).is_some());
        assert_eq!(
            node.entity(entity).transform().bounds(),
            Rect::new(100.0, 100.0, 32.0, 32.0)
        );
    }

    #[test]
    fn moving_an_entity_updates_tree_and_fires_signal() {
        let mut node = test_node();
        let entity = node.create_entity(
            0,
            EntityBuilder::new().with_visual(crate::scene::entity::VisualComponent::new(
                Rect::new(0.0, 0.0, 8.0, 8.0),
            )),
        );

        let moved = std::rc::Rc::new(std::cell::Cell::new(false));
        let flag = moved.clone();
        let _sub = node
            .transform_signals()
            .position_changed
            .connect(move |_| flag.set(true));

        node.move_entity(entity, crate::core::algebra::Vector2::new(500.0, 500.0));
        assert!(moved.get());
        assert_eq!(
            node.layer(0).quadtree().element_bounds(entity),
            Some(Rect::new(500.0, 500.0, 8.0, 8.0))
        );
    }

    #[test]
    fn destroying_removes_from_quadtree() {
        let mut node = test_node();
        let entity = node.create_entity(0, EntityBuilder::new());
        node.destroy_entity(entity);
        assert!(!node.is_alive(entity));
        assert!(node.layer(0).quadtree().owner(entity).is_none());
    }

    #[test]
    fn layer_reorders_are_deferred_until_update_flush(){
        let mut node = test_node();
        node.add_layer("background", 0.5);

        node.move_layer_up(0);
        assert_eq!(node.layer(0).name(), "main");

        node.flush_layer_reorders();
        assert_eq!(node.layer(0).name(), "background");
        assert_eq!(node.layer(1).name(), "main");
    }

    #[test]
    fn unload_drops_content_but_keeps_layers() {
        let mut node = test_node();
        node.load();
        let entity = node.create_entity(0, EntityBuilder::new());
        node.unload();

        assert!(!node.is_loaded());
        assert!(!node.is_alive(entity));
        assert_eq!(node.layer_count(), 1);
        assert_eq!(node.layer(0).quadtree().size(), 0);
    }

    #[test]
    fn adding_a_rigidbody_grows_the_content_bounds() {
        let mut node = test_node();
        let entity = node.create_entity(
            0,
            EntityBuilder::new().with_visual(crate::scene::entity::VisualComponent::new(
                Rect::new(0.0, 0.0, 8.0, 8.0),
            )),
        );

        node.add_rigidbody(
            entity,
            0,
            crate::physics::rigidbody::Rigidbody::new(
                crate::physics::collider::Collider::rotated_rect(
                    crate::core::algebra::Vector2::new(0.0, 0.0),
                    crate::core::algebra::Vector2::new(20.0, 20.0),
                    0.0,
                ),
            ),
        );
        assert_eq!(
            node.entity(entity).transform().size(),
            crate::core::algebra::Vector2::new(20.0, 20.0)
        );

        node.clear_rigidbodies(entity, 0);
        assert_eq!(
            node.entity(entity).transform().size(),
            crate::core::algebra::Vector2::new(8.0, 8.0)
        );
    }

    #[test]
    fn content_growth_fires_size_change_only_when_union_changes() {
        let mut node = test_node();
        let entity = node.create_entity(
            0,
            EntityBuilder::new().with_visual(crate::scene::entity::VisualComponent::new(
                Rect::new(0.0, 0.0, 10.0, 10.0),
            )),
        );

        let size_changes = std::rc::Rc::new(std::cell::Cell::new(0));
        let counter = size_changes.clone();
        let _sub = node
            .transform_signals()
            .size_changed
            .connect(move |_| counter.set(counter.get() + 1));

        // A content rect inside the current union changes nothing.
        node.notify_content_changed(entity, Rect::new(2.0, 2.0, 4.0, 4.0));
        assert_eq!(size_changes.get(), 0);

        // A larger one grows the union.
        node.notify_content_changed(entity, Rect::new(0.0, 0.0, 20.0, 10.0));
        assert_eq!(size_changes.get(), 1);
        assert_eq!(
            node.entity(entity).transform().size(),
            crate::core::algebra::Vector2::new(20.0, 10.0)
        );
    }
}
