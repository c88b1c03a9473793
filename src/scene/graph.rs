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

//! The world graph: a set of spatially adjacent worlds streamed in and out
//! around a reference position.
//!
//! Nodes form an undirected graph. The node containing the reference position
//! is the *active* node; a breadth-first search up to the neighborhood
//! distance decides which nodes stay loaded. When the active node changes the
//! camera center is translated by the difference of the node positions, so
//! the visible world stays continuous across the switch - node-local
//! coordinates never leak into the camera.
//!
//! A world-space quadtree over the node bounds answers "which node contains
//! this point" queries; it grows by an overextension factor whenever a node
//! outgrows it.

use crate::{
    core::{
        algebra::Vector2,
        log::Log,
        math::Rect,
        quadtree::QuadTree,
        signal::Signal,
    },
    scene::{camera::Camera, entity::Entity, node::WorldNode},
};
use fxhash::FxHashSet;
use std::collections::{BTreeSet, VecDeque};

/// Bounds of the node quadtree are overextended by this factor on resize.
const RESCALE_FACTOR: f32 = 1.5;

/// Default neighborhood distance.
pub const DEFAULT_DISTANCE: u32 = 1;

/// Load/unload work produced by a reference-position update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeDiff {
    pub loaded: Vec<usize>,
    pub unloaded: Vec<usize>,
}

/// An entity that left its node and found another loaded node to live in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EntityTransfer {
    pub entity: Entity,
    pub from: usize,
    pub to: usize,
}

/// See module docs.
pub struct WorldGraph {
    nodes: Vec<WorldNode>,
    adjacency: Vec<FxHashSet<usize>>,
    node_quadtree: QuadTree<usize>,
    reference_position: Vector2<f32>,
    /// No streaming happens before the first explicit reference update.
    has_reference: bool,
    active: Option<usize>,
    neighborhood: BTreeSet<usize>,
    distance: u32,
    camera: Camera,
    pub active_node_changed: Signal<(usize, usize)>,
    pub entity_changed_node: Signal<EntityTransfer>,
}

impl WorldGraph {
    pub fn new(camera: Camera) -> Self {
        Self::with_distance(camera, DEFAULT_DISTANCE)
    }

    pub fn with_distance(camera: Camera, distance: u32) -> Self {
        Self {
            nodes: Vec::new(),
            adjacency: Vec::new(),
            node_quadtree: QuadTree::new(Rect::default()),
            reference_position: Vector2::default(),
            has_reference: false,
            active: None,
            neighborhood: BTreeSet::new(),
            distance,
            camera,
            active_node_changed: Signal::new(),
            entity_changed_node: Signal::new(),
        }
    }

    #[inline]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    #[inline]
    pub fn distance(&self) -> u32 {
        self.distance
    }

    /// Changes the neighborhood distance and reevaluates the loaded set.
    pub fn set_distance(&mut self, distance: u32) -> NodeDiff {
        self.distance = distance;
        self.refresh()
    }

    #[inline]
    pub fn reference_position(&self) -> Vector2<f32> {
        self.reference_position
    }

    #[inline]
    pub fn active_node(&self) -> Option<usize> {
        self.active
    }

    /// Indices of the currently loaded nodes, in ascending order.
    pub fn loaded_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.neighborhood.iter().copied()
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn node(&self, index: usize) -> &WorldNode {
        &self.nodes[index]
    }

    #[inline]
    pub fn node_mut(&mut self, index: usize) -> &mut WorldNode {
        &mut self.nodes[index]
    }

    pub fn node_by_name(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.name() == name)
    }

    /// Creates a new node and registers its bounds in the node quadtree.
    pub fn create_node<S: Into<String>>(&mut self, name: S, bounds: Rect<f32>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(WorldNode::new(name, bounds));
        self.adjacency.push(FxHashSet::default());
        self.notify_bounds_changed(index);
        index
    }

    /// Adds an undirected edge and reevaluates the loaded set: a newly
    /// connected node within range is loaded right away.
    pub fn connect(&mut self, a: usize, b: usize) -> NodeDiff {
        if a != b && a < self.nodes.len() && b < self.nodes.len() {
            self.adjacency[a].insert(b);
            self.adjacency[b].insert(a);
        }
        self.refresh()
    }

    /// Removes an edge; a node kept in range only through it is unloaded.
    pub fn disconnect(&mut self, a: usize, b: usize) -> NodeDiff {
        if a < self.nodes.len() && b < self.nodes.len() {
            self.adjacency[a].remove(&b);
            self.adjacency[b].remove(&a);
        }
        self.refresh()
    }

    /// True if an edge connects the two nodes.
    pub fn are_connected(&self, a: usize, b: usize) -> bool {
        self.adjacency.get(a).is_some_and(|set| set.contains(&b))
    }

    /// Finds the node containing the given world position.
    pub fn node_at(&self, position: Vector2<f32>) -> Option<usize> {
        let mut candidates = Vec::new();
        self.node_quadtree
            .retrieve(Rect::new(position.x, position.y, 1.0, 1.0), &mut candidates);
        candidates
            .into_iter()
            .find(|index| self.nodes[*index].bounds().contains(position))
    }

    /// Centers the reference on the named node and loads its neighborhood.
    pub fn activate_node(&mut self, name: &str) -> NodeDiff {
        match self.node_by_name(name) {
            Some(index) => {
                let center = self.nodes[index].bounds().center();
                self.update_reference_position(center)
            }
            None => {
                Log::err(format!(
                    "Tried to activate a world graph node that does not exist: {}",
                    name
                ));
                NodeDiff::default()
            }
        }
    }

    /// Moves the reference position, recomputing the active node and the
    /// loaded neighborhood. Nodes leaving the neighborhood are unloaded,
    /// nodes entering it are loaded; the intersection stays untouched. On an
    /// active-node switch the camera keeps its world position relative to the
    /// new node and `active_node_changed` fires.
    pub fn update_reference_position(&mut self, position: Vector2<f32>) -> NodeDiff {
        self.has_reference = true;
        self.set_reference_position(position, true)
    }

    /// Reevaluates the neighborhood without moving the reference. Does
    /// nothing until the first explicit reference update.
    fn refresh(&mut self) -> NodeDiff {
        if !self.has_reference {
            return NodeDiff::default();
        }
        self.set_reference_position(self.reference_position, false)
    }

    fn set_reference_position(&mut self, position: Vector2<f32>, ignore_identity: bool) -> NodeDiff {
        self.reference_position = position;

        let node = self.node_at(position);
        let old_active = self.active;

        // The new node may have any distance to the last one; they do not
        // have to be neighbors. The desired loaded set B comes from a BFS
        // around the new active node, the current set is A: unload A \ B,
        // load B \ A, keep the intersection as-is.
        let desired = match node {
            Some(index) => {
                if ignore_identity && old_active == Some(index) {
                    return NodeDiff::default();
                }
                self.active = Some(index);
                self.bfs(index)
            }
            None => {
                if ignore_identity && old_active.is_none() {
                    return NodeDiff::default();
                }
                self.active = None;
                BTreeSet::new()
            }
        };

        let mut diff = NodeDiff::default();
        for index in self.neighborhood.difference(&desired) {
            diff.unloaded.push(*index);
        }
        for index in desired.difference(&self.neighborhood) {
            diff.loaded.push(*index);
        }
        for index in &diff.unloaded {
            self.nodes[*index].unload();
        }
        for index in &diff.loaded {
            self.nodes[*index].load();
        }
        self.neighborhood = desired;

        if let Some(new_active) = self.active {
            if old_active != Some(new_active) {
                if let Some(old_index) = old_active {
                    // Keep the visual world continuous across the switch.
                    let shift =
                        self.nodes[old_index].position() - self.nodes[new_active].position();
                    self.camera.translate(shift);
                    self.active_node_changed.emit(&(old_index, new_active));
                } else {
                    let node_position = self.nodes[new_active].position();
                    let center = self.camera.center();
                    self.camera.look_at(center - node_position);
                }
                Log::info(format!(
                    "New active node: {}",
                    self.nodes[new_active].name()
                ));
            }
        }

        diff
    }

    fn bfs(&self, start: usize) -> BTreeSet<usize> {
        let mut discovered = BTreeSet::new();
        let mut queue = VecDeque::new();
        discovered.insert(start);
        queue.push_back((start, 0u32));

        while let Some((current, depth)) = queue.pop_front() {
            if depth == self.distance {
                continue;
            }
            for neighbour in self.adjacency[current].iter() {
                if discovered.insert(*neighbour) {
                    queue.push_back((*neighbour, depth + 1));
                }
            }
        }
        discovered
    }

    /// Must be called when a node's bounds changed. The node quadtree's
    /// bounds are overextended by [`RESCALE_FACTOR`] when the node outgrows
    /// them, which requires a full rebuild of the tree.
    pub fn notify_bounds_changed(&mut self, index: usize) {
        self.node_quadtree.remove(index);

        let tree_bounds = self.node_quadtree.bounds();
        let node_bounds = self.nodes[index].bounds();

        let mut left = tree_bounds.position.x;
        let mut top = tree_bounds.position.y;
        let mut width = tree_bounds.size.x;
        let mut height = tree_bounds.size.y;

        let left_diff = node_bounds.position.x - left;
        let top_diff = node_bounds.position.y - top;
        if left_diff < 0.0 {
            left += left_diff * RESCALE_FACTOR;
            width -= left_diff * RESCALE_FACTOR;
        }
        if top_diff < 0.0 {
            top += top_diff * RESCALE_FACTOR;
            height -= top_diff * RESCALE_FACTOR;
        }

        let right_diff = node_bounds.position.x + node_bounds.size.x - (left + width);
        let bottom_diff = node_bounds.position.y + node_bounds.size.y - (top + height);
        if right_diff > 0.0 {
            width += right_diff * RESCALE_FACTOR;
        }
        if bottom_diff > 0.0 {
            height += bottom_diff * RESCALE_FACTOR;
        }

        let new_bounds = Rect::new(left, top, width, height);
        if new_bounds != tree_bounds {
            let dropped = self.node_quadtree.set_bounds(new_bounds);
            for node in dropped {
                let bounds = self.nodes[node].bounds();
                self.node_quadtree.insert(node, bounds);
            }
        }
        self.node_quadtree.insert(index, node_bounds);

        self.refresh();
    }

    /// Scans every loaded node for movable entities that left the bounds of
    /// their layer quadtree. For each such entity that fits another loaded
    /// node, a transfer is emitted and returned; entities with no receiving
    /// node stay where they are. Entities without a movement component are
    /// skipped.
    pub fn check_out_of_bounds(&mut self) -> Vec<EntityTransfer> {
        let mut transfers = Vec::new();

        for from in self.neighborhood.iter().copied() {
            let node = &self.nodes[from];
            for (_, layer) in node.active_layers() {
                let tree = layer.quadtree();
                // Wanderers collect in the tree's root container, so only the
                // root entries need to be inspected.
                for (entity, _) in tree.node(tree.root()).entries() {
                    let Some(data) = node.try_entity(*entity) else {
                        continue;
                    };
                    if data.mobility().is_none() {
                        continue;
                    }
                    let bounds = data.transform().bounds();
                    if tree.bounds().contains_rect(&bounds) {
                        continue;
                    }

                    let global = bounds.translate(node.position());
                    let mut candidates = Vec::new();
                    self.node_quadtree.retrieve(global, &mut candidates);
                    let target = candidates.into_iter().find(|candidate| {
                        *candidate != from
                            && self.neighborhood.contains(candidate)
                            && self.nodes[*candidate].bounds().intersects(global)
                    });

                    if let Some(to) = target {
                        transfers.push(EntityTransfer {
                            entity: *entity,
                            from,
                            to,
                        });
                    }
                }
            }
        }

        for transfer in &transfers {
            self.entity_changed_node.emit(transfer);
        }
        transfers
    }

    /// Moves an entity's record between two nodes, rebasing its position into
    /// the coordinate system of the receiving node. Returns the entity's new
    /// handle.
    pub fn transfer_entity(&mut self, transfer: EntityTransfer) -> Option<Entity> {
        let offset = self.nodes[transfer.from].position() - self.nodes[transfer.to].position();
        let mut data = self.nodes[transfer.from].extract_entity(transfer.entity)?;
        data.transform.position += offset;
        Some(self.nodes[transfer.to].adopt_entity(data))
    }

    /// Unloads every node and clears the active state.
    pub fn unload_all(&mut self) {
        for index in std::mem::take(&mut self.neighborhood) {
            self.nodes[index].unload();
        }
        self.active = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scene::entity::EntityBuilder;

    fn three_in_a_row() -> WorldGraph {
        let mut graph = WorldGraph::new(Camera::new(Vector2::new(100.0, 100.0)));
        let n1 = graph.create_node("N1", Rect::new(0.0, 0.0, 100.0, 100.0));
        let n2 = graph.create_node("N2", Rect::new(100.0, 0.0, 100.0, 100.0));
        let n3 = graph.create_node("N3", Rect::new(200.0, 0.0, 100.0, 100.0));
        graph.connect(n1, n2);
        graph.connect(n2, n3);
        for i in 0..3 {
            graph.node_mut(i).add_layer("main", 1.0);
        }
        graph
    }

    #[test]
    fn neighborhood_follows_reference_position() {
        let mut graph = three_in_a_row();

        let diff = graph.update_reference_position(Vector2::new(50.0, 50.0));
        assert_eq!(graph.active_node(), Some(0));
        assert_eq!(diff.loaded, vec![0, 1]);
        assert_eq!(graph.loaded_nodes().collect::<Vec<_>>(), vec![0, 1]);
        assert!(graph.node(0).is_loaded() && graph.node(1).is_loaded());
        assert!(!graph.node(2).is_loaded());

        let diff = graph.update_reference_position(Vector2::new(150.0, 50.0));
        assert_eq!(graph.active_node(), Some(1));
        assert_eq!(diff.loaded, vec![2]);
        assert!(diff.unloaded.is_empty());
        assert_eq!(graph.loaded_nodes().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn active_switch_translates_camera_and_fires_signal() {
        let mut graph = three_in_a_row();
        graph.update_reference_position(Vector2::new(50.0, 50.0));

        graph.camera_mut().look_at(Vector2::new(10.0, 20.0));

        let fired = std::rc::Rc::new(std::cell::Cell::new(None));
        let sink = fired.clone();
        let _sub = graph
            .active_node_changed
            .connect(move |(old, new)| sink.set(Some((*old, *new))));

        graph.update_reference_position(Vector2::new(150.0, 50.0));

        // N1.position - N2.position = (-100, 0).
        assert_eq!(graph.camera().center(), Vector2::new(-90.0, 20.0));
        assert_eq!(fired.get(), Some((0, 1)));
    }

    #[test]
    fn leaving_all_nodes_unloads_everything() {
        let mut graph = three_in_a_row();
        graph.update_reference_position(Vector2::new(50.0, 50.0));
        let diff = graph.update_reference_position(Vector2::new(5000.0, 5000.0));

        assert_eq!(graph.active_node(), None);
        assert_eq!(diff.unloaded, vec![0, 1]);
        assert_eq!(graph.loaded_nodes().count(), 0);
    }

    #[test]
    fn disconnect_unloads_out_of_range_neighbors() {
        let mut graph = three_in_a_row();
        graph.update_reference_position(Vector2::new(150.0, 50.0));
        assert_eq!(graph.loaded_nodes().collect::<Vec<_>>(), vec![0, 1, 2]);

        let diff = graph.disconnect(1, 2);
        assert_eq!(diff.unloaded, vec![2]);
        assert!(!graph.node(2).is_loaded());
    }

    #[test]
    fn node_quadtree_rescales_for_outgrowing_nodes() {
        let mut graph = WorldGraph::new(Camera::new(Vector2::new(100.0, 100.0)));
        graph.create_node("small", Rect::new(0.0, 0.0, 100.0, 100.0));
        // A node far outside the current tree bounds.
        graph.create_node("far", Rect::new(10_000.0, 0.0, 100.0, 100.0));

        assert_eq!(graph.node_at(Vector2::new(50.0, 50.0)), Some(0));
        assert_eq!(graph.node_at(Vector2::new(10_050.0, 50.0)), Some(1));
        assert_eq!(graph.node_at(Vector2::new(5_000.0, 50.0)), None);
    }

    #[test]
    fn out_of_bounds_entities_transfer_to_adjacent_nodes() {
        let mut graph = three_in_a_row();
        graph.update_reference_position(Vector2::new(50.0, 50.0));

        // A movable entity near the right edge of N1 walks over into N2.
        let entity = graph.node_mut(0).create_entity(
            0,
            EntityBuilder::new()
                .with_position(Vector2::new(50.0, 50.0))
                .with_mobility(Default::default())
                .with_visual(crate::scene::entity::VisualComponent::new(Rect::new(
                    0.0, 0.0, 10.0, 10.0,
                ))),
        );
        graph.node_mut(0).move_entity(entity, Vector2::new(80.0, 0.0));

        let transfers = graph.check_out_of_bounds();
        assert_eq!(
            transfers,
            vec![EntityTransfer {
                entity,
                from: 0,
                to: 1
            }]
        );

        let new_entity = graph.transfer_entity(transfers[0]).unwrap();
        assert!(!graph.node(0).is_alive(entity));
        assert!(graph.node(1).is_alive(new_entity));
        // 130 in N1 coordinates is 30 in N2 coordinates.
        assert_eq!(
            graph.node(1).entity(new_entity).transform().position(),
            Vector2::new(30.0, 50.0)
        );
    }

    #[test]
    fn entities_without_mobility_are_not_transferred() {
        let mut graph = three_in_a_row();
        graph.update_reference_position(Vector2::new(50.0, 50.0));

        let entity = graph.node_mut(0).create_entity(
            0,
            EntityBuilder::new().with_position(Vector2::new(130.0, 50.0)).with_visual(
                crate::scene::entity::VisualComponent::new(Rect::new(0.0, 0.0, 10.0, 10.0)),
            ),
        );
        assert!(graph.check_out_of_bounds().is_empty());
        assert!(graph.node(0).is_alive(entity));
    }
}
