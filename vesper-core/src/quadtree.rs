//! Quadtree to subdivide two-dimensional space.
//!
//! Every element is stored in exactly one node and the tree keeps a map from
//! element to the node it is stored in, which makes owner lookups and removals
//! constant time. Nodes are kept in a generational arena ([`Pool`]); a node
//! refers to its parent and children by handle, never by pointer.
//!
//! Elements that do not fit entirely into the root bounds stay linked to the
//! root node so they remain discoverable (for example for out-of-bounds
//! transfer between worlds); inserting such an element reports `false`.

use crate::{
    algebra::Vector2,
    math::Rect,
    pool::{Handle, Pool},
};
use fxhash::FxHashMap;
use std::hash::Hash;

/// Default maximum number of elements a node can hold before it subdivides.
pub const DEFAULT_MAX_CAPACITY: usize = 5;
/// Default deepest level the tree can grow to.
pub const DEFAULT_MAX_LEVEL: u32 = 16;

/// A single node of a quadtree. A node has either four children or none.
#[derive(Clone, Debug)]
pub struct QuadTreeNode<T> {
    bounds: Rect<f32>,
    level: u32,
    parent: Handle<QuadTreeNode<T>>,
    children: Option<[Handle<QuadTreeNode<T>>; 4]>,
    entries: Vec<(T, Rect<f32>)>,
}

impl<T> QuadTreeNode<T> {
    fn new(bounds: Rect<f32>, level: u32, parent: Handle<QuadTreeNode<T>>) -> Self {
        Self {
            bounds,
            level,
            parent,
            children: None,
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn bounds(&self) -> Rect<f32> {
        self.bounds
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// Elements stored at this node together with their bounds.
    #[inline]
    pub fn entries(&self) -> &[(T, Rect<f32>)] {
        &self.entries
    }

    /// A node is empty if it has no children and holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_none() && self.entries.is_empty()
    }
}

/// See module docs.
#[derive(Clone, Debug)]
pub struct QuadTree<T>
where
    T: Copy + Eq + Hash,
{
    nodes: Pool<QuadTreeNode<T>>,
    root: Handle<QuadTreeNode<T>>,
    owners: FxHashMap<T, Handle<QuadTreeNode<T>>>,
    max_capacity: usize,
    max_level: u32,
}

impl<T> Default for QuadTree<T>
where
    T: Copy + Eq + Hash,
{
    fn default() -> Self {
        Self::new(Rect::default())
    }
}

impl<T> QuadTree<T>
where
    T: Copy + Eq + Hash,
{
    pub fn new(bounds: Rect<f32>) -> Self {
        Self::with_limits(bounds, DEFAULT_MAX_CAPACITY, DEFAULT_MAX_LEVEL)
    }

    pub fn with_limits(bounds: Rect<f32>, max_capacity: usize, max_level: u32) -> Self {
        let mut nodes = Pool::new();
        let root = nodes.spawn(QuadTreeNode::new(bounds, 0, Handle::NONE));
        Self {
            nodes,
            root,
            owners: FxHashMap::default(),
            max_capacity: max_capacity.max(1),
            max_level,
        }
    }

    #[inline]
    pub fn bounds(&self) -> Rect<f32> {
        self.nodes[self.root].bounds
    }

    #[inline]
    pub fn root(&self) -> Handle<QuadTreeNode<T>> {
        self.root
    }

    #[inline]
    pub fn node(&self, handle: Handle<QuadTreeNode<T>>) -> &QuadTreeNode<T> {
        &self.nodes[handle]
    }

    /// Number of elements in the tree.
    #[inline]
    pub fn size(&self) -> usize {
        self.owners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Returns the node the given element is stored in. Constant time.
    #[inline]
    pub fn owner(&self, element: T) -> Option<Handle<QuadTreeNode<T>>> {
        self.owners.get(&element).copied()
    }

    /// Returns the bounds the tree currently has on record for the element.
    #[inline]
    pub fn element_bounds(&self, element: T) -> Option<Rect<f32>> {
        let owner = self.owners.get(&element)?;
        self.nodes[*owner]
            .entries
            .iter()
            .find(|(e, _)| *e == element)
            .map(|(_, bounds)| *bounds)
    }

    /// Inserts the element, walking downward to the deepest node that fully
    /// contains its bounds. Returns true iff the bounds fit entirely within
    /// the root bounds; elements that do not fit stay linked to the root node.
    pub fn insert(&mut self, element: T, bounds: Rect<f32>) -> bool {
        // Make sure the object is not added twice.
        self.remove(element);

        if self.insert_into(self.root, element, bounds) {
            true
        } else {
            self.link_entry(self.root, element, bounds);
            self.handle_overflow(self.root);
            false
        }
    }

    /// Inserts the element starting the downward walk at the node that holds
    /// `hint`, climbing towards the root until a node takes it. Cheaper than
    /// a full insert when the new element is known to be near the hint.
    pub fn insert_nearby(&mut self, element: T, bounds: Rect<f32>, hint: T) -> bool {
        let Some(mut node) = self.owners.get(&hint).copied() else {
            return false;
        };
        loop {
            if self.insert_into(node, element, bounds) {
                return true;
            }
            let parent = self.nodes[node].parent;
            if parent.is_none() {
                return false;
            }
            node = parent;
        }
    }

    /// Removes the element from the tree. Locates the owner node in constant
    /// time, erases the element and cleans up empty nodes bottom-up.
    pub fn remove(&mut self, element: T) -> bool {
        let Some(owner) = self.owners.get(&element).copied() else {
            return false;
        };
        self.unlink_entry(owner, element);
        self.upwards_cleanup(owner);
        true
    }

    /// Must be called after the bounds of an element changed. If the element
    /// still fits into its current node nothing happens, otherwise it is
    /// removed and reinserted starting at its former node and climbing
    /// upward, which keeps small movements cheap. Returns true if the element
    /// was relocated to another node.
    pub fn changed_properties(&mut self, element: T, new_bounds: Rect<f32>) -> bool {
        let Some(owner) = self.owners.get(&element).copied() else {
            return false;
        };

        if owner != self.root && self.nodes[owner].bounds.contains_rect(&new_bounds) {
            if let Some(entry) = self.nodes[owner]
                .entries
                .iter_mut()
                .find(|(e, _)| *e == element)
            {
                entry.1 = new_bounds;
            }
            return false;
        }

        self.unlink_entry(owner, element);
        let mut node = self.upwards_cleanup(owner);

        loop {
            if node == self.root {
                if !self.insert_into(self.root, element, new_bounds) {
                    self.link_entry(self.root, element, new_bounds);
                    self.handle_overflow(self.root);
                }
                return true;
            }
            if self.insert_into(node, element, new_bounds) {
                return true;
            }
            node = self.nodes[node].parent;
        }
    }

    /// Collects every element of every node whose bounds intersect the query
    /// rect. Since each element lives in exactly one node, no element is
    /// emitted twice. The buffer is cleared first.
    pub fn retrieve(&self, bounds: Rect<f32>, buffer: &mut Vec<T>) {
        buffer.clear();
        self.retrieve_recursive(self.root, &bounds, buffer);
    }

    /// As [`Self::retrieve`], but partitions the result by the given
    /// predicate: elements for which it returns true land in `statics`, the
    /// rest in `non_statics`.
    pub fn retrieve_distinct<F>(
        &self,
        bounds: Rect<f32>,
        is_static: F,
        statics: &mut Vec<T>,
        non_statics: &mut Vec<T>,
    ) where
        F: Fn(&T) -> bool,
    {
        statics.clear();
        non_statics.clear();
        let mut all = Vec::new();
        self.retrieve_recursive(self.root, &bounds, &mut all);
        for element in all {
            if is_static(&element) {
                statics.push(element);
            } else {
                non_statics.push(element);
            }
        }
    }

    /// Collects the whole content of the tree. The buffer is cleared first.
    pub fn content(&self, buffer: &mut Vec<T>) {
        buffer.clear();
        buffer.extend(self.owners.keys().copied());
    }

    /// Invokes the callback for every node of the tree, descending into the
    /// children of a node only while the callback returns true.
    pub fn traverse<F>(&self, mut visit: F)
    where
        F: FnMut(&QuadTreeNode<T>) -> bool,
    {
        self.traverse_recursive(self.root, &mut visit);
    }

    /// Instantiates new boundaries. The whole content of the tree is removed
    /// and reinserted; elements that do not fit into the new bounds are
    /// dropped and returned.
    pub fn set_bounds(&mut self, bounds: Rect<f32>) -> Vec<T> {
        let mut content = Vec::new();
        self.collect_entries(self.root, &mut content);
        self.clear_nodes(bounds);

        let mut dropped = Vec::new();
        for (element, element_bounds) in content {
            if !self.insert_into(self.root, element, element_bounds) {
                dropped.push(element);
            }
        }
        dropped
    }

    /// Clears the contents of the tree, keeping its bounds.
    pub fn clear(&mut self) {
        let bounds = self.bounds();
        self.clear_nodes(bounds);
    }

    fn clear_nodes(&mut self, bounds: Rect<f32>) {
        self.nodes.clear();
        self.root = self.nodes.spawn(QuadTreeNode::new(bounds, 0, Handle::NONE));
        self.owners.clear();
    }

    fn link_entry(&mut self, node: Handle<QuadTreeNode<T>>, element: T, bounds: Rect<f32>) {
        self.nodes[node].entries.push((element, bounds));
        self.owners.insert(element, node);
    }

    fn unlink_entry(&mut self, node: Handle<QuadTreeNode<T>>, element: T) {
        let entries = &mut self.nodes[node].entries;
        if let Some(position) = entries.iter().position(|(e, _)| *e == element) {
            entries.remove(position);
        }
        self.owners.remove(&element);
    }

    fn insert_into(
        &mut self,
        node: Handle<QuadTreeNode<T>>,
        element: T,
        bounds: Rect<f32>,
    ) -> bool {
        if !self.nodes[node].bounds.contains_rect(&bounds) {
            return false;
        }

        // Prefer the deepest child that fully contains the element.
        if let Some(children) = self.nodes[node].children {
            for child in children {
                if self.insert_into(child, element, bounds) {
                    return true;
                }
            }
        }

        // No child can take it, the element stays at this level.
        self.link_entry(node, element, bounds);
        self.handle_overflow(node);
        true
    }

    fn handle_overflow(&mut self, node: Handle<QuadTreeNode<T>>) {
        if self.nodes[node].level > self.max_level
            || self.nodes[node].entries.len() <= self.max_capacity
        {
            return;
        }

        let children = match self.nodes[node].children {
            Some(children) => children,
            None => self.subdivide(node),
        };

        // Re-home elements to the new subnodes. Reverse iteration keeps the
        // remaining indices stable while entries are removed.
        let mut index = self.nodes[node].entries.len();
        while index > 0 {
            index -= 1;
            let (element, bounds) = self.nodes[node].entries[index];
            if children
                .iter()
                .any(|child| self.insert_into(*child, element, bounds))
            {
                self.nodes[node].entries.remove(index);
            }
        }
    }

    fn subdivide(&mut self, node: Handle<QuadTreeNode<T>>) -> [Handle<QuadTreeNode<T>>; 4] {
        let bounds = self.nodes[node].bounds;
        let level = self.nodes[node].level + 1;
        let half = Vector2::new(bounds.size.x / 2.0, bounds.size.y / 2.0);

        let quadrants = [
            Rect::new(bounds.position.x, bounds.position.y, half.x, half.y),
            Rect::new(bounds.position.x + half.x, bounds.position.y, half.x, half.y),
            Rect::new(bounds.position.x, bounds.position.y + half.y, half.x, half.y),
            Rect::new(
                bounds.position.x + half.x,
                bounds.position.y + half.y,
                half.x,
                half.y,
            ),
        ];

        let children = quadrants.map(|quadrant| {
            self.nodes
                .spawn(QuadTreeNode::new(quadrant, level, node))
        });
        self.nodes[node].children = Some(children);
        children
    }

    /// Frees child nodes while all four of them are empty, walking towards the
    /// root. Returns the node the walk stopped at.
    fn upwards_cleanup(
        &mut self,
        mut node: Handle<QuadTreeNode<T>>,
    ) -> Handle<QuadTreeNode<T>> {
        loop {
            if let Some(children) = self.nodes[node].children {
                if children.iter().all(|child| self.nodes[*child].is_empty()) {
                    for child in children {
                        self.nodes.free(child);
                    }
                    self.nodes[node].children = None;
                } else {
                    return node;
                }
            }
            let parent = self.nodes[node].parent;
            if parent.is_none() {
                return node;
            }
            node = parent;
        }
    }

    fn retrieve_recursive(
        &self,
        node: Handle<QuadTreeNode<T>>,
        bounds: &Rect<f32>,
        buffer: &mut Vec<T>,
    ) {
        let node_ref = &self.nodes[node];
        if node_ref.bounds.intersects(*bounds) {
            buffer.extend(node_ref.entries.iter().map(|(element, _)| *element));
            if let Some(children) = node_ref.children {
                for child in children {
                    self.retrieve_recursive(child, bounds, buffer);
                }
            }
        }
    }

    fn collect_entries(&self, node: Handle<QuadTreeNode<T>>, buffer: &mut Vec<(T, Rect<f32>)>) {
        let node_ref = &self.nodes[node];
        buffer.extend_from_slice(&node_ref.entries);
        if let Some(children) = node_ref.children {
            for child in children {
                self.collect_entries(child, buffer);
            }
        }
    }

    fn traverse_recursive<F>(&self, node: Handle<QuadTreeNode<T>>, visit: &mut F)
    where
        F: FnMut(&QuadTreeNode<T>) -> bool,
    {
        let node_ref = &self.nodes[node];
        if visit(node_ref) {
            if let Some(children) = node_ref.children {
                for child in children {
                    self.traverse_recursive(child, visit);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn insert_retrieve_remove() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0));

        assert!(tree.insert(1u32, Rect::new(10.0, 10.0, 5.0, 5.0)));
        assert!(tree.insert(2u32, Rect::new(70.0, 70.0, 5.0, 5.0)));
        assert_eq!(tree.size(), 2);

        let mut buffer = Vec::new();
        tree.retrieve(Rect::new(0.0, 0.0, 100.0, 100.0), &mut buffer);
        buffer.sort_unstable();
        assert_eq!(buffer, vec![1, 2]);

        assert!(tree.remove(1));
        assert!(!tree.remove(1));
        assert_eq!(tree.size(), 1);
    }

    #[test]
    fn oversized_element_reports_failure_but_stays_reachable() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0));

        assert!(!tree.insert(1u32, Rect::new(50.0, 50.0, 100.0, 100.0)));
        assert_eq!(tree.owner(1), Some(tree.root()));
        assert_eq!(tree.size(), 1);
    }

    #[test]
    fn subdivision_rehomes_elements() {
        let mut tree = QuadTree::with_limits(Rect::new(0.0, 0.0, 100.0, 100.0), 2, 4);

        assert!(tree.insert(1u32, Rect::new(10.0, 10.0, 5.0, 5.0)));
        assert!(tree.insert(2u32, Rect::new(15.0, 15.0, 5.0, 5.0)));
        assert!(tree.insert(3u32, Rect::new(12.0, 12.0, 5.0, 5.0)));

        // All three are in the north-west quadrant now, not at the root.
        let root = tree.root();
        for element in [1u32, 2, 3] {
            let owner = tree.owner(element).unwrap();
            assert_ne!(owner, root);
            assert!(tree
                .node(owner)
                .bounds()
                .contains_rect(&tree.element_bounds(element).unwrap()));
        }
        assert_eq!(tree.size(), 3);
    }

    #[test]
    fn changed_properties_moves_element_across_quadrants() {
        let mut tree = QuadTree::with_limits(Rect::new(0.0, 0.0, 100.0, 100.0), 2, 4);

        assert!(tree.insert(1u32, Rect::new(10.0, 10.0, 5.0, 5.0)));
        assert!(tree.insert(2u32, Rect::new(15.0, 15.0, 5.0, 5.0)));
        assert!(tree.insert(3u32, Rect::new(12.0, 12.0, 5.0, 5.0)));

        assert!(tree.changed_properties(1, Rect::new(80.0, 80.0, 5.0, 5.0)));

        let owner = tree.owner(1).unwrap();
        let owner_bounds = tree.node(owner).bounds();
        assert!(owner_bounds.contains_rect(&Rect::new(80.0, 80.0, 5.0, 5.0)));
        // The south-east quadrant starts at (50, 50).
        assert!(owner_bounds.position.x >= 50.0 && owner_bounds.position.y >= 50.0);
        assert_eq!(tree.size(), 3);
    }

    #[test]
    fn changed_properties_without_relocation_updates_bounds() {
        let mut tree = QuadTree::with_limits(Rect::new(0.0, 0.0, 100.0, 100.0), 2, 4);
        for i in 0u32..3 {
            assert!(tree.insert(i, Rect::new(10.0 + i as f32, 10.0, 2.0, 2.0)));
        }

        assert!(!tree.changed_properties(0, Rect::new(11.0, 11.0, 2.0, 2.0)));
        assert_eq!(tree.element_bounds(0), Some(Rect::new(11.0, 11.0, 2.0, 2.0)));
    }

    #[test]
    fn upward_cleanup_drops_empty_children() {
        let mut tree = QuadTree::with_limits(Rect::new(0.0, 0.0, 100.0, 100.0), 1, 4);

        assert!(tree.insert(1u32, Rect::new(10.0, 10.0, 2.0, 2.0)));
        assert!(tree.insert(2u32, Rect::new(80.0, 80.0, 2.0, 2.0)));
        assert!(!tree.node(tree.root()).is_leaf());

        tree.remove(1);
        tree.remove(2);

        assert!(tree.node(tree.root()).is_leaf());
        assert_eq!(tree.size(), 0);
    }

    #[test]
    fn retrieve_never_yields_duplicates() {
        let mut tree = QuadTree::with_limits(Rect::new(0.0, 0.0, 64.0, 64.0), 2, 6);
        for i in 0u32..32 {
            let x = (i % 8) as f32 * 8.0;
            let y = (i / 8) as f32 * 8.0;
            tree.insert(i, Rect::new(x, y, 4.0, 4.0));
        }

        let mut buffer = Vec::new();
        tree.retrieve(tree.bounds(), &mut buffer);
        assert_eq!(buffer.len(), 32);
        buffer.sort_unstable();
        buffer.dedup();
        assert_eq!(buffer.len(), 32);
    }

    #[test]
    fn set_bounds_reports_dropped_elements() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(tree.insert(1u32, Rect::new(10.0, 10.0, 5.0, 5.0)));
        assert!(tree.insert(2u32, Rect::new(80.0, 80.0, 5.0, 5.0)));

        let dropped = tree.set_bounds(Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(dropped, vec![2]);
        assert_eq!(tree.size(), 1);
        assert!(tree.owner(1).is_some());
        assert!(tree.owner(2).is_none());
    }

    #[test]
    fn traverse_stops_on_false() {
        let mut tree = QuadTree::with_limits(Rect::new(0.0, 0.0, 100.0, 100.0), 1, 4);
        for i in 0u32..8 {
            tree.insert(i, Rect::new((i * 10) as f32, (i * 10) as f32, 4.0, 4.0));
        }

        let mut visited_all = 0;
        tree.traverse(|_| {
            visited_all += 1;
            true
        });

        let mut visited_root_only = 0;
        tree.traverse(|_| {
            visited_root_only += 1;
            false
        });

        assert!(visited_all > visited_root_only);
        assert_eq!(visited_root_only, 1);
    }

    #[test]
    fn distinct_retrieve_partitions_by_predicate() {
        let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        for i in 0u32..10 {
            tree.insert(i, Rect::new(i as f32 * 5.0, 0.0, 4.0, 4.0));
        }

        let mut statics = Vec::new();
        let mut dynamics = Vec::new();
        tree.retrieve_distinct(
            tree.bounds(),
            |e| *e % 2 == 0,
            &mut statics,
            &mut dynamics,
        );
        assert_eq!(statics.len(), 5);
        assert_eq!(dynamics.len(), 5);
    }
}
