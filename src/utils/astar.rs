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

//! A* pathfinding over a graph of positioned vertices.

use crate::core::algebra::Vector2;
use std::{
    cmp::Ordering,
    collections::BinaryHeap,
    fmt::{Display, Formatter},
};

/// Graph vertex that contains a position in the world and the indices of its
/// neighbour vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphVertex {
    /// Position in world coordinates.
    pub position: Vector2<f32>,
    /// A set of indices of neighbour vertices.
    pub neighbours: Vec<u32>,
}

impl GraphVertex {
    pub fn new(position: Vector2<f32>) -> Self {
        Self {
            position,
            neighbours: Default::default(),
        }
    }
}

/// A collection of vertices for pathfinding. See module docs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    /// Vertices of the graph.
    pub vertices: Vec<GraphVertex>,
}

/// Shows path status.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PathKind {
    /// The path is a direct path from beginning to end.
    Full,
    /// A partial path ending at the closest reachable vertex to the desired
    /// destination. Can happen if there are isolated "islands" of vertices
    /// with no links between them.
    Partial,
}

/// Path search can be interrupted by errors, this enum stores all possible
/// kinds of errors.
#[derive(Clone, Debug)]
pub enum PathError {
    /// Out-of-bounds vertex index was found, it can be either the index of
    /// begin/end points, or some index in a vertex's neighbour list.
    InvalidIndex(usize),
    /// Graph was empty.
    Empty,
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::InvalidIndex(v) => {
                write!(f, "Invalid vertex index {v}.")
            }
            PathError::Empty => {
                write!(f, "Graph was empty.")
            }
        }
    }
}

impl std::error::Error for PathError {}

fn heuristic(a: Vector2<f32>, b: Vector2<f32>) -> f32 {
    (a - b).norm()
}

#[derive(Clone, PartialEq)]
struct OpenEntry {
    vertex: usize,
    f_score: f32,
}

impl Eq for OpenEntry {}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score.total_cmp(&other.f_score).reverse()
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the active set of vertices. Neighbour lists must contain valid
    /// indices, otherwise path building through them fails.
    pub fn set_vertices(&mut self, vertices: Vec<GraphVertex>) {
        self.vertices = vertices;
    }

    /// Inserts an undirected edge between two vertices.
    pub fn link_bidirect(&mut self, a: usize, b: usize) {
        if a == b || a >= self.vertices.len() || b >= self.vertices.len() {
            return;
        }
        if !self.vertices[a].neighbours.contains(&(b as u32)) {
            self.vertices[a].neighbours.push(b as u32);
        }
        if !self.vertices[b].neighbours.contains(&(a as u32)) {
            self.vertices[b].neighbours.push(a as u32);
        }
    }

    /// Tries to find a vertex closest to the given point. O(n) complexity.
    pub fn get_closest_vertex_to(&self, point: Vector2<f32>) -> Option<usize> {
        self.vertices
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                (a.position - point)
                    .norm_squared()
                    .total_cmp(&(b.position - point).norm_squared())
            })
            .map(|(index, _)| index)
    }

    /// Builds a path from `from` to `to` using A* with the straight-line
    /// distance heuristic (consistent, since edge costs are distances between
    /// vertex positions). The path is written into `path` in traversal order.
    pub fn build_path(
        &self,
        from: usize,
        to: usize,
        path: &mut Vec<usize>,
    ) -> Result<PathKind, PathError> {
        path.clear();

        if self.vertices.is_empty() {
            return Err(PathError::Empty);
        }

        let goal_position = self
            .vertices
            .get(to)
            .ok_or(PathError::InvalidIndex(to))?
            .position;
        self.vertices
            .get(from)
            .ok_or(PathError::InvalidIndex(from))?;

        let mut g_scores = vec![f32::MAX; self.vertices.len()];
        let mut came_from = vec![usize::MAX; self.vertices.len()];
        let mut open = BinaryHeap::new();

        g_scores[from] = 0.0;
        open.push(OpenEntry {
            vertex: from,
            f_score: heuristic(self.vertices[from].position, goal_position),
        });

        // Closest examined vertex to the goal, used for partial paths.
        let mut closest = from;
        let mut closest_distance = heuristic(self.vertices[from].position, goal_position);

        while let Some(entry) = open.pop() {
            if entry.vertex == to {
                reconstruct(&came_from, to, path);
                return Ok(PathKind::Full);
            }

            let current_position = self.vertices[entry.vertex].position;
            let distance_to_goal = heuristic(current_position, goal_position);
            if distance_to_goal < closest_distance {
                closest_distance = distance_to_goal;
                closest = entry.vertex;
            }

            for neighbour in self.vertices[entry.vertex].neighbours.iter() {
                let neighbour = *neighbour as usize;
                let neighbour_vertex = self
                    .vertices
                    .get(neighbour)
                    .ok_or(PathError::InvalidIndex(neighbour))?;

                let tentative =
                    g_scores[entry.vertex] + heuristic(current_position, neighbour_vertex.position);
                if tentative < g_scores[neighbour] {
                    g_scores[neighbour] = tentative;
                    came_from[neighbour] = entry.vertex;
                    open.push(OpenEntry {
                        vertex: neighbour,
                        f_score: tentative + heuristic(neighbour_vertex.position, goal_position),
                    });
                }
            }
        }

        reconstruct(&came_from, closest, path);
        Ok(PathKind::Partial)
    }
}

fn reconstruct(came_from: &[usize], end: usize, path: &mut Vec<usize>) {
    let mut current = end;
    path.push(current);
    while came_from[current] != usize::MAX {
        current = came_from[current];
        path.push(current);
    }
    path.reverse();
}

#[cfg(test)]
mod test {
    use super::*;

    fn grid_graph(side: usize) -> Graph {
        let mut graph = Graph::new();
        let mut vertices = Vec::new();
        for y in 0..side {
            for x in 0..side {
                vertices.push(GraphVertex::new(Vector2::new(x as f32, y as f32)));
            }
        }
        graph.set_vertices(vertices);
        for y in 0..side {
            for x in 0..side {
                let index = y * side + x;
                if x + 1 < side {
                    graph.link_bidirect(index, index + 1);
                }
                if y + 1 < side {
                    graph.link_bidirect(index, index + side);
                }
            }
        }
        graph
    }

    #[test]
    fn full_path_on_connected_grid() {
        let graph = grid_graph(4);
        let mut path = Vec::new();
        let kind = graph.build_path(0, 15, &mut path).unwrap();
        assert_eq!(kind, PathKind::Full);
        assert_eq!(*path.first().unwrap(), 0);
        assert_eq!(*path.last().unwrap(), 15);
        // Shortest path on a 4x4 grid between opposite corners visits 7 cells.
        assert_eq!(path.len(), 7);
    }

    #[test]
    fn partial_path_on_island() {
        let mut graph = grid_graph(2);
        // An isolated vertex far away.
        graph
            .vertices
            .push(GraphVertex::new(Vector2::new(100.0, 100.0)));

        let mut path = Vec::new();
        let kind = graph.build_path(0, 4, &mut path).unwrap();
        assert_eq!(kind, PathKind::Partial);
        assert!(!path.is_empty());
    }

    #[test]
    fn invalid_index_is_an_error() {
        let graph = grid_graph(2);
        let mut path = Vec::new();
        assert!(graph.build_path(0, 99, &mut path).is_err());
    }

    #[test]
    fn closest_vertex_lookup() {
        let graph = grid_graph(3);
        assert_eq!(
            graph.get_closest_vertex_to(Vector2::new(2.2, 1.9)),
            Some(8)
        );
    }
}
