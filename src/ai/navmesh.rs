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

//! Navigation mesh built from the static obstacles of a world.
//!
//! Construction is offline: the corner points of all obstacle bounding boxes,
//! pushed outwards by the agent radius, are Delaunay-triangulated; triangles
//! whose centers lie inside an obstacle are discarded, as are islands that are
//! unreachable from the largest walkable region. The remaining triangles form
//! a graph (edges between triangles sharing an edge, costs are centroid
//! distances) that A* searches with the straight-line heuristic.

use crate::{
    core::{
        algebra::Vector2,
        math::{delaunay, is_point_inside_triangle, Rect},
        quadtree::QuadTree,
    },
    physics::collider::Collider,
    scene::transform::TransformComponent,
    utils::{
        astar::{Graph, GraphVertex, PathKind},
        disjoint_sets::DisjointSets,
    },
};
use fxhash::FxHashMap;

/// One walkable triangle of the mesh.
#[derive(Clone, Debug)]
pub struct NavTriangle {
    pub points: [Vector2<f32>; 3],
    pub centroid: Vector2<f32>,
}

impl NavTriangle {
    fn bounds(&self) -> Rect<f32> {
        let mut bounds = Rect {
            position: self.points[0],
            size: Vector2::default(),
        };
        bounds.push(self.points[1]);
        bounds.push(self.points[2]);
        bounds
    }

    fn contains(&self, point: Vector2<f32>) -> bool {
        is_point_inside_triangle(point, self.points[0], self.points[1], self.points[2])
    }
}

/// See module docs.
#[derive(Clone, Debug, Default)]
pub struct NavMesh {
    triangles: Vec<NavTriangle>,
    graph: Graph,
    finder: QuadTree<usize>,
}

impl NavMesh {
    /// Builds the mesh for the given walkable bounds and obstacle set. The
    /// agent radius widens every obstacle so paths keep clearance.
    pub fn build(
        bounds: Rect<f32>,
        obstacles: &[(Collider, TransformComponent)],
        agent_radius: f32,
    ) -> Self {
        let mut points = Vec::with_capacity(obstacles.len() * 4);
        for (collider, transform) in obstacles {
            let inflated = collider.bounding_box(transform).inflate(agent_radius, agent_radius);
            points.push(inflated.left_top_corner());
            points.push(inflated.right_top_corner());
            points.push(inflated.right_bottom_corner());
            points.push(inflated.left_bottom_corner());
        }
        // The walkable area boundary contributes its corners as well, so open
        // worlds triangulate even with few obstacles.
        points.push(bounds.left_top_corner());
        points.push(bounds.right_top_corner());
        points.push(bounds.right_bottom_corner());
        points.push(bounds.left_bottom_corner());

        let triangulation = delaunay::triangulate(&points, bounds);

        // Keep triangles whose center is not blocked by an obstacle.
        let mut triangles = Vec::new();
        for triangle in &triangulation.triangles {
            let corner_points = [
                points[triangle.vertices[0]],
                points[triangle.vertices[1]],
                points[triangle.vertices[2]],
            ];
            let centroid =
                (corner_points[0] + corner_points[1] + corner_points[2]).scale(1.0 / 3.0);
            let blocked = obstacles
                .iter()
                .any(|(collider, transform)| collider.contains_point(transform, centroid));
            if !blocked {
                triangles.push((
                    NavTriangle {
                        points: corner_points,
                        centroid,
                    },
                    triangle.edges(),
                ));
            }
        }

        // Connect triangles that share an edge.
        let mut edge_owners: FxHashMap<(usize, usize), usize> = FxHashMap::default();
        let mut links = Vec::new();
        for (index, (_, edges)) in triangles.iter().enumerate() {
            for edge in edges {
                if let Some(other) = edge_owners.insert(*edge, index) {
                    links.push((other, index));
                }
            }
        }

        // Discard islands that are not part of the largest walkable region.
        let mut sets = DisjointSets::new(triangles.len());
        for (a, b) in &links {
            sets.merge(*a, *b);
        }
        let largest = (0..triangles.len()).max_by_key(|i| sets.set_size(*i));
        let keep: Vec<bool> = (0..triangles.len())
            .map(|i| Some(sets.find(i)) == largest.map(|l| sets.find(l)))
            .collect();

        let mut remap = vec![usize::MAX; triangles.len()];
        let mut kept_triangles = Vec::new();
        for (index, (triangle, _)) in triangles.into_iter().enumerate() {
            if keep[index] {
                remap[index] = kept_triangles.len();
                kept_triangles.push(triangle);
            }
        }

        let mut graph = Graph::new();
        graph.set_vertices(
            kept_triangles
                .iter()
                .map(|triangle| GraphVertex::new(triangle.centroid))
                .collect(),
        );
        for (a, b) in links {
            if keep[a] && keep[b] {
                graph.link_bidirect(remap[a], remap[b]);
            }
        }

        let mut finder = QuadTree::new(bounds);
        for (index, triangle) in kept_triangles.iter().enumerate() {
            finder.insert(index, triangle.bounds());
        }

        Self {
            triangles: kept_triangles,
            graph,
            finder,
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn triangles(&self) -> &[NavTriangle] {
        &self.triangles
    }

    /// Centroid of the given triangle, used as waypoint by nav-graph paths.
    pub fn gravity_center(&self, node: usize) -> Vector2<f32> {
        self.triangles
            .get(node)
            .map(|triangle| triangle.centroid)
            .unwrap_or_default()
    }

    /// Finds the triangle containing the given point via the spatial index.
    pub fn triangle_at(&self, point: Vector2<f32>) -> Option<usize> {
        let mut candidates = Vec::new();
        self.finder
            .retrieve(Rect::new(point.x, point.y, 1.0, 1.0), &mut candidates);
        candidates
            .into_iter()
            .find(|index| self.triangles[*index].contains(point))
    }

    /// Builds a triangle route between two points. Falls back to the closest
    /// triangles when a point lies outside the walkable region.
    pub fn find_route(&self, from: Vector2<f32>, to: Vector2<f32>) -> Option<(PathKind, Vec<usize>)> {
        let start = self
            .triangle_at(from)
            .or_else(|| self.graph.get_closest_vertex_to(from))?;
        let goal = self
            .triangle_at(to)
            .or_else(|| self.graph.get_closest_vertex_to(to))?;

        let mut route = Vec::new();
        match self.graph.build_path(start, goal, &mut route) {
            Ok(kind) => Some((kind, route)),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn single_obstacle_mesh() -> NavMesh {
        let obstacle = (
            Collider::rotated_rect(Vector2::new(40.0, 40.0), Vector2::new(60.0, 60.0), 0.0),
            TransformComponent::default(),
        );
        NavMesh::build(Rect::new(0.0, 0.0, 100.0, 100.0), &[obstacle], 2.0)
    }

    #[test]
    fn mesh_avoids_obstacle_interiors() {
        let mesh = single_obstacle_mesh();
        assert!(mesh.triangle_count() > 0);
        for triangle in mesh.triangles() {
            assert!(
                !(triangle.centroid.x > 40.0
                    && triangle.centroid.x < 60.0
                    && triangle.centroid.y > 40.0
                    && triangle.centroid.y < 60.0),
                "triangle centroid {:?} lies inside the obstacle",
                triangle.centroid
            );
        }
    }

    #[test]
    fn route_around_obstacle_exists() {
        let mesh = single_obstacle_mesh();
        let route = mesh.find_route(Vector2::new(10.0, 50.0), Vector2::new(90.0, 50.0));
        let (kind, triangles) = route.expect("a route must exist around the obstacle");
        assert_eq!(kind, PathKind::Full);
        assert!(!triangles.is_empty());
        // None of the route waypoints goes through the blocked square.
        for id in &triangles {
            let waypoint = mesh.gravity_center(*id);
            assert!(
                !(waypoint.x > 40.0
                    && waypoint.x < 60.0
                    && waypoint.y > 40.0
                    && waypoint.y < 60.0)
            );
        }
    }

    #[test]
    fn triangle_lookup_matches_containment() {
        let mesh = single_obstacle_mesh();
        let point = Vector2::new(10.0, 10.0);
        if let Some(index) = mesh.triangle_at(point) {
            assert!(mesh.triangles()[index].contains(point));
        }
    }
}
