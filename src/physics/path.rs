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

//! Waypoint paths and their traversal state.
//!
//! A path is either an explicit list of points or a route through the
//! navigation mesh (a list of nav-triangle ids whose centroids act as
//! waypoints). Both keep a cursor and a direction bit; the follow policy
//! decides what happens once the end is reached.

use crate::ai::NavMesh;
use crate::core::algebra::Vector2;
use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

/// What happens when a path's end is reached.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, AsRefStr, Serialize, Deserialize)]
pub enum FollowPolicy {
    /// Clear the path and deactivate the follower.
    #[default]
    OneShot,
    /// Restart from the first waypoint.
    Cycle,
    /// Reverse direction and walk the path back and forth.
    Patrol,
}

/// See module docs.
#[derive(Clone, Debug, PartialEq)]
pub enum Path {
    Explicit {
        points: Vec<Vector2<f32>>,
        cursor: usize,
        forward: bool,
    },
    NavGraph {
        nodes: Vec<usize>,
        cursor: usize,
        forward: bool,
    },
}

impl Path {
    pub fn explicit(points: Vec<Vector2<f32>>) -> Self {
        Self::Explicit {
            points,
            cursor: 0,
            forward: true,
        }
    }

    pub fn nav_graph(nodes: Vec<usize>) -> Self {
        Self::NavGraph {
            nodes,
            cursor: 0,
            forward: true,
        }
    }

    fn len(&self) -> usize {
        match self {
            Path::Explicit { points, .. } => points.len(),
            Path::NavGraph { nodes, .. } => nodes.len(),
        }
    }

    fn cursor(&self) -> usize {
        match self {
            Path::Explicit { cursor, .. } | Path::NavGraph { cursor, .. } => *cursor,
        }
    }

    fn forward(&self) -> bool {
        match self {
            Path::Explicit { forward, .. } | Path::NavGraph { forward, .. } => *forward,
        }
    }

    /// The waypoint the follower currently steers towards. Nav-graph paths
    /// resolve their triangle id through the mesh; without a mesh they have no
    /// waypoint.
    pub fn current_waypoint(&self, navmesh: Option<&NavMesh>) -> Option<Vector2<f32>> {
        match self {
            Path::Explicit { points, cursor, .. } => points.get(*cursor).copied(),
            Path::NavGraph { nodes, cursor, .. } => {
                let mesh = navmesh?;
                nodes.get(*cursor).map(|node| mesh.gravity_center(*node))
            }
        }
    }

    /// True once the cursor sits on the last waypoint of the current
    /// direction.
    pub fn is_finished(&self) -> bool {
        let len = self.len();
        if len == 0 {
            return true;
        }
        (self.forward() && self.cursor() == len - 1) || (!self.forward() && self.cursor() == 0)
    }

    /// Moves the cursor one step along the current direction.
    pub fn advance_waypoint(&mut self) {
        let forward = self.forward();
        match self {
            Path::Explicit { cursor, .. } | Path::NavGraph { cursor, .. } => {
                if forward {
                    *cursor += 1;
                } else {
                    *cursor = cursor.saturating_sub(1);
                }
            }
        }
    }

    /// Moves the cursor back to the start of the current direction.
    pub fn reset(&mut self) {
        let start = if self.forward() { 0 } else { self.len().saturating_sub(1) };
        match self {
            Path::Explicit { cursor, .. } | Path::NavGraph { cursor, .. } => *cursor = start,
        }
    }

    /// Flips the traversal direction.
    pub fn switch_direction(&mut self) {
        match self {
            Path::Explicit { forward, .. } | Path::NavGraph { forward, .. } => {
                *forward = !*forward
            }
        }
    }
}

/// Path-following state attached to an entity.
#[derive(Clone, Debug)]
pub struct PathFinderComponent {
    pub path: Option<Path>,
    pub active: bool,
    pub policy: FollowPolicy,
    pub speed: f32,
    /// Distance at which a waypoint counts as reached.
    pub radius: f32,
    /// Time spent on the current traversal, reset on cycle or direction flip.
    pub time_past: f32,
}

impl Default for PathFinderComponent {
    fn default() -> Self {
        Self {
            path: None,
            active: false,
            policy: FollowPolicy::default(),
            speed: crate::engine::settings::DEFAULT_TRAVERSAL_SPEED,
            radius: crate::engine::settings::DEFAULT_WAYPOINT_RADIUS,
            time_past: 0.0,
        }
    }
}

impl PathFinderComponent {
    pub fn set_path(&mut self, path: Path, policy: FollowPolicy, speed: f32, radius: f32) {
        self.path = Some(path);
        self.active = true;
        self.policy = policy;
        self.speed = speed;
        self.radius = radius;
        self.time_past = 0.0;
    }

    /// Advances the traversal after the current waypoint was reached.
    /// Applies the follow policy at path end.
    pub fn waypoint_reached(&mut self) {
        let Some(path) = self.path.as_mut() else {
            return;
        };

        if path.is_finished() {
            match self.policy {
                FollowPolicy::OneShot => {
                    self.path = None;
                    self.active = false;
                }
                FollowPolicy::Cycle => {
                    path.reset();
                    self.time_past = 0.0;
                }
                FollowPolicy::Patrol => {
                    path.switch_direction();
                    path.advance_waypoint();
                    self.time_past = 0.0;
                }
            }
        } else {
            path.advance_waypoint();
            self.time_past = 0.0;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn patrol_path() -> PathFinderComponent {
        let mut pathfinder = PathFinderComponent::default();
        pathfinder.set_path(
            Path::explicit(vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(10.0, 0.0),
                Vector2::new(20.0, 0.0),
            ]),
            FollowPolicy::Patrol,
            1.0,
            1.0,
        );
        pathfinder
    }

    #[test]
    fn one_shot_clears_path_at_end() {
        let mut pathfinder = PathFinderComponent::default();
        pathfinder.set_path(
            Path::explicit(vec![Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0)]),
            FollowPolicy::OneShot,
            1.0,
            1.0,
        );

        pathfinder.waypoint_reached(); // reached p0, advance to p1
        assert!(pathfinder.active);
        pathfinder.waypoint_reached(); // reached p1, end of path
        assert!(!pathfinder.active);
        assert!(pathfinder.path.is_none());
    }

    #[test]
    fn cycle_restarts_from_first_waypoint() {
        let mut pathfinder = PathFinderComponent::default();
        pathfinder.set_path(
            Path::explicit(vec![Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0)]),
            FollowPolicy::Cycle,
            1.0,
            1.0,
        );

        pathfinder.waypoint_reached();
        pathfinder.waypoint_reached(); // end reached, cycles
        let path = pathfinder.path.as_ref().unwrap();
        assert_eq!(path.current_waypoint(None), Some(Vector2::new(0.0, 0.0)));
        assert!(pathfinder.active);
    }

    #[test]
    fn patrol_walks_back_and_forth() {
        let mut pathfinder = patrol_path();

        // Walk forward to the last point.
        pathfinder.waypoint_reached();
        pathfinder.waypoint_reached();
        let path = pathfinder.path.as_ref().unwrap();
        assert_eq!(path.current_waypoint(None), Some(Vector2::new(20.0, 0.0)));

        // Reaching the end flips the direction and moves towards p1.
        pathfinder.waypoint_reached();
        let path = pathfinder.path.as_ref().unwrap();
        assert_eq!(path.current_waypoint(None), Some(Vector2::new(10.0, 0.0)));

        // Then p0, where the direction flips again.
        pathfinder.waypoint_reached();
        let path = pathfinder.path.as_ref().unwrap();
        assert_eq!(path.current_waypoint(None), Some(Vector2::new(0.0, 0.0)));

        pathfinder.waypoint_reached();
        let path = pathfinder.path.as_ref().unwrap();
        assert_eq!(path.current_waypoint(None), Some(Vector2::new(10.0, 0.0)));
    }

    #[test]
    fn empty_path_is_finished() {
        let path = Path::explicit(Vec::new());
        assert!(path.is_finished());
        assert_eq!(path.current_waypoint(None), None);
    }
}
