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

//! Input routing.
//!
//! Window events come in through the `winit` boundary, are mapped into world
//! coordinates through the active camera view and the hovered layer's
//! parallax, and drive two double-buffered entity trackers: one for hover
//! (enter/exit), one for click (click/release). Comparing this frame's set
//! against the previous one turns point queries into edge events.

use crate::{
    core::{algebra::Vector2, signal::Signal},
    scene::{entity::Entity, graph::WorldGraph},
};
use fxhash::FxHashSet;

/// Engine-level input events, decoupled from the windowing library.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InputEvent {
    MouseMoved { x: f32, y: f32 },
    MouseButtonPressed,
    MouseButtonReleased,
    Resized { width: u32, height: u32 },
}

/// Translates a window event into an engine input event. Events the engine
/// does not consume map to `None`.
pub fn translate_event(event: &winit::event::WindowEvent) -> Option<InputEvent> {
    match event {
        winit::event::WindowEvent::CursorMoved { position, .. } => Some(InputEvent::MouseMoved {
            x: position.x as f32,
            y: position.y as f32,
        }),
        winit::event::WindowEvent::MouseInput { state, .. } => match state {
            winit::event::ElementState::Pressed => Some(InputEvent::MouseButtonPressed),
            winit::event::ElementState::Released => Some(InputEvent::MouseButtonReleased),
        },
        winit::event::WindowEvent::Resized(size) => Some(InputEvent::Resized {
            width: size.width,
            height: size.height,
        }),
        _ => None,
    }
}

/// Two alternating entity sets; diffing them yields enter/exit edges.
#[derive(Debug, Default)]
struct Doublebuffer {
    buffers: [FxHashSet<Entity>; 2],
    active: usize,
}

impl Doublebuffer {
    /// Feeds this frame's hits and returns `(entered, exited)`.
    fn process(&mut self, hits: impl Iterator<Item = Entity>) -> (Vec<Entity>, Vec<Entity>) {
        let (current, previous) = (self.active, 1 - self.active);
        for hit in hits {
            self.buffers[current].insert(hit);
        }

        let entered = self.buffers[current]
            .iter()
            .filter(|entity| !self.buffers[previous].contains(entity))
            .copied()
            .collect();
        let exited = self.buffers[previous]
            .iter()
            .filter(|entity| !self.buffers[current].contains(entity))
            .copied()
            .collect();

        self.active = previous;
        self.buffers[self.active].clear();
        (entered, exited)
    }

    fn clear(&mut self) {
        self.buffers[0].clear();
        self.buffers[1].clear();
    }
}

/// Entity edge events routed out of one input event.
#[derive(Debug, Default)]
pub struct RoutedInput {
    pub entered: Vec<Entity>,
    pub exited: Vec<Entity>,
    pub clicked: Vec<Entity>,
    pub released: Vec<Entity>,
    /// Set when the event was a resize the host should apply to its targets.
    pub resized: Option<(u32, u32)>,
}

/// See module docs.
pub struct InputRouter {
    cursor: Vector2<f32>,
    window_size: Vector2<f32>,
    hovered: Doublebuffer,
    clicked: Doublebuffer,
    pub mouse_enter: Signal<Entity>,
    pub mouse_exit: Signal<Entity>,
    pub mouse_click: Signal<Entity>,
    pub mouse_released: Signal<Entity>,
}

impl InputRouter {
    pub fn new(window_size: Vector2<f32>) -> Self {
        Self {
            cursor: Vector2::default(),
            window_size,
            hovered: Doublebuffer::default(),
            clicked: Doublebuffer::default(),
            mouse_enter: Signal::new(),
            mouse_exit: Signal::new(),
            mouse_click: Signal::new(),
            mouse_released: Signal::new(),
        }
    }

    #[inline]
    pub fn cursor(&self) -> Vector2<f32> {
        self.cursor
    }

    /// Routes one event against the active node of the graph, firing the
    /// edge signals and returning the edges for direct processing.
    pub fn handle_event(&mut self, event: InputEvent, graph: &WorldGraph) -> RoutedInput {
        let mut routed = RoutedInput::default();
        match event {
            InputEvent::MouseMoved { x, y } => {
                self.cursor = Vector2::new(x, y);
                let hits = self.pick(graph);
                let (entered, exited) = self.hovered.process(hits.into_iter());
                for entity in &entered {
                    self.mouse_enter.emit(entity);
                }
                for entity in &exited {
                    self.mouse_exit.emit(entity);
                }
                routed.entered = entered;
                routed.exited = exited;
            }
            InputEvent::MouseButtonPressed => {
                let hits = self.pick(graph);
                let (clicked, released) = self.clicked.process(hits.into_iter());
                for entity in &clicked {
                    self.mouse_click.emit(entity);
                }
                for entity in &released {
                    self.mouse_released.emit(entity);
                }
                routed.clicked = clicked;
                routed.released = released;
            }
            InputEvent::MouseButtonReleased => {
                self.clicked.clear();
            }
            InputEvent::Resized { width, height } => {
                self.window_size = Vector2::new(width as f32, height as f32);
                routed.resized = Some((width, height));
            }
        }
        routed
    }

    /// Entities of the active node under the cursor, across all of its
    /// active layers, each tested at the layer's parallax depth.
    fn pick(&self, graph: &WorldGraph) -> Vec<Entity> {
        let mut picked = Vec::new();
        let Some(active) = graph.active_node() else {
            return picked;
        };
        if self.window_size.x <= 0.0 || self.window_size.y <= 0.0 {
            return picked;
        }

        let node = graph.node(active);
        let relative = Vector2::new(
            self.cursor.x / self.window_size.x,
            self.cursor.y / self.window_size.y,
        );

        let mut candidates = Vec::new();
        for (_, layer) in node.active_layers() {
            // The active node's container sits at the camera origin; the
            // cursor maps into the layer through its parallax view.
            let view = graph
                .camera()
                .layer_view(Vector2::default(), layer.render_depth());
            let point = view.position
                + Vector2::new(relative.x * view.size.x, relative.y * view.size.y);

            layer.quadtree().retrieve(
                crate::core::math::Rect::new(point.x, point.y, 0.0, 0.0),
                &mut candidates,
            );
            for entity in candidates.iter().copied() {
                if let Some(data) = node.try_entity(entity) {
                    if data.transform().bounds().contains(point) {
                        picked.push(entity);
                    }
                }
            }
        }
        picked
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        core::math::Rect,
        scene::{camera::Camera, entity::EntityBuilder, entity::VisualComponent},
    };

    fn graph_with_button() -> (WorldGraph, Entity) {
        let mut graph = WorldGraph::new(Camera::new(Vector2::new(200.0, 200.0)));
        let node = graph.create_node("N", Rect::new(0.0, 0.0, 1000.0, 1000.0));
        graph.node_mut(node).add_layer("main", 1.0);
        graph.update_reference_position(Vector2::new(500.0, 500.0));
        // Put the camera so the view spans (0,0)..(200,200).
        graph.camera_mut().look_at(Vector2::new(100.0, 100.0));

        let button = graph.node_mut(node).create_entity(
            0,
            EntityBuilder::new()
                .with_position(Vector2::new(90.0, 90.0))
                .with_visual(VisualComponent::new(Rect::new(0.0, 0.0, 20.0, 20.0))),
        );
        (graph, button)
    }

    #[test]
    fn hover_produces_enter_then_exit() {
        let (graph, button) = graph_with_button();
        let mut router = InputRouter::new(Vector2::new(200.0, 200.0));

        // Cursor in the middle of the window = world (100, 100).
        let routed = router.handle_event(InputEvent::MouseMoved { x: 100.0, y: 100.0 }, &graph);
        assert_eq!(routed.entered, vec![button]);
        assert!(routed.exited.is_empty());

        // Staying on the entity produces no further edges.
        let routed = router.handle_event(InputEvent::MouseMoved { x: 101.0, y: 100.0 }, &graph);
        assert!(routed.entered.is_empty());
        assert!(routed.exited.is_empty());

        // Leaving it produces the exit edge.
        let routed = router.handle_event(InputEvent::MouseMoved { x: 5.0, y: 5.0 }, &graph);
        assert!(routed.entered.is_empty());
        assert_eq!(routed.exited, vec![button]);
    }

    #[test]
    fn click_edges_follow_press_release() {
        let (graph, button) = graph_with_button();
        let mut router = InputRouter::new(Vector2::new(200.0, 200.0));

        router.handle_event(InputEvent::MouseMoved { x: 100.0, y: 100.0 }, &graph);
        let routed = router.handle_event(InputEvent::MouseButtonPressed, &graph);
        assert_eq!(routed.clicked, vec![button]);

        // Release clears the click tracker; a fresh press clicks again.
        router.handle_event(InputEvent::MouseButtonReleased, &graph);
        let routed = router.handle_event(InputEvent::MouseButtonPressed, &graph);
        assert_eq!(routed.clicked, vec![button]);
    }

    #[test]
    fn resize_updates_the_mapping() {
        let (graph, button) = graph_with_button();
        let mut router = InputRouter::new(Vector2::new(200.0, 200.0));

        let routed = router.handle_event(
            InputEvent::Resized {
                width: 400,
                height: 400,
            },
            &graph,
        );
        assert_eq!(routed.resized, Some((400, 400)));

        // Window is twice as large now; the same world point sits at twice
        // the pixel coordinates.
        let routed = router.handle_event(InputEvent::MouseMoved { x: 200.0, y: 200.0 }, &graph);
        assert_eq!(routed.entered, vec![button]);
    }
}
