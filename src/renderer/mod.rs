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

//! Frame assembly.
//!
//! The renderer walks the loaded nodes in neighborhood order and their active
//! layers in stack order. Every layer gets a parallax-derived view (see
//! [`crate::scene::camera::Camera::layer_view`]) and contributes the entities
//! its quadtree yields for that view; the lighting pass runs per light over
//! the occluders near it and composites multiplicatively after all layers.
//!
//! Everything is produced as plain data; a graphics backend executes the
//! frame against its device. The backend boundary is the [`RenderTarget`]
//! trait, whose resize hook also drives render-texture reallocation for
//! effects such as water reflections.

pub mod light;

use crate::{
    core::{algebra::Vector2, math::Rect},
    scene::{entity::Entity, graph::WorldGraph},
};
use light::pipeline::{build_light_draw, LightFrame, LightPipeline};

/// An off-screen or window surface the backend renders into.
pub trait RenderTarget {
    fn size(&self) -> Vector2<u32>;

    /// Reallocates the target, for example after a window resize.
    fn resize(&mut self, width: u32, height: u32);
}

/// The culled draw work of one layer.
#[derive(Clone, Debug)]
pub struct LayerDraw {
    pub node: usize,
    pub layer: usize,
    /// World offset of the owning node relative to the active node; the
    /// backend translates the layer contents by it.
    pub world_offset: Vector2<f32>,
    /// Parallax view in node-local coordinates; contents were culled to it.
    pub view: Rect<f32>,
    /// Entities to draw, each living in exactly one node of the layer's
    /// quadtree, so no entity appears twice.
    pub entities: Vec<Entity>,
}

/// One fully assembled frame: layers in depth order, lighting composited
/// multiplicatively at the end.
#[derive(Clone, Debug, Default)]
pub struct RenderFrame {
    pub layers: Vec<LayerDraw>,
    pub lighting: LightFrame,
}

/// See module docs.
#[derive(Default)]
pub struct Renderer {
    pub light_pipeline: LightPipeline,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assembles the draw data of the current frame.
    pub fn assemble_frame(&self, graph: &WorldGraph) -> RenderFrame {
        let mut frame = RenderFrame {
            layers: Vec::new(),
            lighting: self.light_pipeline.begin_frame(),
        };

        let Some(active) = graph.active_node() else {
            return frame;
        };
        let active_position = graph.node(active).position();
        let camera = graph.camera();

        for node_index in graph.loaded_nodes() {
            let node = graph.node(node_index);
            let world_offset = node.position() - active_position;

            for (layer_index, layer) in node.active_layers() {
                // The camera lives in active-node coordinates; the layer view
                // is derived there and then rebased into the node.
                let view = camera.layer_view(world_offset, layer.render_depth());
                let local_view = view.translate(-world_offset);

                let mut entities = Vec::new();
                layer.quadtree().retrieve(local_view, &mut entities);

                self.collect_lights(graph, node_index, layer_index, local_view, &mut frame.lighting);

                frame.layers.push(LayerDraw {
                    node: node_index,
                    layer: layer_index,
                    world_offset,
                    view: local_view,
                    entities,
                });
            }
        }

        frame
    }

    /// Gathers every active light of the layer visible in the view, together
    /// with the shadow geometry of the occluders near it.
    fn collect_lights(
        &self,
        graph: &WorldGraph,
        node_index: usize,
        layer_index: usize,
        view: Rect<f32>,
        lighting: &mut LightFrame,
    ) {
        let node = graph.node(node_index);
        let layer = node.layer(layer_index);

        let mut holders = Vec::new();
        layer.quadtree().retrieve(view, &mut holders);

        let mut occluder_candidates = Vec::new();
        for entity in holders {
            let Some(data) = node.try_entity(entity) else {
                continue;
            };
            for emitter in data.light_emitters() {
                if !emitter.light.is_active() {
                    continue;
                }
                let light_bounds = emitter.light.bounding_box(data.transform());
                if !light_bounds.intersects(view) {
                    continue;
                }

                // Occluders whose transformed box intersects the light's box.
                layer
                    .quadtree()
                    .retrieve(light_bounds, &mut occluder_candidates);
                let mut occluders = Vec::new();
                for candidate in occluder_candidates.iter().copied() {
                    let Some(other) = node.try_entity(candidate) else {
                        continue;
                    };
                    for shadow in other.shadow_emitters() {
                        if shadow.collider.is_active() {
                            occluders.push((&shadow.collider, other.transform()));
                        }
                    }
                }

                lighting
                    .lights
                    .push(build_light_draw(&emitter.light, data.transform(), &occluders));
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        core::color::Color,
        renderer::light::{LightEmitterComponent, PointLight},
        scene::{camera::Camera, entity::EntityBuilder, entity::VisualComponent, graph::WorldGraph},
    };

    fn graph_with_content() -> WorldGraph {
        let mut graph = WorldGraph::new(Camera::new(Vector2::new(200.0, 200.0)));
        let node = graph.create_node("N", Rect::new(0.0, 0.0, 1000.0, 1000.0));
        graph.node_mut(node).add_layer("far", 0.5);
        graph.node_mut(node).add_layer("main", 1.0);
        graph.update_reference_position(Vector2::new(500.0, 500.0));
        graph
    }

    #[test]
    fn frame_contains_active_layers_in_order() {
        let mut graph = graph_with_content();
        graph.camera_mut().look_at(Vector2::new(500.0, 500.0));

        let renderer = Renderer::new();
        let frame = renderer.assemble_frame(&graph);
        assert_eq!(frame.layers.len(), 2);
        assert_eq!(frame.layers[0].layer, 0);
        assert_eq!(frame.layers[1].layer, 1);
        // Parallax: the far layer's view center sits closer to the origin.
        assert!(frame.layers[0].view.center().x < frame.layers[1].view.center().x);
    }

    #[test]
    fn culling_limits_entities_to_the_view() {
        // A tight quadtree capacity forces subdivision, so spatially distant
        // entities end up in distinct quadrants.
        let mut graph = WorldGraph::new(Camera::new(Vector2::new(200.0, 200.0)));
        let node = graph.create_node("N", Rect::new(0.0, 0.0, 1000.0, 1000.0));
        graph.node_mut(node).set_quadtree_limits(1, 8);
        graph.node_mut(node).add_layer("far", 0.5);
        graph.node_mut(node).add_layer("main", 1.0);
        graph.update_reference_position(Vector2::new(500.0, 500.0));
        graph.camera_mut().look_at(Vector2::new(100.0, 100.0));

        let visible = graph.node_mut(0).create_entity(
            1,
            EntityBuilder::new()
                .with_position(Vector2::new(100.0, 100.0))
                .with_visual(VisualComponent::new(Rect::new(0.0, 0.0, 16.0, 16.0))),
        );
        let _far_away = graph.node_mut(0).create_entity(
            1,
            EntityBuilder::new()
                .with_position(Vector2::new(900.0, 900.0))
                .with_visual(VisualComponent::new(Rect::new(0.0, 0.0, 16.0, 16.0))),
        );

        let renderer = Renderer::new();
        let frame = renderer.assemble_frame(&graph);
        let main = frame.layers.iter().find(|draw| draw.layer == 1).unwrap();
        assert!(main.entities.contains(&visible));
        // The far-away entity lives in a quadtree node the view never
        // touches.
        assert_eq!(main.entities.len(), 1);
    }

    #[test]
    fn lights_in_view_enter_the_light_frame() {
        let mut graph = graph_with_content();
        graph.camera_mut().look_at(Vector2::new(100.0, 100.0));

        let mut light = PointLight::default();
        light.set_color(Color::opaque(255, 200, 150));
        graph.node_mut(0).create_entity(
            1,
            EntityBuilder::new()
                .with_position(Vector2::new(100.0, 100.0))
                .with_light_emitter(LightEmitterComponent { light }),
        );

        let renderer = Renderer::new();
        let frame = renderer.assemble_frame(&graph);
        assert_eq!(frame.lighting.lights.len(), 1);
        assert_eq!(frame.lighting.ambient, Color::WHITE);
    }
}
