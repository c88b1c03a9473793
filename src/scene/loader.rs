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

//! World persistence.
//!
//! Graphs and nodes are stored as RON documents (tagged text trees with typed
//! attributes). A graph file holds the adjacency list, camera state,
//! reference position and one record per node with the path of its node
//! file; a node file holds the container bounds and ordered layer records
//! with serialized entities. Entity identities within one file are small
//! integers; anything referring across objects is resolved once the whole
//! file is parsed, through the [`DeserialMemory`] the loader returns.

use crate::{
    audio::music::MusicEmitterComponent,
    behavior::BehaviorManager,
    core::{algebra::Vector2, log::Log, math::Rect},
    physics::{
        collider::Collider,
        mobility::MobilityComponent,
        path::{FollowPolicy, Path as WaypointPath, PathFinderComponent},
        rigidbody::Rigidbody,
    },
    renderer::light::{LightCollider, LightEmitterComponent, PointLight, ShadowEmitterComponent},
    resource::Texture,
    scene::{
        camera::Camera,
        entity::{Entity, EntityBuilder, VisualComponent},
        graph::WorldGraph,
        node::WorldNode,
    },
};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use vesper_resource::{AssetStore, LoadPolicy};
use vesper_sound::buffer::SoundBuffer;

/// Serialized camera state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraDef {
    pub center: (f32, f32),
    pub zoom: f32,
}

/// One node record of a graph file. The node's content lives in its own file
/// at `data_path`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeRecordDef {
    pub name: String,
    pub bounds: (f32, f32, f32, f32),
    pub data_path: String,
}

/// A serialized world graph.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldGraphDef {
    pub edges: Vec<(u32, u32)>,
    pub camera: CameraDef,
    pub reference_position: (f32, f32),
    pub nodes: Vec<NodeRecordDef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VisualDef {
    pub texture: Option<String>,
    pub rect: (f32, f32, f32, f32),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MobilityDef {
    pub base_speed: f32,
    pub max_force: f32,
    pub max_velocity: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RigidbodyDef {
    pub context: usize,
    pub collider: Collider,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LightDef {
    pub color: (u8, u8, u8, u8),
    pub radius: f32,
    pub source: (f32, f32),
    pub texture: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShadowDef {
    pub points: Vec<(f32, f32)>,
    pub light_over_shape: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MusicDef {
    pub file: String,
    pub volume: f32,
    pub distance_cap: f32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PathDef {
    pub points: Vec<(f32, f32)>,
    pub policy: FollowPolicy,
    pub speed: f32,
    pub radius: f32,
}

/// Scripted entities carry their meta name and state; their parameter
/// callback runs after the whole file is parsed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BehaviorDef {
    pub script: String,
    pub state: Option<String>,
}

/// Marker for water entities; their tileset keys are applied by the content
/// layer after parse.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WaterDef {
    pub tileset_keys: Vec<String>,
}

/// One serialized entity. `id` is unique within its file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityDef {
    pub id: u32,
    pub name: String,
    pub position: (f32, f32),
    pub scale: (f32, f32),
    pub is_static: bool,
    #[serde(default)]
    pub visual: Option<VisualDef>,
    #[serde(default)]
    pub mobility: Option<MobilityDef>,
    #[serde(default)]
    pub rigidbodies: Vec<RigidbodyDef>,
    #[serde(default)]
    pub lights: Vec<LightDef>,
    #[serde(default)]
    pub shadows: Vec<ShadowDef>,
    #[serde(default)]
    pub music: Option<MusicDef>,
    #[serde(default)]
    pub path: Option<PathDef>,
    #[serde(default)]
    pub behavior: Option<BehaviorDef>,
    #[serde(default)]
    pub water: Option<WaterDef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LayerDef {
    pub name: String,
    pub render_depth: f32,
    pub entities: Vec<EntityDef>,
}

/// A serialized world-graph node.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeDef {
    pub bounds: (f32, f32, f32, f32),
    pub layers: Vec<LayerDef>,
}

/// Deserialization fixups collected while a node file is applied: the id
/// mapping for cross-object references, scripted entities awaiting their
/// parameter callback, and water entities awaiting their tileset keys.
#[derive(Debug, Default)]
pub struct DeserialMemory {
    pub entities_by_id: FxHashMap<u32, Entity>,
    pub scripted: Vec<Entity>,
    pub water: Vec<(Entity, Vec<String>)>,
}

/// Persistence failures.
#[derive(Debug, Clone)]
pub enum SceneLoadError {
    Io(String),
    Format(String),
}

impl std::fmt::Display for SceneLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneLoadError::Io(reason) => write!(f, "Unable to read scene file: {}", reason),
            SceneLoadError::Format(reason) => write!(f, "Malformed scene file: {}", reason),
        }
    }
}

impl std::error::Error for SceneLoadError {}

/// Parses a graph definition from RON text.
pub fn parse_graph_def(text: &str) -> Result<WorldGraphDef, SceneLoadError> {
    ron::from_str(text).map_err(|error| SceneLoadError::Format(error.to_string()))
}

/// Reads a graph definition from a file.
pub fn load_graph_def<P: AsRef<Path>>(path: P) -> Result<WorldGraphDef, SceneLoadError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|error| SceneLoadError::Io(error.to_string()))?;
    parse_graph_def(&text)
}

/// Parses a node definition from RON text.
pub fn parse_node_def(text: &str) -> Result<NodeDef, SceneLoadError> {
    ron::from_str(text).map_err(|error| SceneLoadError::Format(error.to_string()))
}

/// Reads a node definition from a file.
pub fn load_node_def<P: AsRef<Path>>(path: P) -> Result<NodeDef, SceneLoadError> {
    let text = std::fs::read_to_string(path.as_ref())
        .map_err(|error| SceneLoadError::Io(error.to_string()))?;
    parse_node_def(&text)
}

/// Serializes a definition into pretty RON text.
pub fn to_ron_text<T: Serialize>(def: &T) -> Result<String, SceneLoadError> {
    ron::ser::to_string_pretty(def, Default::default())
        .map_err(|error| SceneLoadError::Format(error.to_string()))
}

/// Builds a world graph from a parsed definition: nodes with their bounds and
/// data paths, the adjacency, the camera state and the reference position.
/// Node content stays unloaded until the nodes stream in.
pub fn build_graph(def: &WorldGraphDef, camera: Camera) -> WorldGraph {
    let mut graph = WorldGraph::new(camera);

    for record in &def.nodes {
        let (x, y, w, h) = record.bounds;
        let index = graph.create_node(record.name.clone(), Rect::new(x, y, w, h));
        graph.node_mut(index).set_data_path(record.data_path.clone());
    }
    for (a, b) in &def.edges {
        graph.connect(*a as usize, *b as usize);
    }

    graph.camera_mut().look_at(Vector2::new(def.camera.center.0, def.camera.center.1));
    graph.camera_mut().set_zoom(def.camera.zoom);
    graph.update_reference_position(Vector2::new(
        def.reference_position.0,
        def.reference_position.1,
    ));
    graph
}

/// Serializes a graph back into its definition.
pub fn graph_def_from(graph: &WorldGraph) -> WorldGraphDef {
    let mut edges = Vec::new();
    for a in 0..graph.node_count() {
        for b in (a + 1)..graph.node_count() {
            if graph.are_connected(a, b) {
                edges.push((a as u32, b as u32));
            }
        }
    }

    WorldGraphDef {
        edges,
        camera: CameraDef {
            center: (graph.camera().center().x, graph.camera().center().y),
            zoom: graph.camera().zoom(),
        },
        reference_position: (graph.reference_position().x, graph.reference_position().y),
        nodes: (0..graph.node_count())
            .map(|index| {
                let node = graph.node(index);
                let bounds = node.bounds();
                NodeRecordDef {
                    name: node.name().to_string(),
                    bounds: (
                        bounds.position.x,
                        bounds.position.y,
                        bounds.size.x,
                        bounds.size.y,
                    ),
                    data_path: node.data_path().to_string_lossy().into_owned(),
                }
            })
            .collect(),
    }
}

/// Applies a node definition to a node: creates the layers and their
/// entities, requests referenced assets, and collects the fixup memory.
/// Unknown behavior metas degrade to unscripted entities with a log entry.
pub fn apply_node_def(
    node: &mut WorldNode,
    def: &NodeDef,
    behaviors: &BehaviorManager,
    textures: &AssetStore<Texture>,
    sound_buffers: &AssetStore<SoundBuffer>,
) -> DeserialMemory {
    let mut memory = DeserialMemory::default();

    let (x, y, w, h) = def.bounds;
    node.set_position(Vector2::new(x, y));
    node.set_size(Vector2::new(w, h));

    for layer_def in &def.layers {
        let layer = node.add_layer(layer_def.name.clone(), layer_def.render_depth);

        for entity_def in &layer_def.entities {
            let mut builder = EntityBuilder::new()
                .with_name(entity_def.name.clone())
                .with_position(Vector2::new(entity_def.position.0, entity_def.position.1))
                .with_scale(Vector2::new(entity_def.scale.0, entity_def.scale.1))
                .with_static(entity_def.is_static);

            if let Some(visual_def) = &entity_def.visual {
                let (vx, vy, vw, vh) = visual_def.rect;
                let mut visual = VisualComponent::new(Rect::new(vx, vy, vw, vh));
                if let Some(texture) = &visual_def.texture {
                    visual.texture = Some(textures.load(texture, LoadPolicy::Async));
                }
                builder = builder.with_visual(visual);
            }

            if let Some(mobility_def) = &entity_def.mobility {
                builder = builder.with_mobility(MobilityComponent {
                    base_speed: mobility_def.base_speed,
                    max_force: mobility_def.max_force,
                    max_velocity: mobility_def.max_velocity,
                    ..Default::default()
                });
            }

            for body in &entity_def.rigidbodies {
                let context = body
                    .context
                    .min(crate::physics::rigidbody::COLLISION_CONTEXTS - 1);
                builder = builder.with_rigidbody(context, Rigidbody::new(body.collider.clone()));
            }

            for light_def in &entity_def.lights {
                let mut light = PointLight::default();
                let (r, g, b, a) = light_def.color;
                light.set_color(crate::core::color::Color::from_rgba(r, g, b, a));
                light.set_radius(light_def.radius);
                light.set_source_point(Vector2::new(light_def.source.0, light_def.source.1));
                if let Some(texture) = &light_def.texture {
                    light.set_texture(textures.load(texture, LoadPolicy::Async));
                }
                builder = builder.with_light_emitter(LightEmitterComponent { light });
            }

            for shadow_def in &entity_def.shadows {
                let mut collider = LightCollider::new(
                    shadow_def
                        .points
                        .iter()
                        .map(|(px, py)| Vector2::new(*px, *py))
                        .collect(),
                );
                collider.set_light_over_shape(shadow_def.light_over_shape);
                builder = builder.with_shadow_emitter(ShadowEmitterComponent { collider });
            }

            if let Some(music_def) = &entity_def.music {
                let mut emitter = MusicEmitterComponent::default();
                emitter.load(sound_buffers.load(&music_def.file, LoadPolicy::Async));
                emitter.set_volume(music_def.volume);
                emitter.set_distance_cap(music_def.distance_cap);
                builder = builder.with_music_emitter(emitter);
            }

            if let Some(path_def) = &entity_def.path {
                let mut path_finder = PathFinderComponent::default();
                path_finder.set_path(
                    WaypointPath::explicit(
                        path_def
                            .points
                            .iter()
                            .map(|(px, py)| Vector2::new(*px, *py))
                            .collect(),
                    ),
                    path_def.policy,
                    path_def.speed,
                    path_def.radius,
                );
                builder = builder.with_path_finder(path_finder);
            }

            let mut scripted = false;
            if let Some(behavior_def) = &entity_def.behavior {
                match behaviors.instantiate(&behavior_def.script) {
                    Ok(mut instance) => {
                        if let Some(state) = &behavior_def.state {
                            behaviors.switch_state(&mut instance, state);
                        }
                        builder = builder.with_behavior(instance);
                        scripted = true;
                    }
                    Err(error) => {
                        Log::err(format!(
                            "Entity {} lost its behavior while loading. Reason: {}",
                            entity_def.name, error
                        ));
                    }
                }
            }

            let entity = node.create_entity(layer, builder);
            memory.entities_by_id.insert(entity_def.id, entity);
            if scripted {
                memory.scripted.push(entity);
            }
            if let Some(water) = &entity_def.water {
                memory.water.push((entity, water.tileset_keys.clone()));
            }
        }
    }

    node.load();
    memory
}

/// Serializes a node's current content back into its definition.
pub fn node_def_from(node: &WorldNode) -> NodeDef {
    let bounds = node.bounds();
    let mut layers: Vec<LayerDef> = (0..node.layer_count())
        .map(|index| LayerDef {
            name: node.layer(index).name().to_string(),
            render_depth: node.layer(index).render_depth(),
            entities: Vec::new(),
        })
        .collect();

    for (id, entity) in node.entities().into_iter().enumerate() {
        let data = node.entity(entity);
        let transform = data.transform();

        let def = EntityDef {
            id: id as u32,
            name: data.name().to_string(),
            position: (transform.position.x, transform.position.y),
            scale: (transform.scale.x, transform.scale.y),
            is_static: data.is_static(),
            visual: data.visual().map(|visual| VisualDef {
                texture: visual
                    .texture
                    .as_ref()
                    .map(|texture| texture.path().to_string_lossy().into_owned()),
                rect: (
                    visual.local_rect.position.x,
                    visual.local_rect.position.y,
                    visual.local_rect.size.x,
                    visual.local_rect.size.y,
                ),
            }),
            mobility: data.mobility().map(|mobility| MobilityDef {
                base_speed: mobility.base_speed,
                max_force: mobility.max_force,
                max_velocity: mobility.max_velocity,
            }),
            rigidbodies: (0..crate::physics::rigidbody::COLLISION_CONTEXTS)
                .flat_map(|context| {
                    data.rigidbodies(context).iter().map(move |body| RigidbodyDef {
                        context,
                        collider: body.collider().clone(),
                    })
                })
                .collect(),
            lights: data
                .light_emitters()
                .iter()
                .map(|emitter| {
                    let color = emitter.light.color();
                    LightDef {
                        color: (color.r, color.g, color.b, color.a),
                        radius: emitter.light.radius(),
                        source: (emitter.light.source_point().x, emitter.light.source_point().y),
                        texture: emitter
                            .light
                            .texture()
                            .map(|texture| texture.path().to_string_lossy().into_owned()),
                    }
                })
                .collect(),
            shadows: data
                .shadow_emitters()
                .iter()
                .map(|shadow| ShadowDef {
                    points: shadow
                        .collider
                        .points()
                        .iter()
                        .map(|point| (point.x, point.y))
                        .collect(),
                    light_over_shape: shadow.collider.light_over_shape(),
                })
                .collect(),
            music: data.music_emitter().map(|emitter| MusicDef {
                file: emitter.file_path().to_string_lossy().into_owned(),
                volume: emitter.volume(),
                distance_cap: emitter.distance_cap(),
            }),
            path: data.path_finder().and_then(|path_finder| {
                let points = match path_finder.path.as_ref()? {
                    WaypointPath::Explicit { points, .. } => {
                        points.iter().map(|point| (point.x, point.y)).collect()
                    }
                    // Nav-graph routes are rebuilt at runtime, not persisted.
                    WaypointPath::NavGraph { .. } => return None,
                };
                Some(PathDef {
                    points,
                    policy: path_finder.policy,
                    speed: path_finder.speed,
                    radius: path_finder.radius,
                })
            }),
            behavior: data.behavior().map(|instance| BehaviorDef {
                script: instance.meta_name().to_string(),
                state: instance.state().map(str::to_string),
            }),
            water: None,
        };

        layers[data.layer()].entities.push(def);
    }

    NodeDef {
        bounds: (
            bounds.position.x,
            bounds.position.y,
            bounds.size.x,
            bounds.size.y,
        ),
        layers,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        behavior::{BehaviorDefinition, BehaviorError, BehaviorSource, CallbackTable, Environment},
        core::task::TaskPool,
    };
    use std::sync::Arc;

    struct NullBehaviors;

    impl BehaviorSource for NullBehaviors {
        fn load(&self, _path: &Path) -> Result<BehaviorDefinition, BehaviorError> {
            Ok(BehaviorDefinition {
                name: "guard".to_string(),
                statics: Environment::default(),
                global: CallbackTable::default(),
                states: vec![("idle".to_string(), CallbackTable::default())],
            })
        }
    }

    fn stores() -> (AssetStore<Texture>, AssetStore<SoundBuffer>) {
        let pool = Arc::new(TaskPool::new());
        (AssetStore::new(pool.clone()), AssetStore::new(pool))
    }

    fn sample_node_def() -> NodeDef {
        NodeDef {
            bounds: (0.0, 0.0, 500.0, 500.0),
            layers: vec![LayerDef {
                name: "main".to_string(),
                render_depth: 1.0,
                entities: vec![
                    EntityDef {
                        id: 0,
                        name: "crate".to_string(),
                        position: (100.0, 100.0),
                        scale: (1.0, 1.0),
                        is_static: true,
                        visual: Some(VisualDef {
                            texture: None,
                            rect: (0.0, 0.0, 32.0, 32.0),
                        }),
                        mobility: None,
                        rigidbodies: vec![RigidbodyDef {
                            context: 0,
                            collider: Collider::rotated_rect(
                                Vector2::new(0.0, 0.0),
                                Vector2::new(32.0, 32.0),
                                0.0,
                            ),
                        }],
                        lights: Vec::new(),
                        shadows: Vec::new(),
                        music: None,
                        path: None,
                        behavior: None,
                        water: None,
                    },
                    EntityDef {
                        id: 1,
                        name: "guard".to_string(),
                        position: (200.0, 200.0),
                        scale: (1.0, 1.0),
                        is_static: false,
                        visual: None,
                        mobility: Some(MobilityDef {
                            base_speed: 0.2,
                            max_force: 1.0,
                            max_velocity: 1.0,
                        }),
                        rigidbodies: Vec::new(),
                        lights: Vec::new(),
                        shadows: Vec::new(),
                        music: None,
                        path: Some(PathDef {
                            points: vec![(200.0, 200.0), (300.0, 200.0)],
                            policy: FollowPolicy::Patrol,
                            speed: 1.0,
                            radius: 30.0,
                        }),
                        behavior: Some(BehaviorDef {
                            script: "guard".to_string(),
                            state: Some("idle".to_string()),
                        }),
                        water: None,
                    },
                ],
            }],
        }
    }

    #[test]
    fn node_roundtrip_preserves_structure() {
        let mut behaviors = BehaviorManager::new(Box::new(NullBehaviors));
        behaviors.load("guard.behavior").unwrap();
        let (textures, sounds) = stores();

        let def = sample_node_def();
        let mut node = WorldNode::new("N", Rect::new(0.0, 0.0, 1.0, 1.0));
        let memory = apply_node_def(&mut node, &def, &behaviors, &textures, &sounds);

        assert_eq!(node.layer_count(), 1);
        assert_eq!(node.entity_count(), 2);
        assert_eq!(memory.entities_by_id.len(), 2);
        assert_eq!(memory.scripted.len(), 1);

        let back = node_def_from(&node);
        assert_eq!(back.bounds, def.bounds);
        assert_eq!(back.layers.len(), 1);
        assert_eq!(back.layers[0].entities.len(), 2);

        let guard = back.layers[0]
            .entities
            .iter()
            .find(|entity| entity.name == "guard")
            .unwrap();
        assert_eq!(guard.behavior.as_ref().unwrap().script, "guard");
        assert_eq!(guard.path.as_ref().unwrap().policy, FollowPolicy::Patrol);
    }

    #[test]
    fn ron_text_roundtrip() {
        let def = sample_node_def();
        let text = to_ron_text(&def).unwrap();
        let parsed = parse_node_def(&text).unwrap();
        assert_eq!(parsed.layers[0].entities.len(), def.layers[0].entities.len());
        assert_eq!(parsed.bounds, def.bounds);
    }

    #[test]
    fn unknown_behavior_degrades_to_unscripted_entity() {
        let behaviors = BehaviorManager::new(Box::new(NullBehaviors));
        let (textures, sounds) = stores();

        let mut def = sample_node_def();
        def.layers[0].entities[1].behavior = Some(BehaviorDef {
            script: "does-not-exist".to_string(),
            state: None,
        });

        let mut node = WorldNode::new("N", Rect::new(0.0, 0.0, 1.0, 1.0));
        let memory = apply_node_def(&mut node, &def, &behaviors, &textures, &sounds);
        assert_eq!(node.entity_count(), 2);
        assert!(memory.scripted.is_empty());
    }

    #[test]
    fn graph_def_roundtrip() {
        let def = WorldGraphDef {
            edges: vec![(0, 1), (1, 2)],
            camera: CameraDef {
                center: (50.0, 50.0),
                zoom: 1.0,
            },
            reference_position: (50.0, 50.0),
            nodes: vec![
                NodeRecordDef {
                    name: "N1".to_string(),
                    bounds: (0.0, 0.0, 100.0, 100.0),
                    data_path: "n1.node.ron".to_string(),
                },
                NodeRecordDef {
                    name: "N2".to_string(),
                    bounds: (100.0, 0.0, 100.0, 100.0),
                    data_path: "n2.node.ron".to_string(),
                },
                NodeRecordDef {
                    name: "N3".to_string(),
                    bounds: (200.0, 0.0, 100.0, 100.0),
                    data_path: "n3.node.ron".to_string(),
                },
            ],
        };

        let graph = build_graph(&def, Camera::new(Vector2::new(100.0, 100.0)));
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.active_node(), Some(0));
        assert_eq!(graph.loaded_nodes().collect::<Vec<_>>(), vec![0, 1]);

        let back = graph_def_from(&graph);
        assert_eq!(back.nodes.len(), 3);
        assert_eq!(back.edges, def.edges);
        assert_eq!(back.reference_position, def.reference_position);
    }
}
