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

//! Entities and their component record.
//!
//! An entity is a handle into the generational pool of its world-graph node's
//! universe: a slot index plus a generation tag, compared by identity.
//! Components are fields of the entity's record; single components are
//! optional values, multi components are ordered sequences. Destruction goes
//! through the universe only.

use crate::{
    audio::{music::MusicEmitterComponent, sound::SoundEmitterComponent},
    behavior::BehaviorInstance,
    core::{algebra::Vector2, math::Rect, pool::Handle},
    physics::{
        mobility::MobilityComponent,
        path::PathFinderComponent,
        rigidbody::{Rigidbody, COLLISION_CONTEXTS},
    },
    renderer::light::{LightAffectorComponent, LightEmitterComponent, ShadowEmitterComponent},
    resource::Texture,
    scene::transform::TransformComponent,
};
use vesper_resource::Asset;

/// Identity of an entity within its universe.
pub type Entity = Handle<EntityData>;

/// A textured quad attached to an entity. The local rect feeds the content
/// bounds of the transform.
#[derive(Clone, Debug)]
pub struct VisualComponent {
    pub texture: Option<Asset<Texture>>,
    pub local_rect: Rect<f32>,
}

impl VisualComponent {
    pub fn new(local_rect: Rect<f32>) -> Self {
        Self {
            texture: None,
            local_rect,
        }
    }
}

/// Component record of one entity. See module docs.
#[derive(Debug, Default)]
pub struct EntityData {
    pub(crate) name: String,
    /// Index of the render layer the entity lives on.
    pub(crate) layer: usize,
    /// Static entities never move; they are partitioned separately in
    /// distinct pulls and feed the navigation mesh.
    pub(crate) is_static: bool,
    pub(crate) transform: TransformComponent,
    pub(crate) visual: Option<VisualComponent>,
    pub(crate) mobility: Option<MobilityComponent>,
    pub(crate) path_finder: Option<PathFinderComponent>,
    /// Rigidbodies per collision context (multi-rigidbody).
    pub(crate) rigidbodies: [Vec<Rigidbody>; COLLISION_CONTEXTS],
    pub(crate) light_emitters: Vec<LightEmitterComponent>,
    pub(crate) shadow_emitters: Vec<ShadowEmitterComponent>,
    pub(crate) light_affectors: Vec<LightAffectorComponent>,
    pub(crate) sound_emitter: Option<SoundEmitterComponent>,
    pub(crate) music_emitter: Option<MusicEmitterComponent>,
    pub(crate) behavior: Option<BehaviorInstance>,
}

impl EntityData {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn layer(&self) -> usize {
        self.layer
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[inline]
    pub fn transform(&self) -> &TransformComponent {
        &self.transform
    }

    #[inline]
    pub fn visual(&self) -> Option<&VisualComponent> {
        self.visual.as_ref()
    }

    #[inline]
    pub fn mobility(&self) -> Option<&MobilityComponent> {
        self.mobility.as_ref()
    }

    #[inline]
    pub fn mobility_mut(&mut self) -> Option<&mut MobilityComponent> {
        self.mobility.as_mut()
    }

    #[inline]
    pub fn path_finder(&self) -> Option<&PathFinderComponent> {
        self.path_finder.as_ref()
    }

    #[inline]
    pub fn path_finder_mut(&mut self) -> Option<&mut PathFinderComponent> {
        self.path_finder.as_mut()
    }

    #[inline]
    pub fn rigidbodies(&self, context: usize) -> &[Rigidbody] {
        &self.rigidbodies[context]
    }

    #[inline]
    pub fn rigidbodies_mut(&mut self, context: usize) -> &mut Vec<Rigidbody> {
        &mut self.rigidbodies[context]
    }

    #[inline]
    pub fn light_emitters(&self) -> &[LightEmitterComponent] {
        &self.light_emitters
    }

    #[inline]
    pub fn light_emitters_mut(&mut self) -> &mut Vec<LightEmitterComponent> {
        &mut self.light_emitters
    }

    #[inline]
    pub fn shadow_emitters(&self) -> &[ShadowEmitterComponent] {
        &self.shadow_emitters
    }

    #[inline]
    pub fn shadow_emitters_mut(&mut self) -> &mut Vec<ShadowEmitterComponent> {
        &mut self.shadow_emitters
    }

    #[inline]
    pub fn sound_emitter(&self) -> Option<&SoundEmitterComponent> {
        self.sound_emitter.as_ref()
    }

    #[inline]
    pub fn music_emitter(&self) -> Option<&MusicEmitterComponent> {
        self.music_emitter.as_ref()
    }

    #[inline]
    pub fn music_emitter_mut(&mut self) -> Option<&mut MusicEmitterComponent> {
        self.music_emitter.as_mut()
    }

    #[inline]
    pub fn behavior(&self) -> Option<&BehaviorInstance> {
        self.behavior.as_ref()
    }

    #[inline]
    pub fn behavior_mut(&mut self) -> Option<&mut BehaviorInstance> {
        self.behavior.as_mut()
    }

    /// Local bounds every content-reporting component contributes to the
    /// transform handler.
    pub(crate) fn content_rects(&self) -> Vec<Rect<f32>> {
        let mut rects = Vec::new();
        if let Some(visual) = &self.visual {
            rects.push(visual.local_rect);
        }
        let local = TransformComponent::default();
        for context in &self.rigidbodies {
            for body in context {
                rects.push(body.collider().bounding_box(&local));
            }
        }
        for shadow in &self.shadow_emitters {
            rects.push(shadow.collider.bounding_box(&local));
        }
        rects
    }
}

/// Builder for entity records, used when populating a world node.
#[derive(Default)]
pub struct EntityBuilder {
    data: EntityData,
}

impl EntityBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.data.name = name.into();
        self
    }

    pub fn with_position(mut self, position: Vector2<f32>) -> Self {
        self.data.transform.position = position;
        self
    }

    pub fn with_scale(mut self, scale: Vector2<f32>) -> Self {
        self.data.transform.scale = scale;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.data.is_static = is_static;
        self
    }

    pub fn with_visual(mut self, visual: VisualComponent) -> Self {
        self.data.visual = Some(visual);
        self
    }

    pub fn with_mobility(mut self, mobility: MobilityComponent) -> Self {
        self.data.mobility = Some(mobility);
        self
    }

    pub fn with_path_finder(mut self, path_finder: PathFinderComponent) -> Self {
        self.data.path_finder = Some(path_finder);
        self
    }

    pub fn with_rigidbody(mut self, context: usize, body: Rigidbody) -> Self {
        self.data.rigidbodies[context].push(body);
        self
    }

    pub fn with_light_emitter(mut self, emitter: LightEmitterComponent) -> Self {
        self.data.light_emitters.push(emitter);
        self
    }

    pub fn with_shadow_emitter(mut self, emitter: ShadowEmitterComponent) -> Self {
        self.data.shadow_emitters.push(emitter);
        self
    }

    pub fn with_light_affector(mut self, affector: LightAffectorComponent) -> Self {
        self.data.light_affectors.push(affector);
        self
    }

    pub fn with_sound_emitter(mut self, emitter: SoundEmitterComponent) -> Self {
        self.data.sound_emitter = Some(emitter);
        self
    }

    pub fn with_music_emitter(mut self, emitter: MusicEmitterComponent) -> Self {
        self.data.music_emitter = Some(emitter);
        self
    }

    pub fn with_behavior(mut self, instance: BehaviorInstance) -> Self {
        self.data.behavior = Some(instance);
        self
    }

    pub(crate) fn into_data(self) -> EntityData {
        self.data
    }
}
