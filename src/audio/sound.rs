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

//! Bounded-slot sound playback.
//!
//! Sounds live in named profiles: ordered bundles of buffers shared by many
//! entities. Playback goes through a fixed pool of slots; when every slot is
//! busy the request is silently dropped. Each slot counts down the buffer
//! duration; when it runs out the slot frees itself and decrements the
//! bundle's linkage counter, evicting bundles of expired profiles once their
//! last playback ends.

use crate::{
    audio::DEFAULT_DISTANCE_CAP,
    core::{log::Log, signal::Signal},
};
use fxhash::FxHashMap;
use vesper_resource::Asset;
use vesper_sound::{buffer::SoundBuffer, playback_duration, AudioOutput, VoiceId};

/// Number of concurrently playing sounds.
pub const SOUND_PLAY_CAP: usize = 32;

/// A sound buffer with the number of slots currently playing it.
#[derive(Debug)]
pub struct SoundBundle {
    buffer: Asset<SoundBuffer>,
    linkage: u32,
}

impl SoundBundle {
    #[inline]
    pub fn buffer(&self) -> &Asset<SoundBuffer> {
        &self.buffer
    }
}

/// An ordered set of sound bundles keyed by a profile name.
#[derive(Debug, Default)]
pub struct SoundProfile {
    bundles: Vec<Option<SoundBundle>>,
    expired: bool,
}

impl SoundProfile {
    #[inline]
    pub fn sound_count(&self) -> usize {
        self.bundles.len()
    }

    pub fn bundle(&self, index: usize) -> Option<&SoundBundle> {
        self.bundles.get(index).and_then(|slot| slot.as_ref())
    }
}

/// Sound emitter component: links an entity to a profile.
#[derive(Clone, Debug)]
pub struct SoundEmitterComponent {
    pub profile: String,
    pub distance_cap: f32,
}

impl SoundEmitterComponent {
    pub fn new<S: Into<String>>(profile: S) -> Self {
        Self {
            profile: profile.into(),
            distance_cap: DEFAULT_DISTANCE_CAP,
        }
    }
}

#[derive(Debug, Default)]
struct SoundSlot {
    profile: Option<String>,
    index: usize,
    remaining: f32,
    playing: bool,
}

/// See module docs.
pub struct SoundHandler {
    profiles: FxHashMap<String, SoundProfile>,
    slots: [SoundSlot; SOUND_PLAY_CAP],
    volume_settings: Vec<f32>,
    mute: bool,
    pub sound_begin: Signal<(String, usize)>,
    pub sound_end: Signal<(String, usize)>,
}

impl Default for SoundHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundHandler {
    pub fn new() -> Self {
        Self {
            profiles: FxHashMap::default(),
            slots: std::array::from_fn(|_| SoundSlot::default()),
            volume_settings: vec![1.0],
            mute: false,
            sound_begin: Signal::new(),
            sound_end: Signal::new(),
        }
    }

    /// Registers an empty profile under the given key.
    pub fn init_profile<S: Into<String>>(&mut self, key: S) {
        self.profiles.entry(key.into()).or_default();
    }

    /// Reserves `count` bundle positions in the profile.
    pub fn init_sounds(&mut self, key: &str, count: usize) {
        if let Some(profile) = self.profiles.get_mut(key) {
            profile.bundles.resize_with(count, || None);
        }
    }

    /// Puts the buffer into position `index` of the profile.
    pub fn load_sound(&mut self, key: &str, index: usize, buffer: Asset<SoundBuffer>) {
        let Some(profile) = self.profiles.get_mut(key) else {
            Log::warn(format!("Can not find a sound profile named {}", key));
            return;
        };
        if index >= profile.bundles.len() {
            profile.bundles.resize_with(index + 1, || None);
        }
        profile.bundles[index] = Some(SoundBundle { buffer, linkage: 0 });
    }

    pub fn profile(&self, key: &str) -> Option<&SoundProfile> {
        self.profiles.get(key)
    }

    /// Marks the profile expired: bundles are evicted as soon as their last
    /// playing slot ends; bundles with no running playback go right away.
    pub fn expire_sounds(&mut self, key: &str) {
        if let Some(profile) = self.profiles.get_mut(key) {
            profile.expired = true;
            for bundle in profile.bundles.iter_mut() {
                if bundle.as_ref().is_some_and(|b| b.linkage == 0) {
                    *bundle = None;
                }
            }
        }
    }

    pub fn init_volume_settings(&mut self, count: usize) {
        self.volume_settings.resize(count, 1.0);
    }

    pub fn set_volume(&mut self, setting: usize, volume: f32) {
        if let Some(slot) = self.volume_settings.get_mut(setting) {
            *slot = volume;
        }
    }

    pub fn volume(&self, setting: usize) -> f32 {
        self.volume_settings.get(setting).copied().unwrap_or(1.0)
    }

    /// Mutes or unmutes playback. Muting stops all slots immediately and
    /// prevents any future playback until cleared.
    pub fn set_mute_sound(&mut self, mute: bool, output: &mut dyn AudioOutput) {
        self.mute = mute;
        if mute {
            for (index, slot) in self.slots.iter_mut().enumerate() {
                if slot.profile.is_some() {
                    slot.playing = false;
                    output.stop(VoiceId(index as u32));
                }
            }
        }
    }

    #[inline]
    pub fn is_muted(&self) -> bool {
        self.mute
    }

    /// Number of currently occupied slots.
    pub fn playing_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.profile.is_some()).count()
    }

    /// Starts a sound of the profile on the first free slot. With no free
    /// slot (or while muted) the request is silently dropped. `scaling` is
    /// the spatial attenuation in [0, 1], `volume_setting` selects one of the
    /// global volume groups.
    pub fn play_sound(
        &mut self,
        output: &mut dyn AudioOutput,
        key: &str,
        index: usize,
        scaling: f32,
        volume_setting: usize,
        pitch: f32,
    ) {
        if self.mute {
            return;
        }
        let Some(free) = self.slots.iter().position(|slot| slot.profile.is_none()) else {
            return;
        };
        let Some(profile) = self.profiles.get_mut(key) else {
            Log::warn(format!("Can not find a sound profile named {}", key));
            return;
        };
        let Some(bundle) = profile.bundles.get_mut(index).and_then(|b| b.as_mut()) else {
            return;
        };

        bundle.linkage += 1;

        let buffer = bundle.buffer.get();
        let volume = self.volume_settings.get(volume_setting).copied().unwrap_or(1.0) * scaling;
        output.play(VoiceId(free as u32), &buffer, volume, pitch);

        let slot = &mut self.slots[free];
        slot.profile = Some(key.to_string());
        slot.index = index;
        slot.playing = true;
        slot.remaining = playback_duration(buffer.duration(), pitch).as_secs_f32();

        self.sound_begin.emit(&(key.to_string(), index));
    }

    /// Counts down running slots and frees the ones whose time ran out.
    pub fn update(&mut self, delta: f32, output: &mut dyn AudioOutput) {
        for slot_index in 0..SOUND_PLAY_CAP {
            let slot = &mut self.slots[slot_index];
            if !slot.playing && slot.profile.is_some() {
                let key = slot.profile.take().expect("checked above");
                let index = slot.index;
                slot.index = 0;
                slot.remaining = 0.0;
                output.stop(VoiceId(slot_index as u32));

                if let Some(profile) = self.profiles.get_mut(&key) {
                    if let Some(bundle) =
                        profile.bundles.get_mut(index).and_then(|b| b.as_mut())
                    {
                        bundle.linkage = bundle.linkage.saturating_sub(1);
                        if profile.expired && bundle.linkage == 0 {
                            profile.bundles[index] = None;
                        }
                    }
                }
                self.sound_end.emit(&(key, index));
            } else if slot.profile.is_some() {
                if slot.remaining > 0.0 {
                    slot.remaining -= delta;
                } else {
                    slot.playing = false;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::task::TaskPool;
    use std::sync::Arc;
    use vesper_resource::{AssetStore, LoadPolicy};
    use vesper_sound::NullOutput;

    fn handler_with_profile() -> (SoundHandler, NullOutput) {
        let store: AssetStore<SoundBuffer> = AssetStore::new(Arc::new(TaskPool::new()));
        let mut handler = SoundHandler::new();
        handler.init_profile("steps");
        handler.init_sounds("steps", 2);
        // The store serves default (empty) buffers for unknown paths, which
        // is fine for slot bookkeeping.
        handler.load_sound("steps", 0, store.load("steps0.wav", LoadPolicy::Sync));
        handler.load_sound("steps", 1, store.load("steps1.wav", LoadPolicy::Sync));
        (handler, NullOutput)
    }

    #[test]
    fn playback_count_never_exceeds_the_cap() {
        let (mut handler, mut output) = handler_with_profile();
        for _ in 0..SOUND_PLAY_CAP * 2 {
            handler.play_sound(&mut output, "steps", 0, 1.0, 0, 1.0);
        }
        assert_eq!(handler.playing_count(), SOUND_PLAY_CAP);

        // The overflowing requests were silently dropped; bundle linkage only
        // counts the accepted ones.
        assert_eq!(
            handler.profile("steps").unwrap().bundle(0).unwrap().linkage,
            SOUND_PLAY_CAP as u32
        );
    }

    #[test]
    fn muted_handler_never_occupies_a_slot() {
        let (mut handler, mut output) = handler_with_profile();
        handler.set_mute_sound(true, &mut output);
        handler.play_sound(&mut output, "steps", 0, 1.0, 0, 1.0);
        assert_eq!(handler.playing_count(), 0);
    }

    #[test]
    fn finished_slots_are_freed_and_fire_sound_end() {
        let (mut handler, mut output) = handler_with_profile();
        handler.play_sound(&mut output, "steps", 0, 1.0, 0, 1.0);
        assert_eq!(handler.playing_count(), 1);

        let ended = std::rc::Rc::new(std::cell::Cell::new(false));
        let flag = ended.clone();
        let _sub = handler.sound_end.connect(move |_| flag.set(true));

        // Empty buffers have zero duration: the first update expires the
        // timer, the second collects the slot.
        handler.update(0.016, &mut output);
        handler.update(0.016, &mut output);

        assert!(ended.get());
        assert_eq!(handler.playing_count(), 0);
        assert_eq!(
            handler.profile("steps").unwrap().bundle(0).unwrap().linkage,
            0
        );
    }

    #[test]
    fn expired_profiles_evict_bundles_after_last_playback() {
        let (mut handler, mut output) = handler_with_profile();
        handler.play_sound(&mut output, "steps", 0, 1.0, 0, 1.0);
        handler.expire_sounds("steps");

        // Bundle 1 had no running playback and is gone immediately.
        assert!(handler.profile("steps").unwrap().bundle(1).is_none());
        // Bundle 0 survives until its slot ends.
        assert!(handler.profile("steps").unwrap().bundle(0).is_some());

        handler.update(0.016, &mut output);
        handler.update(0.016, &mut output);
        assert!(handler.profile("steps").unwrap().bundle(0).is_none());
    }
}
