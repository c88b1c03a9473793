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

//! Engine settings, persisted as a RON document. Missing fields fall back to
//! their defaults, so settings files only need to name what they change.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_SPEED: f32 = 0.2;
pub const DEFAULT_MAX_FORCE: f32 = 1.0;
pub const DEFAULT_MAX_VELOCITY: f32 = 1.0;
pub const DEFAULT_WAYPOINT_RADIUS: f32 = 30.0;
pub const DEFAULT_TRAVERSAL_SPEED: f32 = 1.0;
pub const DEFAULT_REFLECTION_OPACITY: f32 = 0.5;

/// Shader and texture paths of the lighting pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    pub unshadow_vertex_shader: PathBuf,
    pub unshadow_frag_shader: PathBuf,
    pub light_vertex_shader: PathBuf,
    pub light_frag_shader: PathBuf,
    pub default_penumbra_texture: PathBuf,
    pub light_radius: f32,
    pub shadow_extend_multiplier: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            unshadow_vertex_shader: PathBuf::from("shaders/unshadow.vert"),
            unshadow_frag_shader: PathBuf::from("shaders/unshadow.frag"),
            light_vertex_shader: PathBuf::from("shaders/light.vert"),
            light_frag_shader: PathBuf::from("shaders/light.frag"),
            default_penumbra_texture: PathBuf::from("textures/penumbra.png"),
            light_radius: crate::renderer::light::DEFAULT_RADIUS,
            shadow_extend_multiplier: crate::renderer::light::DEFAULT_SHADOW_EXTEND_MULTIPLIER,
        }
    }
}

/// Boundary configuration of water rendering; the simulation itself lives
/// outside the core.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterSettings {
    pub distortion_factor: f32,
    pub flow_factor: f32,
    pub reflection_opacity: f32,
}

impl Default for WaterSettings {
    fn default() -> Self {
        Self {
            distortion_factor: 0.02,
            flow_factor: 0.4,
            reflection_opacity: DEFAULT_REFLECTION_OPACITY,
        }
    }
}

/// See module docs.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// BFS radius deciding which world-graph nodes stay loaded.
    pub neighborhood_distance: u32,
    pub quadtree_max_capacity: usize,
    pub quadtree_max_level: u32,
    pub sound_slot_count: usize,
    pub music_slot_count: usize,
    pub mobility_base_speed: f32,
    pub mobility_max_force: f32,
    pub mobility_max_velocity: f32,
    pub waypoint_radius: f32,
    pub traversal_speed: f32,
    pub light: LightSettings,
    pub water: WaterSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            neighborhood_distance: crate::scene::graph::DEFAULT_DISTANCE,
            quadtree_max_capacity: crate::core::quadtree::DEFAULT_MAX_CAPACITY,
            quadtree_max_level: crate::core::quadtree::DEFAULT_MAX_LEVEL,
            sound_slot_count: crate::audio::sound::SOUND_PLAY_CAP,
            music_slot_count: crate::audio::music::MUSIC_PLAY_CAP,
            mobility_base_speed: DEFAULT_BASE_SPEED,
            mobility_max_force: DEFAULT_MAX_FORCE,
            mobility_max_velocity: DEFAULT_MAX_VELOCITY,
            waypoint_radius: DEFAULT_WAYPOINT_RADIUS,
            traversal_speed: DEFAULT_TRAVERSAL_SPEED,
            light: LightSettings::default(),
            water: WaterSettings::default(),
        }
    }
}

impl Settings {
    /// Loads settings from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|error| SettingsError::Io(error.to_string()))?;
        ron::from_str(&text).map_err(|error| SettingsError::Format(error.to_string()))
    }

    /// Writes the settings as a RON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), SettingsError> {
        let text = ron::ser::to_string_pretty(self, Default::default())
            .map_err(|error| SettingsError::Format(error.to_string()))?;
        std::fs::write(path.as_ref(), text).map_err(|error| SettingsError::Io(error.to_string()))
    }
}

/// Settings load/save failures.
#[derive(Debug, Clone)]
pub enum SettingsError {
    Io(String),
    Format(String),
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(reason) => write!(f, "Unable to read settings: {}", reason),
            SettingsError::Format(reason) => write!(f, "Malformed settings: {}", reason),
        }
    }
}

impl std::error::Error for SettingsError {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.neighborhood_distance, 1);
        assert_eq!(settings.quadtree_max_capacity, 5);
        assert_eq!(settings.quadtree_max_level, 16);
        assert_eq!(settings.sound_slot_count, 32);
        assert_eq!(settings.music_slot_count, 5);
        assert_eq!(settings.mobility_base_speed, 0.2);
        assert_eq!(settings.mobility_max_force, 1.0);
        assert_eq!(settings.mobility_max_velocity, 1.0);
        assert_eq!(settings.waypoint_radius, 30.0);
        assert_eq!(settings.traversal_speed, 1.0);
        assert_eq!(settings.light.light_radius, 10.0);
        assert_eq!(settings.light.shadow_extend_multiplier, 1.4);
        assert_eq!(settings.water.reflection_opacity, 0.5);
    }

    #[test]
    fn partial_documents_keep_defaults_for_the_rest() {
        let settings: Settings = ron::from_str("(neighborhood_distance: 3)").unwrap();
        assert_eq!(settings.neighborhood_distance, 3);
        assert_eq!(settings.quadtree_max_capacity, 5);
    }
}
