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

//! All possible errors that can happen in the engine.

use crate::{behavior::BehaviorError, engine::settings::SettingsError, scene::loader::SceneLoadError};
use std::fmt::{Display, Formatter};
use vesper_resource::AssetLoadError;

/// See module docs.
#[derive(Debug)]
pub enum EngineError {
    /// Settings could not be read or written.
    Settings(SettingsError),
    /// A world or node file could not be read or parsed.
    Scene(SceneLoadError),
    /// An asset failed to load. Note that asset failures inside the frame
    /// loop degrade to default assets instead of surfacing here.
    Asset(AssetLoadError),
    /// A behavior file failed to load.
    Behavior(BehaviorError),
}

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Settings(error) => Display::fmt(error, f),
            EngineError::Scene(error) => Display::fmt(error, f),
            EngineError::Asset(error) => Display::fmt(error, f),
            EngineError::Behavior(error) => Display::fmt(error, f),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<SettingsError> for EngineError {
    fn from(error: SettingsError) -> Self {
        Self::Settings(error)
    }
}

impl From<SceneLoadError> for EngineError {
    fn from(error: SceneLoadError) -> Self {
        Self::Scene(error)
    }
}

impl From<AssetLoadError> for EngineError {
    fn from(error: AssetLoadError) -> Self {
        Self::Asset(error)
    }
}

impl From<BehaviorError> for EngineError {
    fn from(error: BehaviorError) -> Self {
        Self::Behavior(error)
    }
}
