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

//! Sound decoding and playback primitives.
//!
//! The crate stops at the device boundary: it can decode wav and ogg/vorbis
//! files into [`buffer::SoundBuffer`]s and describes playback through the
//! [`AudioOutput`] trait, which a host backend implements against the actual
//! audio device. The engine's mixers talk only to these types.

#![warn(missing_docs)]

pub mod buffer;

use std::time::Duration;
use strum_macros::AsRefStr;

/// Status of a playback voice.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, AsRefStr)]
pub enum Status {
    /// The voice produces no samples.
    #[default]
    Stopped,
    /// The voice is producing samples.
    Playing,
    /// The voice keeps its playback position but produces no samples.
    Paused,
}

/// Identifies one voice of the output device. The engine hands these out; a
/// backend maps them onto whatever its device offers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u32);

/// The playback boundary. All methods are fire-and-forget; the engine tracks
/// remaining play time itself from buffer durations.
pub trait AudioOutput {
    /// Starts playing the given buffer on the voice.
    fn play(&mut self, voice: VoiceId, buffer: &buffer::SoundBuffer, volume: f32, pitch: f32);

    /// Stops the voice.
    fn stop(&mut self, voice: VoiceId);

    /// Adjusts the volume of an already playing voice. `volume` is in [0; 1].
    fn set_volume(&mut self, voice: VoiceId, volume: f32);
}

/// An output that plays into the void. Used in tests and on headless hosts.
#[derive(Default)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn play(&mut self, _voice: VoiceId, _buffer: &buffer::SoundBuffer, _volume: f32, _pitch: f32) {}

    fn stop(&mut self, _voice: VoiceId) {}

    fn set_volume(&mut self, _voice: VoiceId, _volume: f32) {}
}

/// Scales a duration by the inverse of pitch: a sound played at double pitch
/// takes half as long.
pub fn playback_duration(buffer_duration: Duration, pitch: f32) -> Duration {
    if pitch <= f32::EPSILON {
        return buffer_duration;
    }
    buffer_duration.div_f32(pitch)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pitch_scales_playback_duration() {
        let base = Duration::from_secs(2);
        assert_eq!(playback_duration(base, 2.0), Duration::from_secs(1));
        assert_eq!(playback_duration(base, 0.0), base);
    }

    #[test]
    fn status_default_is_stopped() {
        assert_eq!(Status::default(), Status::Stopped);
        assert_eq!(Status::Playing.as_ref(), "Playing");
    }
}
