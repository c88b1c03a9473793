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

//! Decoded audio data. Wav decoding is backed by `hound`, ogg/vorbis by
//! `lewton`. A buffer doubles as an asset type, so sound files go through the
//! ordinary asset store with its default-while-loading behavior (the default
//! buffer is silence).

use std::{fs::File, path::Path, time::Duration};
use vesper_resource::{AssetData, AssetLoadError};

/// Interleaved samples decoded from a sound file.
#[derive(Debug, Default, Clone)]
pub struct SoundBuffer {
    samples: Vec<f32>,
    channel_count: usize,
    sample_rate: usize,
}

impl SoundBuffer {
    /// Creates a buffer from raw interleaved samples.
    pub fn from_samples(samples: Vec<f32>, channel_count: usize, sample_rate: usize) -> Self {
        Self {
            samples,
            channel_count,
            sample_rate,
        }
    }

    /// Interleaved samples in [-1; 1].
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    #[allow(missing_docs)]
    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    #[inline]
    #[allow(missing_docs)]
    pub fn sample_rate(&self) -> usize {
        self.sample_rate
    }

    /// Total play time of the buffer at normal pitch.
    pub fn duration(&self) -> Duration {
        if self.channel_count == 0 || self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() / self.channel_count;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    fn from_wav(path: &Path) -> Result<Self, AssetLoadError> {
        let reader = hound::WavReader::open(path).map_err(|e| match e {
            hound::Error::IoError(io) => AssetLoadError::from_io(path, io),
            other => AssetLoadError::Decode {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })?;

        let spec = reader.spec();
        let samples: Result<Vec<f32>, _> = match spec.sample_format {
            hound::SampleFormat::Float => reader.into_samples::<f32>().collect(),
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|sample| sample as f32 * scale))
                    .collect()
            }
        };

        let samples = samples.map_err(|e| AssetLoadError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            samples,
            channel_count: spec.channels as usize,
            sample_rate: spec.sample_rate as usize,
        })
    }

    fn from_ogg(path: &Path) -> Result<Self, AssetLoadError> {
        let file = File::open(path).map_err(|e| AssetLoadError::from_io(path, e))?;

        let mut reader =
            lewton::inside_ogg::OggStreamReader::new(file).map_err(|e| AssetLoadError::Decode {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let channel_count = reader.ident_hdr.audio_channels as usize;
        let sample_rate = reader.ident_hdr.audio_sample_rate as usize;

        let mut samples = Vec::new();
        loop {
            match reader.read_dec_packet_itl() {
                Ok(Some(packet)) => {
                    samples.extend(packet.iter().map(|s| *s as f32 / i16::MAX as f32))
                }
                Ok(None) => break,
                Err(e) => {
                    return Err(AssetLoadError::Decode {
                        path: path.to_path_buf(),
                        reason: e.to_string(),
                    })
                }
            }
        }

        Ok(Self {
            samples,
            channel_count,
            sample_rate,
        })
    }
}

impl AssetData for SoundBuffer {
    fn load(path: &Path) -> Result<Self, AssetLoadError> {
        match path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .as_deref()
        {
            Some("wav") => Self::from_wav(path),
            Some("ogg") => Self::from_ogg(path),
            _ => Err(AssetLoadError::Decode {
                path: path.to_path_buf(),
                reason: "unsupported sound format".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn duration_accounts_for_channels() {
        let buffer = SoundBuffer::from_samples(vec![0.0; 44100 * 2], 2, 44100);
        assert_eq!(buffer.duration(), Duration::from_secs(1));
    }

    #[test]
    fn empty_buffer_has_zero_duration() {
        assert_eq!(SoundBuffer::default().duration(), Duration::ZERO);
    }

    #[test]
    fn unsupported_extension_is_a_decode_error() {
        let result = SoundBuffer::load(Path::new("music.mp3"));
        assert!(matches!(result, Err(AssetLoadError::Decode { .. })));
    }
}
