//! Ambisonics encoding and decoding, the speaker-independent spatial representation.
//!
//! First Order Ambisonics (FOA) uses 4 B-format channels in ACN order:
//! W (omnidirectional), Y (left-right), Z (up-down), X (front-back).
//!
//! Encoding sums each mono source into B-format weighted by its spherical
//! harmonic row. Decoding projects B-format onto a ring of virtual speakers
//! through the transpose of the ring's encoding matrix, giving one mono feed
//! per speaker that the binaural stage can then place.

use std::f64::consts::PI;

use crate::error::{Result, SpatialError};
use crate::harmonics::{spherical_harmonics_matrix, AmbisonicsOrder, EncodingMatrix};
use crate::position::{Position, PositionalSource};
use crate::stereo::StereoBuffer;

/// Number of B-format channels at first order.
pub const FOA_CHANNELS: usize = 4;

/// Default size of the virtual speaker ring.
pub const DEFAULT_SPEAKER_COUNT: usize = 8;

/// A first-order B-format signal: four equal-length channels in ACN order.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbisonicBuffer {
    channels: [Vec<f32>; FOA_CHANNELS],
}

impl AmbisonicBuffer {
    /// Wraps raw channels.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::ChannelMismatch`] unless exactly 4 channels are
    /// given, and [`SpatialError::ChannelLengthMismatch`] if their lengths differ.
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self> {
        let got = channels.len();
        let channels: [Vec<f32>; FOA_CHANNELS] =
            channels
                .try_into()
                .map_err(|_| SpatialError::ChannelMismatch {
                    expected: FOA_CHANNELS,
                    got,
                })?;
        let expected = channels[0].len();
        for (channel, samples) in channels.iter().enumerate() {
            if samples.len() != expected {
                return Err(SpatialError::ChannelLengthMismatch {
                    channel,
                    expected,
                    got: samples.len(),
                });
            }
        }
        Ok(Self { channels })
    }

    /// Validates and copies borrowed channels.
    ///
    /// # Errors
    ///
    /// Same as [`AmbisonicBuffer::from_channels`].
    pub fn from_slices(channels: &[Vec<f32>]) -> Result<Self> {
        if channels.len() != FOA_CHANNELS {
            return Err(SpatialError::ChannelMismatch {
                expected: FOA_CHANNELS,
                got: channels.len(),
            });
        }
        Self::from_channels(channels.to_vec())
    }

    /// A silent buffer of `frames` samples per channel.
    pub fn silent(frames: usize) -> Self {
        Self {
            channels: std::array::from_fn(|_| vec![0.0; frames]),
        }
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Whether the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.channels[0].is_empty()
    }

    /// One channel by ACN index, or `None` past channel 3.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// All four channels in ACN order.
    pub fn channels(&self) -> &[Vec<f32>; FOA_CHANNELS] {
        &self.channels
    }

    /// The omnidirectional channel.
    pub fn w(&self) -> &[f32] {
        &self.channels[0]
    }

    /// Hands back the owned channels.
    pub fn into_channels(self) -> [Vec<f32>; FOA_CHANNELS] {
        self.channels
    }
}

/// Encodes positioned mono sources into one B-format buffer.
///
/// Sample `t` of channel `c` is `Σ_i signal_i[t] · Y[i][c]` where `Y` is the
/// encoding matrix of the source positions. Shorter signals are treated as
/// zero past their end, so the buffer is as long as the longest source. An
/// empty slice encodes to an empty buffer.
pub fn encode_sources(sources: &[PositionalSource]) -> AmbisonicBuffer {
    let positions: Vec<Position> = sources.iter().map(|s| s.position).collect();
    let matrix = spherical_harmonics_matrix(&positions, AmbisonicsOrder::First);
    let frames = sources.iter().map(PositionalSource::len).max().unwrap_or(0);

    let mut acc = vec![[0.0f64; FOA_CHANNELS]; frames];
    for (source, row) in sources.iter().zip(matrix.iter_rows()) {
        for (frame, &sample) in acc.iter_mut().zip(source.signal.iter()) {
            let sample = f64::from(sample);
            for (ch, coeff) in row.iter().enumerate() {
                frame[ch] += sample * coeff;
            }
        }
    }

    let channels =
        std::array::from_fn(|ch| acc.iter().map(|frame| frame[ch] as f32).collect());
    AmbisonicBuffer { channels }
}

/// Projects a B-format buffer onto speakers through the transpose of their
/// encoding matrix.
///
/// Returns one feed per matrix row, each as long as `buffer`. Feed `s` at
/// sample `t` is `Σ_c buffer[c][t] · matrix[s][c]`; no normalization is applied.
///
/// # Errors
///
/// Returns [`SpatialError::ChannelMismatch`] if the matrix does not have 4 columns.
pub fn decode_to_speakers(buffer: &AmbisonicBuffer, matrix: &EncodingMatrix) -> Result<Vec<Vec<f32>>> {
    if matrix.columns() != FOA_CHANNELS {
        return Err(SpatialError::ChannelMismatch {
            expected: FOA_CHANNELS,
            got: matrix.columns(),
        });
    }

    let frames = buffer.len();
    let feeds = matrix
        .iter_rows()
        .map(|row| {
            (0..frames)
                .map(|t| {
                    buffer
                        .channels
                        .iter()
                        .zip(row)
                        .map(|(channel, coeff)| f64::from(channel[t]) * coeff)
                        .sum::<f64>() as f32
                })
                .collect()
        })
        .collect();
    Ok(feeds)
}

/// Cheap two-channel decode with no HRTF: a mid/side pair built from W and
/// the lateral channel.
///
/// - left  = W/2 + Y/2
/// - right = W/2 - Y/2
///
/// so `left + right == W` and `left - right == Y`.
pub fn downmix_stereo(buffer: &AmbisonicBuffer) -> StereoBuffer {
    let w = &buffer.channels[0];
    let y = &buffer.channels[1];
    let left = w.iter().zip(y).map(|(w, y)| w / 2.0 + y / 2.0).collect();
    let right = w.iter().zip(y).map(|(w, y)| w / 2.0 - y / 2.0).collect();
    StereoBuffer::from_equal(left, right)
}

/// Evenly spaced horizontal speakers used as the decode target.
///
/// Speaker `i` of `n` sits at azimuth `(2i/n - 1)·π`, elevation 0, radius 1,
/// so the ring starts directly behind the listener and proceeds in equal steps.
#[derive(Debug, Clone)]
pub struct VirtualSpeakerRing {
    positions: Vec<Position>,
    matrix: EncodingMatrix,
}

impl VirtualSpeakerRing {
    /// Builds a ring of `count` speakers and its encoding matrix.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidSpeakerCount`] if `count` is zero or odd.
    pub fn new(count: usize) -> Result<Self> {
        if count == 0 || count % 2 != 0 {
            return Err(SpatialError::InvalidSpeakerCount(count));
        }
        let positions = (0..count)
            .map(|i| Position::horizontal((2.0 * i as f64 / count as f64 - 1.0) * PI))
            .collect::<Result<Vec<_>>>()?;
        let matrix = spherical_harmonics_matrix(&positions, AmbisonicsOrder::First);

        tracing::info!(speakers = count, "Built virtual speaker ring");

        Ok(Self { positions, matrix })
    }

    /// Number of speakers.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always `false`; an empty ring cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Speaker positions in ring order.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Encoding matrix of the speaker positions (one row per speaker).
    pub fn matrix(&self) -> &EncodingMatrix {
        &self.matrix
    }

    /// Decodes B-format into one feed per speaker.
    pub fn decode(&self, buffer: &AmbisonicBuffer) -> Result<Vec<Vec<f32>>> {
        decode_to_speakers(buffer, &self.matrix)
    }

    /// Decodes B-format and wraps each feed as a source at its speaker position.
    pub fn speaker_sources(
        &self,
        buffer: &AmbisonicBuffer,
        sample_rate: u32,
    ) -> Result<Vec<PositionalSource>> {
        let feeds = self.decode(buffer)?;
        Ok(feeds
            .into_iter()
            .zip(&self.positions)
            .map(|(feed, position)| PositionalSource::new(feed, *position, sample_rate))
            .collect())
    }
}
