//! The rendering pipeline: positioned sources or B-format in, stereo out.
//!
//! Two paths lead to a [`StereoBuffer`]:
//!
//! - **Direct**: every source is convolved with the HRIR pair nearest its
//!   direction and the results are summed.
//! - **Via ambisonics**: sources are encoded to first-order B-format (or
//!   B-format is supplied directly), then either downmixed to mid/side stereo
//!   or decoded onto the virtual speaker ring and binauralized as one source
//!   per speaker.

use crate::ambisonics::{downmix_stereo, encode_sources, AmbisonicBuffer, VirtualSpeakerRing};
use crate::config::StereoToolConfig;
use crate::convolution::ConvolutionEngine;
use crate::error::{Result, SpatialError};
use crate::hrir::HrirStore;
use crate::position::{validate_sources, Position, PositionalSource};
use crate::stereo::StereoBuffer;

/// What the ambisonic path renders from.
#[derive(Debug, Clone, Copy)]
pub enum AmbisonicInput<'a> {
    /// Positioned mono sources, encoded before decoding.
    Sources(&'a [PositionalSource]),
    /// Raw B-format channels in ACN order; must be exactly four of equal length.
    BFormat(&'a [Vec<f32>]),
    /// An already validated B-format buffer.
    Buffer(&'a AmbisonicBuffer),
}

impl<'a> From<&'a [PositionalSource]> for AmbisonicInput<'a> {
    fn from(sources: &'a [PositionalSource]) -> Self {
        AmbisonicInput::Sources(sources)
    }
}

impl<'a> From<&'a AmbisonicBuffer> for AmbisonicInput<'a> {
    fn from(buffer: &'a AmbisonicBuffer) -> Self {
        AmbisonicInput::Buffer(buffer)
    }
}

/// Binaural stereo renderer over a fixed HRIR store and speaker ring.
///
/// Immutable after construction; every render call is an independent
/// computation, so one tool can be shared across threads by reference.
///
/// # Example
///
/// ```
/// use ambistereo::{HrirMeasurement, HrirStore, Position, StereoTool, StereoToolConfig};
///
/// let store = HrirStore::new(
///     16000,
///     vec![
///         HrirMeasurement::new(Position::from_degrees(90.0, 0.0, 1.0)?, vec![1.0, 0.5], vec![0.3, 0.1]),
///         HrirMeasurement::new(Position::from_degrees(-90.0, 0.0, 1.0)?, vec![0.3, 0.1], vec![1.0, 0.5]),
///     ],
/// )?;
/// let tool = StereoTool::new(StereoToolConfig::default(), store)?;
///
/// let source = tool.source(vec![0.5; 1600], Position::from_degrees(60.0, 0.0, 2.0)?);
/// let stereo = tool.render_direct(&[source])?;
/// assert_eq!(stereo.len(), 1600);
/// # Ok::<(), ambistereo::SpatialError>(())
/// ```
#[derive(Debug, Clone)]
pub struct StereoTool {
    config: StereoToolConfig,
    store: HrirStore,
    ring: VirtualSpeakerRing,
}

impl StereoTool {
    /// Creates a tool from a configuration and an HRIR store.
    ///
    /// # Errors
    ///
    /// - Any error from [`StereoToolConfig::validate`].
    /// - [`SpatialError::SampleRateMismatch`] if the store was measured at a
    ///   different rate than `config.sample_rate`.
    pub fn new(config: StereoToolConfig, store: HrirStore) -> Result<Self> {
        config.validate()?;
        if store.sample_rate() != config.sample_rate {
            return Err(SpatialError::SampleRateMismatch {
                expected: config.sample_rate,
                got: store.sample_rate(),
            });
        }
        let ring = VirtualSpeakerRing::new(config.speaker_count)?;

        tracing::info!(
            sample_rate = config.sample_rate,
            speakers = config.speaker_count,
            use_hrtf = config.use_hrtf,
            parallel = config.parallel,
            hrirs = store.len(),
            "Created stereo tool"
        );

        Ok(Self {
            config,
            store,
            ring,
        })
    }

    /// The configuration this tool was built with.
    pub fn config(&self) -> &StereoToolConfig {
        &self.config
    }

    /// The HRIR store used for binauralization.
    pub fn hrir_store(&self) -> &HrirStore {
        &self.store
    }

    /// The virtual speaker ring used by the ambisonic path.
    pub fn speaker_ring(&self) -> &VirtualSpeakerRing {
        &self.ring
    }

    /// Wraps `samples` as a source at `position`, tagged with the pipeline rate.
    pub fn source(&self, samples: Vec<f32>, position: Position) -> PositionalSource {
        PositionalSource::new(samples, position, self.config.sample_rate)
    }

    fn engine(&self) -> ConvolutionEngine<'_> {
        ConvolutionEngine::new(&self.store).with_parallel(self.config.parallel)
    }

    /// Convolves each source with its nearest HRIR pair and sums the results.
    ///
    /// The output is as long as the longest source. A source of length `L`
    /// fills `L - H + 1` samples starting at `H - 1`, where `H` is the store's
    /// impulse response length.
    ///
    /// # Errors
    ///
    /// - [`SpatialError::EmptySources`] if `sources` is empty.
    /// - [`SpatialError::SampleRateMismatch`] if a source is not at the pipeline rate.
    pub fn render_direct(&self, sources: &[PositionalSource]) -> Result<StereoBuffer> {
        let out = self.engine().render(sources)?;
        tracing::debug!(sources = sources.len(), frames = out.len(), "Rendered direct path");
        Ok(out)
    }

    /// Encodes positioned sources into first-order B-format.
    ///
    /// # Errors
    ///
    /// Same as [`StereoTool::render_direct`].
    pub fn encode_ambisonics(&self, sources: &[PositionalSource]) -> Result<AmbisonicBuffer> {
        validate_sources(sources, self.config.sample_rate)?;
        let buffer = encode_sources(sources);
        tracing::debug!(sources = sources.len(), frames = buffer.len(), "Encoded B-format");
        Ok(buffer)
    }

    /// Renders through the ambisonic intermediate.
    ///
    /// With `use_hrtf` the B-format is decoded onto the speaker ring and each
    /// speaker feed is binauralized at its speaker position. Without it the
    /// result is the mid/side [`downmix_stereo`] of W and Y.
    ///
    /// # Errors
    ///
    /// - Source errors as for [`StereoTool::render_direct`].
    /// - [`SpatialError::ChannelMismatch`] or [`SpatialError::ChannelLengthMismatch`]
    ///   for malformed [`AmbisonicInput::BFormat`] channels.
    pub fn render_via_ambisonics(
        &self,
        input: AmbisonicInput<'_>,
        use_hrtf: bool,
    ) -> Result<StereoBuffer> {
        let encoded;
        let buffer = match input {
            AmbisonicInput::Sources(sources) => {
                encoded = self.encode_ambisonics(sources)?;
                &encoded
            }
            AmbisonicInput::BFormat(channels) => {
                encoded = AmbisonicBuffer::from_slices(channels)?;
                &encoded
            }
            AmbisonicInput::Buffer(buffer) => buffer,
        };

        if !use_hrtf {
            let out = downmix_stereo(buffer);
            tracing::debug!(frames = out.len(), "Rendered ambisonic downmix");
            return Ok(out);
        }

        let speakers = self.ring.speaker_sources(buffer, self.config.sample_rate)?;
        let out = self.engine().render(&speakers)?;
        tracing::debug!(
            speakers = speakers.len(),
            frames = out.len(),
            "Rendered ambisonic binaural path"
        );
        Ok(out)
    }

    /// Like [`StereoTool::render_via_ambisonics`], with `None` falling back
    /// to the configured HRTF flag.
    pub fn render(&self, input: AmbisonicInput<'_>, use_hrtf: Option<bool>) -> Result<StereoBuffer> {
        self.render_via_ambisonics(input, use_hrtf.unwrap_or(self.config.use_hrtf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hrir::HrirMeasurement;

    const EPS: f32 = 1e-5;
    const IR_LEN: usize = 4;

    /// Horizontal ring of measurements every 30 degrees plus two elevated rows.
    fn store() -> HrirStore {
        let mut measurements = Vec::new();
        for (row, el) in [-30.0, 0.0, 30.0].into_iter().enumerate() {
            for (col, az) in (-180..180).step_by(30).enumerate() {
                let tag = (row * 12 + col) as f32 + 1.0;
                let left: Vec<f32> = (0..IR_LEN).map(|k| tag / (k as f32 + 1.0)).collect();
                let right: Vec<f32> = (0..IR_LEN).map(|k| -tag * 0.5 / (k as f32 + 1.0)).collect();
                measurements.push(HrirMeasurement::new(
                    Position::from_degrees(az as f64, el, 1.0).unwrap(),
                    left,
                    right,
                ));
            }
        }
        HrirStore::new(16000, measurements).unwrap()
    }

    fn tool() -> StereoTool {
        StereoTool::new(StereoToolConfig::default(), store()).unwrap()
    }

    fn noise(len: usize, seed: u32) -> Vec<f32> {
        let mut state = seed.wrapping_mul(2654435761).max(1);
        (0..len)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }

    fn assert_close(a: &[f32], b: &[f32], what: &str) {
        assert_eq!(a.len(), b.len(), "{} length", what);
        for (i, (x, y)) in a.iter().zip(b).enumerate() {
            assert!((x - y).abs() < EPS, "{}[{}]: {} vs {}", what, i, x, y);
        }
    }

    #[test]
    fn test_new_rejects_rate_mismatch() {
        let config = StereoToolConfig::default().with_sample_rate(48000);
        assert!(matches!(
            StereoTool::new(config, store()),
            Err(SpatialError::SampleRateMismatch {
                expected: 48000,
                got: 16000
            })
        ));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = StereoToolConfig::default().with_speaker_count(3);
        assert!(matches!(
            StereoTool::new(config, store()),
            Err(SpatialError::InvalidSpeakerCount(3))
        ));
    }

    #[test]
    fn test_accessors() {
        let tool = tool();
        assert_eq!(tool.config(), &StereoToolConfig::default());
        assert_eq!(tool.hrir_store().ir_len(), IR_LEN);
        assert_eq!(tool.speaker_ring().len(), 8);
        let src = tool.source(vec![0.0; 3], Position::default());
        assert_eq!(src.sample_rate, 16000);
    }

    #[test]
    fn test_direct_superposition() {
        let tool = tool();
        let a = tool.source(noise(256, 1), Position::from_degrees(40.0, 10.0, 2.0).unwrap());
        let b = tool.source(noise(256, 2), Position::from_degrees(-120.0, -20.0, 1.0).unwrap());

        let both = tool.render_direct(&[a.clone(), b.clone()]).unwrap();
        let only_a = tool.render_direct(&[a]).unwrap();
        let only_b = tool.render_direct(&[b]).unwrap();

        let left: Vec<f32> = only_a.left().iter().zip(only_b.left()).map(|(x, y)| x + y).collect();
        let right: Vec<f32> = only_a.right().iter().zip(only_b.right()).map(|(x, y)| x + y).collect();
        assert_close(both.left(), &left, "left");
        assert_close(both.right(), &right, "right");
    }

    #[test]
    fn test_direct_nonzero_span() {
        let tool = tool();
        let len = 40;
        let src = tool.source(vec![1.0; len], Position::from_degrees(0.0, 0.0, 1.0).unwrap());
        let out = tool.render_direct(&[src]).unwrap();
        assert_eq!(out.len(), len);
        for i in 0..IR_LEN - 1 {
            assert_eq!(out.left()[i], 0.0);
            assert_eq!(out.right()[i], 0.0);
        }
        let span = out.left()[IR_LEN - 1..].iter().filter(|s| **s != 0.0).count();
        assert_eq!(span, len - IR_LEN + 1);
    }

    #[test]
    fn test_end_to_end_impulse_reproduces_nearest_hrir() {
        let tool = tool();
        let position = Position::from_degrees(60.0, 30.0, 3.0).unwrap();
        let mut signal = vec![0.0f32; 16000];
        signal[IR_LEN - 1] = 1.0;

        let out = tool.render_direct(&[tool.source(signal, position)]).unwrap();
        assert_eq!(out.len(), 16000);

        let pair = tool.hrir_store().nearest(&position);
        let offset = IR_LEN - 1;
        assert_close(&out.left()[offset..offset + IR_LEN], &pair.left, "left");
        assert_close(&out.right()[offset..offset + IR_LEN], &pair.right, "right");
        assert!(out.left()[offset + IR_LEN..].iter().all(|s| *s == 0.0));
        assert!(out.left()[..offset].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_direct_empty_sources_fails() {
        assert!(matches!(tool().render_direct(&[]), Err(SpatialError::EmptySources)));
    }

    #[test]
    fn test_bformat_channel_contract() {
        let tool = tool();
        let three = vec![vec![0.0f32; 32]; 3];
        assert!(matches!(
            tool.render_via_ambisonics(AmbisonicInput::BFormat(&three), true),
            Err(SpatialError::ChannelMismatch {
                expected: 4,
                got: 3
            })
        ));
        assert!(matches!(
            tool.render_via_ambisonics(AmbisonicInput::BFormat(&three), false),
            Err(SpatialError::ChannelMismatch { .. })
        ));
        let four = vec![vec![0.0f32; 32]; 4];
        assert!(tool.render_via_ambisonics(AmbisonicInput::BFormat(&four), true).is_ok());
    }

    #[test]
    fn test_ambisonic_downmix_matches_buffer() {
        let tool = tool();
        let sources = [
            tool.source(noise(64, 3), Position::from_degrees(90.0, 0.0, 1.0).unwrap()),
            tool.source(noise(48, 4), Position::from_degrees(-30.0, 20.0, 1.0).unwrap()),
        ];
        let buffer = tool.encode_ambisonics(&sources).unwrap();
        assert_eq!(buffer.len(), 64);

        let out = tool
            .render_via_ambisonics(AmbisonicInput::Sources(&sources), false)
            .unwrap();
        assert_eq!(out.len(), 64);
        for t in 0..out.len() {
            let sum = out.left()[t] + out.right()[t];
            let diff = out.left()[t] - out.right()[t];
            assert!((sum - buffer.w()[t]).abs() < EPS, "W at {}", t);
            assert!((diff - buffer.channel(1).unwrap()[t]).abs() < EPS, "Y at {}", t);
        }
    }

    #[test]
    fn test_ambisonic_hrtf_equals_direct_render_of_speakers() {
        let tool = tool();
        let sources = [tool.source(noise(128, 5), Position::from_degrees(15.0, 0.0, 1.0).unwrap())];
        let buffer = tool.encode_ambisonics(&sources).unwrap();

        let via = tool.render(AmbisonicInput::from(&buffer), Some(true)).unwrap();
        let speakers = tool.speaker_ring().speaker_sources(&buffer, 16000).unwrap();
        let direct = tool.render_direct(&speakers).unwrap();

        assert_eq!(via.len(), 128);
        assert_close(via.left(), direct.left(), "left");
        assert_close(via.right(), direct.right(), "right");
    }

    #[test]
    fn test_render_default_flag_comes_from_config() {
        let store = store();
        let sources = [PositionalSource::new(noise(32, 6), Position::default(), 16000)];

        let hrtf = StereoTool::new(StereoToolConfig::default(), store.clone()).unwrap();
        let plain = StereoTool::new(StereoToolConfig::default().with_hrtf(false), store).unwrap();

        let a = hrtf.render(AmbisonicInput::Sources(&sources), None).unwrap();
        let b = hrtf.render_via_ambisonics(AmbisonicInput::Sources(&sources), true).unwrap();
        assert_eq!(a, b);

        let c = plain.render(AmbisonicInput::Sources(&sources), None).unwrap();
        let d = plain.render_via_ambisonics(AmbisonicInput::Sources(&sources), false).unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn test_ambisonic_sources_validated() {
        let tool = tool();
        assert!(matches!(
            tool.render_via_ambisonics(AmbisonicInput::Sources(&[]), true),
            Err(SpatialError::EmptySources)
        ));
        let wrong_rate = [PositionalSource::new(vec![0.0; 8], Position::default(), 44100)];
        assert!(matches!(
            tool.encode_ambisonics(&wrong_rate),
            Err(SpatialError::SampleRateMismatch { .. })
        ));
    }

    #[test]
    fn test_empty_bformat_renders_empty() {
        let tool = tool();
        let empty = AmbisonicBuffer::silent(0);
        assert!(tool.render(AmbisonicInput::Buffer(&empty), Some(true)).unwrap().is_empty());
        assert!(tool.render(AmbisonicInput::Buffer(&empty), Some(false)).unwrap().is_empty());
    }

    #[test]
    fn test_tool_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StereoTool>();
    }
}
