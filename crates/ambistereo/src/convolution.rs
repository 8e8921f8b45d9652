//! HRIR convolution of positioned sources into a stereo mix.
//!
//! ## Rendering Model
//!
//! For each source the engine:
//! - looks up the nearest HRIR pair for the source direction
//! - convolves the signal with the left and right responses, keeping only the
//!   valid region (`L - H + 1` samples for a signal of length `L` and responses
//!   of length `H`)
//! - adds both results into the output starting at `H - 1`
//!
//! Every pair in a store shares one length, so all sources line up on the same
//! offset and the mix is a plain sum. Signals shorter than the impulse response
//! have no valid region and contribute nothing.

use crate::error::{Result, SpatialError};
use crate::hrir::HrirStore;
use crate::position::{validate_sources, PositionalSource};
use crate::stereo::StereoBuffer;

/// Valid-region linear convolution of `signal` with `impulse`.
///
/// `out[n] = Σ_k signal[n + H - 1 - k] · impulse[k]` for `n` in `0..=L - H`.
/// An impulse at `signal[p]` therefore reproduces `impulse` starting at
/// `out[p - (H - 1)]`.
///
/// Returns an empty vector when `impulse` is empty or `signal` is shorter than
/// `impulse`.
pub fn convolve_valid(signal: &[f32], impulse: &[f32]) -> Vec<f32> {
    if impulse.is_empty() || signal.len() < impulse.len() {
        return Vec::new();
    }
    let reversed: Vec<f32> = impulse.iter().rev().copied().collect();
    convolve_reversed(signal, &reversed)
}

/// Slides an already reversed kernel over the input as a dot product.
fn convolve_reversed(signal: &[f32], reversed: &[f32]) -> Vec<f32> {
    signal
        .windows(reversed.len())
        .map(|window| {
            window
                .iter()
                .zip(reversed)
                .map(|(x, h)| f64::from(*x) * f64::from(*h))
                .sum::<f64>() as f32
        })
        .collect()
}

/// Renders positioned sources to stereo through an [`HrirStore`].
#[derive(Debug, Clone, Copy)]
pub struct ConvolutionEngine<'a> {
    store: &'a HrirStore,
    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    parallel: bool,
}

impl<'a> ConvolutionEngine<'a> {
    /// Creates an engine that looks up responses in `store`.
    pub fn new(store: &'a HrirStore) -> Self {
        Self {
            store,
            parallel: false,
        }
    }

    /// Convolve sources on the rayon pool. Only takes effect with the
    /// `parallel` feature.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Index in the output where every contribution starts (`H - 1`).
    pub fn offset(&self) -> usize {
        self.store.ir_len() - 1
    }

    /// Renders `sources` into a new buffer as long as the longest signal.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::EmptySources`] if `sources` is empty, and
    /// [`SpatialError::SampleRateMismatch`] if a source rate differs from the
    /// store's rate.
    pub fn render(&self, sources: &[PositionalSource]) -> Result<StereoBuffer> {
        validate_sources(sources, self.store.sample_rate())?;
        let frames = sources.iter().map(PositionalSource::len).max().unwrap_or(0);
        let mut out = StereoBuffer::silent(frames);
        self.mix_into(&mut out, sources);
        Ok(out)
    }

    /// Adds the rendering of `sources` into a buffer the caller sized ahead of time.
    ///
    /// # Errors
    ///
    /// Same as [`ConvolutionEngine::render`], plus [`SpatialError::BufferTooShort`]
    /// if a contribution would run past the end of `out`. Nothing is written
    /// when an error is returned.
    pub fn render_into(&self, out: &mut StereoBuffer, sources: &[PositionalSource]) -> Result<()> {
        validate_sources(sources, self.store.sample_rate())?;
        let ir_len = self.store.ir_len();
        let needed = sources
            .iter()
            .map(PositionalSource::len)
            .filter(|len| *len >= ir_len)
            .max()
            .unwrap_or(0);
        if needed > out.len() {
            return Err(SpatialError::BufferTooShort {
                needed,
                available: out.len(),
            });
        }
        self.mix_into(out, sources);
        Ok(())
    }

    fn mix_into(&self, out: &mut StereoBuffer, sources: &[PositionalSource]) {
        #[cfg(feature = "parallel")]
        if self.parallel {
            use rayon::prelude::*;

            let frames = out.len();
            let partial = sources
                .par_iter()
                .fold(
                    || StereoBuffer::silent(frames),
                    |mut acc, source| {
                        self.accumulate_source(&mut acc, source);
                        acc
                    },
                )
                .reduce(
                    || StereoBuffer::silent(frames),
                    |mut a, b| {
                        a.mix(&b);
                        a
                    },
                );
            out.mix(&partial);
            tracing::debug!(sources = sources.len(), frames, "Rendered binaural mix in parallel");
            return;
        }

        for source in sources {
            self.accumulate_source(out, source);
        }
        tracing::debug!(
            sources = sources.len(),
            frames = out.len(),
            "Rendered binaural mix"
        );
    }

    fn accumulate_source(&self, out: &mut StereoBuffer, source: &PositionalSource) {
        let pair = self.store.nearest(&source.position);
        let left = convolve_valid(&source.signal, &pair.left);
        if left.is_empty() {
            return;
        }
        let right = convolve_valid(&source.signal, &pair.right);
        out.accumulate(self.offset(), &left, &right);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hrir::HrirMeasurement;
    use crate::position::Position;

    const EPS: f32 = 1e-6;

    fn store() -> HrirStore {
        HrirStore::new(
            16000,
            vec![
                HrirMeasurement::new(
                    Position::from_degrees(90.0, 0.0, 1.0).unwrap(),
                    vec![1.0, 0.5, 0.25],
                    vec![0.2, 0.1, 0.0],
                ),
                HrirMeasurement::new(
                    Position::from_degrees(-90.0, 0.0, 1.0).unwrap(),
                    vec![0.2, 0.1, 0.0],
                    vec![1.0, 0.5, 0.25],
                ),
            ],
        )
        .unwrap()
    }

    fn left_source(signal: Vec<f32>) -> PositionalSource {
        PositionalSource::new(signal, Position::from_degrees(80.0, 0.0, 2.0).unwrap(), 16000)
    }

    #[test]
    fn test_convolve_valid_known_values() {
        // Same data as a full convolution of [1,2,3,4,5] with [1,2,3], valid part only
        let out = convolve_valid(&[1.0, 2.0, 3.0, 4.0, 5.0], &[1.0, 2.0, 3.0]);
        assert_eq!(out, vec![10.0, 16.0, 22.0]);
    }

    #[test]
    fn test_convolve_valid_impulse_reproduces_kernel() {
        let mut signal = vec![0.0; 8];
        signal[4] = 1.0;
        let out = convolve_valid(&signal, &[0.5, 0.25, 0.125]);
        assert_eq!(out.len(), 6);
        assert_eq!(&out[2..5], &[0.5, 0.25, 0.125]);
        assert_eq!(out[0], 0.0);
        assert_eq!(out[5], 0.0);
    }

    #[test]
    fn test_convolve_valid_degenerate() {
        assert!(convolve_valid(&[], &[1.0]).is_empty());
        assert!(convolve_valid(&[1.0, 2.0], &[1.0, 2.0, 3.0]).is_empty());
        assert!(convolve_valid(&[1.0, 2.0], &[]).is_empty());
        assert_eq!(convolve_valid(&[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0]), vec![6.0]);
    }

    #[test]
    fn test_render_length_and_offset() {
        let store = store();
        let engine = ConvolutionEngine::new(&store);
        assert_eq!(engine.offset(), 2);

        let out = engine.render(&[left_source(vec![1.0; 10])]).unwrap();
        assert_eq!(out.len(), 10);
        // Valid span is L - H + 1 = 8 samples starting at H - 1 = 2
        assert_eq!(out.left()[0], 0.0);
        assert_eq!(out.left()[1], 0.0);
        for i in 2..10 {
            assert!((out.left()[i] - 1.75).abs() < EPS, "L[{}] = {}", i, out.left()[i]);
            assert!((out.right()[i] - 0.3).abs() < EPS, "R[{}] = {}", i, out.right()[i]);
        }
    }

    #[test]
    fn test_render_uses_nearest_pair() {
        let store = store();
        let engine = ConvolutionEngine::new(&store);
        let right = PositionalSource::new(
            vec![1.0; 4],
            Position::from_degrees(-60.0, 10.0, 1.0).unwrap(),
            16000,
        );
        let out = engine.render(&[right]).unwrap();
        assert!(out.right()[3] > out.left()[3]);
    }

    #[test]
    fn test_render_output_is_longest_source() {
        let store = store();
        let engine = ConvolutionEngine::new(&store);
        let out = engine
            .render(&[left_source(vec![1.0; 4]), left_source(vec![1.0; 12])])
            .unwrap();
        assert_eq!(out.len(), 12);
    }

    #[test]
    fn test_render_short_signal_contributes_nothing() {
        let store = store();
        let engine = ConvolutionEngine::new(&store);
        let out = engine
            .render(&[left_source(vec![1.0; 2]), left_source(Vec::new())])
            .unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.left().iter().chain(out.right()).all(|s| *s == 0.0));
    }

    #[test]
    fn test_render_empty_sources_fails() {
        let store = store();
        let engine = ConvolutionEngine::new(&store);
        assert!(matches!(engine.render(&[]), Err(SpatialError::EmptySources)));
    }

    #[test]
    fn test_render_sample_rate_mismatch_fails() {
        let store = store();
        let engine = ConvolutionEngine::new(&store);
        let src = PositionalSource::new(vec![1.0; 8], Position::default(), 48000);
        assert!(matches!(
            engine.render(&[src]),
            Err(SpatialError::SampleRateMismatch {
                expected: 16000,
                got: 48000
            })
        ));
    }

    #[test]
    fn test_render_into_accumulates() {
        let store = store();
        let engine = ConvolutionEngine::new(&store);
        let mut out = StereoBuffer::silent(16);
        let sources = [left_source(vec![1.0; 6])];
        engine.render_into(&mut out, &sources).unwrap();
        engine.render_into(&mut out, &sources).unwrap();
        assert!((out.left()[2] - 3.5).abs() < EPS);
        assert_eq!(out.left()[6], 0.0);
    }

    #[test]
    fn test_render_into_too_short_fails() {
        let store = store();
        let engine = ConvolutionEngine::new(&store);
        let mut out = StereoBuffer::silent(5);
        let result = engine.render_into(&mut out, &[left_source(vec![1.0; 6])]);
        assert!(matches!(
            result,
            Err(SpatialError::BufferTooShort {
                needed: 6,
                available: 5
            })
        ));
        assert!(out.left().iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let store = store();
        let sources: Vec<PositionalSource> = (0..6)
            .map(|i| {
                let signal = (0..64).map(|n| ((n * (i + 1)) as f32 * 0.1).sin()).collect();
                PositionalSource::new(
                    signal,
                    Position::from_degrees(-150.0 + 50.0 * i as f64, 0.0, 1.0).unwrap(),
                    16000,
                )
            })
            .collect();

        let seq = ConvolutionEngine::new(&store).render(&sources).unwrap();
        let par = ConvolutionEngine::new(&store)
            .with_parallel(true)
            .render(&sources)
            .unwrap();
        assert_eq!(seq.len(), par.len());
        for i in 0..seq.len() {
            assert!((seq.left()[i] - par.left()[i]).abs() < 1e-5);
            assert!((seq.right()[i] - par.right()[i]).abs() < 1e-5);
        }
    }
}
