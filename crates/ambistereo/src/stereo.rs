//! Two-channel output buffer.

/// Left and right sample sequences of equal length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl StereoBuffer {
    /// A silent buffer of `frames` samples per channel.
    pub fn silent(frames: usize) -> Self {
        Self {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    /// Wraps existing channels, or returns `None` if their lengths differ.
    pub fn from_channels(left: Vec<f32>, right: Vec<f32>) -> Option<Self> {
        (left.len() == right.len()).then_some(Self { left, right })
    }

    pub(crate) fn from_equal(left: Vec<f32>, right: Vec<f32>) -> Self {
        debug_assert_eq!(left.len(), right.len());
        Self { left, right }
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Whether the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Left channel.
    pub fn left(&self) -> &[f32] {
        &self.left
    }

    /// Right channel.
    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Adds a contribution into both channels starting at `offset`.
    ///
    /// Callers guarantee `offset + left.len() <= self.len()` and equal
    /// contribution lengths.
    pub(crate) fn accumulate(&mut self, offset: usize, left: &[f32], right: &[f32]) {
        let end = offset + left.len();
        for (dst, src) in self.left[offset..end].iter_mut().zip(left) {
            *dst += *src;
        }
        for (dst, src) in self.right[offset..end].iter_mut().zip(right) {
            *dst += *src;
        }
    }

    /// Adds another buffer of the same length sample by sample.
    #[cfg(feature = "parallel")]
    pub(crate) fn mix(&mut self, other: &StereoBuffer) {
        self.accumulate(0, &other.left, &other.right);
    }

    /// Interleaves into `[L0, R0, L1, R1, ...]` frames for audio writers.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.left.len() * 2);
        for (l, r) in self.left.iter().zip(self.right.iter()) {
            out.push(*l);
            out.push(*r);
        }
        out
    }

    /// Hands back the owned `(left, right)` channels.
    pub fn into_channels(self) -> (Vec<f32>, Vec<f32>) {
        (self.left, self.right)
    }
}
