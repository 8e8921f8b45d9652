//! Error types for the binaural rendering crate.

use thiserror::Error;

/// Errors that can occur while building or running the rendering pipeline.
#[derive(Error, Debug)]
pub enum SpatialError {
    /// Azimuth is not a finite number.
    #[error("invalid azimuth {0}: must be finite")]
    InvalidAzimuth(f64),

    /// Elevation value is outside the valid range.
    #[error("invalid elevation {0}: must be within -pi/2..=pi/2 radians")]
    InvalidElevation(f64),

    /// Radius is negative or not finite.
    #[error("invalid radius {0}: must be finite and non-negative")]
    InvalidRadius(f64),

    /// The requested Ambisonics order is not supported.
    #[error("unsupported ambisonics order: {0}")]
    UnsupportedOrder(u8),

    /// The number of channels does not match the expected count.
    #[error("channel count mismatch: expected {expected}, got {got}")]
    ChannelMismatch {
        /// The expected number of channels.
        expected: usize,
        /// The actual number of channels.
        got: usize,
    },

    /// Ambisonic channels do not all have the same number of samples.
    #[error("channel {channel} has {got} samples, expected {expected}")]
    ChannelLengthMismatch {
        /// Index of the offending channel.
        channel: usize,
        /// Length of channel 0.
        expected: usize,
        /// Length of the offending channel.
        got: usize,
    },

    /// Virtual speaker rings need an even, non-zero number of speakers.
    #[error("invalid virtual speaker count {0}: must be even and non-zero")]
    InvalidSpeakerCount(usize),

    /// A render call was given no sources.
    #[error("no positional sources to render")]
    EmptySources,

    /// An HRIR store was constructed without any measurements.
    #[error("HRIR store has no measurements")]
    EmptyHrirStore,

    /// A single measurement is unusable (empty, or left/right lengths differ).
    #[error("invalid HRIR measurement at index {index}: {reason}")]
    InvalidHrir {
        /// Index of the measurement in construction order.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },

    /// Measurements in one store do not share a single impulse response length.
    #[error("HRIR length mismatch at index {index}: expected {expected}, got {got}")]
    HrirLengthMismatch {
        /// Index of the measurement in construction order.
        index: usize,
        /// Length of the first measurement.
        expected: usize,
        /// Length of the offending measurement.
        got: usize,
    },

    /// A sample rate of zero was supplied.
    #[error("invalid sample rate {0}: must be non-zero")]
    InvalidSampleRate(u32),

    /// A source or dataset sample rate differs from the pipeline rate.
    #[error("sample rate mismatch: pipeline runs at {expected} Hz, got {got} Hz")]
    SampleRateMismatch {
        /// Pipeline sample rate.
        expected: u32,
        /// Offending sample rate.
        got: u32,
    },

    /// A caller-provided stereo buffer cannot hold a contribution.
    #[error("stereo buffer too short: need {needed} frames, have {available}")]
    BufferTooShort {
        /// Frames required by the longest contribution.
        needed: usize,
        /// Frames in the provided buffer.
        available: usize,
    },

    /// Serialization/deserialization error.
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

/// Convenience Result type for rendering operations.
pub type Result<T> = std::result::Result<T, SpatialError>;
