//! Pipeline configuration.

use serde::{Deserialize, Serialize};

use crate::ambisonics::DEFAULT_SPEAKER_COUNT;
use crate::error::{Result, SpatialError};
use crate::harmonics::AmbisonicsOrder;

/// Default pipeline sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 16000;

/// Settings for a [`StereoTool`](crate::StereoTool).
///
/// Missing JSON fields fall back to [`StereoToolConfig::default`].
///
/// # Example
///
/// ```
/// use ambistereo::StereoToolConfig;
///
/// let config = StereoToolConfig::from_json(r#"{ "sample_rate": 48000 }"#).unwrap();
/// assert_eq!(config.sample_rate, 48000);
/// assert_eq!(config.speaker_count, 8);
/// assert!(config.use_hrtf);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoToolConfig {
    /// Sample rate every source and the HRIR store must run at.
    pub sample_rate: u32,
    /// Ambisonic order of the intermediate representation.
    pub order: AmbisonicsOrder,
    /// Number of virtual speakers on the decode ring (even, non-zero).
    pub speaker_count: usize,
    /// Whether the ambisonic path binauralizes through HRIRs by default.
    pub use_hrtf: bool,
    /// Convolve sources on the rayon pool (needs the `parallel` feature).
    pub parallel: bool,
}

impl Default for StereoToolConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            order: AmbisonicsOrder::First,
            speaker_count: DEFAULT_SPEAKER_COUNT,
            use_hrtf: true,
            parallel: false,
        }
    }
}

impl StereoToolConfig {
    /// Sets the sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Sets the virtual speaker count.
    pub fn with_speaker_count(mut self, speaker_count: usize) -> Self {
        self.speaker_count = speaker_count;
        self
    }

    /// Sets the default HRTF flag for the ambisonic path.
    pub fn with_hrtf(mut self, use_hrtf: bool) -> Self {
        self.use_hrtf = use_hrtf;
        self
    }

    /// Enables or disables parallel convolution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// - [`SpatialError::InvalidSampleRate`] if the sample rate is zero.
    /// - [`SpatialError::InvalidSpeakerCount`] if the speaker count is zero or odd.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(SpatialError::InvalidSampleRate(self.sample_rate));
        }
        if self.speaker_count == 0 || self.speaker_count % 2 != 0 {
            return Err(SpatialError::InvalidSpeakerCount(self.speaker_count));
        }
        Ok(())
    }

    /// Serializes the configuration to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::SerdeJson`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let json = serde_json::to_string_pretty(self)?;
        Ok(json)
    }

    /// Deserializes a configuration from a JSON string. Does not validate.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::SerdeJson`] if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: StereoToolConfig = serde_json::from_str(json)?;
        Ok(config)
    }
}
