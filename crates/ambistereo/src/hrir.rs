//! Measured head-related impulse responses and nearest-direction lookup.
//!
//! A store is built once from already-parsed measurements and is read-only
//! afterwards. Lookups pick the measurement with the smallest great-circle
//! angle to the query direction; there is no interpolation between
//! measurements and the query radius is ignored.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpatialError};
use crate::position::{dot, Position};

/// Left and right ear impulse responses for one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrirPair {
    /// Left ear impulse response.
    pub left: Vec<f32>,
    /// Right ear impulse response.
    pub right: Vec<f32>,
}

impl HrirPair {
    /// Creates a new pair.
    pub fn new(left: Vec<f32>, right: Vec<f32>) -> Self {
        Self { left, right }
    }

    /// Impulse response length in samples.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Whether the impulse responses are empty.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }
}

/// An HRIR pair tagged with the direction it was measured at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrirMeasurement {
    /// Measurement direction.
    pub position: Position,
    /// The measured impulse responses.
    #[serde(flatten)]
    pub pair: HrirPair,
}

impl HrirMeasurement {
    /// Creates a new measurement.
    pub fn new(position: Position, left: Vec<f32>, right: Vec<f32>) -> Self {
        Self {
            position,
            pair: HrirPair::new(left, right),
        }
    }
}

/// An immutable set of HRIR measurements sharing one length and sample rate.
#[derive(Debug, Clone)]
pub struct HrirStore {
    sample_rate: u32,
    ir_len: usize,
    measurements: Vec<HrirMeasurement>,
    /// Unit direction per measurement, same order as `measurements`.
    directions: Vec<[f64; 3]>,
}

impl HrirStore {
    /// Builds a store from measurements taken at `sample_rate`.
    ///
    /// # Errors
    ///
    /// - [`SpatialError::InvalidSampleRate`] if `sample_rate` is zero.
    /// - [`SpatialError::EmptyHrirStore`] if `measurements` is empty.
    /// - [`SpatialError::InvalidHrir`] if a measurement is empty or its left and
    ///   right responses differ in length.
    /// - [`SpatialError::HrirLengthMismatch`] if measurements differ in length.
    pub fn new(sample_rate: u32, measurements: Vec<HrirMeasurement>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SpatialError::InvalidSampleRate(sample_rate));
        }
        let ir_len = match measurements.first() {
            Some(first) => first.pair.len(),
            None => return Err(SpatialError::EmptyHrirStore),
        };

        for (index, m) in measurements.iter().enumerate() {
            if m.pair.left.len() != m.pair.right.len() {
                return Err(SpatialError::InvalidHrir {
                    index,
                    reason: format!(
                        "left has {} samples, right has {}",
                        m.pair.left.len(),
                        m.pair.right.len()
                    ),
                });
            }
            if m.pair.is_empty() {
                return Err(SpatialError::InvalidHrir {
                    index,
                    reason: "impulse response is empty".into(),
                });
            }
            if m.pair.len() != ir_len {
                return Err(SpatialError::HrirLengthMismatch {
                    index,
                    expected: ir_len,
                    got: m.pair.len(),
                });
            }
        }

        let directions = measurements
            .iter()
            .map(|m| m.position.unit_vector())
            .collect();

        tracing::info!(
            measurements = measurements.len(),
            ir_len,
            sample_rate,
            "Built HRIR store"
        );

        Ok(Self {
            sample_rate,
            ir_len,
            measurements,
            directions,
        })
    }

    /// Sample rate the impulse responses were measured at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length of every impulse response in this store.
    pub fn ir_len(&self) -> usize {
        self.ir_len
    }

    /// Number of measurements.
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// Always `false`; an empty store cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// All measurements in construction order.
    pub fn measurements(&self) -> &[HrirMeasurement] {
        &self.measurements
    }

    /// The HRIR pair measured closest to `position`.
    pub fn nearest(&self, position: &Position) -> &HrirPair {
        &self.nearest_measurement(position).pair
    }

    /// The measurement closest to `position`.
    ///
    /// Closeness is the great-circle angle between directions, found by
    /// maximizing the dot product of unit vectors. Ties resolve to the earliest
    /// measurement in construction order, so repeated queries always agree.
    pub fn nearest_measurement(&self, position: &Position) -> &HrirMeasurement {
        let query = position.unit_vector();
        let mut best = 0;
        let mut best_dot = f64::NEG_INFINITY;
        for (i, dir) in self.directions.iter().enumerate() {
            let d = dot(&query, dir);
            if d > best_dot {
                best_dot = d;
                best = i;
            }
        }
        &self.measurements[best]
    }
}
