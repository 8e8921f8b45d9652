//! Source positions and positioned mono signals.
//!
//! Angles are in radians, radius in meters:
//! - **Azimuth**: wrapped into `[-π, π)` (0 = front, +π/2 = left, -π/2 = right, -π = rear)
//! - **Elevation**: `-π/2..=π/2` (0 = ear level, +π/2 = above, -π/2 = below)
//! - **Radius**: `>= 0`. Carried for callers; the HRIR lookup ignores it.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpatialError};

/// A point around the listener in spherical coordinates.
///
/// Immutable once built; every constructor validates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PositionRepr")]
pub struct Position {
    azimuth: f64,
    elevation: f64,
    radius: f64,
}

impl Position {
    /// Creates a new position, wrapping the azimuth into `[-π, π)`.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidAzimuth`] if azimuth is not finite.
    /// Returns [`SpatialError::InvalidElevation`] if elevation is outside `-π/2..=π/2`.
    /// Returns [`SpatialError::InvalidRadius`] if radius is negative or not finite.
    pub fn new(azimuth: f64, elevation: f64, radius: f64) -> Result<Self> {
        if !azimuth.is_finite() {
            return Err(SpatialError::InvalidAzimuth(azimuth));
        }
        if !(-FRAC_PI_2..=FRAC_PI_2).contains(&elevation) {
            return Err(SpatialError::InvalidElevation(elevation));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(SpatialError::InvalidRadius(radius));
        }
        Ok(Self {
            azimuth: wrap_azimuth(azimuth),
            elevation,
            radius,
        })
    }

    /// Same as [`Position::new`] but with angles given in degrees.
    pub fn from_degrees(azimuth: f64, elevation: f64, radius: f64) -> Result<Self> {
        Self::new(azimuth.to_radians(), elevation.to_radians(), radius)
    }

    /// A unit-radius point at ear level.
    pub fn horizontal(azimuth: f64) -> Result<Self> {
        Self::new(azimuth, 0.0, 1.0)
    }

    /// Azimuth in radians, within `[-π, π)`.
    pub fn azimuth(&self) -> f64 {
        self.azimuth
    }

    /// Elevation in radians.
    pub fn elevation(&self) -> f64 {
        self.elevation
    }

    /// Distance from the listener.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Direction of this position on the unit sphere.
    ///
    /// - x = forward (positive = front)
    /// - y = lateral (positive = left)
    /// - z = up (positive = up)
    pub fn unit_vector(&self) -> [f64; 3] {
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        let (sin_el, cos_el) = self.elevation.sin_cos();
        [cos_az * cos_el, sin_az * cos_el, sin_el]
    }

    /// Great-circle angle to another position in radians, ignoring radius.
    pub fn angle_to(&self, other: &Position) -> f64 {
        dot(&self.unit_vector(), &other.unit_vector())
            .clamp(-1.0, 1.0)
            .acos()
    }
}

impl Default for Position {
    fn default() -> Self {
        Self {
            azimuth: 0.0,
            elevation: 0.0,
            radius: 1.0,
        }
    }
}

#[derive(Deserialize)]
struct PositionRepr {
    azimuth: f64,
    elevation: f64,
    #[serde(default = "default_radius")]
    radius: f64,
}

fn default_radius() -> f64 {
    1.0
}

impl TryFrom<PositionRepr> for Position {
    type Error = SpatialError;

    fn try_from(repr: PositionRepr) -> Result<Self> {
        Position::new(repr.azimuth, repr.elevation, repr.radius)
    }
}

fn wrap_azimuth(azimuth: f64) -> f64 {
    let wrapped = (azimuth + PI).rem_euclid(TAU) - PI;
    // rem_euclid can round up to TAU for inputs just below a multiple of it
    if wrapped >= PI {
        wrapped - TAU
    } else {
        wrapped
    }
}

pub(crate) fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// A mono signal placed at a position.
///
/// The sample rate must match the pipeline that renders it; signal lengths may
/// differ between sources in one render call.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalSource {
    /// Where the source sits relative to the listener.
    pub position: Position,
    /// Mono samples, one per time step.
    pub signal: Vec<f32>,
    /// Sample rate of `signal` in Hz.
    pub sample_rate: u32,
}

impl PositionalSource {
    /// Creates a new positioned source.
    pub fn new(signal: Vec<f32>, position: Position, sample_rate: u32) -> Self {
        Self {
            position,
            signal,
            sample_rate,
        }
    }

    /// Number of samples in the signal.
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    /// Whether the signal has no samples.
    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }
}

/// Checks that a source list is non-empty and runs at `sample_rate`.
pub(crate) fn validate_sources(sources: &[PositionalSource], sample_rate: u32) -> Result<()> {
    if sources.is_empty() {
        return Err(SpatialError::EmptySources);
    }
    for src in sources {
        if src.sample_rate != sample_rate {
            return Err(SpatialError::SampleRateMismatch {
                expected: sample_rate,
                got: src.sample_rate,
            });
        }
    }
    Ok(())
}
