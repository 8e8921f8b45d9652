//! Real spherical harmonics and encoding matrices.
//!
//! Coefficients follow ACN channel ordering with SN3D normalization. At first
//! order a direction `(az, el)` maps to:
//! - ACN 0 (W) = 1  (omnidirectional)
//! - ACN 1 (Y) = sin(az) × cos(el)  (left-right)
//! - ACN 2 (Z) = sin(el)  (up-down)
//! - ACN 3 (X) = cos(az) × cos(el)  (front-back)
//!
//! The same matrix serves both directions of the pipeline: source rows encode
//! mono signals into B-format, speaker rows decode B-format into speaker feeds.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpatialError};
use crate::position::Position;

/// Ambisonics order determining the spatial resolution.
///
/// The number of channels is `(order + 1)²`. This core renders first order only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AmbisonicsOrder {
    /// First Order Ambisonics: 4 channels (W, Y, Z, X).
    #[default]
    First,
}

impl AmbisonicsOrder {
    /// Returns the number of channels required for this order.
    pub fn channel_count(&self) -> usize {
        let order = self.numeric_order();
        (order + 1) * (order + 1)
    }

    /// Returns the numeric order value.
    pub fn numeric_order(&self) -> usize {
        match self {
            Self::First => 1,
        }
    }

    /// Creates an `AmbisonicsOrder` from a numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::UnsupportedOrder`] for anything but 1.
    pub fn from_order(order: u8) -> Result<Self> {
        match order {
            1 => Ok(Self::First),
            _ => Err(SpatialError::UnsupportedOrder(order)),
        }
    }
}

impl TryFrom<u8> for AmbisonicsOrder {
    type Error = SpatialError;

    fn try_from(order: u8) -> Result<Self> {
        Self::from_order(order)
    }
}

impl From<AmbisonicsOrder> for u8 {
    fn from(order: AmbisonicsOrder) -> u8 {
        order.numeric_order() as u8
    }
}

/// Dense row-major matrix with one row of spherical-harmonic coefficients per position.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingMatrix {
    order: AmbisonicsOrder,
    rows: usize,
    coefficients: Vec<f64>,
}

impl EncodingMatrix {
    /// Number of positions (rows).
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of ambisonic channels (columns).
    pub fn columns(&self) -> usize {
        self.order.channel_count()
    }

    /// The order this matrix was built for.
    pub fn order(&self) -> AmbisonicsOrder {
        self.order
    }

    /// Coefficients for one position, or `None` if `index` is out of range.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if index >= self.rows {
            return None;
        }
        let width = self.columns();
        Some(&self.coefficients[index * width..(index + 1) * width])
    }

    /// Iterates over rows in position order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.coefficients.chunks_exact(self.columns())
    }
}

/// Computes spherical harmonic coefficients for one direction.
///
/// Returns `order.channel_count()` values in ACN order.
pub fn spherical_harmonics(position: &Position, order: AmbisonicsOrder) -> Vec<f64> {
    let (sin_az, cos_az) = position.azimuth().sin_cos();
    let (sin_el, cos_el) = position.elevation().sin_cos();

    let mut coeffs = vec![0.0f64; order.channel_count()];

    // Order 0: omnidirectional
    coeffs[0] = 1.0;

    // Order 1: first-order dipoles
    coeffs[1] = sin_az * cos_el;
    coeffs[2] = sin_el;
    coeffs[3] = cos_az * cos_el;

    coeffs
}

/// Builds the encoding matrix for a set of positions.
///
/// Row `i` holds [`spherical_harmonics`] evaluated at `positions[i]`. Pure and
/// deterministic; an empty slice yields a matrix with zero rows.
pub fn spherical_harmonics_matrix(positions: &[Position], order: AmbisonicsOrder) -> EncodingMatrix {
    let mut coefficients = Vec::with_capacity(positions.len() * order.channel_count());
    for position in positions {
        coefficients.extend(spherical_harmonics(position, order));
    }
    EncodingMatrix {
        order,
        rows: positions.len(),
        coefficients,
    }
}
