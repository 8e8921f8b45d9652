//! # ambistereo: binaural stereo rendering of positioned audio sources
//!
//! Turns mono sources placed around a listener into headphone stereo, either
//! by convolving each source with measured head-related impulse responses or
//! by passing through a first-order ambisonic representation first.
//!
//! ## Architecture
//!
//! - **[`position`]**: Spherical positions and positioned mono sources.
//! - **[`harmonics`]**: Real first-order spherical harmonics (ACN/SN3D) and
//!   encoding matrices.
//! - **[`ambisonics`]**: B-format buffers, source encoding, decoding onto a
//!   virtual speaker ring, and the plain mid/side downmix.
//! - **[`hrir`]**: Immutable HRIR store with nearest-direction lookup.
//! - **[`convolution`]**: Valid-region convolution and the binaural mixing engine.
//! - **[`stereo`]**: The two-channel output buffer.
//! - **[`tool`]**: [`StereoTool`], the pipeline tying the stages together.
//! - **[`config`]**: Serializable pipeline settings.
//! - **[`error`]**: Error types for all rendering operations.
//!
//! ## Quick Start
//!
//! ```rust
//! use ambistereo::{
//!     AmbisonicInput, HrirMeasurement, HrirStore, Position, StereoTool, StereoToolConfig,
//! };
//!
//! // Two measured directions, one per ear side
//! let store = HrirStore::new(
//!     16000,
//!     vec![
//!         HrirMeasurement::new(Position::from_degrees(90.0, 0.0, 1.0)?, vec![0.9, 0.3, 0.1], vec![0.2, 0.1, 0.0]),
//!         HrirMeasurement::new(Position::from_degrees(-90.0, 0.0, 1.0)?, vec![0.2, 0.1, 0.0], vec![0.9, 0.3, 0.1]),
//!     ],
//! )?;
//! let tool = StereoTool::new(StereoToolConfig::default(), store)?;
//!
//! let sources = vec![
//!     tool.source(vec![0.25; 800], Position::from_degrees(30.0, 0.0, 1.5)?),
//!     tool.source(vec![0.5; 1600], Position::from_degrees(-45.0, 10.0, 2.0)?),
//! ];
//!
//! // Direct HRIR convolution
//! let direct = tool.render_direct(&sources)?;
//! assert_eq!(direct.len(), 1600);
//!
//! // Through B-format and the virtual speaker ring
//! let via_ring = tool.render(AmbisonicInput::Sources(&sources), None)?;
//! assert_eq!(via_ring.len(), 1600);
//!
//! // Interleaved frames for an audio writer
//! assert_eq!(via_ring.interleaved().len(), 3200);
//! # Ok::<(), ambistereo::SpatialError>(())
//! ```

pub mod ambisonics;
pub mod config;
pub mod convolution;
pub mod error;
pub mod harmonics;
pub mod hrir;
pub mod position;
pub mod stereo;
pub mod tool;

pub use ambisonics::{AmbisonicBuffer, VirtualSpeakerRing};
pub use config::StereoToolConfig;
pub use convolution::{convolve_valid, ConvolutionEngine};
pub use error::{Result, SpatialError};
pub use harmonics::{spherical_harmonics, spherical_harmonics_matrix, AmbisonicsOrder, EncodingMatrix};
pub use hrir::{HrirMeasurement, HrirPair, HrirStore};
pub use position::{Position, PositionalSource};
pub use stereo::StereoBuffer;
pub use tool::{AmbisonicInput, StereoTool};
