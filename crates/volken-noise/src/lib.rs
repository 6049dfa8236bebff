//! Seeded procedural noise for the cloud renderer.
//!
//! Every generator is a pure function of its seed and parameters: the same
//! inputs always produce bit-identical fields. Fields are generated once at
//! session start and cached; nothing here runs per frame.

mod cellular;
mod field;
mod gradient;
mod planet;
mod rng;
mod synthesizer;

pub mod gpu;

pub use field::{NoisePlane, NoiseVolume, PlanetSurfaceMap};
pub use gpu::NoiseTextures;
pub use rng::{hash_to_unit, noise_hash, SeededSequence};
pub use synthesizer::{
    CloudNoiseSet, FractalParams, NoiseSettings, NoiseSynthesizer, PlanetMapParams,
};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NoiseError {
    #[error("invalid noise argument: {0}")]
    InvalidArgument(String),
}
