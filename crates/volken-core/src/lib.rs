pub mod config;
pub mod constants;
pub mod error;
pub mod math;
pub mod preset;

pub use config::{CloudConfig, ConfigIssue, SharedCloudConfig};
pub use error::VolkenError;
pub use preset::{PresetError, PresetLibrary};
