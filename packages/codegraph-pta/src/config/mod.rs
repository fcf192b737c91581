//! Analysis configuration
//!
//! - [`PtaConfig`]: all solver knobs, builder setters, YAML loading
//! - [`Preset`]: fast / balanced / thorough starting points
//! - [`ConfigError`]: validation and loading failures

pub mod error;
pub mod preset;
pub mod pta_config;

pub use error::{ConfigError, ConfigResult};
pub use preset::Preset;
pub use pta_config::{
    ContextPolicy, EntrySeeding, MergeConfig, PtaConfig, WorklistOrder, MAX_CONTEXT_DEPTH,
};
