//! Configuration module.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - CLI argument merging
//! - Configuration validation

pub mod loader;
pub mod modes;
pub mod validation;

pub use loader::{
    CacheSection, Config, DriveSection, MirrorSection, PixivSection, SelectSection,
    TransportSection,
};
pub use modes::{PipelineMode, RankingMode};
pub use validation::validate_config;
