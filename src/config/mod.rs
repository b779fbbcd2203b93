//! Configuration management.
//!
//! Configuration comes from zero or more sources, merged in order into a
//! single immutable [`EffectiveConfig`] before any pipeline stage is built.
//!
//! # Sources
//!
//! A [`ConfigSource`] is either a JSON value held in memory or a path to a
//! JSON (or `.toml`) file. File contents support `${VAR_NAME}` environment
//! variable substitution.
//!
//! # Sections
//!
//! - `detect` - task selection ([`DetectConfig`])
//! - `decide` - consolidation settings ([`DecideConfig`])
//! - `transform` - policies ([`TransformConfig`])
//!
//! Any other top-level key is ignored.
//!
//! # Example Configuration
//!
//! ```json
//! {
//!   "detect": {"exclude_tasks": ["url"], "country": ["es"]},
//!   "decide": {"overlap": "score", "min_score": 0.5},
//!   "transform": {
//!     "default_policy": "label",
//!     "policy": {"EMAIL_ADDRESS": {"name": "hash", "key": "${PII_HASH_KEY}"}}
//!   }
//! }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config_file, merge_configs, ConfigSource};
pub use schema::{
    CountryFilter, DecideConfig, DetectConfig, EffectiveConfig, LoggingConfig, TransformConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
