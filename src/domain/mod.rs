//! Domain models and types for the PII pipeline.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`Language`], [`ChunkId`], [`TaskId`], [`PiiType`])
//! - **Processing units** ([`DocumentChunk`], [`ContextMarker`], [`ChunkMetadata`])
//! - **Detections** ([`PiiInstance`])
//! - **Error types** ([`PiiProcessError`], [`Stage`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible pipeline operations return [`Result<T>`], and every error
//! names the stage it came from:
//!
//! ```rust
//! use pii_process::domain::{PiiProcessError, Stage};
//!
//! let err = PiiProcessError::unsupported_language("fr", ["en", "es"]);
//! assert_eq!(err.stage(), Stage::Dispatch);
//! ```

pub mod chunk;
pub mod errors;
pub mod ids;
pub mod pii;
pub mod result;

// Re-export commonly used types for convenience
pub use chunk::{ChunkMetadata, ContextMarker, DocumentChunk, CONTEXT_FIELD};
pub use errors::{PiiProcessError, Stage};
pub use ids::{ChunkId, Language, PiiType, TaskId};
pub use pii::{DetectionMethod, PiiInstance};
pub use result::Result;
