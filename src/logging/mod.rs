//! Logging and observability
//!
//! Structured logging through `tracing`, with helper macros for the events
//! every pipeline emits.
//!
//! # Example
//!
//! ```no_run
//! use pii_process::logging::init_logging;
//! use pii_process::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log a processed chunk
///
/// # Example
///
/// ```no_run
/// use pii_process::log_chunk_processed;
///
/// log_chunk_processed!("chunk-1", "en", 3);
/// ```
#[macro_export]
macro_rules! log_chunk_processed {
    ($chunk_id:expr, $lang:expr, $count:expr) => {
        tracing::debug!(
            chunk_id = %$chunk_id,
            lang = %$lang,
            pii = $count,
            "Chunk processed"
        );
    };
}

/// Log a stage failure before it propagates
///
/// # Example
///
/// ```no_run
/// use pii_process::log_stage_failure;
/// use pii_process::domain::PiiProcessError;
///
/// let error = PiiProcessError::Decision("engine crashed".to_string());
/// log_stage_failure!(&error, "chunk-1");
/// ```
#[macro_export]
macro_rules! log_stage_failure {
    ($error:expr, $chunk_id:expr) => {
        tracing::error!(
            stage = %$error.stage(),
            chunk_id = %$chunk_id,
            error = %$error,
            "Stage failed"
        );
    };
}

/// Log a newly built pipeline
///
/// # Example
///
/// ```no_run
/// use pii_process::log_pipeline_built;
///
/// log_pipeline_built!("en", 4, "overlap:longest");
/// ```
#[macro_export]
macro_rules! log_pipeline_built {
    ($lang:expr, $tasks:expr, $decider:expr) => {
        tracing::info!(
            lang = %$lang,
            tasks = $tasks,
            decider = %$decider,
            "Pipeline built"
        );
    };
}
