//! Error type for the CLI harness itself (file I/O, JSON parsing). Pipeline
//! errors are passed through rather than wrapped in a new variant per kind.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to parse {path:?} as JSON: {source}")]
    Parse { path: PathBuf, #[source] source: serde_json::Error },

    #[error("failed to write {path:?}: {source}")]
    Write { path: PathBuf, #[source] source: std::io::Error },

    #[error(transparent)]
    Pipeline(#[from] fleet_core::error::PipelineError),
}
