//! Error types and result alias for the crate.
//!
//! This module defines [`enum@crate::error::Error`] and the crate-wide [Result] alias. Variants cover
//! invalid configuration, engine status failures, empty or failed batches and
//! worker pool construction.
use thiserror::Error;

use crate::engine::Status;

pub type Result<T> = std::result::Result<T, Error>;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{context}: {status}")]
    Engine { context: String, status: Status },

    #[error("no initial shapes could be created from the input mesh")]
    NoShapes,

    #[error("generation failed for all {shapes} initial shapes")]
    GenerationFailed { shapes: usize },

    #[error("generation was interrupted")]
    Interrupted,

    #[error("inconsistent shape data: {0}")]
    InvalidShapeData(String),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{0}")]
    Other(String),
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_owned())
    }
}
