//! Error types for the vefgpt API surface.

use thiserror::Error;

use crate::loader::LoadReport;

/// Errors that can occur when loading weights or generating text.
#[derive(Debug, Error)]
pub enum Error {
    /// Model name not found in the registry. The message carries
    /// did-you-mean suggestions when any are close.
    #[error("{0}")]
    UnknownModel(String),

    /// Fetching a remote file failed. Fatal to the load.
    #[error("failed to download '{url}': {source}")]
    DownloadFailed {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    /// The blob store could not be opened or written.
    #[error("weight store error: {0}")]
    StoreFailed(#[source] anyhow::Error),

    /// The weight archive could not be opened.
    #[error("failed to open weight archive: {0}")]
    ArchiveFailed(#[source] anyhow::Error),

    /// The tokenizer file could not be loaded.
    #[error("failed to load tokenizer: {0}")]
    TokenizerFailed(#[source] anyhow::Error),

    /// One or more slots were left unassigned after the load sweep.
    ///
    /// The report lists every failed slot; opt in with
    /// `allow_partial(true)` to accept a partially loaded model anyway.
    #[error("model weights incomplete: {} slot(s) failed to load", .report.failures.len())]
    IncompleteLoad { report: LoadReport },

    /// Generation failed.
    #[error("generation failed: {0}")]
    GenerationFailed(#[from] anyhow::Error),

    /// Rejected generation options.
    #[error("invalid options: {0}")]
    InvalidOptions(String),
}

/// Result type for vefgpt operations.
pub type Result<T> = std::result::Result<T, Error>;
