//! Fetch error types

use thiserror::Error;

use crate::credential::CredentialError;

/// Errors that can occur while fetching a snapshot
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{resource} returned {status}: {message}")]
    Status {
        resource: String,
        status: u16,
        message: String,
    },

    #[error("{resource} response had no value")]
    MissingValue { resource: String },
}
