//! DHRU client errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DhruError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no provider endpoint responded (all candidates returned 404)")]
    EndpointNotFound {
        #[source]
        source: Option<reqwest::Error>,
    },

    #[error("provider request failed (no usable response)")]
    NoUsableResponse,

    #[error("provider API error: {status}")]
    Api {
        status: u16,
        body: serde_json::Value,
    },
}
