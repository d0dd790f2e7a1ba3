//! Error types for the alert relay.

use thiserror::Error;

/// Errors raised while fetching root cause analysis from the Pingdom API.
///
/// These never leave the fetcher: every variant degrades to "no analysis".
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Pingdom answered with a non-success status
    #[error("{step} request returned {status}")]
    Status {
        step: &'static str,
        status: reqwest::StatusCode,
    },

    /// Response body did not have the expected shape
    #[error("Failed to decode {0} response")]
    Decode(&'static str),
}

/// Errors that prevent a message from reaching Slack at all.
///
/// A non-200 answer from Slack is not an error here; it is a failed
/// [`DeliveryOutcome`](crate::slack::DeliveryOutcome).
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}
