//! Error types for the CGI transport

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while talking to the camera over HTTP
///
/// Every variant means the device could not be reached or did not answer
/// with a usable HTTP response. Device-level rejections travel inside a
/// successful response body and are classified by the layer above.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection refused, host unreachable or name resolution failed
    #[error("Cannot connect to camera at {host}: {reason}")]
    Connect { host: String, reason: String },

    /// Connect or read timeout elapsed
    #[error("Connection to {host} timed out after {}s", .timeout.as_secs())]
    Timeout { host: String, timeout: Duration },

    /// The device answered with a non-success HTTP status
    #[error("HTTP error from {host}: status {status}")]
    Status { host: String, status: u16 },

    /// Any other I/O failure while sending or reading the response
    #[error("I/O error talking to {host}: {reason}")]
    Io { host: String, reason: String },
}

impl TransportError {
    /// Whether this failure was caused by an elapsed timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}
