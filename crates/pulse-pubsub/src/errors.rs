//! Backend error type.

use thiserror::Error;

/// Failures talking to the pub/sub backend.
///
/// None of these are fatal to the process: publish failures surface to the
/// caller, subscribe failures make the bridge retry with backoff.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Could not reach the backend.
    #[error("pub/sub connect failed: {0}")]
    Connect(String),

    /// A publish was not accepted.
    #[error("pub/sub publish failed: {0}")]
    Publish(String),

    /// A channel subscription could not be established.
    #[error("pub/sub subscribe failed: {0}")]
    Subscribe(String),

    /// An event could not be serialized for publication.
    #[error("failed to encode event for publication")]
    Encode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = BackendError::Publish("connection reset".into());
        assert!(err.to_string().contains("connection reset"));
    }
}
