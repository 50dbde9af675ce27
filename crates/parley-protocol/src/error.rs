//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means a frame could not be turned into (or out
//! of) a signaling message. It never carries networking or registry state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization of an outbound message failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// An inbound frame is not a well-formed signaling message: malformed
    /// JSON, a missing `type`, or a known type with missing or ill-typed
    /// fields.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
