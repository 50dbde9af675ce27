//! Signaling message types for Parley's wire format.
//!
//! Every frame is one JSON object discriminated by its `type` field. The
//! relay never looks inside SDP or ICE payloads: it forwards them as
//! received, re-addressed to the counterpart.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reply text for a frame that is not a well-formed message.
pub const INCORRECT_DATA_FORMAT: &str = "Incorrect data format";

/// Reply text for a frame whose `type` the relay does not handle.
pub const UNRECOGNIZED_COMMAND: &str = "Unrecognized command";

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// The `type` of an `RTCSessionDescription`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

/// An SDP offer or answer as produced by `RTCPeerConnection`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

/// An ICE candidate as produced by `RTCPeerConnection.onicecandidate`.
///
/// Browsers emit `null` for `sdpMid`/`sdpMLineIndex` in some bundles, so
/// both are optional. Fields the relay does not know about are kept in
/// `extra` and written back out unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Client → server
// ---------------------------------------------------------------------------

/// A frame sent by a browser to the relay.
///
/// Every variant except `Login` is implicitly sent by the session owning the
/// connection it arrived on. `to` is the target session's name; on the wire
/// it is the `name` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Claim `name` for this connection.
    Login { name: String },

    /// Forward an SDP offer to `to`.
    Offer {
        #[serde(rename = "name")]
        to: String,
        offer: SessionDescription,
    },

    /// Forward an SDP answer to `to`.
    Answer {
        #[serde(rename = "name")]
        to: String,
        answer: SessionDescription,
    },

    /// Forward an ICE candidate to `to`.
    Candidate {
        #[serde(rename = "name")]
        to: String,
        candidate: IceCandidate,
    },

    /// Hang up: notify the current peer and close this connection.
    Leave,

    /// Any `type` not listed above.
    #[serde(other)]
    Unrecognized,
}

impl ClientMessage {
    /// The wire tag of this message, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Login { .. } => "login",
            Self::Offer { .. } => "offer",
            Self::Answer { .. } => "answer",
            Self::Candidate { .. } => "candidate",
            Self::Leave => "leave",
            Self::Unrecognized => "unrecognized",
        }
    }
}

// ---------------------------------------------------------------------------
// Server → client
// ---------------------------------------------------------------------------

/// A frame sent by the relay to a browser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Outcome of a `login`.
    LoginResult { success: bool },

    /// Every registered name, in registration order.
    Roster { users: Vec<String> },

    /// An offer from the session called `name`.
    Offer {
        name: String,
        offer: SessionDescription,
    },

    /// An answer to an offer this client sent earlier.
    Answer { answer: SessionDescription },

    /// An ICE candidate from the current counterpart.
    Candidate { candidate: IceCandidate },

    /// The counterpart hung up or lost its connection.
    Leaving,

    /// The last frame could not be handled.
    Error { message: String },
}

impl ServerMessage {
    /// Builds an `error` frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
