//! Wire protocol for Parley.
//!
//! This crate defines the signaling messages browsers exchange through the
//! relay and how they are turned into bytes:
//!
//! - **Types** ([`ClientMessage`], [`ServerMessage`], [`SessionDescription`],
//!   [`IceCandidate`]) — the closed set of frames on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — frame (de)serialization.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage) → Relay (sessions, pairing)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, IceCandidate, SdpKind, ServerMessage, SessionDescription,
    INCORRECT_DATA_FORMAT, UNRECOGNIZED_COMMAND,
};
