//! Participant session management for Parley.
//!
//! This crate owns the authoritative record of who is connected:
//!
//! 1. **Sessions** — one per logged-in participant, keyed by a unique
//!    name and bound to exactly one connection ([`Session`])
//! 2. **Pairing state** — the name each session is negotiating with, held
//!    by name rather than by reference ([`PairingStatus`])
//! 3. **Registry** — the synchronized set of live sessions
//!    ([`SessionRegistry`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Relay (above)     ← handlers resolve senders and targets here
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! Transport (below) ← provides Connection, ConnectionId
//! ```

mod error;
mod registry;
mod session;

pub use error::RegistryError;
pub use registry::{RosterSnapshot, SessionRegistry};
pub use session::{validate_name, PairingStatus, Session, MAX_NAME_LEN};
