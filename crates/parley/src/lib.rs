//! # Parley
//!
//! Rendezvous relay for WebRTC session negotiation.
//!
//! Two browsers that cannot reach each other directly log in under unique
//! names and exchange SDP offers/answers and ICE candidates through the
//! relay. The relay keeps only signaling metadata: who is connected and
//! whom each participant is negotiating with.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley::prelude::*;
//!
//! # async fn run() -> Result<(), RelayError> {
//! let server = RelayServer::builder().bind("0.0.0.0:9090").build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handlers;
mod relay;
mod server;
mod supervisor;

pub use config::RelayConfig;
pub use error::RelayError;
pub use relay::{Flow, Relay};
pub use server::{RelayServer, RelayServerBuilder};
pub use supervisor::ConnectionEnd;

pub mod prelude {
    //! Everything needed to run a relay or drive one in tests.

    pub use crate::{
        ConnectionEnd, Flow, Relay, RelayConfig, RelayError, RelayServer,
        RelayServerBuilder,
    };
    pub use parley_protocol::{
        ClientMessage, Codec, IceCandidate, JsonCodec, ProtocolError,
        SdpKind, ServerMessage, SessionDescription,
    };
    pub use parley_session::{
        PairingStatus, RegistryError, Session, SessionRegistry,
    };
    pub use parley_transport::{
        Connection, ConnectionId, OriginPolicy, TransportError,
    };
}
