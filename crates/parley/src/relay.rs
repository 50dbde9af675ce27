//! The relay core: shared state plus the router that turns one inbound
//! frame into exactly one handler call.
//!
//! ```text
//! frame → Codec::decode → ClientMessage → handler → registry / peer send
//! ```

use std::sync::Arc;

use futures_util::future::join_all;
use parley_protocol::{
    ClientMessage, Codec, JsonCodec, ServerMessage, INCORRECT_DATA_FORMAT,
};
use parley_session::{Session, SessionRegistry};
use parley_transport::{Connection, TransportError};

use crate::{RelayConfig, RelayError};

/// What the receive loop should do after a frame has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Wait for the next frame.
    Continue,
    /// The sender left; stop reading.
    Close,
}

/// Signaling relay state shared by every connection task.
///
/// Generic over the connection type so the negotiation logic can be driven
/// without sockets, and over the codec like the rest of the stack.
pub struct Relay<C, K = JsonCodec> {
    pub(crate) registry: SessionRegistry<C>,
    pub(crate) codec: K,
    pub(crate) config: RelayConfig,
}

impl<C> Relay<C, JsonCodec>
where
    C: Connection<Error = TransportError>,
{
    /// Creates a relay speaking JSON.
    pub fn new(config: RelayConfig) -> Self {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C, K> Relay<C, K>
where
    C: Connection<Error = TransportError>,
    K: Codec,
{
    /// Creates a relay with an explicit codec.
    pub fn with_codec(config: RelayConfig, codec: K) -> Self {
        Self {
            registry: SessionRegistry::new(),
            codec,
            config,
        }
    }

    /// The session registry.
    pub fn registry(&self) -> &SessionRegistry<C> {
        &self.registry
    }

    /// The active configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Decodes `frame` and dispatches it to the matching handler.
    ///
    /// A malformed frame is answered with `error{"Incorrect data format"}`
    /// and reported as [`RelayError::Protocol`]; the connection stays open.
    /// Handler failures are returned for the caller to log; they only end
    /// the handling of this one frame.
    pub async fn dispatch(
        &self,
        conn: &Arc<C>,
        frame: &[u8],
    ) -> Result<Flow, RelayError> {
        let conn_id = conn.id();
        let msg: ClientMessage = match self.codec.decode(frame) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "incorrect data format");
                self.reply(conn, &ServerMessage::error(INCORRECT_DATA_FORMAT))
                    .await?;
                return Err(e.into());
            }
        };

        tracing::debug!(%conn_id, kind = msg.kind(), "frame received");

        match msg {
            ClientMessage::Login { name } => self.on_login(conn, &name).await?,
            ClientMessage::Offer { to, offer } => {
                self.on_offer(conn, &to, offer).await?
            }
            ClientMessage::Answer { to, answer } => {
                self.on_answer(conn, &to, answer).await?
            }
            ClientMessage::Candidate { to, candidate } => {
                self.on_candidate(conn, &to, candidate).await?
            }
            ClientMessage::Leave => {
                self.on_leave(conn).await;
                return Ok(Flow::Close);
            }
            ClientMessage::Unrecognized => {
                self.on_unrecognized(conn, frame).await?
            }
        }

        Ok(Flow::Continue)
    }

    // -- Delivery helpers -------------------------------------------------

    /// Sends `msg` back on the sender's own connection.
    pub(crate) async fn reply(
        &self,
        conn: &C,
        msg: &ServerMessage,
    ) -> Result<(), RelayError> {
        let bytes = self.codec.encode(msg)?;
        conn.send(&bytes).await?;
        Ok(())
    }

    /// Sends `msg` to another session. A failure here says nothing about
    /// the sender's own connection.
    pub(crate) async fn deliver(
        &self,
        target: &Session<C>,
        msg: &ServerMessage,
    ) -> Result<(), RelayError> {
        let bytes = self.codec.encode(msg)?;
        target
            .connection()
            .send(&bytes)
            .await
            .map_err(|source| RelayError::Delivery {
                to: target.name().to_string(),
                source,
            })
    }

    /// Sends the current roster to every live session.
    ///
    /// The recipient list and the roster come from one snapshot taken before
    /// any send starts. A failed send is logged and does not stop the rest.
    pub(crate) async fn broadcast_roster(&self) -> Result<(), RelayError> {
        let snapshot = self.registry.snapshot().await;
        let bytes = self.codec.encode(&ServerMessage::Roster {
            users: snapshot.users,
        })?;

        let sends = snapshot.connections.iter().map(|conn| {
            let bytes = &bytes;
            async move { (conn.id(), conn.send(bytes).await) }
        });
        for (conn_id, result) in join_all(sends).await {
            if let Err(e) = result {
                tracing::warn!(%conn_id, error = %e, "roster delivery failed");
            }
        }
        Ok(())
    }
}
