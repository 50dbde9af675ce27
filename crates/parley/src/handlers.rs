//! Event handlers: the negotiation protocol on top of the registry.
//!
//! Per session, pairing moves `Unpaired → Pairing → Paired` as offers and
//! answers flow. Only `peer` is stored; see
//! [`PairingStatus`](parley_session::PairingStatus).
//!
//! Failure visibility is uneven: a refused login is answered
//! with `login-result{success:false}`, while offer/answer/candidate from an
//! unregistered sender or to an unknown target are dropped without a reply
//! and only surface as a [`RelayError`] for the receive loop to log.

use std::sync::Arc;

use parley_protocol::{
    Codec, IceCandidate, ServerMessage, SessionDescription,
    UNRECOGNIZED_COMMAND,
};
use parley_session::Session;
use parley_transport::{Connection, TransportError};

use crate::{Relay, RelayError};

impl<C, K> Relay<C, K>
where
    C: Connection<Error = TransportError>,
    K: Codec,
{
    /// `login{name}`: claim a name, answer, then push the roster to all.
    pub(crate) async fn on_login(
        &self,
        conn: &Arc<C>,
        name: &str,
    ) -> Result<(), RelayError> {
        let conn_id = conn.id();
        if let Err(e) = self.registry.register(Arc::clone(conn), name).await {
            tracing::info!(%conn_id, name, reason = %e, "login refused");
            return self
                .reply(conn, &ServerMessage::LoginResult { success: false })
                .await;
        }

        // The session only becomes a roster recipient once its
        // login-result is on the wire; concurrent logins skip it until then.
        self.reply(conn, &ServerMessage::LoginResult { success: true })
            .await?;
        self.registry.announce(conn_id).await;
        tracing::info!(%conn_id, name, "logged in");

        self.broadcast_roster().await
    }

    /// `offer{to, sdp}`: pair the sender with `to` and forward the offer,
    /// stamped with the sender's name.
    pub(crate) async fn on_offer(
        &self,
        conn: &C,
        to: &str,
        offer: SessionDescription,
    ) -> Result<(), RelayError> {
        let sender = self.resolve_sender(conn).await?;
        let target = self.resolve_target(to).await?;

        let msg = ServerMessage::Offer {
            name: sender.name().to_string(),
            offer,
        };
        self.pair_and_deliver(&sender, &target, &msg).await?;
        tracing::info!(from = sender.name(), to, "offer forwarded");
        Ok(())
    }

    /// `answer{to, sdp}`: pair the sender with `to` and forward the answer.
    ///
    /// The target identifies the answerer through its own `peer`, set when
    /// it sent the offer, so no name is stamped.
    pub(crate) async fn on_answer(
        &self,
        conn: &C,
        to: &str,
        answer: SessionDescription,
    ) -> Result<(), RelayError> {
        let sender = self.resolve_sender(conn).await?;
        let target = self.resolve_target(to).await?;

        let msg = ServerMessage::Answer { answer };
        self.pair_and_deliver(&sender, &target, &msg).await?;
        tracing::info!(from = sender.name(), to, "answer forwarded");
        Ok(())
    }

    /// `candidate{to, ...}`: forward verbatim. Pairing is not touched.
    pub(crate) async fn on_candidate(
        &self,
        conn: &C,
        to: &str,
        candidate: IceCandidate,
    ) -> Result<(), RelayError> {
        let sender = self.resolve_sender(conn).await?;
        let target = self.resolve_target(to).await?;

        self.deliver(&target, &ServerMessage::Candidate { candidate })
            .await?;
        tracing::debug!(from = sender.name(), to, "candidate forwarded");
        Ok(())
    }

    /// `leave`: notify the peer, drop the session, close the connection.
    ///
    /// The connection is closed even if it never logged in.
    pub(crate) async fn on_leave(&self, conn: &C) {
        tracing::info!(conn_id = %conn.id(), "leave requested");
        self.disconnect(conn).await;
        if let Err(e) = conn.close().await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "close after leave failed");
        }
    }

    /// Any unknown `type`: tell the sender, change nothing.
    pub(crate) async fn on_unrecognized(
        &self,
        conn: &C,
        raw: &[u8],
    ) -> Result<(), RelayError> {
        tracing::info!(
            conn_id = %conn.id(),
            frame = %String::from_utf8_lossy(raw),
            "unrecognized command"
        );
        self.reply(conn, &ServerMessage::error(UNRECOGNIZED_COMMAND))
            .await
    }

    /// Removes the session owning `conn` and tells its peer.
    ///
    /// Shared by `leave` and connection loss. Only the call that actually
    /// removes the session notifies anyone, so repeating it is a no-op.
    pub async fn disconnect(&self, conn: &C) {
        let Some(session) = self.registry.unregister(conn.id()).await else {
            return;
        };

        if let Some(peer_name) = session.peer() {
            match self.registry.lookup(peer_name).await {
                Some(peer) => {
                    match self.deliver(&peer, &ServerMessage::Leaving).await {
                        Ok(()) => tracing::info!(
                            name = session.name(),
                            peer = peer_name,
                            "leaving sent"
                        ),
                        Err(e) => tracing::warn!(
                            name = session.name(),
                            error = %e,
                            "leaving notification failed"
                        ),
                    }
                }
                None => tracing::debug!(
                    name = session.name(),
                    peer = peer_name,
                    "peer already gone"
                ),
            }
        }

        if self.config.roster_on_leave {
            if let Err(e) = self.broadcast_roster().await {
                tracing::warn!(error = %e, "roster broadcast failed");
            }
        }
    }

    // -- Resolution -------------------------------------------------------

    async fn resolve_sender(&self, conn: &C) -> Result<Session<C>, RelayError> {
        self.registry
            .lookup_by_connection(conn.id())
            .await
            .ok_or(RelayError::UnregisteredSender(conn.id()))
    }

    async fn resolve_target(&self, to: &str) -> Result<Session<C>, RelayError> {
        self.registry
            .lookup(to)
            .await
            .ok_or_else(|| RelayError::UnknownPeer(to.to_string()))
    }

    /// Points `sender` at `target`, then delivers `msg` to `target`.
    ///
    /// If delivery fails the pairing is reverted, so a dead target never
    /// stays recorded as the sender's peer.
    async fn pair_and_deliver(
        &self,
        sender: &Session<C>,
        target: &Session<C>,
        msg: &ServerMessage,
    ) -> Result<(), RelayError> {
        let previous = self
            .registry
            .set_peer(sender.name(), target.name())
            .await?;

        if let Err(e) = self.deliver(target, msg).await {
            let reverted = self
                .registry
                .revert_peer(sender.name(), target.name(), previous)
                .await;
            tracing::debug!(name = sender.name(), reverted, "pairing rolled back");
            return Err(e);
        }
        Ok(())
    }
}
