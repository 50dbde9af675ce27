//! Per-connection receive loop.
//!
//! Each accepted connection gets its own Tokio task running
//! [`Relay::serve_connection`]. The loop is strictly sequential: one frame
//! is fully handled before the next is read. Whatever ends the loop, the
//! session is torn down through the same path as an explicit `leave`, so
//! the remaining peer always learns it must renegotiate.

use std::sync::Arc;

use parley_protocol::Codec;
use parley_transport::{Connection, TransportError};

use crate::{Flow, Relay, RelayError};

/// Why a connection's receive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// The client closed the socket.
    Closed,
    /// The client sent `leave`.
    Left,
    /// Reading from or writing to the socket failed.
    TransportFailed,
    /// Nothing arrived within the configured idle timeout.
    IdleTimeout,
}

impl<C, K> Relay<C, K>
where
    C: Connection<Error = TransportError>,
    K: Codec,
{
    /// Runs the receive loop for `conn` until it ends, then cleans up.
    pub async fn serve_connection(&self, conn: Arc<C>) -> ConnectionEnd {
        let conn_id = conn.id();
        tracing::debug!(%conn_id, "handling new connection");

        let end = loop {
            let received = match self.config.idle_timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, conn.recv()).await {
                        Ok(received) => received,
                        Err(_) => {
                            tracing::info!(%conn_id, "connection idle, dropping");
                            break ConnectionEnd::IdleTimeout;
                        }
                    }
                }
                None => conn.recv().await,
            };

            let frame = match received {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!(%conn_id, "connection closed cleanly");
                    break ConnectionEnd::Closed;
                }
                Err(e) => {
                    tracing::info!(%conn_id, error = %e, "connection lost");
                    break ConnectionEnd::TransportFailed;
                }
            };

            match self.dispatch(&conn, &frame).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Close) => break ConnectionEnd::Left,
                Err(e) if e.is_fatal() => {
                    tracing::info!(%conn_id, error = %e, "connection lost");
                    break ConnectionEnd::TransportFailed;
                }
                Err(e @ RelayError::Protocol(_)) => {
                    tracing::debug!(%conn_id, error = %e, "frame rejected");
                }
                Err(e) => {
                    tracing::error!(%conn_id, error = %e, "handler failed");
                }
            }
        };

        self.disconnect(&conn).await;

        if matches!(
            end,
            ConnectionEnd::TransportFailed | ConnectionEnd::IdleTimeout
        ) {
            if let Err(e) = conn.close().await {
                tracing::debug!(%conn_id, error = %e, "close after loss failed");
            }
        }

        tracing::debug!(%conn_id, ?end, "connection finished");
        end
    }
}
