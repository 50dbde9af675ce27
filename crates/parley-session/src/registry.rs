//! The session registry: the single source of truth for who is connected.
//!
//! Every operation takes one exclusive lock over the whole mapping, so an
//! insert, a removal, a peer update and a roster enumeration never
//! interleave. The raw maps are never handed out; callers get cloned
//! [`Session`] snapshots and do their network I/O after the lock is
//! released.

use std::collections::HashMap;
use std::sync::Arc;

use parley_transport::{Connection, ConnectionId};
use tokio::sync::Mutex;

use crate::{validate_name, PairingStatus, RegistryError, Session};

/// The names and connections of every live session, captured under one
/// lock acquisition.
pub struct RosterSnapshot<C> {
    /// Registered names in registration order.
    pub users: Vec<String>,
    /// Connections of those sessions, in the same order.
    pub connections: Vec<Arc<C>>,
}

struct Inner<C> {
    /// Live sessions, keyed by name.
    sessions: HashMap<String, Session<C>>,

    /// Which session a connection belongs to. Kept in sync with `sessions`.
    by_connection: HashMap<ConnectionId, String>,

    /// Names in registration order, for a deterministic roster.
    order: Vec<String>,
}

/// Authoritative mapping of participant name → [`Session`].
///
/// Invariants:
/// - a name maps to at most one live session;
/// - a connection maps to at most one session;
/// - all mutations and enumerations are mutually exclusive.
pub struct SessionRegistry<C> {
    inner: Mutex<Inner<C>>,
}

impl<C: Connection> SessionRegistry<C> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                sessions: HashMap::new(),
                by_connection: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Creates a session called `name` bound to `connection`.
    ///
    /// # Errors
    /// - [`RegistryError::InvalidName`] — `name` fails [`validate_name`]
    /// - [`RegistryError::DuplicateName`] — `name` is held by a live session
    /// - [`RegistryError::ConnectionBound`] — `connection` already owns a
    ///   session
    ///
    /// On error the registry is left untouched.
    pub async fn register(
        &self,
        connection: Arc<C>,
        name: &str,
    ) -> Result<Session<C>, RegistryError> {
        validate_name(name)?;

        let mut inner = self.inner.lock().await;
        if inner.sessions.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        let conn_id = connection.id();
        if let Some(existing) = inner.by_connection.get(&conn_id) {
            return Err(RegistryError::ConnectionBound(
                conn_id,
                existing.clone(),
            ));
        }

        let session = Session::new(name.to_string(), connection);
        inner.by_connection.insert(conn_id, name.to_string());
        inner.order.push(name.to_string());
        inner.sessions.insert(name.to_string(), session.clone());

        tracing::info!(%conn_id, name, "session registered");
        Ok(session)
    }

    /// Removes the session owning `conn_id` and returns it.
    ///
    /// Returns `None` if the connection owns no session, so calling this
    /// twice is harmless and only the first caller sees the session.
    pub async fn unregister(&self, conn_id: ConnectionId) -> Option<Session<C>> {
        let mut inner = self.inner.lock().await;
        let name = inner.by_connection.remove(&conn_id)?;
        inner.order.retain(|n| n != &name);
        let session = inner.sessions.remove(&name);

        tracing::info!(%conn_id, name = %name, "session unregistered");
        session
    }

    /// Looks up a live session by name.
    pub async fn lookup(&self, name: &str) -> Option<Session<C>> {
        self.inner.lock().await.sessions.get(name).cloned()
    }

    /// Looks up the session owning `conn_id`.
    pub async fn lookup_by_connection(
        &self,
        conn_id: ConnectionId,
    ) -> Option<Session<C>> {
        let inner = self.inner.lock().await;
        let name = inner.by_connection.get(&conn_id)?;
        inner.sessions.get(name).cloned()
    }

    /// Points session `name` at `peer` and returns the previous peer.
    ///
    /// `peer` is not checked for liveness; callers resolve the target
    /// before committing the pairing.
    ///
    /// # Errors
    /// Returns [`RegistryError::UnknownSession`] if `name` is not live.
    pub async fn set_peer(
        &self,
        name: &str,
        peer: &str,
    ) -> Result<Option<String>, RegistryError> {
        let mut inner = self.inner.lock().await;
        let session = inner
            .sessions
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownSession(name.to_string()))?;
        let previous = session.peer.replace(peer.to_string());

        tracing::debug!(name, peer, ?previous, "peer updated");
        Ok(previous)
    }

    /// Restores `name`'s peer to `previous`, but only if it still points at
    /// `expected`. Returns whether the restore happened.
    ///
    /// Used to undo a pairing whose notification could not be delivered
    /// without clobbering a newer pairing made in the meantime.
    pub async fn revert_peer(
        &self,
        name: &str,
        expected: &str,
        previous: Option<String>,
    ) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.sessions.get_mut(name) {
            Some(session) if session.peer.as_deref() == Some(expected) => {
                tracing::debug!(name, expected, ?previous, "peer reverted");
                session.peer = previous;
                true
            }
            _ => false,
        }
    }

    /// Marks the session owning `conn_id` as announced, making it a roster
    /// recipient. Returns `false` if the connection owns no session.
    pub async fn announce(&self, conn_id: ConnectionId) -> bool {
        let mut inner = self.inner.lock().await;
        let Some(name) = inner.by_connection.get(&conn_id).cloned() else {
            return false;
        };
        match inner.sessions.get_mut(&name) {
            Some(session) => {
                session.announced = true;
                true
            }
            None => false,
        }
    }

    /// Returns every registered name in registration order.
    pub async fn roster(&self) -> Vec<String> {
        self.inner.lock().await.order.clone()
    }

    /// Returns the roster together with the connections to deliver it to.
    ///
    /// `users` lists every live session. `connections` only holds announced
    /// ones, so a client never receives a roster ahead of its own
    /// `login-result`.
    pub async fn snapshot(&self) -> RosterSnapshot<C> {
        let inner = self.inner.lock().await;
        let connections = inner
            .order
            .iter()
            .filter_map(|name| inner.sessions.get(name))
            .filter(|s| s.announced)
            .map(|s| Arc::clone(s.connection()))
            .collect();
        RosterSnapshot {
            users: inner.order.clone(),
            connections,
        }
    }

    /// Returns where session `name` stands in negotiation, or `None` if it
    /// is not live.
    pub async fn pairing_status(&self, name: &str) -> Option<PairingStatus> {
        let inner = self.inner.lock().await;
        let session = inner.sessions.get(name)?;
        let status = match session.peer() {
            None => PairingStatus::Unpaired,
            Some(peer) => match inner.sessions.get(peer) {
                Some(other) if other.peer() == Some(name) => {
                    PairingStatus::Paired
                }
                _ => PairingStatus::Pairing,
            },
        };
        Some(status)
    }

    /// Returns the number of live sessions.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }

    /// Returns `true` if there are no live sessions.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.sessions.is_empty()
    }
}

impl<C: Connection> Default for SessionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionRegistry`.
    //!
    //! Naming follows `test_{operation}_{scenario}_{expected}`. Connections
    //! are stubs: the registry never performs I/O, it only needs ids.

    use super::*;
    use parley_transport::TransportError;

    struct StubConnection(ConnectionId);

    impl Connection for StubConnection {
        type Error = TransportError;

        async fn send(&self, _data: &[u8]) -> Result<(), TransportError> {
            Ok(())
        }

        async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
            Ok(None)
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }

        fn id(&self) -> ConnectionId {
            self.0
        }
    }

    fn conn(id: u64) -> Arc<StubConnection> {
        Arc::new(StubConnection(ConnectionId::new(id)))
    }

    async fn registry_with(
        names: &[&str],
    ) -> SessionRegistry<StubConnection> {
        let registry = SessionRegistry::new();
        for (i, name) in names.iter().enumerate() {
            registry
                .register(conn(i as u64 + 1), name)
                .await
                .expect("register should succeed");
        }
        registry
    }

    // =====================================================================
    // register()
    // =====================================================================

    #[tokio::test]
    async fn test_register_new_name_returns_unpaired_session() {
        let registry = SessionRegistry::new();

        let session = registry.register(conn(1), "alice").await.unwrap();

        assert_eq!(session.name(), "alice");
        assert_eq!(session.peer(), None);
        assert_eq!(session.connection_id(), ConnectionId::new(1));
        assert_eq!(
            registry.pairing_status("alice").await,
            Some(PairingStatus::Unpaired)
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_name_leaves_original_intact() {
        let registry = registry_with(&["alice"]).await;

        let result = registry.register(conn(9), "alice").await;

        assert!(
            matches!(result, Err(RegistryError::DuplicateName(ref n)) if n == "alice")
        );
        let original = registry.lookup("alice").await.unwrap();
        assert_eq!(original.connection_id(), ConnectionId::new(1));
        assert!(registry.lookup_by_connection(ConnectionId::new(9)).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_register_bound_connection_is_rejected() {
        let registry = SessionRegistry::new();
        let c = conn(1);
        registry.register(Arc::clone(&c), "alice").await.unwrap();

        let result = registry.register(c, "alice2").await;

        assert!(matches!(result, Err(RegistryError::ConnectionBound(_, _))));
        assert_eq!(registry.roster().await, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_register_blank_name_is_rejected() {
        let registry = SessionRegistry::new();

        let result = registry.register(conn(1), " ").await;

        assert!(matches!(result, Err(RegistryError::InvalidName(_))));
        assert!(registry.is_empty().await);
    }

    // =====================================================================
    // unregister()
    // =====================================================================

    #[tokio::test]
    async fn test_unregister_returns_session_once() {
        let registry = registry_with(&["alice", "bob"]).await;

        let removed = registry.unregister(ConnectionId::new(1)).await;
        assert_eq!(removed.map(|s| s.name().to_string()), Some("alice".into()));

        // Second call is a no-op.
        assert!(registry.unregister(ConnectionId::new(1)).await.is_none());
        assert_eq!(registry.roster().await, vec!["bob".to_string()]);
    }

    #[tokio::test]
    async fn test_unregister_frees_name_for_reuse() {
        let registry = registry_with(&["alice"]).await;
        registry.unregister(ConnectionId::new(1)).await;

        let session = registry.register(conn(5), "alice").await.unwrap();

        assert_eq!(session.connection_id(), ConnectionId::new(5));
    }

    #[tokio::test]
    async fn test_unregister_unknown_connection_is_noop() {
        let registry = registry_with(&["alice"]).await;

        assert!(registry.unregister(ConnectionId::new(42)).await.is_none());
        assert_eq!(registry.len().await, 1);
    }

    // =====================================================================
    // roster() / snapshot()
    // =====================================================================

    #[tokio::test]
    async fn test_roster_is_registration_order() {
        let registry = registry_with(&["carol", "alice", "bob"]).await;
        registry.unregister(ConnectionId::new(2)).await;
        registry.register(conn(7), "dave").await.unwrap();

        assert_eq!(registry.roster().await, vec!["carol", "bob", "dave"]);
    }

    #[tokio::test]
    async fn test_snapshot_pairs_names_with_connections() {
        let registry = registry_with(&["alice", "bob"]).await;
        assert!(registry.announce(ConnectionId::new(1)).await);
        assert!(registry.announce(ConnectionId::new(2)).await);

        let snapshot = registry.snapshot().await;

        assert_eq!(snapshot.users, vec!["alice", "bob"]);
        let ids: Vec<_> = snapshot.connections.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![ConnectionId::new(1), ConnectionId::new(2)]);
    }

    #[tokio::test]
    async fn test_snapshot_skips_unannounced_sessions() {
        let registry = registry_with(&["alice", "bob"]).await;
        registry.announce(ConnectionId::new(2)).await;

        let snapshot = registry.snapshot().await;

        assert_eq!(snapshot.users, vec!["alice", "bob"]);
        let ids: Vec<_> = snapshot.connections.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![ConnectionId::new(2)]);
        assert!(!registry.lookup("alice").await.unwrap().is_announced());
    }

    #[tokio::test]
    async fn test_announce_unknown_session_is_false() {
        let registry = registry_with(&["alice"]).await;
        assert!(!registry.announce(ConnectionId::new(9)).await);
    }

    // =====================================================================
    // set_peer() / revert_peer() / pairing_status()
    // =====================================================================

    #[tokio::test]
    async fn test_set_peer_unknown_session_errors() {
        let registry = registry_with(&["alice"]).await;

        let result = registry.set_peer("nobody", "alice").await;

        assert!(matches!(result, Err(RegistryError::UnknownSession(_))));
    }

    #[tokio::test]
    async fn test_set_peer_does_not_validate_target() {
        let registry = registry_with(&["alice"]).await;

        let previous = registry.set_peer("alice", "ghost").await.unwrap();

        assert_eq!(previous, None);
        let alice = registry.lookup("alice").await.unwrap();
        assert_eq!(alice.peer(), Some("ghost"));
        assert_eq!(
            registry.pairing_status("alice").await,
            Some(PairingStatus::Pairing)
        );
    }

    #[tokio::test]
    async fn test_pairing_status_mutual_peers_are_paired() {
        let registry = registry_with(&["alice", "bob"]).await;
        registry.set_peer("alice", "bob").await.unwrap();
        assert_eq!(
            registry.pairing_status("bob").await,
            Some(PairingStatus::Unpaired)
        );

        registry.set_peer("bob", "alice").await.unwrap();

        assert_eq!(
            registry.pairing_status("alice").await,
            Some(PairingStatus::Paired)
        );
        assert_eq!(
            registry.pairing_status("bob").await,
            Some(PairingStatus::Paired)
        );
    }

    #[tokio::test]
    async fn test_pairing_status_after_peer_leaves_is_pairing() {
        let registry = registry_with(&["alice", "bob"]).await;
        registry.set_peer("alice", "bob").await.unwrap();
        registry.set_peer("bob", "alice").await.unwrap();

        registry.unregister(ConnectionId::new(2)).await;

        // alice still names bob: a stale, not invalid, reference.
        assert_eq!(
            registry.pairing_status("alice").await,
            Some(PairingStatus::Pairing)
        );
        assert_eq!(registry.pairing_status("bob").await, None);
    }

    #[tokio::test]
    async fn test_revert_peer_only_when_unchanged() {
        let registry = registry_with(&["alice", "bob", "carol"]).await;
        let previous = registry.set_peer("alice", "bob").await.unwrap();
        registry.set_peer("alice", "carol").await.unwrap();

        // alice moved on to carol; reverting the bob pairing must not touch it.
        assert!(!registry.revert_peer("alice", "bob", previous.clone()).await);
        assert_eq!(
            registry.lookup("alice").await.unwrap().peer(),
            Some("carol")
        );

        assert!(registry.revert_peer("alice", "carol", Some("bob".into())).await);
        assert_eq!(registry.lookup("alice").await.unwrap().peer(), Some("bob"));
    }

    // =====================================================================
    // Concurrency
    // =====================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_same_name_only_one_wins() {
        let registry = Arc::new(SessionRegistry::new());
        let mut tasks = Vec::new();
        for i in 0..32 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                registry.register(conn(i + 1), "alice").await.is_ok()
            }));
        }

        let mut wins = 0;
        for t in tasks {
            if t.await.unwrap() {
                wins += 1;
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(registry.roster().await, vec!["alice".to_string()]);
    }
}
