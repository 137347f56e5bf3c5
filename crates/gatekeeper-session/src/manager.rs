//! Session table, creation, and TTL reaping (spec §3, §4.9).
//!
//! Sessions are looked up far more often than they are created or
//! destroyed, so the table is a `DashMap` rather than a single
//! `RwLock<HashMap<..>>` - conceptually the same "reads don't block reads"
//! contract the spec describes, sharded instead of global.

use crate::error::SessionError;
use crate::id::SessionId;
use crate::session::Session;
use dashmap::DashMap;
use gatekeeper_rpc::{Client, ClientConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// Frozen template each new session clones into its own `Client`.
    pub client_template: ClientConfig,
    pub ttl: Duration,
    pub protocol_version: String,
}

/// Owns every live bridge session plus the reaper task that evicts idle
/// ones. `close_all` cancels the shared token, which is also observed by
/// the reaper loop so a server shutdown and a spurious double-stop both
/// terminate it cleanly.
pub struct SessionManager {
    config: SessionManagerConfig,
    sessions: DashMap<SessionId, Arc<Session>>,
    cancellation: CancellationToken,
    stop_reaper: Arc<Notify>,
    unusable: AtomicBool,
}

impl SessionManager {
    pub fn new(config: SessionManagerConfig) -> Arc<SessionManager> {
        Arc::new(SessionManager {
            config,
            sessions: DashMap::new(),
            cancellation: CancellationToken::new(),
            stop_reaper: Arc::new(Notify::new()),
            unusable: AtomicBool::new(false),
        })
    }

    /// Starts a new upstream `Client` from the frozen template, runs the
    /// MCP handshake, and stores the session under a fresh UUID. If
    /// `initialize` fails the half-constructed client is always closed -
    /// never left as a leaked process (spec §9).
    pub async fn create(&self) -> Result<Arc<Session>, SessionError> {
        if self.unusable.load(Ordering::SeqCst) {
            return Err(SessionError::NotFound);
        }
        let client = Client::start(self.config.client_template.clone())
            .await
            .map_err(SessionError::ClientStart)?;

        if let Err(e) = client.initialize(&self.config.protocol_version).await {
            let _ = client.close().await;
            return Err(SessionError::Initialize(e));
        }

        let id = SessionId::new();
        let session = Session::new(id, client);
        self.sessions.insert(id, Arc::clone(&session));
        info!(session_id = %id, "bridge session created");
        Ok(session)
    }

    pub fn get(&self, id: SessionId) -> Option<Arc<Session>> {
        self.sessions.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn touch(&self, id: SessionId) -> bool {
        match self.sessions.get(&id) {
            Some(session) => {
                session.touch();
                true
            }
            None => false,
        }
    }

    /// Removes and closes the session; returns `true` on the first call
    /// for a given id, `false` on every subsequent call (spec §8).
    pub async fn delete(&self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some((_, session)) => {
                session.close().await;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Runs until either `stop()` is called or `cancellation` fires,
    /// scanning for idle sessions on every `ttl/2` tick and closing them.
    pub async fn run_reaper(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.ttl / 2);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = ticker.tick() => self.reap_once().await,
                _ = self.stop_reaper.notified() => break,
                _ = self.cancellation.cancelled() => break,
            }
        }
    }

    async fn reap_once(&self) {
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().is_expired(self.config.ttl))
            .map(|entry| *entry.key())
            .collect();
        for id in expired {
            warn!(session_id = %id, "evicting session after TTL expiry");
            self.delete(id).await;
        }
    }

    pub fn stop_reaper(&self) {
        self.stop_reaper.notify_waiters();
    }

    /// Cancels the shared token (propagating to the reaper and anything
    /// else watching it) and closes every remaining session's client.
    /// After this the manager is unusable - `create` always fails.
    pub async fn close_all(&self) {
        self.unusable.store(true, Ordering::SeqCst);
        self.cancellation.cancel();
        let ids: Vec<SessionId> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, session)) = self.sessions.remove(&id) {
                session.close().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(ttl: Duration) -> SessionManagerConfig {
        SessionManagerConfig {
            client_template: ClientConfig {
                command: "cat".to_string(),
                ..ClientConfig::default()
            },
            ttl,
            protocol_version: gatekeeper_protocol::MCP_PROTOCOL_VERSION.to_string(),
        }
    }

    // `cat` never replies to `initialize`, so these tests exercise the
    // table/reaper mechanics against a client that starts but never
    // finishes the handshake, using a short call_timeout to fail fast.
    fn failing_handshake_config() -> SessionManagerConfig {
        let mut cfg = config(Duration::from_millis(200));
        cfg.client_template.call_timeout = Duration::from_millis(50);
        cfg
    }

    #[tokio::test]
    async fn create_fails_and_closes_client_when_initialize_times_out() {
        let manager = SessionManager::new(failing_handshake_config());
        let result = manager.create().await;
        assert!(result.is_err());
        assert_eq!(manager.len(), 0);
    }

    #[tokio::test]
    async fn delete_returns_true_once_then_false() {
        let manager = SessionManager::new(failing_handshake_config());
        // Build a session directly to avoid depending on a real upstream
        // handshake succeeding in this sandboxed test environment.
        let client = Client::start(ClientConfig {
            command: "cat".to_string(),
            ..ClientConfig::default()
        })
        .await
        .expect("cat must be spawnable for this test");
        let id = SessionId::new();
        let session = Session::new(id, client);
        manager.sessions.insert(id, session);

        assert!(manager.delete(id).await);
        assert!(!manager.delete(id).await);
    }

    #[tokio::test]
    async fn close_all_makes_manager_unusable() {
        let manager = SessionManager::new(failing_handshake_config());
        manager.close_all().await;
        assert!(manager.create().await.is_err());
    }

    #[tokio::test]
    async fn touch_reports_whether_session_existed() {
        let manager = SessionManager::new(failing_handshake_config());
        let client = Client::start(ClientConfig {
            command: "cat".to_string(),
            ..ClientConfig::default()
        })
        .await
        .expect("cat must be spawnable for this test");
        let id = SessionId::new();
        manager.sessions.insert(id, Session::new(id, client));

        assert!(manager.touch(id));
        assert!(!manager.touch(SessionId::new()));
        manager.delete(id).await;
    }
}
