//! Session registry for the producer side of the link.
//!
//! The registry mints session tokens, keeps the token → cancellation table
//! and spawns one send loop per session. The table is the only state shared
//! between concurrently running sessions.

use crate::error::{StreamError, StreamResult};
use crate::gate::AdmissionGate;
use crate::session::{SessionConfig, TransmissionSession};
use groundlink_core::{Destination, SessionToken};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct Entry {
    cancel: CancellationToken,
    destination: Destination,
}

pub(crate) struct RegistryInner {
    sessions: Mutex<HashMap<SessionToken, Entry>>,
    removed: Notify,
}

impl RegistryInner {
    fn table(&self) -> MutexGuard<'_, HashMap<SessionToken, Entry>> {
        // Entries are plain data; a panic elsewhere cannot leave one half-written.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn remove(&self, token: &SessionToken) {
        let removed = self.table().remove(token).is_some();
        if removed {
            debug!(%token, "Session removed from registry");
        }
        self.removed.notify_waiters();
    }
}

/// Creates, tracks and cancels transmission sessions.
///
/// Cloning is cheap; clones share the same table and admission gate.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
    gate: AdmissionGate,
    config: SessionConfig,
}

impl SessionRegistry {
    /// Registry whose gate admits `capacity` concurrent sessions.
    pub fn new(capacity: usize, config: SessionConfig) -> StreamResult<Self> {
        Ok(Self {
            inner: Arc::new(RegistryInner {
                sessions: Mutex::new(HashMap::new()),
                removed: Notify::new(),
            }),
            gate: AdmissionGate::new(capacity)?,
            config,
        })
    }

    /// Start a session streaming to `destination`.
    ///
    /// Returns as soon as the session is recorded; admission happens inside
    /// the spawned task. Must be called from within a tokio runtime.
    pub fn create(&self, destination: Destination) -> SessionToken {
        let token = SessionToken::new();
        let cancel = CancellationToken::new();

        self.inner.table().insert(
            token,
            Entry {
                cancel: cancel.clone(),
                destination: destination.clone(),
            },
        );

        info!(%token, %destination, "Starting stream");

        let session = TransmissionSession {
            token,
            destination,
            cancel,
            gate: self.gate.clone(),
            registry: Arc::clone(&self.inner),
            config: self.config.clone(),
        };
        tokio::spawn(session.run());

        token
    }

    /// Signal cancellation for a live session.
    ///
    /// The token stays listed until its send loop observes the signal and
    /// exits.
    pub fn cancel(&self, token: &SessionToken) -> StreamResult<()> {
        match self.inner.table().get(token) {
            Some(entry) => {
                entry.cancel.cancel();
                info!(%token, destination = %entry.destination, "Stream cancellation requested");
                Ok(())
            }
            None => Err(StreamError::SessionNotFound { token: *token }),
        }
    }

    /// Tokens currently tracked, in a stable order.
    pub fn list_active(&self) -> Vec<SessionToken> {
        let mut tokens: Vec<SessionToken> = self.inner.table().keys().copied().collect();
        tokens.sort();
        tokens
    }

    /// Whether `token` is still tracked.
    pub fn contains(&self, token: &SessionToken) -> bool {
        self.inner.table().contains_key(token)
    }

    /// Number of tracked sessions, queued ones included.
    pub fn len(&self) -> usize {
        self.inner.table().len()
    }

    /// Whether no session is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Admission gate shared by this registry's sessions.
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Wait until `token` is no longer tracked, or `timeout` elapses.
    ///
    /// Returns `true` when the session is gone.
    pub async fn wait_removed(&self, token: &SessionToken, timeout: Duration) -> bool {
        self.wait_until(timeout, |table| !table.contains_key(token)).await
    }

    /// Cancel every session and wait for the table to drain.
    ///
    /// Returns the number of sessions still tracked when `timeout` elapsed.
    pub async fn shutdown(&self, timeout: Duration) -> usize {
        let tokens: Vec<SessionToken> = {
            let table = self.inner.table();
            for entry in table.values() {
                entry.cancel.cancel();
            }
            table.keys().copied().collect()
        };
        info!(sessions = tokens.len(), "Cancelling all streams");

        self.wait_until(timeout, |table| table.is_empty()).await;

        let remaining = self.len();
        if remaining > 0 {
            warn!(remaining, "Streams still running after shutdown timeout");
        }
        remaining
    }

    async fn wait_until<F>(&self, timeout: Duration, done: F) -> bool
    where
        F: Fn(&HashMap<SessionToken, Entry>) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.inner.removed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if done(&self.inner.table()) {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return done(&self.inner.table());
            }
        }
    }
}
