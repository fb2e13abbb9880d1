//! In-memory collaborators for engine tests
//!
//! Key-set providers with fixed behavior and an observer that records every
//! event it sees.

use async_trait::async_trait;
use oidc_auth::{
    AuthEvent, AuthObserver, KeySet, KeySetError, KeySetProvider, Role, StaticRoleResolver,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Returns the same key set for every service and counts calls.
#[derive(Debug, Default)]
pub struct StaticKeySetProvider {
    key_set: Arc<KeySet>,
    calls: AtomicUsize,
}

impl StaticKeySetProvider {
    pub fn new(key_set: KeySet) -> Self {
        Self {
            key_set: Arc::new(key_set),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `key_set` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeySetProvider for StaticKeySetProvider {
    async fn key_set(&self, _service_name: &str) -> Result<Arc<KeySet>, KeySetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::clone(&self.key_set))
    }
}

/// Always fails with an HTTP status error.
#[derive(Debug, Clone, Copy)]
pub struct FailingKeySetProvider {
    pub status: u16,
}

impl Default for FailingKeySetProvider {
    fn default() -> Self {
        Self { status: 503 }
    }
}

#[async_trait]
impl KeySetProvider for FailingKeySetProvider {
    async fn key_set(&self, _service_name: &str) -> Result<Arc<KeySet>, KeySetError> {
        Err(KeySetError::Status(self.status))
    }
}

/// Observer that stores every event.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<AuthEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Copy of all events recorded so far
    pub fn events(&self) -> Vec<AuthEvent> {
        self.events.lock().expect("observer lock poisoned").clone()
    }
}

impl AuthObserver for RecordingObserver {
    fn on_event(&self, event: &AuthEvent) {
        self.events
            .lock()
            .expect("observer lock poisoned")
            .push(event.clone());
    }
}

/// Role resolver knowing `Acme:Viewer` and `Acme:Editor`.
pub fn test_role_resolver() -> StaticRoleResolver {
    StaticRoleResolver::new([
        Role::new("Acme:Viewer", "Viewer"),
        Role::new("Acme:Editor", "Editor"),
    ])
}
