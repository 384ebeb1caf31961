//! Server Options
//!
//! Runtime-adjustable configuration shared by every connection. Readers
//! always see the current value: the auth gate re-reads the password on
//! each invocation, so `CONFIG SET requirepass` takes effect immediately,
//! without a restart and without touching established authenticated
//! sessions.

use std::sync::RwLock;

/// Shared, hot-reloadable server options.
///
/// One instance is created at startup and handed (via `Arc`) to the
/// middleware and handlers that need it.
#[derive(Debug, Default)]
pub struct ServerOptions {
    /// Password clients must present via AUTH; `None` disables authentication
    requirepass: RwLock<Option<String>>,
}

impl ServerOptions {
    /// Creates options with authentication disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options with a required password.
    pub fn with_requirepass(password: impl Into<String>) -> Self {
        let options = Self::new();
        options.set_requirepass(Some(password.into()));
        options
    }

    /// The current password, read fresh on every call.
    ///
    /// Returns `None` when no password is configured.
    pub fn requirepass(&self) -> Option<String> {
        self.requirepass.read().unwrap().clone()
    }

    /// Replaces the password at runtime.
    ///
    /// An empty string is normalized to `None`, matching the protocol
    /// convention that an unset password disables authentication.
    pub fn set_requirepass(&self, password: Option<String>) {
        let normalized = password.filter(|p| !p.is_empty());
        *self.requirepass.write().unwrap() = normalized;
    }
}
