//! Identity collaborator seen by the session client.
//!
//! The client never issues or stores credentials. It reads the current token
//! when building a request and signals invalidation when the backend rejects
//! it.

use tokio::sync::watch;

/// Source of the bearer credential attached to outbound requests.
pub trait IdentityProvider: Send + Sync {
    /// The current token, or `None` when logged out.
    fn token(&self) -> Option<String>;

    /// Drop the credential after the backend rejected it (logout).
    fn invalidate(&self);
}

/// In-process token holder backed by a `watch` channel.
///
/// Hosts subscribe to observe logout and navigate away from the chat view.
#[derive(Debug)]
pub struct TokenStore {
    tx: watch::Sender<Option<String>>,
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TokenStore {
    pub fn new(token: Option<String>) -> Self {
        let (tx, _rx) = watch::channel(token);
        Self { tx }
    }

    /// Store a freshly issued token.
    pub fn login(&self, token: impl Into<String>) {
        self.tx.send_replace(Some(token.into()));
        tracing::info!("Identity token stored");
    }

    pub fn is_logged_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// Watch the token; `None` means logged out.
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.tx.subscribe()
    }
}

impl IdentityProvider for TokenStore {
    fn token(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    fn invalidate(&self) {
        let previous = self.tx.send_replace(None);
        if previous.is_some() {
            tracing::info!("Identity token invalidated");
        } else {
            tracing::debug!("Invalidate requested while already logged out");
        }
    }
}
