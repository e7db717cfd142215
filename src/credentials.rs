//! Session credential source.
//!
//! The connection manager asks a [`CredentialSource`] for the bearer
//! credential on every connect attempt and never caches the answer, so a
//! rotated credential is picked up on the next reconnect.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

/// Supplies the current bearer credential, if any.
///
/// Implementations must be side-effect free and cheap: `get` is called
/// synchronously from the connect path.
pub trait CredentialSource: Send + Sync + fmt::Debug {
    /// Returns the current credential, or `None` when signed out.
    fn get(&self) -> Option<String>;
}

/// In-memory credential slot shared between the session layer (which
/// writes it) and the connection manager (which only reads it).
#[derive(Clone, Default)]
pub struct SharedCredential {
    inner: Arc<RwLock<Option<String>>>,
}

impl SharedCredential {
    /// Creates a slot holding `initial`.
    #[must_use]
    pub fn new(initial: Option<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    /// Stores a new credential.
    pub fn set(&self, credential: impl Into<String>) {
        *self.inner.write() = Some(credential.into());
    }

    /// Clears the credential (sign-out).
    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

impl CredentialSource for SharedCredential {
    fn get(&self) -> Option<String> {
        self.inner.read().clone()
    }
}

impl fmt::Debug for SharedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.inner.read().is_some() {
            "<redacted>"
        } else {
            "<none>"
        };
        f.debug_struct("SharedCredential")
            .field("credential", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_is_visible_to_clones() {
        let slot = SharedCredential::new(Some("first".to_string()));
        let reader = slot.clone();
        assert_eq!(reader.get().as_deref(), Some("first"));

        slot.set("second");
        assert_eq!(reader.get().as_deref(), Some("second"));

        slot.clear();
        assert!(reader.get().is_none());
    }

    #[test]
    fn debug_does_not_leak_token() {
        let slot = SharedCredential::new(Some("secret-token".to_string()));
        let rendered = format!("{slot:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("redacted"));
    }
}
