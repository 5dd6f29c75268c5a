//! In-memory bearer token

use parking_lot::RwLock;

/// Bearer token of the logged-in operator
///
/// The token lives for the process lifetime only. Clearing it is how the
/// client signals "logged out" to pollers and request builders.
#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<String>>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }

    /// Current token, if any
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Install a new token (after a fresh login)
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Drop the token
    ///
    /// Returns `true` only for the call that actually removed it, so the
    /// session-expired flow runs once.
    pub fn clear(&self) -> bool {
        self.token.write().take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_lifecycle() {
        let session = Session::new(Some("abc".into()));
        assert!(session.is_authenticated());
        assert_eq!(session.token().as_deref(), Some("abc"));

        assert!(session.clear());
        assert!(!session.clear());
        assert!(!session.is_authenticated());

        session.set_token("def");
        assert_eq!(session.token().as_deref(), Some("def"));
    }

    #[test]
    fn test_empty_token_is_no_token() {
        assert!(!Session::new(Some(String::new())).is_authenticated());
        assert!(!Session::default().is_authenticated());
    }
}
