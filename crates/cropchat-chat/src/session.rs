//! Continuity token tracking for one chat view.

/// The backend-issued token correlating exchanges into one conversation.
///
/// Opaque: never parsed, merged, or persisted. Each successful response
/// replaces it outright.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    session_id: Option<String>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current token, if the backend has issued one.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Replace the token with the one from the latest response, returning the
    /// previous value.
    pub fn replace(&mut self, session_id: String) -> Option<String> {
        self.session_id.replace(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_without_token() {
        let ctx = SessionContext::new();
        assert!(ctx.session_id().is_none());
    }

    #[test]
    fn test_replace_overwrites() {
        let mut ctx = SessionContext::new();
        assert_eq!(ctx.replace("abc123".to_string()), None);
        assert_eq!(ctx.session_id(), Some("abc123"));

        assert_eq!(ctx.replace("def456".to_string()), Some("abc123".to_string()));
        assert_eq!(ctx.session_id(), Some("def456"));
    }

    #[test]
    fn test_token_is_opaque() {
        let mut ctx = SessionContext::new();
        ctx.replace("  {not: json} ".to_string());
        assert_eq!(ctx.session_id(), Some("  {not: json} "));
    }
}
