//! Session state

/// Lifecycle of an application relationship as seen by the controller
///
/// A release does not move the session back to `Unestablished`; the
/// device is free to drop the AR but the session keeps its identifiers
/// and reconnects on the next stale read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No connect has completed yet
    #[default]
    Unestablished,
    /// A connect has completed
    Live,
}

impl SessionState {
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        assert_eq!(SessionState::default(), SessionState::Unestablished);
        assert!(!SessionState::Unestablished.is_live());
        assert!(SessionState::Live.is_live());
    }
}
