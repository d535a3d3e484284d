//! Server lifecycle states.

use std::fmt;

/// Where the server is in its life. Transitions only move forward:
/// `Unbound → Listening → Draining → Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    /// Constructed, no socket yet.
    Unbound,
    /// Bound and accepting connections.
    Listening,
    /// No longer accepting; in-flight HTTP connections finishing.
    Draining,
    /// All done (or the grace period ran out).
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Unbound => "unbound",
            LifecycleState::Listening => "listening",
            LifecycleState::Draining => "draining",
            LifecycleState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_ordered() {
        assert!(LifecycleState::Unbound < LifecycleState::Listening);
        assert!(LifecycleState::Listening < LifecycleState::Draining);
        assert!(LifecycleState::Draining < LifecycleState::Closed);
        assert_eq!(LifecycleState::Draining.to_string(), "draining");
    }
}
