use core::fmt;

/// Lifecycle of a kitchen session.
///
/// A session starts `Active`, moves to `Draining` exactly once when its
/// connection ends or fails, and finishes `Closed` after the outbound writer
/// and every fryer have stopped. There is no way back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Draining,
    Closed,
}

impl SessionState {
    /// Whether `next` is a legal successor of `self`.
    pub const fn can_become(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Draining) | (Self::Draining, Self::Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Active => "active",
            Self::Draining => "draining",
            Self::Closed => "closed",
        })
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn only_forward_transitions_are_legal() {
        use super::SessionState::*;

        assert!(Active.can_become(Draining));
        assert!(Draining.can_become(Closed));

        assert!(!Active.can_become(Closed));
        assert!(!Draining.can_become(Active));
        assert!(!Closed.can_become(Active));
        assert!(!Closed.can_become(Draining));
        assert!(!Active.can_become(Active));
    }
}
