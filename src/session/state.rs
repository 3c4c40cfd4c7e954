use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of a streaming session.
///
/// `Created -> Running -> {Completed | Failed | TimedOut | Disconnected}`.
/// Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Created = 0,
    Running = 1,
    Completed = 2,
    Failed = 3,
    TimedOut = 4,
    Disconnected = 5,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionState::Created | SessionState::Running)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => SessionState::Created,
            1 => SessionState::Running,
            2 => SessionState::Completed,
            3 => SessionState::Failed,
            4 => SessionState::TimedOut,
            _ => SessionState::Disconnected,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Created => "created",
            SessionState::Running => "running",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::TimedOut => "timed_out",
            SessionState::Disconnected => "disconnected",
        };
        write!(f, "{s}")
    }
}

/// Single-writer guard over the session state.
///
/// Every terminal path races through [`StateCell::finish`]; exactly one wins.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(SessionState::Created as u8))
    }

    pub(crate) fn get(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// `Created -> Running`. False if the session already moved on.
    pub(crate) fn start(&self) -> bool {
        self.0
            .compare_exchange(
                SessionState::Created as u8,
                SessionState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to a terminal state. True only for the first caller.
    pub(crate) fn finish(&self, target: SessionState) -> bool {
        debug_assert!(target.is_terminal());
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if SessionState::from_u8(current).is_terminal() {
                    None
                } else {
                    Some(target as u8)
                }
            })
            .is_ok()
    }

    /// Swap one terminal state for another. Reserved for the caller that won
    /// [`StateCell::finish`].
    pub(crate) fn replace(&self, from: SessionState, to: SessionState) -> bool {
        debug_assert!(from.is_terminal() && to.is_terminal());
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_start_then_finish() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), SessionState::Created);
        assert!(cell.start());
        assert!(!cell.start());
        assert!(cell.finish(SessionState::Completed));
        assert_eq!(cell.get(), SessionState::Completed);
    }

    #[test]
    fn test_first_terminal_wins() {
        let cell = StateCell::new();
        assert!(cell.finish(SessionState::TimedOut));
        assert!(!cell.finish(SessionState::Completed));
        assert!(!cell.finish(SessionState::Failed));
        assert!(!cell.start());
        assert_eq!(cell.get(), SessionState::TimedOut);
    }

    #[test]
    fn test_replace_terminal_state() {
        let cell = StateCell::new();
        assert!(cell.finish(SessionState::Completed));
        assert!(!cell.replace(SessionState::Failed, SessionState::Disconnected));
        assert!(cell.replace(SessionState::Completed, SessionState::Disconnected));
        assert_eq!(cell.get(), SessionState::Disconnected);
    }

    #[test]
    fn test_concurrent_finish_single_winner() {
        for _ in 0..200 {
            let cell = Arc::new(StateCell::new());
            cell.start();
            let targets = [
                SessionState::Completed,
                SessionState::Failed,
                SessionState::TimedOut,
                SessionState::Disconnected,
            ];
            let handles: Vec<_> = targets
                .into_iter()
                .map(|target| {
                    let cell = cell.clone();
                    std::thread::spawn(move || cell.finish(target))
                })
                .collect();
            let winners = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|won| *won)
                .count();
            assert_eq!(winners, 1);
            assert!(cell.get().is_terminal());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(SessionState::TimedOut.to_string(), "timed_out");
        assert!(!SessionState::Running.is_terminal());
    }
}
