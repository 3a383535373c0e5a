//! Turns typed lines into intents. Shared by the stdin thread and the renderer.

use chatter::dispatcher::Intent;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct InputMode {
    joined: AtomicBool,
    /// A join was sent and the server has not answered yet.
    join_pending: AtomicBool,
}

impl InputMode {
    /// The intent for one typed line. None while a join is waiting for the server's answer,
    /// or when there is no nickname to ask for.
    pub fn intent_for(&self, line: &str) -> Option<Intent> {
        if self.joined.load(Ordering::SeqCst) {
            return Some(Intent::Send(line.to_string()));
        }
        if line.trim().is_empty() || self.join_pending.swap(true, Ordering::SeqCst) {
            return None;
        }
        Some(Intent::Join(line.to_string()))
    }

    pub fn is_joined(&self) -> bool {
        self.joined.load(Ordering::SeqCst)
    }

    /// Chat view shown: later lines are messages.
    pub fn mark_joined(&self) {
        self.joined.store(true, Ordering::SeqCst);
        self.join_pending.store(false, Ordering::SeqCst);
    }

    /// The server answered with an error; a new nickname may be tried.
    pub fn join_refused(&self) {
        self.join_pending.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_typed_before_join_ok_are_held_back() {
        let mode = InputMode::default();
        assert_eq!(mode.intent_for("alice"), Some(Intent::Join("alice".to_string())));
        assert_eq!(mode.intent_for("hello everyone"), None);
        mode.mark_joined();
        assert_eq!(
            mode.intent_for("hello everyone"),
            Some(Intent::Send("hello everyone".to_string()))
        );
    }

    #[test]
    fn refused_join_allows_another_nickname() {
        let mode = InputMode::default();
        assert!(mode.intent_for("taken").is_some());
        assert_eq!(mode.intent_for("other"), None);
        mode.join_refused();
        assert_eq!(mode.intent_for("other"), Some(Intent::Join("other".to_string())));
    }

    #[test]
    fn blank_nickname_does_not_block() {
        let mode = InputMode::default();
        assert_eq!(mode.intent_for("   "), None);
        assert_eq!(mode.intent_for("bob"), Some(Intent::Join("bob".to_string())));
    }
}
