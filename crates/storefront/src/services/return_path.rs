//! Deferred post-sign-in redirect target.

use std::sync::{Arc, Mutex, PoisonError};

/// Single-slot mailbox for the protected path a signed-out user asked for.
///
/// Setting overwrites any unconsumed path (last write wins). Taking empties
/// the slot in the same critical section, so a path is handed out at most once.
#[derive(Debug, Clone, Default)]
pub struct ReturnPathQueue {
    slot: Arc<Mutex<Option<String>>>,
}

impl ReturnPathQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `path`, replacing any pending one.
    pub fn set(&self, path: impl Into<String>) {
        let path = path.into();
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.as_deref()
            && previous != path
        {
            tracing::debug!(previous, path, "Replacing pending return path");
        }
        *slot = Some(path);
    }

    /// Consume the pending path, leaving the slot empty.
    pub fn take(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// The pending path, without consuming it.
    #[must_use]
    pub fn peek(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drop any pending path.
    pub fn clear(&self) {
        self.take();
    }
}
