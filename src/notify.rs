//! Transient user-facing notifications

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// Notifications kept before the oldest is dropped
pub const MAX_PENDING: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

/// One toast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

/// Queue of notifications waiting to be shown
#[derive(Debug, Default)]
pub struct Notifier {
    queue: Mutex<VecDeque<Notification>>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>) {
        let message = message.into();
        info!(%message, "notify");
        self.push(Level::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "notify");
        self.push(Level::Error, message);
    }

    fn push(&self, level: Level, message: String) {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        if queue.len() == MAX_PENDING {
            queue.pop_front();
        }
        queue.push_back(Notification { level, message });
    }

    /// Take every pending notification, oldest first
    pub fn drain(&self) -> Vec<Notification> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Pending notifications without consuming them
    pub fn pending(&self) -> Vec<Notification> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Pending error notifications
    pub fn errors(&self) -> Vec<Notification> {
        self.pending()
            .into_iter()
            .filter(|n| n.level == Level::Error)
            .collect()
    }
}
