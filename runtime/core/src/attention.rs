//! Attention Queue
//!
//! Background applications ask to become foreground by filing an
//! [`AttentionRequest`]. The scheduler serves at most one request per frame,
//! always the head of the queue.
//!
//! # Ordering
//!
//! The queue is kept sorted by descending [`Priority`]. Among equal
//! priorities, the earlier request is served first. A new request is inserted
//! after every queued entry of equal or higher priority, which keeps the sort
//! stable without re-sorting.
//!
//! # One Entry per Application
//!
//! An application appears at most once. Asking again at the same or a lower
//! priority is a no-op; asking at a higher priority moves the existing entry
//! up (it is re-inserted at the tail of its new priority band).

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::app::AppId;

/// Attention priority
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Served after everything else
    Low,
    /// Default priority
    #[default]
    Normal,
    /// Served first (alarms, timers)
    High,
}

impl Priority {
    /// Parse a priority name
    ///
    /// Unknown names map to [`Priority::Normal`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "high" | "urgent" => Self::High,
            _ => Self::Normal,
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pending request to become foreground
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttentionRequest {
    /// Requested priority
    pub priority: Priority,
    /// Requesting application
    pub app: AppId,
}

/// Priority-ordered queue of attention requests
#[derive(Debug, Default)]
pub struct AttentionQueue {
    entries: VecDeque<AttentionRequest>,
}

impl AttentionQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// File a request for `app` at `priority`
    ///
    /// Returns `true` if the queue changed.
    pub fn request(&mut self, app: AppId, priority: Priority) -> bool {
        if let Some(pos) = self.entries.iter().position(|r| r.app == app) {
            if self.entries[pos].priority >= priority {
                tracing::debug!(%app, %priority, "Attention already requested");
                return false;
            }
            self.entries.remove(pos);
        }

        let at = self
            .entries
            .iter()
            .position(|r| r.priority < priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(at, AttentionRequest { priority, app });

        tracing::debug!(%app, %priority, position = at, "Attention requested");
        true
    }

    /// Remove and return the highest-priority request
    pub fn pop(&mut self) -> Option<AttentionRequest> {
        self.entries.pop_front()
    }

    /// Look at the head of the queue
    #[must_use]
    pub fn peek(&self) -> Option<&AttentionRequest> {
        self.entries.front()
    }

    /// Drop any request from `app`; returns whether one was removed
    pub fn remove_app(&mut self, app: AppId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|r| r.app != app);
        self.entries.len() != before
    }

    /// Whether `app` has a pending request
    #[must_use]
    pub fn contains(&self, app: AppId) -> bool {
        self.entries.iter().any(|r| r.app == app)
    }

    /// Number of pending requests
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no requests are pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending requests in service order
    pub fn iter(&self) -> impl Iterator<Item = &AttentionRequest> {
        self.entries.iter()
    }
}
