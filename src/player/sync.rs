//! Multi-player time linking
//!
//! A player can take its current time from an external [`TimeSource`]
//! instead of its own clock. [`CompareLink`] is the source used to slave
//! one player to another: it holds only weak references, so a linked
//! player never keeps its primary alive.

use crate::time::RationalTime;
use crate::utils::observer::Observable;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// External clock a player can follow
pub trait TimeSource: Send + Sync {
    /// Current time, or `None` once the source has gone away
    fn current_time(&self) -> Option<RationalTime>;
}

/// Weak link to a primary player's current time
pub struct CompareLink {
    time: Weak<Observable<RationalTime>>,
    followers: Weak<AtomicUsize>,
}

impl CompareLink {
    /// Link to a primary's time, counting this link as one of its followers
    pub fn new(time: &Arc<Observable<RationalTime>>, followers: &Arc<AtomicUsize>) -> Self {
        followers.fetch_add(1, Ordering::AcqRel);
        Self {
            time: Arc::downgrade(time),
            followers: Arc::downgrade(followers),
        }
    }

    /// Whether the primary still exists
    pub fn is_alive(&self) -> bool {
        self.time.strong_count() > 0
    }
}

impl TimeSource for CompareLink {
    fn current_time(&self) -> Option<RationalTime> {
        self.time.upgrade().map(|time| time.get())
    }
}

impl Drop for CompareLink {
    fn drop(&mut self) {
        if let Some(followers) = self.followers.upgrade() {
            followers.fetch_sub(1, Ordering::AcqRel);
        }
    }
}
