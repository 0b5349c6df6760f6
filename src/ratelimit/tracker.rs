//! Per-endpoint request tracking state.

use chrono::{DateTime, Duration, Utc};

/// Logical state of a tracker entry at a given instant.
///
/// The phase is derived from the entry's fields on every evaluation rather
/// than stored, so it can never go stale between requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The entry rejects all requests until its cooldown expires.
    Cooling,
    /// The entry has been idle longer than its window, or was never used,
    /// and must be reset before counting resumes.
    IdleExpired,
    /// The entry is counting requests against its limit.
    Active,
}

/// State record for one simulated endpoint.
///
/// All time-dependent operations take the current time as an explicit
/// argument; the entry never reads the clock itself.
#[derive(Debug, Clone)]
pub struct TrackerEntry {
    /// Endpoint index, fixed at creation
    index: usize,
    /// Accepted requests since the last reset
    count: u32,
    /// When the most recent request was accepted
    last_request: Option<DateTime<Utc>>,
    /// Until when all requests are rejected
    cooldown_until: Option<DateTime<Utc>>,
}

impl TrackerEntry {
    /// Create a fresh entry for the given endpoint index.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            count: 0,
            last_request: None,
            cooldown_until: None,
        }
    }

    /// Endpoint index this entry belongs to.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Accepted requests since the last reset.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Timestamp of the most recently accepted request.
    pub fn last_request(&self) -> Option<DateTime<Utc>> {
        self.last_request
    }

    /// Classify the entry, checking the cooldown before idleness.
    ///
    /// An entry inside its cooldown is never considered idle, no matter how
    /// long ago the last request was accepted.
    pub fn phase(&self, now: DateTime<Utc>, idle_window_secs: u64) -> Phase {
        if self.cooldown_until.is_some_and(|until| until > now) {
            return Phase::Cooling;
        }
        match self.last_request {
            None => Phase::IdleExpired,
            Some(last) if last + Duration::seconds(idle_window_secs as i64) < now => {
                Phase::IdleExpired
            }
            Some(_) => Phase::Active,
        }
    }

    /// Record an accepted request.
    pub fn accept(&mut self, now: DateTime<Utc>) {
        self.count += 1;
        self.last_request = Some(now);
        self.cooldown_until = None;
    }

    /// Return the entry to its initial state.
    pub fn reset(&mut self) {
        self.count = 0;
        self.last_request = None;
        self.cooldown_until = None;
    }

    /// Start a cooldown of `retry_after_secs` seconds from `now`.
    pub fn set_cooldown(&mut self, now: DateTime<Utc>, retry_after_secs: u64) {
        self.cooldown_until = Some(now + Duration::seconds(retry_after_secs as i64));
    }

    /// Seconds until the cooldown expires, rounded up to the next whole
    /// second; 0 when not cooling.
    pub fn remaining_cooldown(&self, now: DateTime<Utc>) -> u64 {
        match self.cooldown_until {
            Some(until) if until > now => {
                let millis = (until - now).num_milliseconds();
                (millis as u64).div_ceil(1000).max(1)
            }
            _ => 0,
        }
    }
}
