//! Rate limit evaluation and the per-endpoint tracker table.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use super::params::LimitParams;
use super::tracker::{Phase, TrackerEntry};

/// Public view of a tracker entry, returned with accepted requests.
///
/// The cooldown expiry is deliberately absent: clients only learn about
/// cooldowns through rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerSnapshot {
    /// Endpoint index
    pub index: usize,
    /// Accepted requests in the current window, including this one
    pub count: u32,
    /// When this request was accepted
    pub last_request: Option<DateTime<Utc>>,
    /// Request limit in effect for this endpoint
    pub max_requests: u32,
    /// Cooldown and idle window in effect for this endpoint
    pub retry_after_seconds: u64,
}

/// Outcome of evaluating one request against one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request is within the limit.
    Accepted(TrackerSnapshot),
    /// The request is rejected; retry after the given number of seconds.
    Rejected {
        /// Whole seconds to wait, rounded up
        retry_after_secs: u64,
    },
}

/// Evaluate a request against a single entry at the given instant.
///
/// Transition rules, in order:
/// - cooling down: reject with the remaining cooldown, mutate nothing;
/// - idle past the window (or never used): reset, then continue as active;
/// - active under the limit: accept;
/// - active at the limit: start a cooldown and reject with its full length.
pub fn evaluate(entry: &mut TrackerEntry, params: &LimitParams, now: DateTime<Utc>) -> Decision {
    match entry.phase(now, params.retry_after_seconds) {
        Phase::Cooling => {
            return Decision::Rejected {
                retry_after_secs: entry.remaining_cooldown(now),
            };
        }
        Phase::IdleExpired => entry.reset(),
        Phase::Active => {}
    }

    if entry.count() < params.max_requests {
        entry.accept(now);
        Decision::Accepted(TrackerSnapshot {
            index: entry.index(),
            count: entry.count(),
            last_request: entry.last_request(),
            max_requests: params.max_requests,
            retry_after_seconds: params.retry_after_seconds,
        })
    } else {
        entry.set_cooldown(now, params.retry_after_seconds);
        Decision::Rejected {
            retry_after_secs: params.retry_after_seconds,
        }
    }
}

/// One endpoint's parameters and lockable state.
struct Slot {
    /// Limits for this endpoint, fixed at table creation
    params: LimitParams,
    /// Mutable tracking state, one lock per endpoint
    entry: Mutex<TrackerEntry>,
}

/// A fixed-size table of rate-limited endpoints.
///
/// The table is created once at startup and shared across request tasks.
/// Each entry carries its own lock, so requests to different indices never
/// contend with each other, while the read-decide-write sequence for one
/// index stays atomic.
pub struct RateLimiter {
    slots: Vec<Slot>,
}

impl RateLimiter {
    /// Create a table where every endpoint shares the same limits.
    pub fn uniform(max_endpoints: usize, params: LimitParams) -> Self {
        let slots = (0..max_endpoints)
            .map(|index| Slot {
                params,
                entry: Mutex::new(TrackerEntry::new(index)),
            })
            .collect();
        Self { slots }
    }

    /// Create a table where every endpoint draws its own random limits.
    ///
    /// A fixed seed reproduces the same table; `None` seeds from entropy.
    pub fn heterogeneous(max_endpoints: usize, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let slots = (0..max_endpoints)
            .map(|index| Slot {
                params: LimitParams::random(&mut rng),
                entry: Mutex::new(TrackerEntry::new(index)),
            })
            .collect();
        Self { slots }
    }

    /// Number of endpoints in the table.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table has no endpoints.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Limits in effect for the given index.
    pub fn limit_params(&self, index: usize) -> Option<LimitParams> {
        self.slots.get(index).map(|slot| slot.params)
    }

    /// Iterate over every endpoint's limits in index order.
    pub fn iter_params(&self) -> impl Iterator<Item = (usize, LimitParams)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (index, slot.params))
    }

    /// Evaluate a request against the entry at `index`.
    ///
    /// Returns `None` for an out-of-range index, mutating nothing. The entry
    /// stays locked for the whole evaluation, so concurrent requests to one
    /// index can never over-admit.
    pub fn check(&self, index: usize, now: DateTime<Utc>) -> Option<Decision> {
        let slot = self.slots.get(index)?;
        let mut entry = slot.entry.lock();
        let decision = evaluate(&mut entry, &slot.params, now);

        match decision {
            Decision::Accepted(snapshot) => {
                trace!(index, count = snapshot.count, "Request accepted");
            }
            Decision::Rejected { retry_after_secs } => {
                debug!(index, retry_after_secs, "Request throttled");
            }
        }

        Some(decision)
    }
}
