//! Limiter parameters attached to each simulated endpoint.

use rand::Rng;
use std::ops::RangeInclusive;

/// Range `max_requests` is drawn from in the randomized table.
pub const MAX_REQUESTS_RANGE: RangeInclusive<u32> = 5..=50;
/// Range `retry_after_seconds` is drawn from in the randomized table.
pub const RETRY_AFTER_RANGE: RangeInclusive<u64> = 2..=10;

/// Limits applied to a single endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitParams {
    /// Accepted requests per window
    pub max_requests: u32,
    /// Cooldown duration in seconds; also the idle window
    pub retry_after_seconds: u64,
}

impl LimitParams {
    /// Draw a random parameter set for one endpoint of the randomized table.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            max_requests: rng.gen_range(MAX_REQUESTS_RANGE),
            retry_after_seconds: rng.gen_range(RETRY_AFTER_RANGE),
        }
    }
}
