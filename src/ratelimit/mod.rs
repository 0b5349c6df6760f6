//! Rate limiting state machine and endpoint tracker tables.

mod limiter;
mod params;
mod tracker;

pub use limiter::{evaluate, Decision, RateLimiter, TrackerSnapshot};
pub use params::{LimitParams, MAX_REQUESTS_RANGE, RETRY_AFTER_RANGE};
pub use tracker::{Phase, TrackerEntry};
