//! Throttlebox - Simulated Rate Limiting Service
//!
//! This crate implements a mock HTTP server for exercising client-side
//! handling of 429 responses. It exposes tables of synthetic endpoints that
//! accept a bounded number of requests before cooling down behind a
//! Retry-After hint, plus diagnostic routes that fail or drop connections
//! on purpose.

pub mod http;
pub mod ratelimit;
pub mod config;
pub mod error;
