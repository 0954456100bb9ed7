//! ledgerlink - authenticated cashbook ledger API client.
//!
//! The data-access layer for a financial record-keeping dashboard: an
//! authenticated transport with automatic credential renewal, layered over
//! a cache-backed, quota-aware local store that keeps reads working
//! (read-only, possibly stale) when the network or the service is down.
//!
//! The resilience contract in one line: reads degrade to last-known-good,
//! writes require the network and surface their errors.

#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod client;
pub mod core;
pub mod error;
pub mod repo;
pub mod storage;
pub mod transport;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use client::Client;
pub use crate::core::config::ClientConfig;
pub use error::{ApiError, Result};
