//! HTTP service wiring around the allocation engine.
//!
//! ## Structure
//!
//! - [`config`] - CLI/env configuration and validation.
//! - [`state`] - shared application state (catalog, engine, result cache).
//! - [`cache`] - bounded per-catalog-version result cache.
//! - [`response`] - the JSON response envelope and status mapping.
//! - [`routes`] - the router and request handlers.
//! - [`telemetry`] - log subscriber setup.

pub mod cache;
pub mod config;
pub mod response;
pub mod routes;
pub mod state;
pub mod telemetry;
