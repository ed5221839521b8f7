//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`client`] - Fake connectivity clients: `ScriptedClient`, `ScriptedFactory`.
//! - [`domain`] - Builders for domain primitives: keys, candles, trades, books.
//! - [`config`] - Canonical test settings and a fully wired test feed.

pub mod client;
pub mod config;
pub mod domain;
