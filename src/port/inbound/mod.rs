//! Inbound (driving) ports consumed by inbound adapters.
//!
//! # Modules
//!
//! - [`operator`]: Operator-facing use cases for configuration checks and
//!   provider resolution

pub mod operator;
