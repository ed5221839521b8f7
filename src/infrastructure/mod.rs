//! Infrastructure layer.
//!
//! Technical concerns that support the application without containing
//! business logic.
//!
//! # Submodules
//!
//! - [`bootstrap`] - Composition root for runtime wiring
//! - [`config`] - Configuration loading and validation
//! - [`exchange`] - Connectivity client pool
//! - [`operator`] - Diagnostic use cases behind the CLI

pub mod bootstrap;
pub mod config;
pub mod exchange;
pub mod operator;
