//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe what the core needs from the outside world:
//! connectivity clients, credential lookup, and chart update consumers.

pub mod credentials;
pub mod exchange;
pub mod listener;
