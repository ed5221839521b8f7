//! Exchange client infrastructure.
//!
//! - [`pool`] - TTL cache of connectivity clients with a background sweep

pub mod pool;
