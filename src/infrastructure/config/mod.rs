//! Infrastructure configuration modules.

pub mod feed;
pub mod logging;
pub mod pool;
pub mod provider;
pub mod settings;
