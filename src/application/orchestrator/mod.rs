//! Fetch orchestrator: push and poll loops behind registry entries.

mod context;
mod fetch;
mod operation;
mod pull;
mod push;
mod task;

pub use fetch::FetchOrchestrator;
pub use task::FeedTask;
