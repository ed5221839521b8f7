//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │         Application          │
//!                 │ registry · orchestrator ·    │
//!                 │ merge store · event hub      │
//!                 └──────────────┬───────────────┘
//!          ┌─────────────────────┼─────────────────────┐
//!          ▼                     ▼                     ▼
//!   ┌─────────────┐      ┌───────────────┐     ┌──────────────┐
//!   │ Exchange    │      │ Credential    │     │ Chart        │
//!   │ client      │      │ store         │     │ listener     │
//!   └─────────────┘      └───────────────┘     └──────────────┘
//! ```

pub mod inbound;
pub mod outbound;

pub use outbound::credentials::{CredentialStore, Credentials, NoCredentials, StaticCredentials};
pub use outbound::exchange::{
    Capabilities, ClientCache, ClientFactory, ExchangeClient, PoolStats,
};
pub use outbound::listener::{ChartListener, LogListener};
