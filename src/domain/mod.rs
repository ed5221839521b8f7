//! Exchange-agnostic domain types.
//!
//! Pure data: identifiers, subscription keys, market data records and
//! provider descriptions. No I/O and no async.

pub mod book;
pub mod candle;
pub mod id;
pub mod key;
pub mod market;
pub mod provider;
pub mod trade;
pub mod transport;
pub mod update;

pub use book::{OrderBook, PriceLevel};
pub use candle::Candle;
pub use id::{ExchangeId, ListenerId, ProviderId, SubscriberId};
pub use key::SubscriptionKey;
pub use market::{DataKind, MarketType, Timeframe};
pub use provider::{
    ExchangeScope, Provider, ProviderConnection, ProviderKind, ProviderStatus,
};
pub use trade::{Trade, TradeSide};
pub use transport::{ClientMode, FeedOperation, TransportMethod};
pub use update::{ChartUpdate, UpdateKind};
