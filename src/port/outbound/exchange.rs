//! Connectivity client port.
//!
//! The exchange connectivity library is opaque to this crate. Everything the
//! orchestrator needs from it is expressed here: a capability-flags value
//! object, request/response fetches, streaming watches, and a factory that
//! builds clients from provider configuration.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{
    Candle, ClientMode, ExchangeId, FeedOperation, MarketType, OrderBook, Provider, ProviderId,
    Timeframe, Trade,
};
use crate::error::Error;

/// Operations a client declares support for.
///
/// Probed by the orchestrator before choosing a transport; a missing flag
/// downgrades the feed to polling instead of failing it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub fetch_ohlcv: bool,
    pub fetch_trades: bool,
    pub fetch_order_book: bool,
    pub watch_ohlcv: bool,
    pub watch_trades: bool,
    pub watch_order_book: bool,
    pub watch_order_book_for_symbols: bool,
}

impl Capabilities {
    /// Every operation supported.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            fetch_ohlcv: true,
            fetch_trades: true,
            fetch_order_book: true,
            watch_ohlcv: true,
            watch_trades: true,
            watch_order_book: true,
            watch_order_book_for_symbols: true,
        }
    }

    /// Only the request/response operations.
    #[must_use]
    pub const fn pull_only() -> Self {
        Self {
            fetch_ohlcv: true,
            fetch_trades: true,
            fetch_order_book: true,
            watch_ohlcv: false,
            watch_trades: false,
            watch_order_book: false,
            watch_order_book_for_symbols: false,
        }
    }

    /// Whether a specific operation is declared.
    #[must_use]
    pub const fn supports(&self, operation: FeedOperation) -> bool {
        match operation {
            FeedOperation::WatchOhlcv => self.watch_ohlcv,
            FeedOperation::FetchOhlcv => self.fetch_ohlcv,
            FeedOperation::WatchTrades => self.watch_trades,
            FeedOperation::FetchTrades => self.fetch_trades,
            FeedOperation::WatchOrderBookForSymbols => self.watch_order_book_for_symbols,
            FeedOperation::WatchOrderBook => self.watch_order_book,
            FeedOperation::FetchOrderBook => self.fetch_order_book,
        }
    }
}

/// A live connectivity client for one exchange.
///
/// Implementations handle protocol details, rate limiting, and diff
/// application for incremental order-book streams. `watch_*` calls resolve
/// with the next pushed payload; an `Err` ends the stream for that caller.
#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// Exchange this client talks to.
    fn exchange(&self) -> &ExchangeId;

    /// Declared operation support.
    fn capabilities(&self) -> Capabilities;

    /// One-time expensive setup (instrument metadata).
    async fn load_markets(&self) -> Result<(), Error>;

    async fn fetch_ohlcv(
        &self,
        market: MarketType,
        symbol: &str,
        timeframe: &Timeframe,
        limit: Option<usize>,
    ) -> Result<Vec<Candle>, Error>;

    /// Recent trades, oldest first. `since` is an inclusive lower bound in
    /// epoch milliseconds.
    async fn fetch_trades(
        &self,
        market: MarketType,
        symbol: &str,
        since: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<Trade>, Error>;

    async fn fetch_order_book(
        &self,
        market: MarketType,
        symbol: &str,
        depth: Option<usize>,
    ) -> Result<OrderBook, Error>;

    async fn watch_ohlcv(
        &self,
        market: MarketType,
        symbol: &str,
        timeframe: &Timeframe,
    ) -> Result<Vec<Candle>, Error>;

    async fn watch_trades(&self, market: MarketType, symbol: &str) -> Result<Vec<Trade>, Error>;

    async fn watch_order_book(&self, market: MarketType, symbol: &str) -> Result<OrderBook, Error>;

    /// Multi-symbol book stream; resolves with whichever symbol updated.
    async fn watch_order_book_for_symbols(
        &self,
        market: MarketType,
        symbols: &[String],
    ) -> Result<OrderBook, Error>;

    /// Close streaming connections held by this client.
    async fn close(&self) -> Result<(), Error>;
}

/// Builds connectivity clients from provider configuration.
///
/// Injected at startup. Returning
/// [`FeedError::ClientUnavailable`](crate::error::FeedError::ClientUnavailable)
/// is the expected way to say the underlying library is missing.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn create(
        &self,
        exchange: &ExchangeId,
        provider: &Provider,
        mode: ClientMode,
    ) -> Result<Arc<dyn ExchangeClient>, Error>;
}

/// Shared cache of ready-to-use clients.
///
/// The orchestrator asks for clients through this port; the pool behind it
/// decides when to build, reuse or evict them.
#[async_trait]
pub trait ClientCache: Send + Sync {
    /// Return a client for `(exchange, provider, mode)`, building and
    /// initialising one on a miss.
    ///
    /// # Errors
    ///
    /// Propagates factory and `load_markets` failures. Nothing is cached
    /// when construction fails.
    async fn client(
        &self,
        exchange: &ExchangeId,
        provider: &Provider,
        mode: ClientMode,
    ) -> Result<Arc<dyn ExchangeClient>, Error>;

    /// Drop cached clients for an exchange, optionally only those built for
    /// one provider.
    fn invalidate(&self, exchange: &ExchangeId, provider: Option<&ProviderId>);

    /// Drop cached clients built for a provider, whatever the exchange.
    fn invalidate_provider(&self, provider: &ProviderId);

    /// Drop every cached client.
    fn invalidate_all(&self);

    /// Drop every cached client and close its connections.
    async fn close_all(&self);
}

/// Client cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Clients currently cached.
    pub cached: usize,
    pub hits: u64,
    pub misses: u64,
    /// Clients removed by expiry or invalidation.
    pub evictions: u64,
}
