//! Fake [`ExchangeClient`] and [`ClientFactory`] implementations.
//!
//! - [`ScriptedClient`] - Declared capabilities, canned fetch results and
//!   channel-fed push payloads. Best for: transport selection, fallback,
//!   merge behaviour.
//! - [`ScriptedFactory`] - Hands out scripted clients and counts
//!   constructions. Best for: pool caching and TTL tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::{
    Candle, ClientMode, DataKind, ExchangeId, MarketType, OrderBook, Provider, Timeframe, Trade,
};
use crate::error::{Error, FeedError, Result};
use crate::port::{Capabilities, ClientFactory, ExchangeClient};

// ---------------------------------------------------------------------------
// ScriptedClient
// ---------------------------------------------------------------------------

/// One scripted push delivery.
#[derive(Debug, Clone)]
enum Pushed<T> {
    Data(T),
    Error(String),
}

/// Unbounded channel whose receiver waits forever when empty.
struct PushChannel<T> {
    tx: mpsc::UnboundedSender<Pushed<T>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Pushed<T>>>,
}

impl<T> PushChannel<T> {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    fn send(&self, item: Pushed<T>) {
        let _ = self.tx.send(item);
    }

    async fn next(&self) -> Result<T> {
        match self.rx.lock().await.recv().await {
            Some(Pushed::Data(data)) => Ok(data),
            Some(Pushed::Error(reason)) => Err(Error::transport(reason)),
            None => Err(Error::transport("push channel closed")),
        }
    }
}

/// A fake connectivity client.
///
/// Fetches return whatever was last set with the `with_*`/`set_*` methods.
/// Watches block until a payload is pushed with `push_*`; a pushed error
/// ends that watch call with a transport error.
pub struct ScriptedClient {
    exchange: ExchangeId,
    capabilities: Capabilities,
    candles: Mutex<Vec<Candle>>,
    trades: Mutex<Vec<Trade>>,
    book: Mutex<Option<OrderBook>>,
    fetch_failures: Mutex<VecDeque<String>>,
    load_failure: Mutex<Option<String>>,
    candle_push: PushChannel<Vec<Candle>>,
    trade_push: PushChannel<Vec<Trade>>,
    book_push: PushChannel<OrderBook>,
    fetch_count: AtomicU32,
    watch_count: AtomicU32,
    load_count: AtomicU32,
    close_count: AtomicU32,
    last_since: Mutex<Option<i64>>,
}

impl ScriptedClient {
    /// A client declaring every capability and returning empty data.
    pub fn new(exchange: impl Into<ExchangeId>) -> Self {
        Self {
            exchange: exchange.into(),
            capabilities: Capabilities::all(),
            candles: Mutex::new(Vec::new()),
            trades: Mutex::new(Vec::new()),
            book: Mutex::new(None),
            fetch_failures: Mutex::new(VecDeque::new()),
            load_failure: Mutex::new(None),
            candle_push: PushChannel::new(),
            trade_push: PushChannel::new(),
            book_push: PushChannel::new(),
            fetch_count: AtomicU32::new(0),
            watch_count: AtomicU32::new(0),
            load_count: AtomicU32::new(0),
            close_count: AtomicU32::new(0),
            last_since: Mutex::new(None),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_candles(self, candles: Vec<Candle>) -> Self {
        self.set_candles(candles);
        self
    }

    pub fn with_trades(self, trades: Vec<Trade>) -> Self {
        self.set_trades(trades);
        self
    }

    pub fn with_order_book(self, book: OrderBook) -> Self {
        self.set_order_book(book);
        self
    }

    /// Make `load_markets` fail.
    pub fn with_load_failure(self, reason: &str) -> Self {
        *self.load_failure.lock() = Some(reason.to_string());
        self
    }

    pub fn set_candles(&self, candles: Vec<Candle>) {
        *self.candles.lock() = candles;
    }

    pub fn set_trades(&self, trades: Vec<Trade>) {
        *self.trades.lock() = trades;
    }

    pub fn set_order_book(&self, book: OrderBook) {
        *self.book.lock() = Some(book);
    }

    /// Fail the next fetch call, whatever its kind.
    pub fn fail_next_fetch(&self, reason: &str) {
        self.fetch_failures.lock().push_back(reason.to_string());
    }

    pub fn push_candles(&self, candles: Vec<Candle>) {
        self.candle_push.send(Pushed::Data(candles));
    }

    pub fn push_trades(&self, trades: Vec<Trade>) {
        self.trade_push.send(Pushed::Data(trades));
    }

    pub fn push_order_book(&self, book: OrderBook) {
        self.book_push.send(Pushed::Data(book));
    }

    /// Make the pending (or next) watch call for `kind` fail.
    pub fn push_error(&self, kind: DataKind, reason: &str) {
        let reason = reason.to_string();
        match kind {
            DataKind::Candles => self.candle_push.send(Pushed::Error(reason)),
            DataKind::Trades => self.trade_push.send(Pushed::Error(reason)),
            DataKind::OrderBook => self.book_push.send(Pushed::Error(reason)),
        }
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub fn watch_count(&self) -> u32 {
        self.watch_count.load(Ordering::SeqCst)
    }

    pub fn load_count(&self) -> u32 {
        self.load_count.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> u32 {
        self.close_count.load(Ordering::SeqCst)
    }

    /// `since` passed to the most recent `fetch_trades`.
    pub fn last_trade_since(&self) -> Option<i64> {
        *self.last_since.lock()
    }

    fn begin_fetch(&self) -> Result<()> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        match self.fetch_failures.lock().pop_front() {
            Some(reason) => Err(Error::transport(reason)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExchangeClient for ScriptedClient {
    fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn load_markets(&self) -> Result<()> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        match self.load_failure.lock().clone() {
            Some(reason) => Err(Error::transport(reason)),
            None => Ok(()),
        }
    }

    async fn fetch_ohlcv(
        &self,
        _market: MarketType,
        _symbol: &str,
        _timeframe: &Timeframe,
        limit: Option<usize>,
    ) -> Result<Vec<Candle>> {
        self.begin_fetch()?;
        let candles = self.candles.lock().clone();
        let skip = limit.map_or(0, |l| candles.len().saturating_sub(l));
        Ok(candles.into_iter().skip(skip).collect())
    }

    async fn fetch_trades(
        &self,
        _market: MarketType,
        _symbol: &str,
        since: Option<i64>,
        _limit: Option<usize>,
    ) -> Result<Vec<Trade>> {
        self.begin_fetch()?;
        *self.last_since.lock() = since;
        let trades = self.trades.lock().clone();
        Ok(trades
            .into_iter()
            .filter(|t| since.map_or(true, |s| t.timestamp >= s))
            .collect())
    }

    async fn fetch_order_book(
        &self,
        _market: MarketType,
        symbol: &str,
        _depth: Option<usize>,
    ) -> Result<OrderBook> {
        self.begin_fetch()?;
        self.book.lock().clone().ok_or_else(|| {
            Error::transport(format!("no order book scripted for {symbol}"))
        })
    }

    async fn watch_ohlcv(
        &self,
        _market: MarketType,
        _symbol: &str,
        _timeframe: &Timeframe,
    ) -> Result<Vec<Candle>> {
        self.watch_count.fetch_add(1, Ordering::SeqCst);
        self.candle_push.next().await
    }

    async fn watch_trades(&self, _market: MarketType, _symbol: &str) -> Result<Vec<Trade>> {
        self.watch_count.fetch_add(1, Ordering::SeqCst);
        self.trade_push.next().await
    }

    async fn watch_order_book(&self, _market: MarketType, _symbol: &str) -> Result<OrderBook> {
        self.watch_count.fetch_add(1, Ordering::SeqCst);
        self.book_push.next().await
    }

    async fn watch_order_book_for_symbols(
        &self,
        _market: MarketType,
        _symbols: &[String],
    ) -> Result<OrderBook> {
        self.watch_count.fetch_add(1, Ordering::SeqCst);
        self.book_push.next().await
    }

    async fn close(&self) -> Result<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedFactory
// ---------------------------------------------------------------------------

/// A factory handing out [`ScriptedClient`]s.
///
/// Clients registered with [`serve`](Self::serve) are returned for their
/// exchange (and mode, if given); anything else gets a fresh default
/// client per construction.
#[derive(Default)]
pub struct ScriptedFactory {
    served: Mutex<HashMap<(ExchangeId, Option<ClientMode>), Arc<ScriptedClient>>>,
    failures: Mutex<VecDeque<String>>,
    created: Mutex<Vec<Arc<ScriptedClient>>>,
    create_count: AtomicU32,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `client` for every construction on `exchange`.
    pub fn serve(&self, exchange: &str, client: Arc<ScriptedClient>) {
        self.served
            .lock()
            .insert((ExchangeId::new(exchange), None), client);
    }

    /// Serve `client` for constructions on `exchange` in one mode only.
    pub fn serve_mode(&self, exchange: &str, mode: ClientMode, client: Arc<ScriptedClient>) {
        self.served
            .lock()
            .insert((ExchangeId::new(exchange), Some(mode)), client);
    }

    /// Fail the next construction as if the library were missing.
    pub fn fail_next(&self, reason: &str) {
        self.failures.lock().push_back(reason.to_string());
    }

    pub fn create_count(&self) -> u32 {
        self.create_count.load(Ordering::SeqCst)
    }

    /// Most recently constructed client.
    pub fn last_client(&self) -> Option<Arc<ScriptedClient>> {
        self.created.lock().last().cloned()
    }
}

#[async_trait]
impl ClientFactory for ScriptedFactory {
    async fn create(
        &self,
        exchange: &ExchangeId,
        _provider: &Provider,
        mode: ClientMode,
    ) -> Result<Arc<dyn ExchangeClient>> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.failures.lock().pop_front() {
            return Err(FeedError::ClientUnavailable {
                exchange: exchange.to_string(),
                reason,
            }
            .into());
        }

        let client = {
            let served = self.served.lock();
            served
                .get(&(exchange.clone(), Some(mode)))
                .or_else(|| served.get(&(exchange.clone(), None)))
                .cloned()
        }
        .unwrap_or_else(|| Arc::new(ScriptedClient::new(exchange.clone())));

        self.created.lock().push(Arc::clone(&client));
        Ok(client)
    }
}
