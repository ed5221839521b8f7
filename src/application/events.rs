//! Chart event hub: per-key listener lists for candle updates.
//!
//! Dispatch is always deferred. `emit` only snapshots the listeners and
//! queues the event; a single dispatcher task on the current tokio runtime
//! delivers queued events in order, so a listener never runs inside the
//! merge that produced its event. A panicking listener is caught and logged
//! and the remaining listeners still run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::domain::{ChartUpdate, DataKind, ListenerId, SubscriptionKey};
use crate::error::FeedError;
use crate::port::ChartListener;

type Listeners = Vec<(ListenerId, Arc<dyn ChartListener>)>;

struct Dispatch {
    listeners: Listeners,
    update: ChartUpdate,
}

/// Listener table plus the deferred dispatcher.
#[derive(Default)]
pub struct ChartEventHub {
    listeners: RwLock<HashMap<String, Listeners>>,
    dispatcher: Mutex<Option<mpsc::UnboundedSender<Dispatch>>>,
}

impl ChartEventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for a candle key.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidKey`] for trade and order-book keys;
    /// only candle merges produce events.
    pub fn add_listener(
        &self,
        key: &SubscriptionKey,
        listener: Arc<dyn ChartListener>,
    ) -> Result<ListenerId, FeedError> {
        if key.kind() != DataKind::Candles {
            return Err(FeedError::InvalidKey {
                reason: format!("chart listeners need a candle key, got '{key}'"),
            });
        }
        let id = ListenerId::new();
        self.listeners
            .write()
            .entry(key.encode())
            .or_default()
            .push((id, listener));
        debug!(key = %key, listener = %id, "Chart listener added");
        Ok(id)
    }

    /// Remove a listener; returns whether it was registered.
    pub fn remove_listener(&self, key: &SubscriptionKey, id: ListenerId) -> bool {
        let encoded = key.encode();
        let mut listeners = self.listeners.write();
        let Some(list) = listeners.get_mut(&encoded) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            listeners.remove(&encoded);
        }
        removed
    }

    #[must_use]
    pub fn listener_count(&self, key: &SubscriptionKey) -> usize {
        self.listeners.read().get(&key.encode()).map_or(0, Vec::len)
    }

    /// Queue an update for the listeners currently attached to `key`.
    ///
    /// Listeners added after this call do not see the update.
    pub fn emit(&self, key: &SubscriptionKey, update: ChartUpdate) {
        let listeners = match self.listeners.read().get(&key.encode()) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => return,
        };

        let mut dispatcher = self.dispatcher.lock();
        let sender = match dispatcher.as_ref().filter(|tx| !tx.is_closed()) {
            Some(tx) => tx.clone(),
            None => match spawn_dispatcher() {
                Some(tx) => {
                    *dispatcher = Some(tx.clone());
                    tx
                }
                None => {
                    warn!(key = %key, "No async runtime; chart update dropped");
                    return;
                }
            },
        };
        drop(dispatcher);

        if sender.send(Dispatch { listeners, update }).is_err() {
            warn!(key = %key, "Chart dispatcher gone; update dropped");
        }
    }
}

impl std::fmt::Debug for ChartEventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartEventHub")
            .field("keys", &self.listeners.read().len())
            .finish_non_exhaustive()
    }
}

fn spawn_dispatcher() -> Option<mpsc::UnboundedSender<Dispatch>> {
    let handle = Handle::try_current().ok()?;
    let (tx, mut rx) = mpsc::unbounded_channel::<Dispatch>();
    handle.spawn(async move {
        while let Some(dispatch) = rx.recv().await {
            deliver(&dispatch);
        }
    });
    Some(tx)
}

fn deliver(dispatch: &Dispatch) {
    for (id, listener) in &dispatch.listeners {
        let outcome = catch_unwind(AssertUnwindSafe(|| listener.on_update(&dispatch.update)));
        if outcome.is_err() {
            error!(
                listener = %id,
                symbol = %dispatch.update.symbol,
                kind = dispatch.update.kind.as_str(),
                "Chart listener panicked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Utc;

    use super::*;
    use crate::domain::{MarketType, Timeframe, UpdateKind};

    fn key() -> SubscriptionKey {
        SubscriptionKey::candles("binance", MarketType::Spot, "BTC/USDT", Timeframe::one_minute())
            .unwrap()
    }

    fn update(kind: UpdateKind) -> ChartUpdate {
        ChartUpdate {
            kind,
            exchange: "binance".into(),
            market: MarketType::Spot,
            symbol: "BTC/USDT".into(),
            timeframe: Timeframe::one_minute(),
            candles: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn rejects_non_candle_keys() {
        let hub = ChartEventHub::new();
        let trades = SubscriptionKey::trades("binance", MarketType::Spot, "BTC/USDT").unwrap();
        assert!(hub.add_listener(&trades, Arc::new(|_: &ChartUpdate| {})).is_err());
    }

    #[tokio::test]
    async fn dispatch_is_deferred_and_ordered() {
        let hub = ChartEventHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.add_listener(
            &key(),
            Arc::new(move |u: &ChartUpdate| {
                let _ = tx.send(u.kind);
            }),
        )
        .unwrap();

        hub.emit(&key(), update(UpdateKind::InitialLoad));
        hub.emit(&key(), update(UpdateKind::NewCandles));
        assert!(rx.try_recv().is_err());

        assert_eq!(rx.recv().await, Some(UpdateKind::InitialLoad));
        assert_eq!(rx.recv().await, Some(UpdateKind::NewCandles));
    }

    #[tokio::test]
    async fn panicking_listener_does_not_block_others() {
        let hub = ChartEventHub::new();
        let calls = Arc::new(AtomicU32::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        hub.add_listener(&key(), Arc::new(|_: &ChartUpdate| panic!("listener bug")))
            .unwrap();
        let counter = calls.clone();
        hub.add_listener(
            &key(),
            Arc::new(move |_: &ChartUpdate| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(());
            }),
        )
        .unwrap();

        hub.emit(&key(), update(UpdateKind::NewCandles));
        rx.recv().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn removed_listener_is_not_called() {
        let hub = ChartEventHub::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let id = hub
            .add_listener(
                &key(),
                Arc::new(move |_: &ChartUpdate| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert!(hub.remove_listener(&key(), id));
        assert!(!hub.remove_listener(&key(), id));
        assert_eq!(hub.listener_count(&key()), 0);

        hub.emit(&key(), update(UpdateKind::NewCandles));
        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn emit_without_runtime_drops_update() {
        let hub = ChartEventHub::new();
        hub.add_listener(&key(), Arc::new(|_: &ChartUpdate| {})).unwrap();
        hub.emit(&key(), update(UpdateKind::InitialLoad));
    }
}
