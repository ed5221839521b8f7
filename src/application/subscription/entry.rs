//! Registry entry and its read-only diagnostic view.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::orchestrator::FeedTask;
use crate::domain::{
    DataKind, ExchangeId, FeedOperation, MarketType, SubscriptionKey, Timeframe, TransportMethod,
};

/// Bookkeeping for one live feed. Never handed out; callers see
/// [`ActiveSubscription`] copies.
#[derive(Debug)]
pub(crate) struct SubscriptionEntry {
    pub key: SubscriptionKey,
    pub subscriber_count: usize,
    /// Global preference captured when the entry was (re)started.
    pub preferred: TransportMethod,
    /// Transport actually in use.
    pub method: TransportMethod,
    pub is_fallback: bool,
    pub is_active: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub operation: Option<FeedOperation>,
    pub last_error: Option<String>,
    pub task: Option<FeedTask>,
    /// Bumped on every start and stop; stale tasks compare against it.
    pub generation: u64,
    pub created_at: DateTime<Utc>,
}

impl SubscriptionEntry {
    pub fn new(key: SubscriptionKey, preferred: TransportMethod) -> Self {
        Self {
            key,
            subscriber_count: 1,
            preferred,
            method: preferred,
            is_fallback: false,
            is_active: false,
            last_update: None,
            operation: None,
            last_error: None,
            task: None,
            generation: 0,
            created_at: Utc::now(),
        }
    }

    pub fn view(&self) -> ActiveSubscription {
        ActiveSubscription {
            key: self.key.encode(),
            exchange: self.key.exchange().clone(),
            market: self.key.market(),
            symbol: self.key.symbol().to_string(),
            kind: self.key.kind(),
            timeframe: self.key.timeframe().cloned(),
            subscriber_count: self.subscriber_count,
            method: self.method,
            preferred_method: self.preferred,
            is_fallback: self.is_fallback,
            is_active: self.is_active,
            last_update: self.last_update,
            operation: self.operation,
            last_error: self.last_error.clone(),
            created_at: self.created_at,
        }
    }
}

/// Snapshot of one registry entry for diagnostics and UI display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSubscription {
    /// Canonical key encoding.
    pub key: String,
    pub exchange: ExchangeId,
    pub market: MarketType,
    pub symbol: String,
    pub kind: DataKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeframe: Option<Timeframe>,
    pub subscriber_count: usize,
    pub method: TransportMethod,
    pub preferred_method: TransportMethod,
    pub is_fallback: bool,
    pub is_active: bool,
    pub last_update: Option<DateTime<Utc>>,
    /// Client operation the feed runs on, once one has been chosen.
    pub operation: Option<FeedOperation>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}
