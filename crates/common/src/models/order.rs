use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::SignalEvent;

/// Dispatch status of a TradeOrder across the queue/store commit phases.
/// Stored as an integer column; 6 is kept for rejected so existing dashboards
/// keep working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    Pending,
    Queued,
    Dispatched,
    FailedQueueWrite,
    FailedStoreWrite,
    RejectedLowConfidence,
}

impl LifecycleState {
    pub fn code(&self) -> i64 {
        match self {
            LifecycleState::Pending => 0,
            LifecycleState::Queued => 1,
            LifecycleState::Dispatched => 2,
            LifecycleState::FailedQueueWrite => 3,
            LifecycleState::FailedStoreWrite => 4,
            LifecycleState::RejectedLowConfidence => 6,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(LifecycleState::Pending),
            1 => Some(LifecycleState::Queued),
            2 => Some(LifecycleState::Dispatched),
            3 => Some(LifecycleState::FailedQueueWrite),
            4 => Some(LifecycleState::FailedStoreWrite),
            6 => Some(LifecycleState::RejectedLowConfidence),
            _ => None,
        }
    }
}

/// One dispatch record, keyed by oid. Created and transitioned exclusively by
/// the pipeline; the terminal later fills operational fields via FillReport.
/// Rows are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOrder {
    pub oid: String,
    pub event: SignalEvent,
    pub score: u8,
    /// Formatted publishing template for actionable signals, rejection notes
    /// otherwise.
    pub formatted: Option<String>,
    pub lifecycle: LifecycleState,
    pub ts_queued: Option<DateTime<Utc>>,
    pub symbol: Option<String>,
    pub order_type: Option<String>,
    pub entry_price: Option<f64>,
    pub sl: Option<f64>,
    pub take_profits: Vec<f64>,
    pub comment: String,
}

impl TradeOrder {
    /// Take-profit by slot (0-based); the queue row carries at most four.
    pub fn tp(&self, slot: usize) -> Option<f64> {
        self.take_profits.get(slot).copied()
    }
}

/// One record of the delimited execution queue the terminal drains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueRow {
    pub oid: String,
    pub queued_at: String,
    pub symbol: String,
    pub order_type: String,
    pub entry_price: Option<f64>,
    pub sl: Option<f64>,
    pub tp1: Option<f64>,
    pub tp2: Option<f64>,
    pub tp3: Option<f64>,
    pub tp4: Option<f64>,
    pub comment: String,
    pub state: i64,
}

impl QueueRow {
    pub fn from_order(order: &TradeOrder, queued_at: DateTime<Utc>) -> Self {
        Self {
            oid: order.oid.clone(),
            queued_at: queued_at.to_rfc3339(),
            symbol: order.symbol.clone().unwrap_or_default(),
            order_type: order.order_type.clone().unwrap_or_default(),
            entry_price: order.entry_price,
            sl: order.sl,
            tp1: order.tp(0),
            tp2: order.tp(1),
            tp3: order.tp(2),
            tp4: order.tp(3),
            comment: order.comment.clone(),
            state: order.lifecycle.code(),
        }
    }
}

/// Asynchronous fill acknowledgement written by the terminal, keyed by oid.
/// Only operational columns are merged back into the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillReport {
    pub oid: String,
    pub symbol: Option<String>,
    pub order_type: Option<String>,
    pub entry_price: Option<f64>,
    pub sl: Option<f64>,
    pub tp: Option<f64>,
    pub comment: Option<String>,
    pub ticket: Option<String>,
    pub profit: Option<f64>,
}
