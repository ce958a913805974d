//! The existence oracle the account-mirroring tool synchronizes against.
//!
//! Contract: given a source-account ticket id, answer whether an order tagged
//! with it exists as an open position or anywhere in bounded execution
//! history. This one predicate is enough to make the mirror's open/close/
//! modify actions idempotent.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::SqlitePool;

use storage::repositories::OrdersRepository;
use storage::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TicketOracle: Send + Sync {
    async fn ticket_exists(&self, ticket: &str) -> Result<bool, StoreError>;
}

/// Oracle backed by the relational store's execution history.
pub struct StoreTicketOracle {
    pool: SqlitePool,
    history: Duration,
}

impl StoreTicketOracle {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            history: Duration::days(90),
        }
    }

    pub fn with_history_days(mut self, days: i64) -> Self {
        self.history = Duration::days(days);
        self
    }
}

#[async_trait]
impl TicketOracle for StoreTicketOracle {
    async fn ticket_exists(&self, ticket: &str) -> Result<bool, StoreError> {
        let cutoff = Utc::now() - self.history;
        OrdersRepository::ticket_seen_since(&self.pool, ticket, cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::models::{EventKind, FillReport, LifecycleState, SignalEvent, TradeOrder};
    use uuid::Uuid;

    #[tokio::test]
    async fn sees_tickets_within_the_history_window() {
        let path = std::env::temp_dir().join(format!("oracle-{}.db", Uuid::new_v4()));
        let pool = storage::db::connect(path.to_str().unwrap()).await.unwrap();

        let order = TradeOrder {
            oid: "20260807-00099".to_string(),
            event: SignalEvent {
                kind: EventKind::New,
                channel_id: "100".to_string(),
                channel_username: None,
                channel_title: None,
                msg_id: 99,
                revision: 1,
                ts_utc: None,
                sender_id: None,
                text: "buy gold".to_string(),
                ts_ingest: Some(Utc::now()),
            },
            score: 10,
            formatted: None,
            lifecycle: LifecycleState::Dispatched,
            ts_queued: Some(Utc::now()),
            symbol: Some("XAUUSD".to_string()),
            order_type: Some("BUY".to_string()),
            entry_price: None,
            sl: None,
            take_profits: Vec::new(),
            comment: "20260807-00099".to_string(),
        };
        OrdersRepository::upsert(&pool, &order).await.unwrap();
        OrdersRepository::merge_fill(
            &pool,
            &FillReport {
                oid: "20260807-00099".to_string(),
                symbol: None,
                order_type: None,
                entry_price: None,
                sl: None,
                tp: None,
                comment: None,
                ticket: Some("31337".to_string()),
                profit: None,
            },
        )
        .await
        .unwrap();

        let oracle = StoreTicketOracle::new(pool);
        assert!(oracle.ticket_exists("31337").await.unwrap());
        assert!(!oracle.ticket_exists("99999").await.unwrap());
    }
}
