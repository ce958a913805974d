use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

use common::models::{FillReport, LifecycleState, TradeOrder};

use crate::error::StoreError;

pub struct OrdersRepository;

impl OrdersRepository {
    /// Upsert-by-oid. Redelivery of the same logical message lands on the
    /// same row; the store is the sole source of truth for lifecycle state.
    pub async fn upsert(pool: &SqlitePool, order: &TradeOrder) -> Result<(), StoreError> {
        sqlx::query(
            r#"
                INSERT INTO trade_orders (
                    oid, event_kind, channel_id, channel_username, channel_title,
                    msg_id, revision, sender_id, raw_text, ts_utc, ts_ingest,
                    score, formatted, lifecycle,
                    symbol, order_type, entry_price, sl, tp1, tp2, tp3, tp4, comment
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(oid) DO UPDATE SET
                    event_kind       = excluded.event_kind,
                    channel_id       = excluded.channel_id,
                    channel_username = excluded.channel_username,
                    channel_title    = excluded.channel_title,
                    msg_id           = excluded.msg_id,
                    revision         = excluded.revision,
                    sender_id        = excluded.sender_id,
                    raw_text         = excluded.raw_text,
                    ts_utc           = excluded.ts_utc,
                    ts_ingest        = excluded.ts_ingest,
                    score            = excluded.score,
                    formatted        = excluded.formatted,
                    lifecycle        = excluded.lifecycle,
                    symbol           = excluded.symbol,
                    order_type       = excluded.order_type,
                    entry_price      = excluded.entry_price,
                    sl               = excluded.sl,
                    tp1              = excluded.tp1,
                    tp2              = excluded.tp2,
                    tp3              = excluded.tp3,
                    tp4              = excluded.tp4,
                    comment          = excluded.comment
            "#,
        )
        .bind(&order.oid)
        .bind(order.event.kind.as_str())
        .bind(&order.event.channel_id)
        .bind(&order.event.channel_username)
        .bind(&order.event.channel_title)
        .bind(order.event.msg_id)
        .bind(order.event.revision)
        .bind(&order.event.sender_id)
        .bind(&order.event.text)
        .bind(order.event.ts_utc.map(|t| t.to_rfc3339()))
        .bind(order.event.ts_ingest.map(|t| t.to_rfc3339()))
        .bind(order.score as i64)
        .bind(&order.formatted)
        .bind(order.lifecycle.code())
        .bind(&order.symbol)
        .bind(&order.order_type)
        .bind(order.entry_price)
        .bind(order.sl)
        .bind(order.tp(0))
        .bind(order.tp(1))
        .bind(order.tp(2))
        .bind(order.tp(3))
        .bind(&order.comment)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_lifecycle(
        pool: &SqlitePool,
        oid: &str,
        state: LifecycleState,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE trade_orders SET lifecycle = ? WHERE oid = ?")
            .bind(state.code())
            .bind(oid)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Records the moment the queue row was written.
    pub async fn mark_queued(
        pool: &SqlitePool,
        oid: &str,
        queued_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE trade_orders SET ts_queued = ?, lifecycle = ? WHERE oid = ?")
            .bind(queued_at.to_rfc3339())
            .bind(LifecycleState::Queued.code())
            .bind(oid)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Merges a terminal acknowledgement into the row. Only operational
    /// columns are touched; raw text and event timestamps stay as ingested.
    pub async fn merge_fill(pool: &SqlitePool, fill: &FillReport) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
                UPDATE trade_orders SET
                    symbol      = COALESCE(?, symbol),
                    order_type  = COALESCE(?, order_type),
                    entry_price = COALESCE(?, entry_price),
                    sl          = COALESCE(?, sl),
                    tp1         = COALESCE(?, tp1),
                    comment     = COALESCE(?, comment),
                    ticket      = COALESCE(?, ticket),
                    profit      = COALESCE(?, profit)
                WHERE oid = ?
            "#,
        )
        .bind(&fill.symbol)
        .bind(&fill.order_type)
        .bind(fill.entry_price)
        .bind(fill.sl)
        .bind(fill.tp)
        .bind(&fill.comment)
        .bind(&fill.ticket)
        .bind(fill.profit)
        .bind(&fill.oid)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn exists(pool: &SqlitePool, oid: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM trade_orders WHERE oid = ? LIMIT 1")
            .bind(oid)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn lifecycle_of(
        pool: &SqlitePool,
        oid: &str,
    ) -> Result<Option<LifecycleState>, StoreError> {
        let row = sqlx::query("SELECT lifecycle FROM trade_orders WHERE oid = ?")
            .bind(oid)
            .fetch_optional(pool)
            .await?;
        Ok(row.and_then(|r| LifecycleState::from_code(r.get::<i64, _>(0))))
    }

    pub async fn count(pool: &SqlitePool) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) FROM trade_orders")
            .fetch_one(pool)
            .await?;
        Ok(row.get::<i64, _>(0))
    }

    /// Existence oracle for the account-mirroring tool: has an order tagged
    /// with this terminal ticket been seen since `cutoff`?
    pub async fn ticket_seen_since(
        pool: &SqlitePool,
        ticket: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
                SELECT 1 FROM trade_orders
                WHERE ticket = ? AND (ts_queued IS NULL OR ts_queued >= ?)
                LIMIT 1
            "#,
        )
        .bind(ticket)
        .bind(cutoff.to_rfc3339())
        .fetch_optional(pool)
        .await?;
        Ok(row.is_some())
    }
}
