//! Merges terminal fill acknowledgements back into the store.
//!
//! The terminal appends one CSV row per executed oid. Each sweep merges every
//! readable row (operational columns only) and rewrites the file without the
//! consumed ones — read-then-delete by oid, so a crash between merge and
//! rewrite only means a harmless re-merge.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};
use common::models::FillReport;
use common::retry::{self, Backoff};
use storage::repositories::OrdersRepository;
use storage::{QueueError, StoreError};

use crate::error::PipelineError;

pub struct FillService {
    id: Uuid,
    pool: SqlitePool,
    ack_path: PathBuf,
    poll_interval: Duration,
    backoff: Backoff,
    shutdown: watch::Receiver<bool>,
}

impl FillService {
    pub fn new(
        pool: SqlitePool,
        ack_path: &Path,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pool,
            ack_path: ack_path.to_path_buf(),
            poll_interval,
            backoff: Backoff::default(),
            shutdown,
        }
    }

    fn read_reports(&self) -> Result<Vec<FillReport>, QueueError> {
        if !self.ack_path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.ack_path)?;
        let mut reports = Vec::new();
        for record in reader.deserialize() {
            match record {
                Ok(report) => reports.push(report),
                Err(e) => warn!("skipping unreadable fill row: {}", e),
            }
        }
        Ok(reports)
    }

    fn rewrite_pending(&self, pending: &[FillReport]) -> Result<(), QueueError> {
        if pending.is_empty() {
            std::fs::remove_file(&self.ack_path)?;
            return Ok(());
        }
        let mut writer = csv::Writer::from_path(&self.ack_path)?;
        for report in pending {
            writer.serialize(report)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// One sweep over the ack file. Returns how many reports were merged.
    pub async fn sweep(&self) -> Result<usize, PipelineError> {
        let reports = self.read_reports()?;
        if reports.is_empty() {
            return Ok(0);
        }

        let mut pending = Vec::new();
        let mut merged = 0usize;
        for report in reports {
            let applied =
                retry::with_backoff(self.backoff, StoreError::is_transient, || async {
                    OrdersRepository::merge_fill(&self.pool, &report).await
                })
                .await
                .map_err(|source| PipelineError::StoreExhausted {
                    oid: report.oid.clone(),
                    source,
                })?;
            if applied {
                debug!("merged fill for {}", report.oid);
                merged += 1;
            } else {
                // the terminal acked an oid we have not stored yet; retry later
                warn!("fill for unknown oid {}, keeping for next sweep", report.oid);
                pending.push(report);
            }
        }

        self.rewrite_pending(&pending)?;
        Ok(merged)
    }
}

#[async_trait]
impl Actor for FillService {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::FillActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let heartbeat_handle = self.spawn_heartbeat(supervisor_tx.clone());
        info!(
            "watching {} for terminal acknowledgements",
            self.ack_path.display()
        );

        loop {
            if *self.shutdown.borrow() {
                info!("fill service stopping on shutdown signal");
                break;
            }
            match self.sweep().await {
                Ok(0) => {}
                Ok(n) => info!("merged {} fill report(s)", n),
                Err(e) => {
                    supervisor_tx
                        .send(ControlMessage::Error(self.id, format!("sweep failed: {}", e)))
                        .await?;
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        heartbeat_handle.abort();
        supervisor_tx
            .send(ControlMessage::Shutdown(self.id))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::models::{EventKind, LifecycleState, SignalEvent, TradeOrder};

    async fn setup() -> (FillService, SqlitePool, PathBuf) {
        let base = std::env::temp_dir().join(format!("fill-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&base).unwrap();
        let pool = storage::db::connect(base.join("store.db").to_str().unwrap())
            .await
            .unwrap();
        let ack_path = base.join("fills.csv");
        let (_tx, rx) = watch::channel(false);
        let service = FillService::new(pool.clone(), &ack_path, Duration::from_secs(3), rx);
        (service, pool, ack_path)
    }

    fn stored_order(oid: &str) -> TradeOrder {
        TradeOrder {
            oid: oid.to_string(),
            event: SignalEvent {
                kind: EventKind::New,
                channel_id: "100".to_string(),
                channel_username: None,
                channel_title: None,
                msg_id: 55,
                revision: 1,
                ts_utc: None,
                sender_id: None,
                text: "XAUUSD BUY @3814.5 SL 3809.5 TP 3820".to_string(),
                ts_ingest: Some(Utc::now()),
            },
            score: 10,
            formatted: None,
            lifecycle: LifecycleState::Dispatched,
            ts_queued: Some(Utc::now()),
            symbol: Some("XAUUSD".to_string()),
            order_type: Some("BUY".to_string()),
            entry_price: Some(3814.5),
            sl: Some(3809.5),
            take_profits: vec![3820.0],
            comment: oid.to_string(),
        }
    }

    fn write_fill(path: &Path, report: &FillReport) {
        let mut writer = csv::Writer::from_path(path).unwrap();
        writer.serialize(report).unwrap();
        writer.flush().unwrap();
    }

    #[tokio::test]
    async fn merged_fills_are_consumed_from_the_file() {
        let (service, pool, ack_path) = setup().await;
        OrdersRepository::upsert(&pool, &stored_order("20260807-00055"))
            .await
            .unwrap();
        write_fill(
            &ack_path,
            &FillReport {
                oid: "20260807-00055".to_string(),
                symbol: None,
                order_type: None,
                entry_price: Some(3815.0),
                sl: None,
                tp: None,
                comment: None,
                ticket: Some("42".to_string()),
                profit: None,
            },
        );

        assert_eq!(service.sweep().await.unwrap(), 1);
        assert!(!ack_path.exists(), "consumed file should be removed");
        // second sweep is a no-op
        assert_eq!(service.sweep().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_oids_stay_pending() {
        let (service, _pool, ack_path) = setup().await;
        write_fill(
            &ack_path,
            &FillReport {
                oid: "not-yet-stored".to_string(),
                symbol: None,
                order_type: None,
                entry_price: None,
                sl: None,
                tp: None,
                comment: None,
                ticket: None,
                profit: None,
            },
        );

        assert_eq!(service.sweep().await.unwrap(), 0);
        assert!(ack_path.exists(), "unknown fills are kept for the next sweep");
    }
}
