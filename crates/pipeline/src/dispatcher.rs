//! Classification plus the compensating dual-sink commit.
//!
//! Per event: classify, derive the oid, then either run the
//! queue-append → store-commit saga (score 10) or record an audit-only
//! rejection row (anything else). Every inbound message ends up as exactly
//! one store row, noise included.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePool;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use classifier::{format_signal, Classifier};
use common::models::{ExtractedSignal, LifecycleState, QueueRow, SignalEvent, TradeOrder};
use common::retry::{self, Backoff};
use storage::repositories::OrdersRepository;
use storage::{ExecutionQueue, StoreError};

use crate::error::PipelineError;
use crate::oid;
use crate::saga::{self, SagaStep};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Dispatched { oid: String },
    Rejected { oid: String },
    FailedQueueWrite { oid: String },
    FailedStoreWrite { oid: String },
}

pub struct Dispatcher {
    classifier: Arc<Classifier>,
    pool: SqlitePool,
    queue: Arc<ExecutionQueue>,
    backoff: Backoff,
    notify_tx: Option<broadcast::Sender<String>>,
}

impl Dispatcher {
    pub fn new(pool: SqlitePool, queue: Arc<ExecutionQueue>, classifier: Arc<Classifier>) -> Self {
        Self {
            classifier,
            pool,
            queue,
            backoff: Backoff::default(),
            notify_tx: None,
        }
    }

    /// Re-publish formatted actionable signals (a downstream channel mirror).
    pub fn with_notifier(mut self, tx: broadcast::Sender<String>) -> Self {
        self.notify_tx = Some(tx);
        self
    }

    pub async fn process(&self, event: &SignalEvent) -> Result<Outcome, PipelineError> {
        let signals = self.classifier.classify(&event.text);
        let best = best_signal(&signals);
        let oid = oid::derive_oid(event)
            .ok_or_else(|| PipelineError::Malformed("event carries no timestamp".to_string()))?;

        let mut order = build_order(oid.clone(), event, best);

        if !best.is_actionable() {
            order.lifecycle = LifecycleState::RejectedLowConfidence;
            self.store_with_retry(&order).await?;
            info!("rejected low-confidence message as {}", oid);
            return Ok(Outcome::Rejected { oid });
        }

        let queued_at = Utc::now();
        order.lifecycle = LifecycleState::Queued;
        order.ts_queued = Some(queued_at);
        let row = QueueRow::from_order(&order, queued_at);

        let steps: Vec<Box<dyn SagaStep>> = vec![
            Box::new(QueueAppendStep {
                queue: self.queue.clone(),
                row,
            }),
            Box::new(StoreCommitStep {
                pool: self.pool.clone(),
                order: order.clone(),
                backoff: self.backoff,
            }),
        ];

        match saga::run(&steps).await {
            Ok(()) => {
                retry::with_backoff(self.backoff, StoreError::is_transient, || async {
                    OrdersRepository::set_lifecycle(&self.pool, &oid, LifecycleState::Dispatched)
                        .await
                })
                .await
                .map_err(|source| PipelineError::StoreExhausted {
                    oid: oid.clone(),
                    source,
                })?;

                if let (Some(tx), Some(text)) = (&self.notify_tx, &order.formatted) {
                    // nobody listening is fine; the send only fails then
                    let _ = tx.send(text.clone());
                }
                info!("dispatched {} to both sinks", oid);
                Ok(Outcome::Dispatched { oid })
            }
            Err(failure) if failure.failed_step == QUEUE_STEP => {
                warn!("queue append failed for {}: {}", oid, failure.error);
                order.lifecycle = LifecycleState::FailedQueueWrite;
                order.ts_queued = None;
                self.store_with_retry(&order).await?;
                Ok(Outcome::FailedQueueWrite { oid })
            }
            Err(failure) => {
                // store commit failed; the queue row was already compensated
                if !failure.failed_compensations.is_empty() {
                    return Err(PipelineError::SinkDivergence {
                        oid,
                        detail: "queue row could not be removed after store failure".to_string(),
                    });
                }
                error!("store commit failed for {}: {}", oid, failure.error);
                order.lifecycle = LifecycleState::FailedStoreWrite;
                order.ts_queued = None;
                self.store_with_retry(&order).await?;
                Ok(Outcome::FailedStoreWrite { oid })
            }
        }
    }

    async fn store_with_retry(&self, order: &TradeOrder) -> Result<(), PipelineError> {
        retry::with_backoff(self.backoff, StoreError::is_transient, || async {
            OrdersRepository::upsert(&self.pool, order).await
        })
        .await
        .map_err(|source| PipelineError::StoreExhausted {
            oid: order.oid.clone(),
            source,
        })
    }
}

/// Prefer the first actionable signal; otherwise the first one (there is
/// always at least one, noise included).
fn best_signal(signals: &[ExtractedSignal]) -> &ExtractedSignal {
    signals
        .iter()
        .find(|s| s.is_actionable())
        .unwrap_or(&signals[0])
}

fn build_order(oid: String, event: &SignalEvent, signal: &ExtractedSignal) -> TradeOrder {
    let formatted = format_signal(signal).or_else(|| {
        if signal.notes.is_empty() {
            None
        } else {
            Some(signal.notes.join("; "))
        }
    });
    TradeOrder {
        comment: oid.clone(),
        oid,
        event: event.clone(),
        score: signal.score,
        formatted,
        lifecycle: LifecycleState::Pending,
        ts_queued: None,
        symbol: signal.asset.clone(),
        order_type: signal.action.map(|a| a.queue_label().to_string()),
        entry_price: signal.resolved_entry,
        sl: signal.sl,
        take_profits: signal.take_profits.clone(),
    }
}

const QUEUE_STEP: &str = "queue-append";
const STORE_STEP: &str = "store-commit";

struct QueueAppendStep {
    queue: Arc<ExecutionQueue>,
    row: QueueRow,
}

#[async_trait]
impl SagaStep for QueueAppendStep {
    fn name(&self) -> &'static str {
        QUEUE_STEP
    }

    async fn apply(&self) -> Result<(), PipelineError> {
        self.queue.append_if_absent(&self.row)?;
        Ok(())
    }

    async fn compensate(&self) -> Result<(), PipelineError> {
        self.queue.remove(&self.row.oid)?;
        Ok(())
    }
}

struct StoreCommitStep {
    pool: SqlitePool,
    order: TradeOrder,
    backoff: Backoff,
}

#[async_trait]
impl SagaStep for StoreCommitStep {
    fn name(&self) -> &'static str {
        STORE_STEP
    }

    async fn apply(&self) -> Result<(), PipelineError> {
        retry::with_backoff(self.backoff, StoreError::is_transient, || async {
            OrdersRepository::upsert(&self.pool, &self.order).await
        })
        .await
        .map_err(|source| PipelineError::StoreExhausted {
            oid: self.order.oid.clone(),
            source,
        })
    }

    async fn compensate(&self) -> Result<(), PipelineError> {
        // nothing to undo: the upsert either fully landed or did not
        Ok(())
    }
}
