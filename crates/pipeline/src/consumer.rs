//! The stream-consumer actor: one unit of work at a time, ack only after the
//! processing branch fully completes.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};

use crate::dispatcher::Dispatcher;
use crate::error::PipelineError;
use crate::ingest;
use crate::stream::{EventSource, RedisEventSource, StreamSettings};

pub struct ParserService {
    id: Uuid,
    settings: StreamSettings,
    dispatcher: Arc<Dispatcher>,
    shutdown: watch::Receiver<bool>,
}

impl ParserService {
    pub fn new(
        settings: StreamSettings,
        dispatcher: Arc<Dispatcher>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            settings,
            dispatcher,
            shutdown,
        }
    }

    /// The consumer loop, generic over the source so tests can script one.
    ///
    /// Ack discipline: a clean outcome (dispatched, rejected, flagged failure)
    /// acks; a structurally invalid event dead-letters and acks; a
    /// message-scoped fatal error leaves the event unacked for redelivery.
    /// One poison message never stops the loop.
    pub async fn consume<S: EventSource>(&mut self, mut source: S) -> Result<(), PipelineError> {
        loop {
            if *self.shutdown.borrow() {
                info!("consumer stopping on shutdown signal");
                return Ok(());
            }

            let inbound = match source.next().await {
                Ok(Some(inbound)) => inbound,
                Ok(None) => continue, // bounded wait timed out
                Err(e) => {
                    error!("stream read failed: {}; backing off", e);
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    continue;
                }
            };

            match ingest::decode(&inbound.fields) {
                Err(PipelineError::Malformed(reason)) => {
                    warn!("dead-lettering malformed event: {}", reason);
                    if let Err(e) = source.dead_letter(&inbound.token, &reason).await {
                        error!("dead-letter failed: {}", e);
                    }
                }
                Err(other) => {
                    error!("unexpected decode failure: {}", other);
                }
                Ok(event) => match self.dispatcher.process(&event).await {
                    Ok(outcome) => {
                        info!(
                            "processed msg {}/{} rev {} -> {:?}",
                            event.channel_id, event.msg_id, event.revision, outcome
                        );
                        if let Err(e) = source.ack(&inbound.token).await {
                            error!("ack failed, message will be redelivered: {}", e);
                        }
                    }
                    Err(e) => {
                        // left unacked on purpose: redelivery retries it
                        error!(
                            "message-scoped failure for msg {}/{}: {}",
                            event.channel_id, event.msg_id, e
                        );
                    }
                },
            }
        }
    }
}

#[async_trait]
impl Actor for ParserService {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::ParserActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let heartbeat_handle = self.spawn_heartbeat(supervisor_tx.clone());
        info!("starting parser consumer");

        let source = match RedisEventSource::connect(self.settings.clone()).await {
            Ok(source) => source,
            Err(e) => {
                heartbeat_handle.abort();
                supervisor_tx
                    .send(ControlMessage::Error(
                        self.id,
                        format!("stream connect failed: {}", e),
                    ))
                    .await?;
                anyhow::bail!("stream connect failed: {}", e);
            }
        };

        let result = self.consume(source).await;
        heartbeat_handle.abort();
        supervisor_tx
            .send(ControlMessage::Shutdown(self.id))
            .await?;
        result.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{AckToken, InboundEvent, MockEventSource};
    use classifier::Classifier;
    use mockall::Sequence;
    use std::collections::HashMap;
    use storage::ExecutionQueue;

    fn fields(msg_id: &str, text: Option<&str>) -> HashMap<String, String> {
        let mut m = HashMap::new();
        m.insert("type".to_string(), "new".to_string());
        m.insert("channel_id".to_string(), "100".to_string());
        m.insert("msg_id".to_string(), msg_id.to_string());
        m.insert("revision".to_string(), "1".to_string());
        m.insert(
            "ts_ingest".to_string(),
            "2026-08-07T10:00:00+00:00".to_string(),
        );
        if let Some(text) = text {
            m.insert("text".to_string(), text.to_string());
        }
        m
    }

    async fn service() -> (ParserService, watch::Sender<bool>) {
        let path = std::env::temp_dir().join(format!("consumer-{}.db", Uuid::new_v4()));
        let pool = storage::db::connect(path.to_str().unwrap()).await.unwrap();
        let dir = std::env::temp_dir().join(format!("consumer-queue-{}", Uuid::new_v4()));
        let queue = Arc::new(ExecutionQueue::new(&dir, "queue.csv").unwrap());
        let dispatcher = Arc::new(Dispatcher::new(pool, queue, Arc::new(Classifier::new())));
        let (tx, rx) = watch::channel(false);
        let settings = StreamSettings {
            url: "redis://localhost:6379/0".to_string(),
            stream: "signals:parse".to_string(),
            group: "parser".to_string(),
            consumer: "test".to_string(),
            block_ms: 100,
        };
        (ParserService::new(settings, dispatcher, rx), tx)
    }

    #[tokio::test]
    async fn acks_good_events_and_dead_letters_malformed_ones() {
        let (mut service, shutdown_tx) = service().await;
        let mut source = MockEventSource::new();
        let mut seq = Sequence::new();

        // 1: malformed (no text) -> dead-lettered
        source
            .expect_next()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Ok(Some(InboundEvent {
                    token: AckToken("1-0".to_string()),
                    fields: fields("60", None),
                }))
            });
        source
            .expect_dead_letter()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        // 2: valid signal -> processed and acked
        source
            .expect_next()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Ok(Some(InboundEvent {
                    token: AckToken("2-0".to_string()),
                    fields: fields("61", Some("XAUUSD BUY @3814.5 SL 3809.5 TP 3820")),
                }))
            });
        source
            .expect_ack()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|token| token.0 == "2-0")
            .returning(|_| Ok(()));

        // 3: timeout; flip the shutdown flag so the loop exits cleanly
        source
            .expect_next()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move || {
                shutdown_tx.send(true).unwrap();
                Ok(None)
            });

        service.consume(source).await.unwrap();
    }
}
