//! The inbound event stream, behind a trait so the consumer loop can be
//! exercised with a scripted source in tests.
//!
//! Production uses a Redis Streams consumer group: ordered, persistent,
//! fanned out across named consumers, each event delivered at least once and
//! acked only after its processing branch completes.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::{aio::ConnectionManager, AsyncCommands};
use tracing::info;

use crate::error::SourceError;

/// Opaque handle used to ack or dead-letter one delivered event.
#[derive(Debug, Clone)]
pub struct AckToken(pub String);

pub struct InboundEvent {
    pub token: AckToken,
    pub fields: HashMap<String, String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Blocks for a bounded interval; `None` means the wait timed out and the
    /// caller should loop (checking for shutdown in between).
    async fn next(&mut self) -> Result<Option<InboundEvent>, SourceError>;

    async fn ack(&mut self, token: &AckToken) -> Result<(), SourceError>;

    /// Records a structurally invalid event on the side stream and acks it;
    /// dead-lettered events are never retried.
    async fn dead_letter(&mut self, token: &AckToken, reason: &str) -> Result<(), SourceError>;
}

#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub url: String,
    pub stream: String,
    pub group: String,
    pub consumer: String,
    pub block_ms: usize,
}

pub struct RedisEventSource {
    conn: ConnectionManager,
    settings: StreamSettings,
}

impl RedisEventSource {
    pub async fn connect(settings: StreamSettings) -> Result<Self, SourceError> {
        let client = redis::Client::open(settings.url.as_str())?;
        let conn = client.get_connection_manager().await?;
        let mut source = Self { conn, settings };
        source.ensure_group().await?;
        info!(
            "consuming stream '{}' as {}/{}",
            source.settings.stream, source.settings.group, source.settings.consumer
        );
        Ok(source)
    }

    async fn ensure_group(&mut self) -> Result<(), SourceError> {
        let created: Result<String, redis::RedisError> = self
            .conn
            .xgroup_create_mkstream(&self.settings.stream, &self.settings.group, "0")
            .await;
        match created {
            Ok(_) => Ok(()),
            // group already exists: fine, another consumer got there first
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn dead_stream(&self) -> String {
        format!("{}:dead", self.settings.stream)
    }
}

#[async_trait]
impl EventSource for RedisEventSource {
    async fn next(&mut self) -> Result<Option<InboundEvent>, SourceError> {
        let opts = StreamReadOptions::default()
            .group(&self.settings.group, &self.settings.consumer)
            .count(1)
            .block(self.settings.block_ms);
        let reply: StreamReadReply = self
            .conn
            .xread_options(&[self.settings.stream.as_str()], &[">"], &opts)
            .await?;

        for key in reply.keys {
            for entry in key.ids {
                let mut fields = HashMap::new();
                for (name, value) in entry.map {
                    if let Ok(text) = redis::from_redis_value::<String>(&value) {
                        fields.insert(name, text);
                    }
                }
                return Ok(Some(InboundEvent {
                    token: AckToken(entry.id),
                    fields,
                }));
            }
        }
        Ok(None)
    }

    async fn ack(&mut self, token: &AckToken) -> Result<(), SourceError> {
        let _: i64 = self
            .conn
            .xack(
                &self.settings.stream,
                &self.settings.group,
                &[token.0.as_str()],
            )
            .await?;
        Ok(())
    }

    async fn dead_letter(&mut self, token: &AckToken, reason: &str) -> Result<(), SourceError> {
        let dead = self.dead_stream();
        let _: String = self
            .conn
            .xadd(
                dead,
                "*",
                &[("origin_id", token.0.as_str()), ("reason", reason)],
            )
            .await?;
        self.ack(token).await
    }
}
