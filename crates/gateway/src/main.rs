use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info};

use classifier::Classifier;
use common::actors::ActorType;
use common::logger;
use pipeline::{Dispatcher, FillService, ParserService};
use storage::ExecutionQueue;

use crate::actors::supervisor::Supervisor;
use crate::config::Config;
use crate::services::notifier::NotifierService;

mod actors;
mod config;
mod services;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::setup_logger();
    dotenv().ok();
    debug!("gateway starting up...");

    let config = Config::from_env()?;
    info!(
        "store={} queue_dir={} stream={}",
        config.store.db_path,
        config.queue.dir.display(),
        config.stream.stream
    );

    let pool = storage::db::connect(&config.store.db_path).await?;
    let queue = Arc::new(ExecutionQueue::new(&config.queue.dir, &config.queue.queue_file)?);
    let classifier = Arc::new(Classifier::new());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (notify_tx, _) = broadcast::channel::<String>(256);

    let mut dispatcher = Dispatcher::new(pool.clone(), queue.clone(), classifier);
    if let Some(telegram) = &config.telegram {
        let notifier = NotifierService::new(telegram);
        tokio::spawn(notifier.start(notify_tx.subscribe()));
        dispatcher = dispatcher.with_notifier(notify_tx.clone());
    } else {
        info!("signal re-publishing disabled (no TELEGRAM_* in env)");
    }
    let dispatcher = Arc::new(dispatcher);

    let mut supervisor = Supervisor::new(shutdown_tx);

    let stream_settings = config.stream.clone();
    let dispatcher_for_parser = dispatcher.clone();
    let shutdown_for_parser = shutdown_rx.clone();
    supervisor.register_actor(
        ActorType::ParserActor,
        Box::new(move || {
            Box::new(ParserService::new(
                stream_settings.clone(),
                dispatcher_for_parser.clone(),
                shutdown_for_parser.clone(),
            ))
        }),
    );

    let pool_for_fills = pool.clone();
    let ack_path = config.queue.dir.join(&config.queue.ack_file);
    let poll = Duration::from_secs(config.queue.ack_poll_secs);
    let shutdown_for_fills = shutdown_rx.clone();
    supervisor.register_actor(
        ActorType::FillActor,
        Box::new(move || {
            Box::new(FillService::new(
                pool_for_fills.clone(),
                &ack_path,
                poll,
                shutdown_for_fills.clone(),
            ))
        }),
    );

    supervisor.start().await;
    info!("gateway stopped");
    Ok(())
}
