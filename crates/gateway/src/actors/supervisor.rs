use std::{collections::HashMap, time::Duration};

use tokio::{
    signal,
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{self, Instant},
};
use tracing::{error, info, warn};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};

/// Restarts unresponsive actors from their factories; on ctrl-c it flips the
/// shutdown signal and lets every actor finish its in-flight work.
pub struct Supervisor {
    actor_factories: HashMap<ActorType, Box<dyn Fn() -> Box<dyn Actor> + Send + Sync>>,
    pulses: HashMap<ActorType, Instant>,
    handles: HashMap<ActorType, JoinHandle<()>>,
    ids: HashMap<Uuid, ActorType>,
    shutdown_tx: watch::Sender<bool>,
}

impl Supervisor {
    pub fn new(shutdown_tx: watch::Sender<bool>) -> Self {
        Self {
            actor_factories: HashMap::new(),
            pulses: HashMap::new(),
            handles: HashMap::new(),
            ids: HashMap::new(),
            shutdown_tx,
        }
    }

    pub fn register_actor(
        &mut self,
        actor_type: ActorType,
        factory: Box<dyn Fn() -> Box<dyn Actor> + Send + Sync>,
    ) {
        self.actor_factories.insert(actor_type, factory);
    }

    pub async fn start(&mut self) {
        let mut check_interval = time::interval(Duration::from_secs(1));
        let timeout_duration = Duration::from_secs(3);

        let (supervisor_tx, mut supervisor_rx) = mpsc::channel::<ControlMessage>(512);

        let actors: Vec<ActorType> = self.actor_factories.keys().copied().collect();
        for actor in actors {
            self.spawn_actor(actor, supervisor_tx.clone());
        }

        loop {
            tokio::select! {
                Some(msg) = supervisor_rx.recv() => {
                    match msg {
                        ControlMessage::Heartbeat(id) => {
                            if let Some(actor_type) = self.ids.get(&id) {
                                self.pulses.insert(*actor_type, Instant::now());
                            }
                        }
                        ControlMessage::Shutdown(id) => {
                            if let Some(actor_type) = self.ids.remove(&id) {
                                warn!("{:?} is shutting down gracefully.", actor_type);
                                self.pulses.remove(&actor_type);
                            }
                        }
                        ControlMessage::Error(id, error_msg) => {
                            if let Some(actor_type) = self.ids.get(&id) {
                                error!("Actor {:?} reported error: {}", actor_type, error_msg);
                                self.pulses.insert(*actor_type, Instant::now());
                            }
                        }
                    }
                }

                _ = check_interval.tick() => {
                    if *self.shutdown_tx.borrow() {
                        continue; // draining, no restarts
                    }
                    let dead_timeout = Instant::now() - timeout_duration;
                    let mut dead_actors = Vec::new();

                    for (key, &pulse) in self.pulses.iter() {
                        if pulse < dead_timeout {
                            warn!("{:?} is unresponsive!", key);
                            dead_actors.push(*key);
                            self.handles[key].abort();
                        }
                    }

                    for actor in dead_actors {
                        self.spawn_actor(actor, supervisor_tx.clone());
                    }
                }

                _ = signal::ctrl_c() => {
                    info!("interrupt received, draining actors");
                    let _ = self.shutdown_tx.send(true);
                    self.drain().await;
                    break;
                }
            }
        }
    }

    /// Waits for every actor to exit on its own; anything still running after
    /// the grace period gets aborted.
    async fn drain(&mut self) {
        for (actor_type, handle) in self.handles.drain() {
            let abort = handle.abort_handle();
            match time::timeout(Duration::from_secs(15), handle).await {
                Ok(_) => info!("{:?} drained", actor_type),
                Err(_) => {
                    warn!("{:?} did not stop in time, aborting", actor_type);
                    abort.abort();
                }
            }
        }
    }

    fn spawn_actor(&mut self, actor_type: ActorType, tx: mpsc::Sender<ControlMessage>) {
        let mut new_actor = self.actor_factories[&actor_type]();
        self.ids.insert(new_actor.id(), actor_type);
        let new_actor_handle = tokio::spawn(async move {
            if let Err(e) = new_actor.run(tx).await {
                error!("Actor {:?} crashed: {}", &actor_type, e);
            }
        });
        self.handles.insert(actor_type, new_actor_handle);
        self.pulses.insert(actor_type, Instant::now());
    }
}
