//! Actor-based ownership of the calorimeter state.
//!
//! The [`CalorimeterActor`] is the single owner of the [`Calorimeter`] (buffer
//! store, mode state, lock state) and runs in a dedicated Tokio task. It
//! processes [`CalorCommand`] messages one at a time, which is the only
//! concurrency discipline in the crate: an ingestion, a command and a snapshot
//! can never interleave, so a snapshot never observes a half-applied append or
//! transition.
//!
//! ## Message Flow
//!
//! ```text
//! Transport ──Ingest──┐
//!                     ├──> mpsc ──> CalorimeterActor ──┬──> oneshot replies
//! Presentation ──Ctl──┘              (owns state)      ├──> watch<Arc<Snapshot>>
//!                                                      └──> SinkWorker (persistence)
//! ```
//!
//! After every accepted mutation the actor publishes a fresh snapshot on a watch
//! channel, so consumers can either poll [`CalorimeterHandle::snapshot`] or
//! await changes from [`CalorimeterHandle::subscribe`].
//!
//! # Example
//!
//! ```no_run
//! use calor_daq::{app_actor::CalorimeterHandle, core::Calorimeter, data::storage};
//!
//! # async fn example() -> calor_daq::error::AppResult<()> {
//! let sink = storage::spawn_sink_worker(Box::new(storage::NullSink));
//! let (handle, _task) = CalorimeterHandle::spawn(Calorimeter::default(), sink, 32);
//! handle.start_mixing().await?;
//! let snapshot = handle.snapshot().await?;
//! println!("{}", snapshot.status_line("edukit/suhu"));
//! # Ok(())
//! # }
//! ```

use crate::core::{Calorimeter, Control, Ingested};
use crate::data::storage::{PersistedRow, SinkWorker};
use crate::error::{AppResult, CalorError};
use crate::messages::CalorCommand;
use crate::snapshot::Snapshot;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Central actor that owns all calorimeter state.
pub struct CalorimeterActor {
    core: Calorimeter,
    sink: SinkWorker,
    snapshots: watch::Sender<Arc<Snapshot>>,
}

impl CalorimeterActor {
    /// Create the actor and the receiver side of its snapshot channel.
    pub fn new(core: Calorimeter, sink: SinkWorker) -> (Self, watch::Receiver<Arc<Snapshot>>) {
        let (snapshots, rx) = watch::channel(Arc::new(core.snapshot()));
        (
            Self {
                core,
                sink,
                snapshots,
            },
            rx,
        )
    }

    /// Event loop. Returns when a `Shutdown` arrives or every sender is dropped.
    pub async fn run(mut self, mut rx: mpsc::Receiver<CalorCommand>) {
        tracing::info!("Calorimeter actor started");
        let mut shutdown_reply = None;

        while let Some(command) = rx.recv().await {
            match command {
                CalorCommand::Ingest { payload, response } => {
                    let result = self.handle_ingest(&payload);
                    let _ = response.send(result);
                }
                CalorCommand::Control { control, response } => {
                    let result = self.core.apply(control, Utc::now());
                    if result.is_ok() {
                        self.publish();
                    }
                    let _ = response.send(result);
                }
                CalorCommand::Snapshot { response } => {
                    let _ = response.send(Arc::new(self.core.snapshot()));
                }
                CalorCommand::Shutdown { response } => {
                    shutdown_reply = Some(response);
                    break;
                }
            }
        }

        self.sink.close().await;
        tracing::info!(
            entries = self.core.buffer().len(),
            "Calorimeter actor stopped"
        );
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    fn handle_ingest(&mut self, payload: &[u8]) -> AppResult<Ingested> {
        let ingested = self.core.ingest_payload(payload, Utc::now())?;
        self.sink.submit(PersistedRow::from_entry(&ingested.entry));
        self.publish();
        Ok(ingested)
    }

    fn publish(&self) {
        self.snapshots.send_replace(Arc::new(self.core.snapshot()));
    }
}

/// Cloneable client for a running [`CalorimeterActor`].
#[derive(Clone)]
pub struct CalorimeterHandle {
    tx: mpsc::Sender<CalorCommand>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
}

impl CalorimeterHandle {
    /// Spawn an actor around `core` and return a handle to it.
    pub fn spawn(
        core: Calorimeter,
        sink: SinkWorker,
        channel_capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let (actor, snapshots) = CalorimeterActor::new(core, sink);
        let task = tokio::spawn(actor.run(rx));
        (Self { tx, snapshots }, task)
    }

    async fn send(&self, command: CalorCommand) -> AppResult<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| CalorError::ActorUnavailable)
    }

    /// Validate and ingest a raw payload.
    pub async fn ingest(&self, payload: Vec<u8>) -> AppResult<Ingested> {
        let (cmd, rx) = CalorCommand::ingest(payload);
        self.send(cmd).await?;
        rx.await.map_err(|_| CalorError::ActorUnavailable)?
    }

    /// Apply any presentation-side command.
    pub async fn apply(&self, control: Control) -> AppResult<()> {
        let (cmd, rx) = CalorCommand::control(control);
        self.send(cmd).await?;
        rx.await.map_err(|_| CalorError::ActorUnavailable)?
    }

    /// Measuring -> Mixing.
    pub async fn start_mixing(&self) -> AppResult<()> {
        self.apply(Control::StartMixing).await
    }

    /// Mixing -> Finished.
    pub async fn stop_and_lock(&self) -> AppResult<()> {
        self.apply(Control::StopAndLock).await
    }

    /// Finished -> Measuring.
    pub async fn reset(&self) -> AppResult<()> {
        self.apply(Control::Reset).await
    }

    /// Lock the initial cold/hot temperatures.
    pub async fn lock(&self) -> AppResult<()> {
        self.apply(Control::Lock).await
    }

    /// Release the locked temperatures.
    pub async fn unlock(&self) -> AppResult<()> {
        self.apply(Control::Unlock).await
    }

    /// Set the cold vessel volume in mL.
    pub async fn set_cold_volume(&self, volume_ml: f64) -> AppResult<()> {
        self.apply(Control::SetColdVolume(volume_ml)).await
    }

    /// Set the hot vessel volume in mL.
    pub async fn set_hot_volume(&self, volume_ml: f64) -> AppResult<()> {
        self.apply(Control::SetHotVolume(volume_ml)).await
    }

    /// Request a fresh snapshot.
    pub async fn snapshot(&self) -> AppResult<Arc<Snapshot>> {
        let (cmd, rx) = CalorCommand::snapshot();
        self.send(cmd).await?;
        rx.await.map_err(|_| CalorError::ActorUnavailable)
    }

    /// Receiver that sees a new snapshot after every accepted mutation.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }

    /// Stop the actor and wait until the sink is flushed.
    pub async fn shutdown(&self) -> AppResult<()> {
        let (cmd, rx) = CalorCommand::shutdown();
        self.send(cmd).await?;
        rx.await.map_err(|_| CalorError::ActorUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::storage::{spawn_sink_worker, NullSink};
    use crate::experiment::ExperimentPhase;

    fn spawn_default() -> (CalorimeterHandle, JoinHandle<()>) {
        CalorimeterHandle::spawn(
            Calorimeter::default(),
            spawn_sink_worker(Box::new(NullSink)),
            8,
        )
    }

    #[tokio::test]
    async fn test_commands_round_trip() {
        let (handle, task) = spawn_default();
        handle.start_mixing().await.unwrap();
        assert!(matches!(
            handle.start_mixing().await,
            Err(CalorError::InvalidTransition { .. })
        ));
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.phase(), ExperimentPhase::Mixing);

        handle.shutdown().await.unwrap();
        task.await.unwrap();
        assert!(matches!(
            handle.snapshot().await,
            Err(CalorError::ActorUnavailable)
        ));
    }

    #[tokio::test]
    async fn test_subscription_sees_mutations() {
        let (handle, _task) = spawn_default();
        let mut rx = handle.subscribe();
        assert_eq!(rx.borrow_and_update().sequence, 0);

        handle.set_cold_volume(100.0).await.unwrap();
        rx.changed().await.unwrap();
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.sequence, 1);
        assert_eq!(snap.mode.cold().volume_ml, 100.0);
    }

    #[tokio::test]
    async fn test_malformed_payload_reported() {
        let (handle, _task) = spawn_default();
        assert!(matches!(
            handle.ingest(b"{\"dingin\": {}}".to_vec()).await,
            Err(CalorError::MalformedPayload(_))
        ));
        assert!(handle.snapshot().await.unwrap().is_empty());
    }
}
