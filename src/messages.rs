//! Message types for actor-based communication.
//!
//! Commands travel from the transport and the presentation side to the
//! [`CalorimeterActor`](crate::app_actor::CalorimeterActor) over an mpsc channel.
//! Each command embeds a oneshot sender for its reply:
//!
//! ```text
//! Caller                              Actor Task
//! ------                              ----------
//! 1. Create command with oneshot
//! 2. Send via mpsc channel    ------>
//!                                     3. Receive command
//!                                     4. Mutate or copy state
//!                                     5. Send response
//! 6. Await oneshot receiver   <------
//! ```
//!
//! Use the helper constructors, which hand back the receiver together with the
//! command:
//!
//! ```rust
//! use calor_daq::messages::CalorCommand;
//!
//! let (cmd, rx) = CalorCommand::snapshot();
//! // cmd_tx.send(cmd).await?;
//! // let snapshot = rx.await?;
//! ```

use crate::core::{Control, Ingested};
use crate::error::AppResult;
use crate::snapshot::Snapshot;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Commands accepted by the calorimeter actor.
#[derive(Debug)]
pub enum CalorCommand {
    /// Validate and ingest one raw payload.
    ///
    /// The actor stamps the reading with its own clock when it processes the
    /// command, inside the same step that reads the mode and appends.
    Ingest {
        /// Raw message body
        payload: Vec<u8>,
        /// Response channel
        response: oneshot::Sender<AppResult<Ingested>>,
    },

    /// Apply a mode, lock or volume command.
    Control {
        /// The command
        control: Control,
        /// Response channel
        response: oneshot::Sender<AppResult<()>>,
    },

    /// Copy the current state.
    Snapshot {
        /// Response channel
        response: oneshot::Sender<Arc<Snapshot>>,
    },

    /// Stop the actor after flushing the persistence sink.
    Shutdown {
        /// Signalled once the actor has stopped
        response: oneshot::Sender<()>,
    },
}

impl CalorCommand {
    /// Ingest command plus its reply receiver.
    pub fn ingest(payload: Vec<u8>) -> (Self, oneshot::Receiver<AppResult<Ingested>>) {
        let (response, rx) = oneshot::channel();
        (Self::Ingest { payload, response }, rx)
    }

    /// Control command plus its reply receiver.
    pub fn control(control: Control) -> (Self, oneshot::Receiver<AppResult<()>>) {
        let (response, rx) = oneshot::channel();
        (Self::Control { control, response }, rx)
    }

    /// Snapshot request plus its reply receiver.
    pub fn snapshot() -> (Self, oneshot::Receiver<Arc<Snapshot>>) {
        let (response, rx) = oneshot::channel();
        (Self::Snapshot { response }, rx)
    }

    /// Shutdown request plus its completion receiver.
    pub fn shutdown() -> (Self, oneshot::Receiver<()>) {
        let (response, rx) = oneshot::channel();
        (Self::Shutdown { response }, rx)
    }
}
