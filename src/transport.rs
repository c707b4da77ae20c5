//! Newline-delimited JSON transport.
//!
//! Each non-blank line is one payload as published on the rig's topic. Lines are
//! forwarded to the actor in arrival order. A rejected payload is dropped (the
//! core already logged it) and reading continues; delivery is at-most-once.

use crate::app_actor::CalorimeterHandle;
use crate::error::CalorError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Counters for one transport session.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransportStats {
    /// Payloads stored
    pub accepted: u64,
    /// Payloads dropped by validation
    pub rejected: u64,
}

/// Pump lines from `reader` into the actor until the source goes away.
///
/// Returns [`CalorError::TransportDisconnected`] on end of input or a read
/// error, or [`CalorError::ActorUnavailable`] if the actor stopped first. The
/// stored state is left as it was when the source ended.
pub async fn run_line_transport<R>(
    reader: R,
    handle: &CalorimeterHandle,
) -> (TransportStats, CalorError)
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = TransportStats::default();
    let mut lines = reader.lines();

    let reason = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break CalorError::TransportDisconnected("end of input".into()),
            Err(e) => break CalorError::TransportDisconnected(e.to_string()),
        };
        let payload = line.trim();
        if payload.is_empty() {
            continue;
        }

        match handle.ingest(payload.as_bytes().to_vec()).await {
            Ok(_) => stats.accepted += 1,
            Err(CalorError::ActorUnavailable) => break CalorError::ActorUnavailable,
            Err(_) => stats.rejected += 1,
        }
    };

    tracing::warn!(
        accepted = stats.accepted,
        rejected = stats.rejected,
        reason = %reason,
        "Transport stopped"
    );
    (stats, reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Calorimeter;
    use crate::data::storage::{spawn_sink_worker, NullSink};
    use crate::simulator::ProbeRig;

    #[tokio::test]
    async fn test_lines_forwarded_and_eof_reported() {
        let (handle, _task) = CalorimeterHandle::spawn(
            Calorimeter::default(),
            spawn_sink_worker(Box::new(NullSink)),
            4,
        );
        let mut rig = ProbeRig::new(7);
        let mut input = String::new();
        for _ in 0..3 {
            input.push_str(&String::from_utf8(rig.next_payload()).unwrap());
            input.push('\n');
        }
        input.push_str("\n{\"dingin\": 1}\n");

        let (stats, reason) = run_line_transport(input.as_bytes(), &handle).await;
        assert_eq!(
            stats,
            TransportStats {
                accepted: 3,
                rejected: 1
            }
        );
        assert!(matches!(reason, CalorError::TransportDisconnected(_)));
        assert_eq!(handle.snapshot().await.unwrap().len(), 3);
    }
}
