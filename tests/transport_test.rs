//! Line transport: disconnects leave the store intact and a new source resumes.

use calor_daq::app_actor::CalorimeterHandle;
use calor_daq::core::Calorimeter;
use calor_daq::data::storage::{spawn_sink_worker, NullSink};
use calor_daq::error::CalorError;
use calor_daq::simulator::ProbeRig;
use calor_daq::transport::run_line_transport;
use tokio::io::{AsyncWriteExt, BufReader};

fn lines(rig: &mut ProbeRig, n: usize) -> String {
    (0..n)
        .map(|_| String::from_utf8(rig.next_payload()).unwrap() + "\n")
        .collect()
}

#[tokio::test]
async fn test_disconnect_then_reconnect() {
    let (handle, _task) =
        CalorimeterHandle::spawn(Calorimeter::default(), spawn_sink_worker(Box::new(NullSink)), 8);
    let mut rig = ProbeRig::new(8);

    let (mut writer, reader) = tokio::io::duplex(4096);
    let pump = {
        let handle = handle.clone();
        tokio::spawn(async move { run_line_transport(BufReader::new(reader), &handle).await })
    };
    writer.write_all(lines(&mut rig, 3).as_bytes()).await.unwrap();
    writer.write_all(b"{\"dingin\": {\"C\": 1}}\n").await.unwrap();
    drop(writer);

    let (stats, reason) = pump.await.unwrap();
    assert_eq!(stats.accepted, 3);
    assert_eq!(stats.rejected, 1);
    assert!(matches!(reason, CalorError::TransportDisconnected(_)));

    let before = handle.snapshot().await.unwrap();
    assert_eq!(before.len(), 3);

    let second = lines(&mut rig, 2);
    let (stats, _) = run_line_transport(second.as_bytes(), &handle).await;
    assert_eq!(stats.accepted, 2);

    let after = handle.snapshot().await.unwrap();
    assert_eq!(after.len(), 5);
    assert_eq!(&after.series.timestamps[..3], &before.series.timestamps[..]);
    assert!(after.sequence > before.sequence);
}

#[tokio::test]
async fn test_stopped_actor_ends_transport() {
    let (handle, task) =
        CalorimeterHandle::spawn(Calorimeter::default(), spawn_sink_worker(Box::new(NullSink)), 8);
    handle.shutdown().await.unwrap();
    task.await.unwrap();

    let mut rig = ProbeRig::new(2);
    let input = lines(&mut rig, 2);
    let (stats, reason) = run_line_transport(input.as_bytes(), &handle).await;
    assert_eq!(stats.accepted, 0);
    assert!(matches!(reason, CalorError::ActorUnavailable));
}
