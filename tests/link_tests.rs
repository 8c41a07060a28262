use std::io::Cursor;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use telemetry_hub::link::{pump_lines, ReadOutcome};
use telemetry_hub::{DistributionHub, ReadingStatus, SerialLink};

#[tokio::test]
async fn pump_forwards_valid_lines_and_flags_the_outage() {
    let mut hub = DistributionHub::new();
    let mut inbox = hub.register("consumer", 16);
    let feed = concat!(
        "{\"ts\":1}\n",
        "\n",
        "not json at all\n",
        "{\"ts\":2,\"voltageSensorV5\":{\"voltage\":5.1,\"current\":0.4,\"isAvailable\":true}}\n",
    )
    .as_bytes()
    .to_vec();

    let token = CancellationToken::new();
    let outcome = pump_lines(Cursor::new(feed), &mut hub, &token).await;
    assert_eq!(outcome, ReadOutcome::Eof);
    drop(hub);

    // Malformed and empty lines were skipped, valid ones forwarded in order.
    assert_eq!(inbox.recv().await.unwrap().ts, 1);
    let second = inbox.recv().await.unwrap();
    assert_eq!(second.ts, 2);
    assert_eq!(second.voltage_sensor_v5.voltage, 5.1);
    assert!(second.voltage_sensor_v5.is_available);

    // Exactly one offline snapshot after the stream died.
    let outage = inbox.recv().await.unwrap();
    assert_eq!(outage.status, ReadingStatus::Error);
    assert!(!outage.voltage_sensor_v5.is_available);
    assert!(inbox.recv().await.is_none());
}

#[tokio::test]
async fn undecodable_bytes_do_not_reset_the_stream() {
    let mut hub = DistributionHub::new();
    let mut inbox = hub.register("consumer", 16);
    let mut feed = vec![0xff, 0xfe, b'\n'];
    feed.extend_from_slice(b"{\"ts\":3}\n");

    let token = CancellationToken::new();
    let outcome = pump_lines(Cursor::new(feed), &mut hub, &token).await;
    assert_eq!(outcome, ReadOutcome::Eof);
    drop(hub);

    // The garbled line is dropped, the stream keeps going.
    assert_eq!(inbox.recv().await.unwrap().ts, 3);
    assert_eq!(inbox.recv().await.unwrap().status, ReadingStatus::Error);
    assert!(inbox.recv().await.is_none());
}

#[tokio::test]
async fn cancellation_stops_the_pump_without_an_outage_snapshot() {
    let mut hub = DistributionHub::new();
    let mut inbox = hub.register("consumer", 16);
    let token = CancellationToken::new();
    token.cancel();

    let outcome = pump_lines(Cursor::new(b"{\"ts\":1}\n".to_vec()), &mut hub, &token).await;
    assert_eq!(outcome, ReadOutcome::Cancelled);
    drop(hub);
    assert!(inbox.recv().await.is_none());
}

#[tokio::test]
async fn missing_device_is_not_fatal() {
    let mut hub = DistributionHub::new();
    let mut inbox = hub.register("consumer", 4);
    let link = SerialLink::new(
        vec!["/dev/nonexistent-telemetry-0".to_string()],
        115_200,
        Duration::from_millis(10),
    );

    let token = CancellationToken::new();
    let stop = token.clone();
    let worker = tokio::spawn(link.run(hub, token));

    // Give it a few reconnect cycles, then ask it to stop.
    tokio::time::sleep(Duration::from_millis(50)).await;
    stop.cancel();
    let result = tokio::time::timeout(Duration::from_secs(1), worker)
        .await
        .expect("link must honor cancellation")
        .unwrap();
    assert!(result.is_ok());

    // Nothing was ever produced while disconnected.
    assert!(inbox.recv().await.is_none());
}
