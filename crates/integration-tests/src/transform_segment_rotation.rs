//! Scenario S4 ("a transaction straddles a WAL segment boundary"), driven
//! through real file I/O rather than feeding the state machine directly:
//! a transaction opens in segment one, a SWITCH marker closes the file
//! without a COMMIT, and segment two continues the same xid to COMMIT. The
//! worker must emit no second BEGIN in segment two's output.

use concurrency::{CancelFlags, NamedQueue};
use std::path::Path;
use tempfile::tempdir;
use tokio::io::AsyncWriteExt;
use transform::file_worker::{SegmentJob, run};

async fn write_json(dir: &Path, name: &str, lines: &[&str]) {
    let mut f = tokio::fs::File::create(dir.join(format!("{name}.json"))).await.unwrap();
    for line in lines {
        f.write_all(line.as_bytes()).await.unwrap();
        f.write_all(b"\n").await.unwrap();
    }
}

#[tokio::test]
async fn a_transaction_spanning_two_segments_emits_exactly_one_begin() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();

    write_json(
        input.path(),
        "000001",
        &[
            r#"{"message": {"action":"B","xid":77,"lsn":"0/1","timestamp":"2026-01-01T00:00:00Z"}}"#,
            r#"{"message": {"action":"I","xid":77,"schema":"public","table":"events","new":[{"columnnames":["id"],"columnvalues":[{"type":"int8","value":1}]}]}}"#,
            r#"{"message": {"action":"X","lsn":"0/9","timestamp":"2026-01-01T00:00:01Z"}}"#,
        ],
    )
    .await;

    write_json(
        input.path(),
        "000002",
        &[
            r#"{"message": {"action":"I","xid":77,"schema":"public","table":"events","new":[{"columnnames":["id"],"columnvalues":[{"type":"int8","value":2}]}]}}"#,
            r#"{"message": {"action":"C","xid":77,"lsn":"0/A0","timestamp":"2026-01-01T00:00:02Z"}}"#,
        ],
    )
    .await;

    let (queue, rx) = NamedQueue::create("transform", 4);
    queue.send(SegmentJob { segment_name: "000001".to_string(), is_final_segment: false }).await.unwrap();
    queue.send(SegmentJob { segment_name: "000002".to_string(), is_final_segment: true }).await.unwrap();
    queue.send_stop().await.unwrap();

    run(rx, input.path().to_path_buf(), output.path().to_path_buf(), CancelFlags::new()).await.unwrap();

    let seg1 = tokio::fs::read_to_string(output.path().join("000001.sql")).await.unwrap();
    let seg2 = tokio::fs::read_to_string(output.path().join("000002.sql")).await.unwrap();

    assert_eq!(seg1.matches("BEGIN").count(), 1);
    assert!(seg1.contains("INSERT INTO"));
    assert!(!seg1.contains("COMMIT"), "the transaction is still open when segment one ends");

    assert_eq!(seg2.matches("BEGIN").count(), 0, "a continued transaction emits no second BEGIN");
    assert!(seg2.contains("INSERT INTO"));
    assert!(seg2.contains("COMMIT"));
}

#[tokio::test]
async fn the_final_segment_replaces_an_unfinished_transaction_with_a_keepalive() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();

    write_json(
        input.path(),
        "000001",
        &[
            r#"{"message": {"action":"B","xid":9,"lsn":"0/1","timestamp":"2026-01-01T00:00:00Z"}}"#,
            r#"{"message": {"action":"I","xid":9,"schema":"public","table":"events","new":[{"columnnames":["id"],"columnvalues":[{"type":"int8","value":1}]}]}}"#,
        ],
    )
    .await;

    let (queue, rx) = NamedQueue::create("transform", 4);
    queue.send(SegmentJob { segment_name: "000001".to_string(), is_final_segment: true }).await.unwrap();
    queue.send_stop().await.unwrap();

    run(rx, input.path().to_path_buf(), output.path().to_path_buf(), CancelFlags::new()).await.unwrap();

    let seg1 = tokio::fs::read_to_string(output.path().join("000001.sql")).await.unwrap();
    assert!(!seg1.contains("BEGIN"));
    assert!(!seg1.contains("INSERT INTO"));
    assert!(seg1.to_uppercase().contains("KEEPALIVE"));
}
