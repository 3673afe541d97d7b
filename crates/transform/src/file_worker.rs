//! File-mode entry point (§4.6): one of the two ways to drive the
//! transformer. A supervisor hands segment names over a transform queue;
//! this worker reads `<segment>.json`, replays it through the state
//! machine, and writes `<segment>.sql`. A segment the supervisor marks as
//! the run's last one is finalized at endpos before being written out.

use crate::emitter::render_line;
use crate::error::{Result, TransformError};
use crate::lsn::Lsn;
use crate::message::parse_line;
use crate::state_machine::Transformer;
use chrono::Utc;
use concurrency::{CancelFlags, QueueReceiver, ReceivedMessage};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// One unit of work handed to a file-mode worker over its transform queue.
#[derive(Debug, Clone)]
pub struct SegmentJob {
    pub segment_name: String,
    /// true if this is the last segment of the run: an open transaction at
    /// end-of-file is replaced by a KEEPALIVE rather than carried forward.
    pub is_final_segment: bool,
}

/// Processes every JSON segment handed over `queue` until a `Stop` poison
/// pill or cancellation arrives. The same [`Transformer`] is reused across
/// segments so a transaction left open by a mid-segment SWITCH carries
/// forward correctly.
pub async fn run(mut queue: QueueReceiver<SegmentJob>, input_dir: PathBuf, output_dir: PathBuf, cancel: CancelFlags) -> Result<()> {
    let mut transformer = Transformer::new();
    loop {
        match queue.receive(&cancel).await {
            ReceivedMessage::Item(job) => {
                process_segment(&mut transformer, &input_dir, &output_dir, &job).await?;
            }
            ReceivedMessage::Stop | ReceivedMessage::Closed | ReceivedMessage::Cancelled => break,
        }
    }
    Ok(())
}

async fn process_segment(transformer: &mut Transformer, input_dir: &Path, output_dir: &Path, job: &SegmentJob) -> Result<()> {
    let input_path = input_dir.join(format!("{}.json", job.segment_name));
    let sql_path = output_dir.join(format!("{}.sql", job.segment_name));
    let partial_path = output_dir.join(format!("{}.sql.partial", job.segment_name));

    let file = tokio::fs::File::open(&input_path)
        .await
        .map_err(|_| TransformError::MissingSegmentFile(job.segment_name.clone()))?;
    let mut lines = BufReader::new(file).lines();

    transformer.begin_new_segment();
    let mut last_lsn = Lsn::default();

    let result: Result<()> = async {
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let msg = parse_line(&line)?;
            last_lsn = msg.lsn();
            transformer.process(msg)?;
        }
        Ok(())
    }
    .await;

    if let Err(err) = result {
        let records = transformer.take_segment_output();
        write_records(&partial_path, &records).await?;
        return Err(err);
    }

    if job.is_final_segment && transformer.has_open_transaction() {
        transformer.finalize_at_endpos(last_lsn, Utc::now());
    }

    let records = transformer.take_segment_output();
    write_records(&sql_path, &records).await?;
    Ok(())
}

async fn write_records(path: &Path, records: &[crate::state_machine::OutputRecord]) -> Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    for record in records {
        file.write_all(render_line(record).as_bytes()).await?;
        file.write_all(b"\n").await?;
    }
    file.flush().await?;
    file.sync_all().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use concurrency::NamedQueue;
    use tempfile::tempdir;
    use tokio::io::AsyncWriteExt as _;

    async fn write_json(dir: &Path, name: &str, lines: &[&str]) {
        let mut f = tokio::fs::File::create(dir.join(format!("{name}.json"))).await.unwrap();
        for line in lines {
            f.write_all(line.as_bytes()).await.unwrap();
            f.write_all(b"\n").await.unwrap();
        }
    }

    #[tokio::test]
    async fn writes_sql_file_for_a_clean_segment() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_json(
            input.path(),
            "seg1",
            &[
                r#"{"message": {"action":"B","xid":1,"lsn":"0/1","timestamp":"2026-01-01T00:00:00Z"}}"#,
                r#"{"message": {"action":"I","xid":1,"schema":"public","table":"t","new":[{"columnnames":["id"],"columnvalues":[{"type":"int8","value":1}]}]}}"#,
                r#"{"message": {"action":"C","xid":1,"lsn":"0/2","timestamp":"2026-01-01T00:00:01Z"}}"#,
            ],
        )
        .await;

        let (queue, rx) = NamedQueue::create("transform", 4);
        queue.send(SegmentJob { segment_name: "seg1".to_string(), is_final_segment: false }).await.unwrap();
        queue.send_stop().await.unwrap();

        run(rx, input.path().to_path_buf(), output.path().to_path_buf(), CancelFlags::new()).await.unwrap();

        let contents = tokio::fs::read_to_string(output.path().join("seg1.sql")).await.unwrap();
        assert!(contents.contains("BEGIN"));
        assert!(contents.contains("INSERT INTO"));
        assert!(contents.contains("COMMIT"));
    }

    #[tokio::test]
    async fn malformed_segment_keeps_partial_output() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_json(
            input.path(),
            "seg1",
            &[
                r#"{"message": {"action":"B","xid":1,"lsn":"0/1","timestamp":"2026-01-01T00:00:00Z"}}"#,
                "not valid json",
            ],
        )
        .await;

        let (queue, rx) = NamedQueue::create("transform", 4);
        queue.send(SegmentJob { segment_name: "seg1".to_string(), is_final_segment: false }).await.unwrap();
        queue.send_stop().await.unwrap();

        let result = run(rx, input.path().to_path_buf(), output.path().to_path_buf(), CancelFlags::new()).await;
        assert!(result.is_err());
        assert!(output.path().join("seg1.sql.partial").exists());
        assert!(!output.path().join("seg1.sql").exists());
    }
}
