//! Pipe-mode entry point (§4.6): reads a continuous stream of
//! logical-decoding messages (normally stdin, piped straight from the
//! source's replication connection) and writes SQL as it goes, rotating
//! the output file whenever the computed WAL segment name changes. Unlike
//! file-mode, this side has no prior knowledge of segment boundaries — it
//! discovers them itself from each message's LSN.

use crate::emitter::render_line;
use crate::error::Result;
use crate::lsn::{wal_segment_name, Lsn};
use crate::message::parse_line;
use crate::state_machine::Transformer;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

pub struct PipeStreamerConfig {
    pub output_dir: PathBuf,
    pub timeline: u32,
    pub wal_seg_size: u64,
}

struct RotatingFile {
    segment_name: Option<String>,
    file: Option<tokio::fs::File>,
}

impl RotatingFile {
    fn new() -> Self {
        Self { segment_name: None, file: None }
    }

    async fn rotate_if_needed(&mut self, output_dir: &Path, segment_name: &str) -> Result<()> {
        if self.segment_name.as_deref() == Some(segment_name) {
            return Ok(());
        }
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        let path = output_dir.join(format!("{segment_name}.sql"));
        let file = tokio::fs::OpenOptions::new().create(true).append(true).open(path).await?;
        self.segment_name = Some(segment_name.to_string());
        self.file = Some(file);
        Ok(())
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.write_all(line.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        Ok(())
    }
}

/// Streams `input` line by line through the transformer, writing rendered
/// SQL both to the rotating on-disk segment files and to `echo` (normally
/// stdout) so a downstream apply process can consume it without touching
/// the filesystem.
pub async fn stream<R, W>(input: R, mut echo: W, config: PipeStreamerConfig) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut transformer = Transformer::new();
    let mut rotating = RotatingFile::new();
    let mut lines = BufReader::new(input).lines();
    let mut last_lsn = Lsn::default();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let msg = parse_line(&line)?;
        let lsn = msg.lsn();
        let effective_lsn = if lsn == Lsn::default() { last_lsn } else { lsn };
        last_lsn = effective_lsn;

        let segment_name = wal_segment_name(config.timeline, config.wal_seg_size, effective_lsn)?;
        rotating.rotate_if_needed(&config.output_dir, &segment_name).await?;

        transformer.process(msg)?;
        for record in transformer.take_segment_output() {
            let rendered = render_line(&record);
            rotating.write_line(&rendered).await?;
            echo.write_all(rendered.as_bytes()).await?;
            echo.write_all(b"\n").await?;
        }
    }

    if transformer.has_open_transaction() {
        transformer.finalize_at_endpos(last_lsn, Utc::now());
        for record in transformer.take_segment_output() {
            let rendered = render_line(&record);
            rotating.write_line(&rendered).await?;
            echo.write_all(rendered.as_bytes()).await?;
            echo.write_all(b"\n").await?;
        }
    }

    rotating.close().await?;
    echo.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn rotates_output_file_across_segment_boundary() {
        let output = tempdir().unwrap();
        let wal_seg_size = 16 * 1024 * 1024u64;
        // first lsn in segment 0, second lsn one full log unit later (segment rolls).
        let input = format!(
            "{{\"message\": {{\"action\":\"B\",\"xid\":1,\"lsn\":\"0/1\",\"timestamp\":\"2026-01-01T00:00:00Z\"}}}}\n\
             {{\"message\": {{\"action\":\"C\",\"xid\":1,\"lsn\":\"0/2\",\"timestamp\":\"2026-01-01T00:00:01Z\"}}}}\n\
             {{\"message\": {{\"action\":\"B\",\"xid\":2,\"lsn\":\"1/0\",\"timestamp\":\"2026-01-01T00:00:02Z\"}}}}\n\
             {{\"message\": {{\"action\":\"C\",\"xid\":2,\"lsn\":\"1/2\",\"timestamp\":\"2026-01-01T00:00:03Z\"}}}}\n"
        );

        let config = PipeStreamerConfig { output_dir: output.path().to_path_buf(), timeline: 1, wal_seg_size };
        let mut echo = Vec::new();
        stream(input.as_bytes(), &mut echo, config).await.unwrap();

        let seg0 = wal_segment_name(1, wal_seg_size, Lsn::parse("0/1").unwrap()).unwrap();
        let seg1 = wal_segment_name(1, wal_seg_size, Lsn::parse("1/0").unwrap()).unwrap();
        assert_ne!(seg0, seg1);
        assert!(output.path().join(format!("{seg0}.sql")).exists());
        assert!(output.path().join(format!("{seg1}.sql")).exists());
    }

    #[tokio::test]
    async fn echoes_rendered_lines_to_downstream_sink() {
        let output = tempdir().unwrap();
        let input = "{\"message\": {\"action\":\"B\",\"xid\":1,\"lsn\":\"0/1\",\"timestamp\":\"2026-01-01T00:00:00Z\"}}\n\
             {\"message\": {\"action\":\"C\",\"xid\":1,\"lsn\":\"0/2\",\"timestamp\":\"2026-01-01T00:00:01Z\"}}\n";
        let config = PipeStreamerConfig { output_dir: output.path().to_path_buf(), timeline: 1, wal_seg_size: 16 * 1024 * 1024 };
        let mut echo = Vec::new();
        stream(input.as_bytes(), &mut echo, config).await.unwrap();
        let text = String::from_utf8(echo).unwrap();
        assert!(text.contains("BEGIN"));
        assert!(text.contains("COMMIT"));
    }
}
