//! Change-Stream Transformer error taxonomy (§7 "Parser: malformed JSON
//! message -> fatal for that segment"). A parse failure aborts the segment
//! currently being processed; the caller keeps the partially written SQL
//! file under its `.partial` suffix rather than renaming it into place.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("malformed logical-decoding message: {0}")]
    Parse(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid WAL lsn or segment computation: {0}")]
    Rotation(String),

    #[error("a transform-queue item named a WAL segment with no matching JSON file: {0}")]
    MissingSegmentFile(String),
}

pub type Result<T> = std::result::Result<T, TransformError>;
