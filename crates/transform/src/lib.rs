//! Change-Stream Transformer (§4.4/§4.6): turns logical-decoding JSON
//! messages into equivalent SQL, preserving transaction boundaries and
//! WAL-file rotation. Two entry points share the same parser, state
//! machine, and emitter: [`pipe`] streams continuously and rotates output
//! files by computing WAL segment names itself; [`file_worker`] processes
//! one already-delimited segment file at a time, pulling segment names
//! off a transform queue.

pub mod emitter;
pub mod error;
pub mod file_worker;
pub mod lsn;
pub mod message;
pub mod pipe;
pub mod state_machine;
pub mod value;

pub use error::{Result, TransformError};
pub use file_worker::SegmentJob;
pub use lsn::Lsn;
pub use message::Message;
pub use pipe::PipeStreamerConfig;
pub use state_machine::{OutputRecord, Transformer};
pub use value::{Tuple, Value};
