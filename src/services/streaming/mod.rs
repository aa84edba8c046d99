//! Streaming support for chat responses
//!
//! The server answers a submit with newline-delimited records. Records
//! carrying data start with `data:` followed by one JSON object and a
//! trailing comma:
//!
//! ```text
//! data:{"delta":{"content":"partial text"}},
//! data:{"delta":{"function_call":{"name":"fn","arguments":"{\"a\":1"}}},
//! ```
//!
//! Bytes flow through [`ChunkReassembler`] (UTF-8 and line reassembly),
//! [`strip_marker`] (record filter) and [`parse_delta`] before
//! [`StreamSession`] applies each [`Delta`] to the live message.

pub mod delta_parser;
pub mod events;
pub mod ingestor;
pub mod reassembler;
pub mod record;

pub use delta_parser::{normalize_newlines, parse_delta, Delta, LINE_BREAK, PARAGRAPH_BREAK};
pub use events::{delta_stream, LiveSnapshot, WatchSink};
pub use ingestor::{IngestState, StreamIngestor, StreamOutcome, StreamSession};
pub use reassembler::ChunkReassembler;
pub use record::{strip_marker, DATA_MARKER};
