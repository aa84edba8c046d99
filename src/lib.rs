//! talkforge-rs: streaming chat client for the TalkForge server
//!
//! The core of this library is the stream ingestor in
//! [`services::streaming`], which turns the server's `data:` line protocol
//! into content and function-call deltas applied to a live assistant
//! message.

#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::too_many_lines)]

pub mod cli;
pub mod config;
pub mod error;
pub mod messages;
pub mod services;

// Re-exports for convenience
pub use error::{ForgeError, Result};
pub use messages::{ChatMessage, FunctionCall, MessageList, Role};
pub use services::{
    streaming::{Delta, StreamIngestor, StreamOutcome},
    ChatStreamClient, MessageSink, StreamStatus, StreamTransport,
};
