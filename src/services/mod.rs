//! Service layer for talking to the TalkForge server
//!
//! This module provides:
//! - [`StreamTransport`], the seam between the streaming core and HTTP
//! - [`MessageSink`], the narrow write interface the core uses on messages
//! - [`ChatStreamClient`], the reqwest-backed transport
//! - [`streaming`], the stream ingestor itself

pub mod chat_client;
pub mod streaming;

pub use chat_client::ChatStreamClient;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

use crate::{
    error::{ForgeError, Result},
    messages::ChatMessage,
};

/// Status text shown while the assistant is producing output
pub const THINKING_STATUS: &str = "Thinking...";

/// Raw response body as a stream of byte chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Body of a streaming submit request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub content: String,
    pub session_id: String,
}

impl SubmitRequest {
    #[must_use]
    pub fn new(session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            session_id: session_id.into(),
        }
    }
}

/// Progress indicator reported to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    /// Nothing in flight
    Idle,
    /// Stream open, output arriving
    Running(String),
    /// Stream ended with an error
    Failed(String),
}

/// Capability interface the streaming core writes through.
///
/// Implementations own the message list; the core only ever touches the
/// message created by [`MessageSink::begin_message`]. All calls happen on
/// the read loop, so none of them may block.
pub trait MessageSink {
    /// Append an empty assistant message and make it the live message
    fn begin_message(&mut self);

    /// Append text to the live message's content
    fn append_to_last_message(&mut self, text: &str);

    /// Fold a function-call fragment into the live message
    fn set_function_call(&mut self, name: Option<&str>, arguments_fragment: &str);

    /// Signal that the live message changed
    fn notify(&mut self);

    /// Report a status change
    fn update_status(&mut self, _status: StreamStatus) {}

    /// Swap the live message for a server-processed version
    fn replace_last_message(&mut self, _message: ChatMessage) {}

    /// Current state of the live message, if the sink can expose it
    fn live_message(&self) -> Option<&ChatMessage> {
        None
    }
}

/// Transport used to open a streaming chat turn
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Submit user content and return the response body as raw bytes
    async fn open_stream(&self, request: &SubmitRequest) -> Result<ByteStream>;

    /// Fetch the server's post-processed version of the last message
    async fn fetch_processed_last(&self, session_id: &str) -> Result<ChatMessage> {
        Err(ForgeError::Other(format!(
            "post-processing not supported for session {session_id}"
        )))
    }
}
