//! Decoupled consumers of a stream
//!
//! [`WatchSink`] keeps the live message itself and publishes a snapshot on
//! every notification through a `tokio::sync::watch` channel, so a render
//! task can follow the stream without blocking the read loop: the channel
//! holds one value and a slow reader only ever sees the latest state.
//!
//! [`delta_stream`] exposes the parsed deltas of a raw body as a stream for
//! callers that want to do their own bookkeeping.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tracing::warn;

use crate::{
    error::Result,
    messages::{ChatMessage, FunctionCall},
    services::{MessageSink, StreamStatus},
};

use super::{parse_delta, strip_marker, ChunkReassembler, Delta};

/// State published after each change
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSnapshot {
    pub message: Option<ChatMessage>,
    pub status: StreamStatus,
    /// Number of notifications published so far
    pub revision: u64,
}

impl Default for LiveSnapshot {
    fn default() -> Self {
        Self {
            message: None,
            status: StreamStatus::Idle,
            revision: 0,
        }
    }
}

/// Sink that owns the live message and broadcasts snapshots
#[derive(Debug)]
pub struct WatchSink {
    message: Option<ChatMessage>,
    status: StreamStatus,
    revision: u64,
    tx: watch::Sender<LiveSnapshot>,
}

impl WatchSink {
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<LiveSnapshot>) {
        let (tx, rx) = watch::channel(LiveSnapshot::default());
        let sink = Self {
            message: None,
            status: StreamStatus::Idle,
            revision: 0,
            tx,
        };
        (sink, rx)
    }

    /// Hand the finished (or partial) message over to the caller
    #[must_use]
    pub fn into_message(self) -> Option<ChatMessage> {
        self.message
    }

    fn publish(&self) {
        self.tx.send_replace(LiveSnapshot {
            message: self.message.clone(),
            status: self.status.clone(),
            revision: self.revision,
        });
    }
}

impl MessageSink for WatchSink {
    fn begin_message(&mut self) {
        self.message = Some(ChatMessage::placeholder());
        self.publish();
    }

    fn append_to_last_message(&mut self, text: &str) {
        if let Some(message) = self.message.as_mut() {
            message.content.push_str(text);
        }
    }

    fn set_function_call(&mut self, name: Option<&str>, arguments_fragment: &str) {
        if let Some(message) = self.message.as_mut() {
            message
                .function_call
                .get_or_insert_with(FunctionCall::default)
                .absorb(name, arguments_fragment);
        }
    }

    fn notify(&mut self) {
        self.revision += 1;
        self.publish();
    }

    fn update_status(&mut self, status: StreamStatus) {
        self.status = status;
        self.publish();
    }

    fn replace_last_message(&mut self, message: ChatMessage) {
        if self.message.is_some() {
            self.message = Some(message);
        }
    }

    fn live_message(&self) -> Option<&ChatMessage> {
        self.message.as_ref()
    }
}

/// Parse a raw response body into a stream of deltas.
///
/// Records that yield no delta are skipped; a read error is yielded and
/// ends the stream.
pub fn delta_stream<St>(bytes: St) -> impl Stream<Item = Result<Delta>>
where
    St: Stream<Item = Result<Bytes>>,
{
    async_stream::try_stream! {
        let mut reassembler = ChunkReassembler::new();
        let mut bytes = std::pin::pin!(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk?;
            for record in reassembler.push(&chunk) {
                if let Some(delta) = strip_marker(&record).and_then(parse_delta) {
                    yield delta;
                }
            }
        }

        let discarded = reassembler.finish();
        if discarded > 0 {
            warn!(bytes = discarded, "Discarding unterminated record at end of stream");
        }
    }
}
