//! Stream ingestion
//!
//! Drives one streaming chat turn: opens the stream, reassembles records,
//! parses deltas and applies them to the live message through a
//! [`MessageSink`].
//!
//! ```text
//! NoMessage --start--> Streaming --end of stream--> Finalized
//! ```
//!
//! A transport failure while streaming ends the turn with an error but
//! leaves whatever was already applied in the live message.

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    error::{ForgeError, Result},
    messages::ChatMessage,
    services::{MessageSink, StreamStatus, StreamTransport, SubmitRequest, THINKING_STATUS},
};

use super::{parse_delta, strip_marker, ChunkReassembler, Delta};

/// Lifecycle of a [`StreamSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    NoMessage,
    Streaming,
    Finalized,
}

/// Counters describing a finished stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOutcome {
    /// Deltas applied to the live message
    pub deltas_applied: usize,
    /// `data:` records that produced no delta
    pub records_dropped: usize,
    /// Records without the `data:` marker, blank separators included
    pub records_skipped: usize,
    /// Bytes of unterminated tail dropped at end of stream
    pub discarded_tail_bytes: usize,
    /// Whether any function-call fragment arrived
    pub saw_function_call: bool,
}

/// State of one streaming call
#[derive(Debug)]
pub struct StreamSession {
    conversation_id: String,
    reassembler: ChunkReassembler,
    state: IngestState,
    outcome: StreamOutcome,
}

impl StreamSession {
    #[must_use]
    pub fn new(conversation_id: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            reassembler: ChunkReassembler::new(),
            state: IngestState::NoMessage,
            outcome: StreamOutcome::default(),
        }
    }

    #[must_use]
    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    #[must_use]
    pub const fn state(&self) -> IngestState {
        self.state
    }

    /// Create the placeholder message before any bytes arrive
    pub fn start<S>(&mut self, sink: &mut S)
    where
        S: MessageSink + ?Sized,
    {
        if self.state != IngestState::NoMessage {
            return;
        }
        sink.begin_message();
        sink.update_status(StreamStatus::Running(THINKING_STATUS.to_string()));
        self.state = IngestState::Streaming;
    }

    /// Feed one chunk of the response body
    pub fn feed<S>(&mut self, chunk: &[u8], sink: &mut S)
    where
        S: MessageSink + ?Sized,
    {
        if self.state != IngestState::Streaming {
            return;
        }

        for record in self.reassembler.push(chunk) {
            let Some(payload) = strip_marker(&record) else {
                debug!(len = record.len(), "Skipping non-data record");
                self.outcome.records_skipped += 1;
                continue;
            };

            match parse_delta(payload) {
                Some(delta) => self.apply(delta, sink),
                None => {
                    debug!(len = payload.len(), "Dropping data record without delta");
                    self.outcome.records_dropped += 1;
                }
            }
        }
    }

    /// Apply a single delta to the live message and notify
    pub fn apply<S>(&mut self, delta: Delta, sink: &mut S)
    where
        S: MessageSink + ?Sized,
    {
        if self.state != IngestState::Streaming {
            return;
        }

        match delta {
            Delta::Content { text } => {
                debug!(len = text.len(), "Content delta");
                sink.append_to_last_message(&text);
            }
            Delta::FunctionCall {
                name,
                arguments_fragment,
            } => {
                debug!(name = ?name, len = arguments_fragment.len(), "Function call delta");
                self.outcome.saw_function_call = true;
                sink.set_function_call(name.as_deref(), &arguments_fragment);
            }
        }

        self.outcome.deltas_applied += 1;
        sink.notify();
    }

    /// End of stream: drop the unterminated tail and stop mutating
    pub fn finish<S>(&mut self, sink: &mut S) -> StreamOutcome
    where
        S: MessageSink + ?Sized,
    {
        if self.state == IngestState::Streaming {
            let discarded = self.reassembler.finish();
            if discarded > 0 {
                warn!(
                    conversation_id = %self.conversation_id,
                    bytes = discarded,
                    "Discarding unterminated record at end of stream"
                );
            }
            self.outcome.discarded_tail_bytes = discarded;
            sink.update_status(StreamStatus::Idle);
            self.state = IngestState::Finalized;
        }
        self.outcome
    }

    /// Transport failure: keep partial output, report and finalize
    pub fn fail<S>(&mut self, err: &ForgeError, sink: &mut S)
    where
        S: MessageSink + ?Sized,
    {
        error!(conversation_id = %self.conversation_id, error = %err, "Stream failed");
        self.reassembler.finish();
        sink.update_status(StreamStatus::Failed(err.to_string()));
        self.state = IngestState::Finalized;
    }

    /// Read `stream` to its end, applying every delta to `sink`.
    ///
    /// Stops early with [`ForgeError::Cancelled`] once `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns the first error the stream yields, or `Cancelled`
    pub async fn run<St, S>(
        &mut self,
        stream: St,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome>
    where
        St: Stream<Item = Result<bytes::Bytes>>,
        S: MessageSink + ?Sized,
    {
        self.start(sink);
        let mut stream = std::pin::pin!(stream);

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    let err = ForgeError::Cancelled;
                    self.fail(&err, sink);
                    return Err(err);
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => self.feed(&chunk, sink),
                Some(Err(err)) => {
                    self.fail(&err, sink);
                    return Err(err);
                }
                None => break,
            }
        }

        Ok(self.finish(sink))
    }
}

/// Runs streaming chat turns over a [`StreamTransport`]
pub struct StreamIngestor<T> {
    transport: T,
    post_process: bool,
}

impl<T: StreamTransport> StreamIngestor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            post_process: false,
        }
    }

    /// Replace the streamed message with the server-processed one afterwards
    #[must_use]
    pub fn with_post_process(mut self, enabled: bool) -> Self {
        self.post_process = enabled;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Submit `content` to the conversation and stream the reply into `sink`
    ///
    /// # Errors
    ///
    /// Returns a transport error if the stream cannot be opened or a read
    /// fails; the live message keeps what was applied before the failure
    pub async fn stream_submit<S>(
        &self,
        conversation_id: &str,
        content: &str,
        sink: &mut S,
    ) -> Result<StreamOutcome>
    where
        S: MessageSink + ?Sized,
    {
        self.stream_submit_with_cancel(conversation_id, content, sink, &CancellationToken::new())
            .await
    }

    /// Like [`Self::stream_submit`], stopping early when `cancel` fires
    ///
    /// # Errors
    ///
    /// As [`Self::stream_submit`], plus [`ForgeError::Cancelled`]
    pub async fn stream_submit_with_cancel<S>(
        &self,
        conversation_id: &str,
        content: &str,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<StreamOutcome>
    where
        S: MessageSink + ?Sized,
    {
        if conversation_id.trim().is_empty() {
            return Err(ForgeError::InvalidInput("conversation id is empty".to_string()));
        }

        info!(conversation_id, "Starting stream");
        let mut session = StreamSession::new(conversation_id);
        session.start(sink);

        let request = SubmitRequest::new(conversation_id, content);
        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ForgeError::Cancelled),
            opened = self.transport.open_stream(&request) => opened,
        };
        let stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                session.fail(&err, sink);
                return Err(err);
            }
        };

        let outcome = session.run(stream, sink, cancel).await?;
        info!(
            conversation_id = session.conversation_id(),
            deltas = outcome.deltas_applied,
            dropped = outcome.records_dropped,
            "Stream done"
        );

        let function_reply = outcome.saw_function_call
            || sink.live_message().is_some_and(ChatMessage::has_function_call);
        if self.post_process && !function_reply {
            let processed = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(conversation_id, "Cancelled before post-processing, keeping streamed message");
                    return Ok(outcome);
                }
                processed = self.transport.fetch_processed_last(conversation_id) => processed,
            };
            match processed {
                Ok(processed) => {
                    sink.replace_last_message(processed);
                    sink.notify();
                }
                Err(err) => warn!(conversation_id, error = %err, "Post-processing failed, keeping streamed message"),
            }
        }

        Ok(outcome)
    }
}
