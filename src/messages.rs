//! Message types for chat sessions
//!
//! Defines the chat messages a session holds, the function-call
//! accumulator an assistant message grows while streaming, and the
//! caller-owned [`MessageList`] the streaming core writes into.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::{MessageSink, StreamStatus};

/// Message role in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Function,
}

/// Function invocation assembled from streamed fragments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

impl FunctionCall {
    /// Fold one streamed fragment into the call.
    ///
    /// The first non-empty name is kept; later names are ignored.
    /// Argument fragments are concatenated in arrival order.
    pub fn absorb(&mut self, name: Option<&str>, arguments_fragment: &str) {
        if self.name.is_empty() {
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                self.name = name.to_string();
            }
        }
        self.arguments.push_str(arguments_fragment);
    }

    /// Parse the accumulated arguments as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are not a complete JSON document
    pub fn parsed_arguments(&self) -> serde_json::Result<serde_json::Value> {
        if self.arguments.is_empty() {
            return Ok(serde_json::Value::Object(serde_json::Map::new()));
        }
        serde_json::from_str(&self.arguments)
    }
}

/// A single message in a chat session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<Uuid>,
}

impl ChatMessage {
    /// Create a new user message
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
            function_call: None,
            uuid: Some(Uuid::new_v4()),
        }
    }

    /// Create a new assistant message
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            function_call: None,
            uuid: Some(Uuid::new_v4()),
        }
    }

    /// Empty assistant message used as the streaming placeholder
    #[must_use]
    pub fn placeholder() -> Self {
        Self::assistant(String::new())
    }

    /// Check if message carries a function call
    #[must_use]
    pub const fn has_function_call(&self) -> bool {
        self.function_call.is_some()
    }
}

/// Ordered list of messages owned by the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageList {
    messages: Vec<ChatMessage>,
}

impl MessageList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: ChatMessage) -> usize {
        self.messages.push(message);
        self.messages.len() - 1
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ChatMessage> {
        self.messages.get(index)
    }

    #[must_use]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    /// Borrow the list as a sink for one streaming turn.
    ///
    /// `on_update` runs synchronously after every applied delta and
    /// blocks the next read while it runs, so keep it short.
    pub fn live<F>(&mut self, on_update: F) -> LiveMessage<'_, F>
    where
        F: FnMut(&ChatMessage),
    {
        LiveMessage {
            messages: self,
            index: None,
            status: StreamStatus::Idle,
            on_update,
        }
    }
}

/// Write handle onto the single in-flight assistant message
pub struct LiveMessage<'a, F> {
    messages: &'a mut MessageList,
    index: Option<usize>,
    status: StreamStatus,
    on_update: F,
}

impl<F> LiveMessage<'_, F> {
    /// Index of the live message within the list, once started
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    /// Last status reported by the streaming core
    #[must_use]
    pub const fn status(&self) -> &StreamStatus {
        &self.status
    }

    fn live_mut(&mut self) -> Option<&mut ChatMessage> {
        let index = self.index?;
        self.messages.messages.get_mut(index)
    }
}

impl<F> MessageSink for LiveMessage<'_, F>
where
    F: FnMut(&ChatMessage),
{
    fn begin_message(&mut self) {
        self.index = Some(self.messages.push(ChatMessage::placeholder()));
    }

    fn append_to_last_message(&mut self, text: &str) {
        if let Some(message) = self.live_mut() {
            message.content.push_str(text);
        }
    }

    fn set_function_call(&mut self, name: Option<&str>, arguments_fragment: &str) {
        if let Some(message) = self.live_mut() {
            message
                .function_call
                .get_or_insert_with(FunctionCall::default)
                .absorb(name, arguments_fragment);
        }
    }

    fn notify(&mut self) {
        if let Some(index) = self.index {
            if let Some(message) = self.messages.messages.get(index) {
                (self.on_update)(message);
            }
        }
    }

    fn update_status(&mut self, status: StreamStatus) {
        self.status = status;
    }

    fn replace_last_message(&mut self, message: ChatMessage) {
        if let Some(live) = self.live_mut() {
            *live = message;
        }
    }

    fn live_message(&self) -> Option<&ChatMessage> {
        self.messages.messages.get(self.index?)
    }
}
