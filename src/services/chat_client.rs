//! HTTP transport for the TalkForge chat endpoints

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client};
use tracing::debug;

use crate::{
    config::ClientConfig,
    error::{ForgeError, Result},
    messages::ChatMessage,
};

use super::{ByteStream, StreamTransport, SubmitRequest};

/// reqwest-backed [`StreamTransport`]
#[derive(Debug, Clone)]
pub struct ChatStreamClient {
    client: Client,
    config: ClientConfig,
}

impl ChatStreamClient {
    /// Create a client for the server described by `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = Client::builder().default_headers({
            let mut headers = header::HeaderMap::new();
            headers.insert(
                header::CACHE_CONTROL,
                header::HeaderValue::from_static("no-cache"),
            );
            headers
        });
        // Connect only: a whole-request timeout would cut long streams.
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(ForgeError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl StreamTransport for ChatStreamClient {
    async fn open_stream(&self, request: &SubmitRequest) -> Result<ByteStream> {
        let url = self.config.stream_url();
        debug!(%url, session_id = %request.session_id, "Opening chat stream");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ForgeError::Transport(e.to_string())));
        Ok(Box::pin(body))
    }

    async fn fetch_processed_last(&self, session_id: &str) -> Result<ChatMessage> {
        let url = self.config.post_process_url(session_id);
        debug!(%url, "Fetching post-processed message");

        let response = self.client.get(&url).send().await?;
        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }
}
