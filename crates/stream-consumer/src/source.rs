use std::fmt;
use std::pin::Pin;

use eventsource_stream::Eventsource as _;
use futures::{Stream, StreamExt as _};
use tracing::debug;

use crate::config::SessionConfig;
use crate::errors::{ConsumerError, SourceError};
use crate::event::StreamEvent;

/// Lazy, finite, non-restartable sequence of decoded events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, SourceError>> + Send>>;

/// Everything a source needs to open one response stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamRequest {
    pub session_id: uuid::Uuid,
    pub model: String,
    pub system_prompt: Option<String>,
    pub prompt: String,
}

/// Producer of event sequences.
///
/// Transport, framing and auth live behind this seam; the consumer only ever
/// sees the returned `EventStream`.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Opens a new event sequence for `request`.
    async fn open(&self, request: &StreamRequest) -> Result<EventStream, SourceError>;
}

/// Event source backed by the OpenAI Responses API (`stream: true`).
pub struct ResponsesSource {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl ResponsesSource {
    pub fn new(config: &SessionConfig) -> Result<Self, ConsumerError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ConsumerError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            url: config.responses_url(),
        })
    }
}

impl fmt::Debug for ResponsesSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponsesSource")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl EventSource for ResponsesSource {
    fn name(&self) -> &str {
        "openai-responses"
    }

    async fn open(&self, request: &StreamRequest) -> Result<EventStream, SourceError> {
        debug!(session_id = %request.session_id, model = %request.model, url = %self.url, "opening responses stream");
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&build_request_body(request))
            .send()
            .await
            .map_err(|e| SourceError::transport(format!("responses request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SourceError::upstream(
                format!("responses request failed with status {status}: {body}"),
                Some(status.as_u16()),
            ));
        }

        Ok(sse_event_stream(response.bytes_stream()))
    }
}

pub(crate) fn build_request_body(request: &StreamRequest) -> serde_json::Value {
    let mut input = Vec::new();
    if let Some(system_prompt) = request
        .system_prompt
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        input.push(serde_json::json!({
            "role": "system",
            "content": system_prompt,
        }));
    }
    input.push(serde_json::json!({
        "role": "user",
        "content": request.prompt,
    }));

    serde_json::json!({
        "model": request.model,
        "input": input,
        "stream": true,
        "store": false,
    })
}

/// Frames a raw SSE byte stream and decodes every frame into a `StreamEvent`.
pub fn sse_event_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    Box::pin(bytes.eventsource().filter_map(|item| {
        futures::future::ready(match item {
            Ok(event) => decode_sse_event(&event),
            Err(e) => Some(Err(SourceError::transport(format!(
                "event stream read failed: {e}"
            )))),
        })
    }))
}

fn decode_sse_event(
    event: &eventsource_stream::Event,
) -> Option<Result<StreamEvent, SourceError>> {
    let data = event.data.trim();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }
    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            return Some(Err(SourceError::transport(format!(
                "invalid SSE JSON frame: {e}"
            ))));
        }
    };
    // `message` is the SSE default name, not a discriminator.
    let fallback = Some(event.event.as_str()).filter(|name| *name != "message");
    Some(StreamEvent::from_json_with_fallback(&value, fallback))
}
