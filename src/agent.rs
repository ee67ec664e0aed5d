//! LLM agent module for paper summarisation.
//!
//! Talks to any OpenAI-compatible chat completion endpoint and consumes the
//! answer as a stream of text fragments.

use crate::config::{Config, OpenAiConfig};
use crate::sse::SseDecoder;
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("LLM request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("LLM API returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("LLM API error: {0}")]
    Api(String),
    #[error("malformed stream chunk: {0}")]
    Malformed(String),
}

/// Incremental model output
pub type FragmentStream = BoxStream<'static, Result<String, SummarizeError>>;

/// Something that can summarise extracted paper text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Start a summary; fragments arrive in order on the returned stream.
    async fn stream(&self, text: &str) -> Result<FragmentStream, SummarizeError>;
}

/// Drain a fragment stream, handing each fragment to `observer` as it arrives.
pub async fn collect_fragments<S, F>(mut fragments: S, mut observer: F) -> Result<String, SummarizeError>
where
    S: Stream<Item = Result<String, SummarizeError>> + Unpin,
    F: FnMut(&str),
{
    let mut summary = String::new();
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        observer(&fragment);
        summary.push_str(&fragment);
    }
    Ok(summary)
}

struct DecodeState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<String, SummarizeError>>,
    finished: bool,
}

/// Turn a raw SSE response body into content fragments.
///
/// Polling stops at `[DONE]` or the first transport error. A last line the
/// server left unterminated is still decoded when the body ends.
pub fn decode_fragments<S, B, E>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Send + 'static,
    SummarizeError: From<E>,
{
    let state = DecodeState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(fragment) = state.pending.pop_front() {
                return Some((fragment, state));
            }
            if state.finished || state.decoder.is_done() {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => state.pending.extend(state.decoder.feed(chunk.as_ref())),
                Some(Err(e)) => {
                    state.pending.push_back(Err(SummarizeError::from(e)));
                    state.finished = true;
                }
                None => {
                    state.pending.extend(state.decoder.finish());
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

/// Build the user turn carrying the paper text
pub fn user_message(text: &str) -> String {
    format!("Please summarize the following academic paper:\n{}", text)
}

/// Streaming chat-completion summariser
pub struct OpenAiSummarizer {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
    system_prompt: String,
    temperature: f32,
}

impl OpenAiSummarizer {
    pub fn new(config: &Config) -> Result<Self, SummarizeError> {
        Self::from_parts(&config.openai, config.system_prompt())
    }

    pub fn from_parts(openai: &OpenAiConfig, system_prompt: &str) -> Result<Self, SummarizeError> {
        let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        let base_url = openai.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: openai.api_key.clone(),
            model: openai.model.clone(),
            system_prompt: system_prompt.to_string(),
            temperature: openai.temperature,
        })
    }

    fn request<'a>(&'a self, user: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.temperature,
            stream: true,
        }
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn stream(&self, text: &str) -> Result<FragmentStream, SummarizeError> {
        let user = user_message(text);
        tracing::debug!(endpoint = %self.endpoint, model = %self.model, chars = text.len(), "requesting summary");

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(&user))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizeError::Status { status, body });
        }

        let fragments = decode_fragments(response.bytes_stream());
        Ok(fragments)
    }
}
