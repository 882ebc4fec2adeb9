//! Summarization providers.
//!
//! A provider turns one [`SummaryRequest`] into a finite, ordered stream of
//! text fragments. The future resolves once the request has been accepted
//! (the session is then `Streaming`); the stream ends when the model is done.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::stream::{self, BoxStream, Stream};
use futures_util::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::errors::ProviderError;
use crate::settings::compose_prompt;

pub type FragmentStream = BoxStream<'static, Result<String, ProviderError>>;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub base_url: Url,
    pub model: String,
    pub temperature: f32,
    pub prompt: String,
    pub template: String,
    pub note: String,
    /// Key of the default AI service, if it has one.
    pub api_key: Option<String>,
}

impl SummaryRequest {
    pub fn full_prompt(&self) -> String {
        compose_prompt(&self.prompt, &self.template, &self.note)
    }
}

pub trait SummaryProvider: Send + Sync {
    fn summarize(&self, request: SummaryRequest)
        -> BoxFuture<'static, Result<FragmentStream, ProviderError>>;
}

// ============================================================================
// Ollama
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// One line of Ollama's streaming `/api/generate` response.
#[derive(Debug, Deserialize, PartialEq)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Streams completions from a local Ollama server.
#[derive(Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new() -> Result<Self, ProviderError> {
        // No overall timeout: generation can take minutes. Only bound the connect.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client })
    }
}

/// Appends `api/generate` to the base path, keeping any prefix such as a
/// reverse-proxy mount point whether or not it ends in a slash.
pub fn generate_endpoint(base_url: &Url) -> Result<Url, ProviderError> {
    let mut endpoint = base_url.clone();
    endpoint
        .path_segments_mut()
        .map_err(|_| ProviderError::Transport(format!("Bad provider URL: {}", base_url)))?
        .pop_if_empty()
        .extend(["api", "generate"]);
    Ok(endpoint)
}

impl SummaryProvider for OllamaProvider {
    fn summarize(
        &self,
        request: SummaryRequest,
    ) -> BoxFuture<'static, Result<FragmentStream, ProviderError>> {
        let client = self.client.clone();
        async move {
            let endpoint = generate_endpoint(&request.base_url)?;
            let body = GenerateRequest {
                model: &request.model,
                prompt: request.full_prompt(),
                stream: true,
                options: GenerateOptions {
                    temperature: request.temperature,
                },
            };

            let mut builder = client.post(endpoint.clone()).json(&body);
            if let Some(key) = request.api_key.as_deref().filter(|k| !k.is_empty()) {
                builder = builder.bearer_auth(key);
            }

            info!(%endpoint, model = %request.model, "sending summary request");
            let response = builder.send().await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            Ok(decode_ndjson(response.bytes_stream()))
        }
        .boxed()
    }
}

// ============================================================================
// NDJSON decoding
// ============================================================================

/// Splits a byte stream into newline-delimited JSON chunks. Lines may arrive
/// split across reads, including in the middle of a UTF-8 sequence.
#[derive(Debug, Default)]
pub struct NdjsonDecoder {
    pending: Vec<u8>,
}

impl NdjsonDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) -> Vec<Result<GenerateChunk, ProviderError>> {
        self.pending.extend_from_slice(bytes);
        let mut out = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(parsed) = parse_line(&line) {
                out.push(parsed);
            }
        }
        out
    }

    /// Flush a trailing line that had no newline.
    pub fn finish(&mut self) -> Option<Result<GenerateChunk, ProviderError>> {
        let rest = std::mem::take(&mut self.pending);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Option<Result<GenerateChunk, ProviderError>> {
    let text = match std::str::from_utf8(line) {
        Ok(t) => t.trim(),
        Err(e) => return Some(Err(ProviderError::Malformed(e.to_string()))),
    };
    if text.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str::<GenerateChunk>(text)
            .map_err(|e| ProviderError::Malformed(format!("{}: {}", e, text))),
    )
}

struct DecodeState<S> {
    chunks: std::pin::Pin<Box<S>>,
    decoder: NdjsonDecoder,
    ready: VecDeque<Result<String, ProviderError>>,
    done: bool,
}

impl<S> DecodeState<S> {
    /// Queue the fragments carried by decoded chunks. Returns false once the
    /// stream is over (model finished or an error was queued).
    fn accept(&mut self, chunk: Result<GenerateChunk, ProviderError>) -> bool {
        match chunk {
            Ok(GenerateChunk {
                error: Some(error), ..
            }) => {
                self.ready.push_back(Err(ProviderError::Model(error)));
                false
            }
            Ok(chunk) => {
                if !chunk.response.is_empty() {
                    self.ready.push_back(Ok(chunk.response));
                }
                !chunk.done
            }
            Err(e) => {
                self.ready.push_back(Err(e));
                false
            }
        }
    }
}

/// Turn a raw NDJSON byte stream into a stream of text fragments.
pub fn decode_ndjson<S, B, E>(chunks: S) -> FragmentStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ProviderError> + Send + 'static,
{
    let state = DecodeState {
        chunks: Box::pin(chunks),
        decoder: NdjsonDecoder::new(),
        ready: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            match state.chunks.next().await {
                Some(Ok(bytes)) => {
                    for chunk in state.decoder.push(bytes.as_ref()) {
                        if !state.accept(chunk) {
                            state.done = true;
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    state.ready.push_back(Err(e.into()));
                    state.done = true;
                }
                None => {
                    if let Some(chunk) = state.decoder.finish() {
                        state.accept(chunk);
                    }
                    debug!("provider stream closed");
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}
