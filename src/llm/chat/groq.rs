use async_trait::async_trait;
use futures::StreamExt;
use log::{ debug, error, info };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ ChatClient, TokenStream };
use crate::error::{ ProxyError, ProxyResult };
use crate::llm::{ LlmConfig, SamplingParams, DEFAULT_GROQ_MODEL, DEFAULT_GROQ_URL };
use crate::models::chat::ChatMessage;

pub struct GroqChatClient {
    http: HttpClient,
    model: String,
    base_url: String,
    sampling: SamplingParams,
}

#[derive(Serialize)]
struct GroqRequest<'a> {
    messages: &'a [ChatMessage],
    model: &'a str,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct GroqStreamResponse {
    #[serde(default)]
    choices: Vec<GroqStreamChoice>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GroqStreamChoice {
    #[serde(default)]
    delta: Option<GroqDelta>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GroqDelta {
    content: Option<String>,
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Token(String),
    Done,
    /// Error object sent in place of a completion chunk.
    Failed(String),
}

/// Splits a server-sent event byte stream into complete `data:` lines.
/// Lines that straddle network chunks are held until their newline arrives.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            events.extend(parse_sse_line(line.trim_end_matches(['\r', '\n'])));
        }
        events
    }

    fn finish(&mut self) -> Vec<SseEvent> {
        let rest = std::mem::take(&mut self.buffer);
        let line = String::from_utf8_lossy(&rest);
        parse_sse_line(line.trim()).into_iter().collect()
    }
}

fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(SseEvent::Done);
    }
    match serde_json::from_str::<GroqStreamResponse>(data) {
        Ok(GroqStreamResponse { error: Some(err), .. }) => {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            Some(SseEvent::Failed(message))
        }
        Ok(resp) => {
            let choice = resp.choices.into_iter().next()?;
            let content = choice.delta.and_then(|d| d.content).filter(|c| !c.is_empty());
            match (content, choice.finish_reason.as_deref()) {
                (Some(text), _) => Some(SseEvent::Token(text)),
                (None, Some("stop")) => Some(SseEvent::Done),
                (None, _) => None,
            }
        }
        Err(e) => {
            debug!("Failed to parse Groq chunk: {}, error: {}", data, e);
            None
        }
    }
}

/// Sends one decoded event to the consumer. Returns false once the stream
/// is over, either by completion, by an upstream error or because the
/// receiver went away.
async fn forward_event(tx: &mpsc::Sender<ProxyResult<String>>, event: SseEvent) -> bool {
    match event {
        SseEvent::Token(text) => tx.send(Ok(text)).await.is_ok(),
        SseEvent::Done => false,
        SseEvent::Failed(message) => {
            error!("Groq stream reported an error: {}", message);
            let _ = tx.send(Err(ProxyError::upstream(message))).await;
            false
        }
    }
}

impl GroqChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>,
        sampling: SamplingParams
    ) -> ProxyResult<Self> {
        let chat_model = model.unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string());
        let api_url = base_url.unwrap_or_else(|| DEFAULT_GROQ_URL.to_string());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e|
                ProxyError::Config(format!("Invalid API key format: {}", e))
            )?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProxyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            model: chat_model,
            base_url: api_url,
            sampling,
        })
    }

    pub fn from_config(config: &LlmConfig) -> ProxyResult<Self> {
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProxyError::Config("Groq API key is required".to_string()))?;

        Self::new(
            api_key,
            config.completion_model.clone(),
            config.base_url.clone(),
            config.sampling
        )
    }
}

#[async_trait]
impl ChatClient for GroqChatClient {
    async fn stream_chat(&self, messages: &[ChatMessage]) -> ProxyResult<TokenStream> {
        let req = GroqRequest {
            messages,
            model: &self.model,
            temperature: self.sampling.temperature,
            top_p: self.sampling.top_p,
            max_tokens: self.sampling.max_tokens,
            stream: true,
        };

        info!("Starting Groq stream request to {} ({} messages)", self.base_url, messages.len());

        let resp = self.http
            .post(&self.base_url)
            .json(&req)
            .send().await
            .map_err(|e| {
                error!("Groq request error: {}", e);
                ProxyError::upstream(e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("Groq API error: {} {}", status, body);
            return Err(ProxyError::upstream(format!("HTTP {} {}", status, body).trim_end()));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut bytes = resp.bytes_stream();

        tokio::spawn(async move {
            let mut decoder = SseDecoder::default();
            while let Some(chunk_result) = bytes.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        for event in decoder.push(&chunk) {
                            if !forward_event(&tx, event).await {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        error!("Groq stream error: {}", e);
                        let _ = tx.send(Err(ProxyError::upstream(e))).await;
                        return;
                    }
                }
            }
            for event in decoder.finish() {
                if !forward_event(&tx, event).await {
                    return;
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}
