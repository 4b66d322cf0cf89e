pub mod groq;

use async_trait::async_trait;
use base64::Engine;
use futures::{ Stream, StreamExt };
use std::pin::Pin;
use std::sync::Arc;

use super::LlmConfig;
use self::groq::GroqChatClient;
use crate::error::{ ProxyError, ProxyResult };
use crate::models::chat::{ ChatMessage, ContentPart, ImageUrl, MessageContent, Role };

/// Lazily produced text fragments of one model reply, in arrival order.
pub type TokenStream = Pin<Box<dyn Stream<Item = ProxyResult<String>> + Send>>;

#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn stream_chat(&self, messages: &[ChatMessage]) -> ProxyResult<TokenStream>;

    /// Accumulated form of [`ChatClient::stream_chat`].
    async fn complete(&self, messages: &[ChatMessage]) -> ProxyResult<String> {
        let stream = self.stream_chat(messages).await?;
        collect_stream(stream).await
    }

    fn get_model(&self) -> String;
}

/// Concatenates every non-empty fragment; the first error aborts.
pub async fn collect_stream(mut stream: TokenStream) -> ProxyResult<String> {
    let mut response = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        if !fragment.is_empty() {
            response.push_str(&fragment);
        }
    }
    Ok(response)
}

/// Builds the single user message used for image questions: the prompt
/// followed by the image inlined as a base64 data URL.
pub fn image_message(prompt: &str, mime_type: &str, bytes: &[u8]) -> ProxyResult<ChatMessage> {
    let mime = mime_type.trim().to_ascii_lowercase();
    let is_image = mime
        .strip_prefix("image/")
        .map(|sub| !sub.is_empty() && !sub.contains(char::is_whitespace))
        .unwrap_or(false);
    if !is_image {
        return Err(
            ProxyError::invalid_input(format!("Unsupported file type '{}': expected an image", mime_type))
        );
    }
    if bytes.is_empty() {
        return Err(ProxyError::invalid_input("Uploaded image is empty"));
    }

    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(ChatMessage {
        role: Role::User,
        content: MessageContent::Parts(
            vec![
                ContentPart::Text { text: prompt.to_string() },
                ContentPart::ImageUrl {
                    image_url: ImageUrl { url: format!("data:{};base64,{}", mime, encoded) },
                }
            ]
        ),
    })
}

pub fn new_client(config: &LlmConfig) -> ProxyResult<Arc<dyn ChatClient>> {
    let client = GroqChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
