use serde::{ Serialize, Deserialize };

use super::chat::Role;

fn default_language() -> String {
    "en".to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub role: Role,
    pub conversation_id: String,
    pub user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatResponse {
    pub response: String,
    pub language: Option<String>,
    pub audio_url: Option<String>,
    pub conversation_id: String,
}

#[derive(Debug, Clone)]
pub struct ImageQuery {
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
    pub message: String,
    pub conversation_id: String,
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ImageResponse {
    pub response: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub bytes: Vec<u8>,
    pub user_id: String,
    pub conversation_id: String,
    pub prompt: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DocumentResponse {
    pub response: String,
}

/// Text-to-speech input; accepted from the query string or a JSON body.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct SpeechParams {
    pub text: Option<String>,
    pub language: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SpeechResponse {
    pub audio_url: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TranslateRequest {
    pub text: String,
    #[serde(default = "default_language")]
    pub target_language: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TranslateResponse {
    pub translated_text: String,
    pub audio_url: String,
    pub language: String,
}
