use log::{ info, warn };
use std::error::Error;
use std::sync::Arc;

use crate::cleanup::CleanupScheduler;
use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig };
use crate::error::{ ProxyError, ProxyResult };
use crate::extract::extract_text;
use crate::language::detect_language;
use crate::llm::chat::{ image_message, new_client as new_chat_client, ChatClient };
use crate::models::api::{
    ChatRequest,
    ChatResponse,
    DocumentQuery,
    DocumentResponse,
    ImageQuery,
    ImageResponse,
    SpeechParams,
    SpeechResponse,
    TranslateRequest,
    TranslateResponse,
};
use crate::models::chat::{ ChatMessage, Role, SessionKey };
use crate::session::{ initialize_session_store, SessionStore };
use crate::speech::{ voices, AudioArtifact, SpeechService };

/// Composes the model client, session store, speech service and cleanup
/// scheduler behind the HTTP endpoints.
#[derive(Clone)]
pub struct ProxyAgent {
    chat_client: Arc<dyn ChatClient>,
    sessions: Arc<dyn SessionStore>,
    speech: SpeechService,
    cleanup: CleanupScheduler,
    prompt_config: Arc<PromptConfig>,
    default_language: String,
}

fn require_non_empty(value: &str, field: &str) -> ProxyResult<()> {
    if value.trim().is_empty() {
        return Err(ProxyError::invalid_input(format!("'{}' must not be empty", field)));
    }
    Ok(())
}

impl ProxyAgent {
    pub async fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let llm_config = args.llm_config();
        let chat_client = new_chat_client(&llm_config)?;
        info!(
            "Chat client configured: Model={}, BaseURL={}",
            chat_client.get_model(),
            llm_config.base_url.as_deref().unwrap_or("adapter default")
        );

        let prompt_config = prompt::load_prompts(args.prompts_path.as_deref())?;
        let sessions = initialize_session_store(&prompt_config.chat_system);

        let speech_config = args.speech_config();
        if speech_config.api_key.is_empty() {
            warn!("SPEECH_API_KEY is empty; speech synthesis requests will likely be rejected upstream.");
        }
        tokio::fs::create_dir_all(&speech_config.audio_dir).await?;
        info!("Audio files are written to {}", speech_config.audio_dir.display());
        let speech = SpeechService::from_config(&speech_config)?;

        let cleanup = CleanupScheduler::new(args.audio_ttl());

        Ok(
            Self::from_parts(
                chat_client,
                sessions,
                speech,
                cleanup,
                prompt_config,
                voices::resolve(&args.default_language)?.code.to_string()
            )
        )
    }

    pub fn from_parts(
        chat_client: Arc<dyn ChatClient>,
        sessions: Arc<dyn SessionStore>,
        speech: SpeechService,
        cleanup: CleanupScheduler,
        prompt_config: Arc<PromptConfig>,
        default_language: String
    ) -> Self {
        Self {
            chat_client,
            sessions,
            speech,
            cleanup,
            prompt_config,
            default_language,
        }
    }

    pub fn speech(&self) -> &SpeechService {
        &self.speech
    }

    pub fn cleanup(&self) -> &CleanupScheduler {
        &self.cleanup
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Synthesizes speech and schedules the resulting file for deletion.
    async fn speak(&self, text: &str, language: &str) -> ProxyResult<AudioArtifact> {
        let artifact = self.speech.synthesize(text, language).await?;
        self.cleanup.schedule(&artifact.path);
        Ok(artifact)
    }

    /// Speaks `text` when it has content; an empty model reply has no audio.
    async fn speak_reply(&self, text: &str, language: &str) -> ProxyResult<Option<String>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(self.speak(text, language).await?.url))
    }

    pub async fn chat(&self, req: ChatRequest) -> ProxyResult<ChatResponse> {
        require_non_empty(&req.message, "message")?;
        require_non_empty(&req.user_id, "user_id")?;
        require_non_empty(&req.conversation_id, "conversation_id")?;
        if req.role == Role::System {
            return Err(ProxyError::invalid_input("'role' must be 'user' or 'assistant'"));
        }

        let key = SessionKey::new(req.user_id, req.conversation_id);
        let session = self.sessions.load_or_init(&key).await;
        let detected = detect_language(&req.message);
        info!(
            "Chat {} ({} prior messages, detected language {:?})",
            key,
            session.messages.len(),
            detected
        );

        let user_message = ChatMessage::new(req.role, req.message);
        let mut prompt = session.messages;
        prompt.push(user_message.clone());

        let reply = self.chat_client.complete(&prompt).await?;
        let language = detected.clone().unwrap_or_else(|| self.default_language.clone());
        // History only changes once the whole turn, audio included, succeeded.
        let audio_url = self.speak_reply(&reply, &language).await?;

        self.sessions.append(
            &key,
            vec![user_message, ChatMessage::assistant(reply.clone())],
            detected
        ).await;

        Ok(ChatResponse {
            response: reply,
            language: Some(language),
            audio_url,
            conversation_id: key.conversation_id,
        })
    }

    pub async fn image_query(&self, query: ImageQuery) -> ProxyResult<ImageResponse> {
        require_non_empty(&query.message, "message")?;
        let mime_type = query.mime_type
            .as_deref()
            .ok_or_else(|| ProxyError::invalid_input("Uploaded file has no content type"))?;
        let message = image_message(&query.message, mime_type, &query.bytes)?;
        info!(
            "Image query for conversation {} (user {:?}, {} bytes, {})",
            query.conversation_id,
            query.user_id,
            query.bytes.len(),
            mime_type
        );

        let reply = self.chat_client.complete(&[message]).await?;
        let audio_url = self.speak_reply(&reply, &self.default_language).await?;

        Ok(ImageResponse { response: reply, audio_url })
    }

    pub async fn document_query(&self, query: DocumentQuery) -> ProxyResult<DocumentResponse> {
        require_non_empty(&query.prompt, "prompt")?;
        info!(
            "Document query for {}/{} ({} bytes)",
            query.user_id,
            query.conversation_id,
            query.bytes.len()
        );

        let text = extract_text(query.bytes).await;
        if text.trim().is_empty() {
            return Err(ProxyError::EmptyDocument);
        }

        let messages = vec![
            ChatMessage::system(self.prompt_config.document_system.clone()),
            ChatMessage::user(prompt::get_document_user_prompt(&self.prompt_config, &text, &query.prompt))
        ];
        let reply = self.chat_client.complete(&messages).await?;
        Ok(DocumentResponse { response: reply })
    }

    pub async fn text_to_speech(&self, params: SpeechParams) -> ProxyResult<SpeechResponse> {
        let text = params.text.unwrap_or_default();
        require_non_empty(&text, "text")?;
        let language = params.language
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.default_language.clone());

        let artifact = self.speak(&text, &language).await?;
        Ok(SpeechResponse { audio_url: artifact.url })
    }

    pub async fn speak_translated(&self, req: TranslateRequest) -> ProxyResult<TranslateResponse> {
        require_non_empty(&req.text, "text")?;
        let voice = voices::resolve(&req.target_language)?;
        info!("Translating {} characters into {}", req.text.len(), voice.code);

        let messages = vec![
            ChatMessage::system(prompt::get_translation_system_prompt(&self.prompt_config, voice.language)),
            ChatMessage::user(req.text)
        ];
        let translated = self.chat_client.complete(&messages).await?.trim().to_string();
        if translated.is_empty() {
            return Err(ProxyError::upstream("translation returned no text"));
        }

        let artifact = self.speak(&translated, voice.code).await?;
        Ok(TranslateResponse {
            translated_text: translated,
            audio_url: artifact.url,
            language: voice.code.to_string(),
        })
    }
}
