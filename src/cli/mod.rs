use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::cleanup::{ MAX_AUDIO_TTL_SECS, MIN_AUDIO_TTL_SECS };
use crate::error::{ ProxyError, ProxyResult };
use crate::llm::{ LlmConfig, SamplingParams, DEFAULT_GROQ_MODEL, DEFAULT_GROQ_URL };
use crate::speech::{ azure, voices, SpeechConfig };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// API key for the Groq chat completion API. The server refuses to start without it.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub groq_api_key: String,

    /// Model name for chat completion.
    #[arg(long, env = "CHAT_MODEL", default_value = DEFAULT_GROQ_MODEL)]
    pub chat_model: String,

    /// Chat completion endpoint (OpenAI-compatible).
    #[arg(long, env = "CHAT_BASE_URL", default_value = DEFAULT_GROQ_URL)]
    pub chat_base_url: String,

    /// Optional JSON file overriding the built-in system and translation prompts.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    // --- Speech Args ---
    /// Region of the text-to-speech service, used to derive the endpoint.
    #[arg(long, env = "SPEECH_REGION", default_value = "eastus")]
    pub speech_region: String,

    /// Full text-to-speech endpoint. Overrides --speech-region when set.
    #[arg(long, env = "SPEECH_ENDPOINT")]
    pub speech_endpoint: Option<String>,

    /// Subscription key for the text-to-speech service.
    #[arg(long, env = "SPEECH_API_KEY", default_value = "", hide_env_values = true)]
    pub speech_api_key: String,

    /// Language code used for speech when none is requested or detected.
    #[arg(long, env = "DEFAULT_LANGUAGE", default_value = "en")]
    pub default_language: String,

    /// Directory where synthesized audio files are written and served from.
    #[arg(long, env = "AUDIO_DIR", default_value = "static/audio")]
    pub audio_dir: PathBuf,

    /// Seconds before a synthesized audio file is deleted.
    #[arg(
        long,
        env = "AUDIO_TTL_SECS",
        default_value_t = MIN_AUDIO_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(MIN_AUDIO_TTL_SECS..=MAX_AUDIO_TTL_SECS)
    )]
    pub audio_ttl_secs: u64,

    /// Absolute URL prefix for returned audio links (e.g. http://localhost:8000). Relative links when unset.
    #[arg(long, env = "PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,

    // --- General App Args ---
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8000")]
    pub server_addr: String,

    /// Comma-separated CORS origin allowlist; "*" allows any origin.
    #[arg(long, env = "CORS_ORIGINS", default_value = "*", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Enable debug logging/output
    #[arg(long, env = "DEBUG", default_value = "false")]
    pub debug: bool,

    /// Optional path to the TLS certificate file (PEM format) for enabling HTTPS. Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format) for enabling HTTPS. Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    /// Startup checks clap cannot express on its own.
    pub fn validate(&self) -> ProxyResult<()> {
        if self.groq_api_key.trim().is_empty() {
            return Err(
                ProxyError::Config(
                    "API key for Groq is missing. Please set GROQ_API_KEY in the environment or .env file.".to_string()
                )
            );
        }
        voices::resolve(&self.default_language).map_err(|e|
            ProxyError::Config(format!("Invalid --default-language: {}", e))
        )?;
        for url in [Some(&self.chat_base_url), self.speech_endpoint.as_ref(), self.public_base_url.as_ref()]
            .into_iter()
            .flatten() {
            url::Url::parse(url).map_err(|e| ProxyError::Config(format!("Invalid URL '{}': {}", url, e)))?;
        }
        if self.enable_tls && (self.tls_cert_path.is_none() || self.tls_key_path.is_none()) {
            return Err(
                ProxyError::Config(
                    "Both --tls-cert-path and --tls-key-path must be provided to enable TLS.".to_string()
                )
            );
        }
        Ok(())
    }

    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            api_key: Some(self.groq_api_key.clone()),
            completion_model: Some(self.chat_model.clone()),
            base_url: Some(self.chat_base_url.clone()),
            sampling: SamplingParams::default(),
        }
    }

    pub fn speech_config(&self) -> SpeechConfig {
        SpeechConfig {
            endpoint: self.speech_endpoint
                .clone()
                .unwrap_or_else(|| azure::default_endpoint(&self.speech_region)),
            api_key: self.speech_api_key.clone(),
            audio_dir: self.audio_dir.clone(),
            public_base_url: self.public_base_url.clone(),
        }
    }

    pub fn audio_ttl(&self) -> Duration {
        Duration::from_secs(self.audio_ttl_secs)
    }
}
