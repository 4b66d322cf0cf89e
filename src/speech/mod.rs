pub mod azure;
pub mod voices;

use async_trait::async_trait;
use log::{ info, warn };
use std::path::{ Path, PathBuf };
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ ProxyError, ProxyResult };
use self::azure::AzureSpeechClient;
pub use self::voices::Voice;

pub const AUDIO_ROUTE: &str = "/audio";

/// Backend that turns text into encoded audio for a given voice.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &Voice) -> ProxyResult<Vec<u8>>;

    fn file_extension(&self) -> &'static str {
        "mp3"
    }
}

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub endpoint: String,
    pub api_key: String,
    pub audio_dir: PathBuf,
    pub public_base_url: Option<String>,
}

/// A synthesized speech file exposed under [`AUDIO_ROUTE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub file_name: String,
    pub path: PathBuf,
    pub url: String,
}

#[derive(Clone)]
pub struct SpeechService {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    audio_dir: PathBuf,
    public_base_url: Option<String>,
}

impl SpeechService {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        audio_dir: impl Into<PathBuf>,
        public_base_url: Option<String>
    ) -> Self {
        Self {
            synthesizer,
            audio_dir: audio_dir.into(),
            public_base_url: public_base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
        }
    }

    pub fn from_config(config: &SpeechConfig) -> ProxyResult<Self> {
        let client = AzureSpeechClient::new(config.endpoint.clone(), config.api_key.clone())?;
        Ok(Self::new(Arc::new(client), config.audio_dir.clone(), config.public_base_url.clone()))
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Synthesizes `text` with the voice for `language` and writes it to a
    /// freshly named file. Unknown languages are rejected before any write.
    pub async fn synthesize(&self, text: &str, language: &str) -> ProxyResult<AudioArtifact> {
        let voice = voices::resolve(language)?;
        if text.trim().is_empty() {
            return Err(ProxyError::invalid_input("Text for speech synthesis must not be empty"));
        }

        let audio = self.synthesizer.synthesize(text, &voice).await?;
        if audio.is_empty() {
            return Err(ProxyError::speech("synthesizer returned no audio"));
        }

        tokio::fs::create_dir_all(&self.audio_dir).await?;
        let file_name = format!("{}.{}", Uuid::new_v4(), self.synthesizer.file_extension());
        let path = self.audio_dir.join(&file_name);
        tokio::fs::write(&path, &audio).await?;

        let written = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            warn!("Audio file {} missing or empty after write", path.display());
            return Err(ProxyError::speech(format!("audio file {} was not written", file_name)));
        }

        info!(
            "Synthesized {} bytes of speech ({}, {}) to {}",
            written,
            voice.code,
            voice.voice_id,
            path.display()
        );

        Ok(AudioArtifact {
            url: self.url_for(&file_name),
            file_name,
            path,
        })
    }

    pub fn url_for(&self, file_name: &str) -> String {
        match &self.public_base_url {
            Some(base) => format!("{}{}/{}", base, AUDIO_ROUTE, file_name),
            None => format!("{}/{}", AUDIO_ROUTE, file_name),
        }
    }
}
