use async_trait::async_trait;
use log::{ debug, error };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT } };

use super::{ SpeechSynthesizer, Voice };
use crate::error::{ ProxyError, ProxyResult };

pub const OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

pub fn default_endpoint(region: &str) -> String {
    format!("https://{}.tts.speech.microsoft.com/cognitiveservices/v1", region)
}

/// Neural text-to-speech over the Cognitive Services REST API.
pub struct AzureSpeechClient {
    http: HttpClient,
    endpoint: String,
}

impl AzureSpeechClient {
    pub fn new(endpoint: String, api_key: String) -> ProxyResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/ssml+xml"));
        headers.insert(HeaderName::from_static("x-microsoft-outputformat"), HeaderValue::from_static(OUTPUT_FORMAT));
        headers.insert(USER_AGENT, HeaderValue::from_static("voxrelay"));
        headers.insert(
            HeaderName::from_static("ocp-apim-subscription-key"),
            HeaderValue::from_str(&api_key).map_err(|e|
                ProxyError::Config(format!("Invalid speech API key format: {}", e))
            )?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ProxyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, endpoint })
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn build_ssml(text: &str, voice: &Voice) -> String {
    format!(
        "<speak version='1.0' xml:lang='{locale}'><voice xml:lang='{locale}' name='{name}'>{text}</voice></speak>",
        locale = voice.locale(),
        name = voice.voice_id,
        text = escape_xml(text)
    )
}

#[async_trait]
impl SpeechSynthesizer for AzureSpeechClient {
    async fn synthesize(&self, text: &str, voice: &Voice) -> ProxyResult<Vec<u8>> {
        let ssml = build_ssml(text, voice);
        debug!("Requesting speech from {} with voice {}", self.endpoint, voice.voice_id);

        let resp = self.http
            .post(&self.endpoint)
            .body(ssml)
            .send().await
            .map_err(|e| {
                error!("Speech request error: {}", e);
                ProxyError::speech(e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!("Speech API error: {} {}", status, body);
            return Err(ProxyError::speech(format!("HTTP {} {}", status, body).trim_end()));
        }

        let bytes = resp.bytes().await.map_err(ProxyError::speech)?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::voices;

    #[test]
    fn ssml_escapes_text_and_names_voice() {
        let voice = voices::lookup("fr").unwrap();
        let ssml = build_ssml("Tom & <Jerry>", &voice);
        assert!(ssml.contains("xml:lang='fr-FR'"));
        assert!(ssml.contains("name='fr-FR-DeniseNeural'"));
        assert!(ssml.contains("Tom &amp; &lt;Jerry&gt;"));
    }

    #[test]
    fn endpoint_is_derived_from_region() {
        assert_eq!(
            default_endpoint("westeurope"),
            "https://westeurope.tts.speech.microsoft.com/cognitiveservices/v1"
        );
    }
}
