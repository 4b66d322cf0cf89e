use serde::Deserialize;
use std::fs;
use std::sync::Arc;
use log::info;
use thiserror::Error;

use crate::models::chat::DEFAULT_SYSTEM_PROMPT;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt template '{template}' is missing placeholder '{placeholder}'")]
    MissingPlaceholder {
        template: &'static str,
        placeholder: &'static str,
    },
    #[error("Prompt file IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Prompt JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// System and user templates for every model round trip the proxy makes.
/// Placeholders are written as `{name}`.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PromptConfig {
    pub chat_system: String,
    pub document_system: String,
    pub document_user: String,
    pub translation_system: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            chat_system: DEFAULT_SYSTEM_PROMPT.to_string(),
            document_system: "You are a helpful assistant that answers questions about the document provided by the user. Base your answer only on the document content.".to_string(),
            document_user: "Document content:\n{document}\n\nRequest: {prompt}".to_string(),
            translation_system: "You are a professional translator. Translate the user's text into {language}. Respond with the translated text only, without explanations, notes, quotes or any additional commentary.".to_string(),
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        let required: [(&'static str, &str, &'static str); 3] = [
            ("document_user", &self.document_user, "{document}"),
            ("document_user", &self.document_user, "{prompt}"),
            ("translation_system", &self.translation_system, "{language}"),
        ];
        for (template, body, placeholder) in required {
            if !body.contains(placeholder) {
                return Err(PromptError::MissingPlaceholder { template, placeholder });
            }
        }
        Ok(())
    }
}

/// Loads prompt overrides from a JSON file. Keys absent from the file keep
/// their built-in defaults.
pub fn load_prompts(path: Option<&str>) -> Result<Arc<PromptConfig>, PromptError> {
    let config = match path {
        Some(path) => {
            let file_content = fs::read_to_string(path)?;
            let config: PromptConfig = serde_json::from_str(&file_content)?;
            info!("Loaded prompt overrides from {}", path);
            config
        }
        None => PromptConfig::default(),
    };
    config.validate()?;
    Ok(Arc::new(config))
}

/// Substitutes `{name}` placeholders in one left-to-right pass, so text
/// inserted for one placeholder is never scanned for another.
fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    'scan: while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        for (name, value) in values {
            if let Some(after) = tail.strip_prefix(name).and_then(|t| t.strip_prefix('}')) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        out.push('{');
        rest = tail;
    }
    out.push_str(rest);
    out
}

pub fn get_document_user_prompt(config: &PromptConfig, document: &str, prompt: &str) -> String {
    render(&config.document_user, &[("document", document), ("prompt", prompt)])
}

pub fn get_translation_system_prompt(config: &PromptConfig, language_name: &str) -> String {
    render(&config.translation_system, &[("language", language_name)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = load_prompts(None).unwrap();
        assert_eq!(config.chat_system, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn document_prompt_embeds_text_and_request() {
        let config = PromptConfig::default();
        let rendered = get_document_user_prompt(&config, "page text", "summarize");
        assert!(rendered.contains("page text"));
        assert!(rendered.contains("Request: summarize"));
    }

    #[test]
    fn placeholders_inside_inserted_text_stay_literal() {
        let config = PromptConfig::default();
        let rendered = get_document_user_prompt(&config, "Total: {prompt}", "Compare with {document}");
        assert_eq!(
            rendered,
            "Document content:\nTotal: {prompt}\n\nRequest: Compare with {document}"
        );
    }

    #[test]
    fn unknown_braces_are_kept() {
        assert_eq!(render("{a} {b} {", &[("a", "x")]), "x {b} {");
    }

    #[test]
    fn translation_prompt_names_target_language() {
        let config = PromptConfig::default();
        let rendered = get_translation_system_prompt(&config, "French");
        assert!(rendered.contains("into French"));
        assert!(!rendered.contains("{language}"));
    }

    #[test]
    fn partial_override_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"chat_system": "Be brief."}}"#).unwrap();
        let config = load_prompts(file.path().to_str()).unwrap();
        assert_eq!(config.chat_system, "Be brief.");
        assert_eq!(config.document_user, PromptConfig::default().document_user);
    }

    #[test]
    fn override_missing_placeholder_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"translation_system": "Translate."}}"#).unwrap();
        let err = load_prompts(file.path().to_str()).unwrap_err();
        assert!(matches!(err, PromptError::MissingPlaceholder { placeholder: "{language}", .. }));
    }
}
