use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use crate::error::{ ProxyError, ProxyResult };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Voice {
    pub code: &'static str,
    pub language: &'static str,
    pub voice_id: &'static str,
}

impl Voice {
    /// Locale prefix of the voice id, e.g. `en-US` for `en-US-AriaNeural`.
    pub fn locale(&self) -> &'static str {
        match self.voice_id.rmatch_indices('-').next() {
            Some((idx, _)) => &self.voice_id[..idx],
            None => self.voice_id,
        }
    }
}

const VOICES: &[Voice] = &[
    Voice { code: "en", language: "English", voice_id: "en-US-AriaNeural" },
    Voice { code: "en-gb", language: "British English", voice_id: "en-GB-LibbyNeural" },
    Voice { code: "hi", language: "Hindi", voice_id: "hi-IN-SwaraNeural" },
    Voice { code: "fr", language: "French", voice_id: "fr-FR-DeniseNeural" },
    Voice { code: "de", language: "German", voice_id: "de-DE-KatjaNeural" },
    Voice { code: "es", language: "Spanish", voice_id: "es-ES-ElviraNeural" },
    Voice { code: "es-mx", language: "Mexican Spanish", voice_id: "es-MX-DaliaNeural" },
    Voice { code: "it", language: "Italian", voice_id: "it-IT-ElsaNeural" },
    Voice { code: "ja", language: "Japanese", voice_id: "ja-JP-NanamiNeural" },
    Voice { code: "ko", language: "Korean", voice_id: "ko-KR-SunHiNeural" },
    Voice { code: "zh", language: "Simplified Chinese", voice_id: "zh-CN-XiaoxiaoNeural" },
    Voice { code: "zh-hk", language: "Cantonese", voice_id: "zh-HK-HiuMaanNeural" },
    Voice { code: "zh-tw", language: "Traditional Chinese", voice_id: "zh-TW-HsiaoChenNeural" },
    Voice { code: "pt", language: "Brazilian Portuguese", voice_id: "pt-BR-FranciscaNeural" },
    Voice { code: "pt-pt", language: "European Portuguese", voice_id: "pt-PT-RaquelNeural" },
    Voice { code: "ru", language: "Russian", voice_id: "ru-RU-SvetlanaNeural" },
    Voice { code: "tr", language: "Turkish", voice_id: "tr-TR-EmelNeural" },
    Voice { code: "ar", language: "Arabic", voice_id: "ar-EG-SalmaNeural" },
    Voice { code: "id", language: "Indonesian", voice_id: "id-ID-GadisNeural" },
    Voice { code: "th", language: "Thai", voice_id: "th-TH-PremwadeeNeural" },
    Voice { code: "vi", language: "Vietnamese", voice_id: "vi-VN-HoaiMyNeural" },
    Voice { code: "nl", language: "Dutch", voice_id: "nl-NL-FennaNeural" },
    Voice { code: "pl", language: "Polish", voice_id: "pl-PL-ZofiaNeural" },
    Voice { code: "sv", language: "Swedish", voice_id: "sv-SE-SofieNeural" },
    Voice { code: "no", language: "Norwegian", voice_id: "nb-NO-IselinNeural" },
    Voice { code: "fi", language: "Finnish", voice_id: "fi-FI-SelmaNeural" },
    Voice { code: "da", language: "Danish", voice_id: "da-DK-ChristelNeural" },
    Voice { code: "he", language: "Hebrew", voice_id: "he-IL-HilaNeural" },
    Voice { code: "cs", language: "Czech", voice_id: "cs-CZ-VlastaNeural" },
    Voice { code: "el", language: "Greek", voice_id: "el-GR-AthinaNeural" },
    Voice { code: "ro", language: "Romanian", voice_id: "ro-RO-AlinaNeural" },
    Voice { code: "hu", language: "Hungarian", voice_id: "hu-HU-NoemiNeural" },
    Voice { code: "sk", language: "Slovak", voice_id: "sk-SK-ViktoriaNeural" },
    Voice { code: "uk", language: "Ukrainian", voice_id: "uk-UA-PolinaNeural" },
];

static VOICE_MAP: Lazy<BTreeMap<&'static str, Voice>> = Lazy::new(||
    VOICES.iter().map(|v| (v.code, *v)).collect()
);

fn normalize(code: &str) -> String {
    code.trim().to_ascii_lowercase().replace('_', "-")
}

pub fn lookup(code: &str) -> Option<Voice> {
    VOICE_MAP.get(normalize(code).as_str()).copied()
}

/// Supported codes in table order.
pub fn supported_codes() -> Vec<String> {
    VOICES.iter().map(|v| v.code.to_string()).collect()
}

pub fn resolve(code: &str) -> ProxyResult<Voice> {
    lookup(code).ok_or_else(|| ProxyError::UnsupportedLanguage {
        code: code.to_string(),
        supported: supported_codes(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_and_separator_insensitive() {
        assert_eq!(lookup("EN_GB").unwrap().voice_id, "en-GB-LibbyNeural");
        assert_eq!(lookup(" fr ").unwrap().voice_id, "fr-FR-DeniseNeural");
    }

    #[test]
    fn codes_are_unique() {
        assert_eq!(VOICE_MAP.len(), VOICES.len());
        assert_eq!(supported_codes().len(), 34);
    }

    #[test]
    fn unknown_code_error_lists_supported_codes() {
        let err = resolve("xx").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'xx'"));
        assert!(msg.contains("en, en-gb, hi, fr"));
        assert!(err.is_client_error());
    }

    #[test]
    fn locale_is_voice_prefix() {
        assert_eq!(lookup("no").unwrap().locale(), "nb-NO");
        assert_eq!(lookup("zh-hk").unwrap().locale(), "zh-HK");
    }
}
