//! Lightweight input-language detection.
//!
//! Script ranges settle non-Latin text outright. Latin-script text is scored
//! against short lists of frequent function words. Only codes present in the
//! voice map are ever returned, so a detected language can always be spoken.

const MIN_LETTERS: usize = 3;

const LATIN_INDICATORS: &[(&str, &[&str])] = &[
    ("en", &["the", "and", "is", "are", "you", "what", "this", "that", "with", "have", "how", "hello", "please", "can", "i", "my", "it", "of", "to"]),
    ("fr", &["le", "la", "les", "est", "et", "je", "vous", "une", "des", "pour", "avec", "bonjour", "merci", "que", "qui", "pas", "c'est", "suis"]),
    ("es", &["el", "los", "las", "es", "y", "yo", "usted", "una", "para", "con", "hola", "gracias", "que", "por", "como", "está", "estoy", "qué"]),
    ("de", &["der", "die", "das", "und", "ist", "ich", "sie", "nicht", "mit", "ein", "eine", "hallo", "danke", "wie", "bitte", "was", "auf"]),
    ("it", &["il", "gli", "è", "sono", "io", "una", "per", "con", "ciao", "grazie", "che", "non", "come", "sei", "della", "questo"]),
    ("pt", &["o", "os", "é", "eu", "você", "uma", "para", "com", "olá", "obrigado", "obrigada", "não", "como", "está", "isso", "muito"]),
    ("nl", &["de", "het", "een", "en", "is", "ik", "jij", "niet", "met", "hallo", "dank", "bedankt", "wat", "hoe", "zijn", "voor"]),
    ("tr", &["bir", "ve", "bu", "ben", "sen", "merhaba", "teşekkürler", "nasıl", "ne", "için", "değil", "çok"]),
    ("id", &["saya", "anda", "dan", "yang", "ini", "itu", "tidak", "apa", "terima", "kasih", "selamat", "dengan"]),
    ("pl", &["jest", "nie", "się", "że", "jak", "dzień", "dobry", "dziękuję", "cześć", "czy", "to", "co"]),
    ("sv", &["och", "är", "jag", "det", "inte", "hej", "tack", "med", "för", "hur", "vad", "du"]),
    ("ro", &["și", "este", "eu", "nu", "cu", "bună", "mulțumesc", "ce", "pentru", "sunt"]),
    ("vi", &["xin", "chào", "cảm", "ơn", "tôi", "bạn", "không", "là", "của", "và"]),
];

fn is_between(c: char, lo: u32, hi: u32) -> bool {
    let v = c as u32;
    v >= lo && v <= hi
}

fn detect_script(text: &str) -> Option<&'static str> {
    let mut counts: [(&'static str, usize); 10] = [
        ("hi", 0),
        ("ja", 0),
        ("ko", 0),
        ("zh", 0),
        ("ru", 0),
        ("ar", 0),
        ("he", 0),
        ("el", 0),
        ("th", 0),
        ("uk", 0),
    ];
    let mut kana = 0usize;
    for c in text.chars() {
        let slot = if is_between(c, 0x0900, 0x097f) {
            0
        } else if is_between(c, 0x3040, 0x30ff) {
            kana += 1;
            1
        } else if is_between(c, 0xac00, 0xd7af) || is_between(c, 0x1100, 0x11ff) {
            2
        } else if is_between(c, 0x4e00, 0x9fff) {
            3
        } else if matches!(c, 'є' | 'ї' | 'і' | 'ґ' | 'Є' | 'Ї' | 'І' | 'Ґ') {
            9
        } else if is_between(c, 0x0400, 0x04ff) {
            4
        } else if is_between(c, 0x0600, 0x06ff) {
            5
        } else if is_between(c, 0x0590, 0x05ff) {
            6
        } else if is_between(c, 0x0370, 0x03ff) {
            7
        } else if is_between(c, 0x0e00, 0x0e7f) {
            8
        } else {
            continue;
        };
        counts[slot].1 += 1;
    }

    // Japanese mixes kanji with kana; any kana tips Han text to Japanese.
    if kana > 0 {
        counts[1].1 += counts[3].1;
        counts[3].1 = 0;
    }
    // Ukrainian shares Cyrillic with Russian; its letters decide the split.
    if counts[9].1 > 0 {
        counts[9].1 += counts[4].1;
        counts[4].1 = 0;
    }

    counts
        .iter()
        .filter(|(_, n)| *n > 0)
        .max_by_key(|(_, n)| *n)
        .map(|(code, _)| *code)
}

fn detect_latin(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphabetic() || c == '\''))
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return None;
    }

    let mut best: Option<(&'static str, usize)> = None;
    for (code, indicators) in LATIN_INDICATORS {
        let score = words
            .iter()
            .filter(|w| indicators.contains(w))
            .count();
        if score == 0 {
            continue;
        }
        match best {
            Some((_, top)) if top >= score => {}
            _ => {
                best = Some((*code, score));
            }
        }
    }
    best.map(|(code, _)| code)
}

/// Best-guess language code for `text`, or `None` when the text is too short
/// or carries no recognisable signal.
pub fn detect_language(text: &str) -> Option<String> {
    let letters = text
        .chars()
        .filter(|c| c.is_alphabetic())
        .count();
    if letters < MIN_LETTERS {
        return None;
    }
    detect_script(text)
        .or_else(|| detect_latin(text))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::voices;

    #[test]
    fn detects_common_latin_languages() {
        assert_eq!(detect_language("Hello, how are you today?").as_deref(), Some("en"));
        assert_eq!(detect_language("Bonjour, je suis très content").as_deref(), Some("fr"));
        assert_eq!(detect_language("Hola, ¿cómo estás? Gracias por todo").as_deref(), Some("es"));
        assert_eq!(detect_language("Hallo, wie geht es dir? Danke").as_deref(), Some("de"));
    }

    #[test]
    fn detects_by_script() {
        assert_eq!(detect_language("नमस्ते आप कैसे हैं").as_deref(), Some("hi"));
        assert_eq!(detect_language("こんにちは、元気ですか").as_deref(), Some("ja"));
        assert_eq!(detect_language("你好，你今天怎么样").as_deref(), Some("zh"));
        assert_eq!(detect_language("안녕하세요 반갑습니다").as_deref(), Some("ko"));
        assert_eq!(detect_language("Привет, как дела?").as_deref(), Some("ru"));
        assert_eq!(detect_language("Привіт, як справи? Дякую, все добре").as_deref(), Some("uk"));
        assert_eq!(detect_language("مرحبا كيف حالك").as_deref(), Some("ar"));
    }

    #[test]
    fn too_little_signal_is_none() {
        assert_eq!(detect_language("ok"), None);
        assert_eq!(detect_language("1234 !!"), None);
        assert_eq!(detect_language("xyzzy plugh"), None);
    }

    #[test]
    fn every_detectable_code_has_a_voice() {
        for (code, _) in LATIN_INDICATORS {
            assert!(voices::lookup(code).is_some(), "{code} has no voice");
        }
        for code in ["hi", "ja", "ko", "zh", "ru", "ar", "he", "el", "th", "uk"] {
            assert!(voices::lookup(code).is_some(), "{code} has no voice");
        }
    }
}
