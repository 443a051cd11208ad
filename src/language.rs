//! Supported languages and query-language detection.
//!
//! Detection is a narrow capability the pipeline calls through a trait; the bundled
//! implementation is deterministic (script ranges plus stopword profiles) and defaults to
//! English whenever the input is too short or too ambiguous to call.

use serde::Serialize;

/// Languages the service can answer in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    /// English (the processing language).
    En,
    /// Spanish.
    Es,
    /// French.
    Fr,
    /// German.
    De,
    /// Hindi.
    Hi,
    /// Chinese (zh-cn and zh-tw both fold here).
    Zh,
    /// Arabic.
    Ar,
    /// Russian.
    Ru,
    /// Japanese.
    Ja,
    /// Portuguese.
    Pt,
    /// Italian.
    It,
    /// Korean.
    Ko,
}

impl Lang {
    /// All supported languages, in display order.
    pub const ALL: [Lang; 12] = [
        Lang::En,
        Lang::Es,
        Lang::Fr,
        Lang::De,
        Lang::Hi,
        Lang::Zh,
        Lang::Ar,
        Lang::Ru,
        Lang::Ja,
        Lang::Pt,
        Lang::It,
        Lang::Ko,
    ];

    /// ISO 639-1 code.
    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Es => "es",
            Lang::Fr => "fr",
            Lang::De => "de",
            Lang::Hi => "hi",
            Lang::Zh => "zh",
            Lang::Ar => "ar",
            Lang::Ru => "ru",
            Lang::Ja => "ja",
            Lang::Pt => "pt",
            Lang::It => "it",
            Lang::Ko => "ko",
        }
    }

    /// English display name returned in responses.
    pub fn display_name(self) -> &'static str {
        match self {
            Lang::En => "English",
            Lang::Es => "Spanish",
            Lang::Fr => "French",
            Lang::De => "German",
            Lang::Hi => "Hindi",
            Lang::Zh => "Chinese",
            Lang::Ar => "Arabic",
            Lang::Ru => "Russian",
            Lang::Ja => "Japanese",
            Lang::Pt => "Portuguese",
            Lang::It => "Italian",
            Lang::Ko => "Korean",
        }
    }

    /// Parse a language code, folding regional Chinese variants. Unknown codes map to `None`.
    pub fn from_code(code: &str) -> Option<Lang> {
        let normalized = code.trim().to_lowercase();
        let folded = match normalized.as_str() {
            "zh-cn" | "zh-tw" => "zh",
            other => other,
        };
        Lang::ALL.into_iter().find(|lang| lang.code() == folded)
    }
}

/// Capability interface for query-language detection.
pub trait LanguageDetector: Send + Sync {
    /// Identify the language of `text`, defaulting to English on short or uncertain input.
    fn detect(&self, text: &str) -> Lang;
}

/// Deterministic detector based on Unicode script ranges and stopword profiles.
pub struct HeuristicDetector;

impl HeuristicDetector {
    /// Construct a new detector instance.
    pub const fn new() -> Self {
        Self
    }
}

impl Default for HeuristicDetector {
    fn default() -> Self {
        Self::new()
    }
}

struct ScriptCounts {
    devanagari: usize,
    han: usize,
    kana: usize,
    hangul: usize,
    arabic: usize,
    cyrillic: usize,
    latin: usize,
}

fn count_scripts(text: &str) -> ScriptCounts {
    let mut counts = ScriptCounts {
        devanagari: 0,
        han: 0,
        kana: 0,
        hangul: 0,
        arabic: 0,
        cyrillic: 0,
        latin: 0,
    };
    for ch in text.chars() {
        match ch {
            '\u{0900}'..='\u{097F}' => counts.devanagari += 1,
            '\u{4E00}'..='\u{9FFF}' => counts.han += 1,
            '\u{3040}'..='\u{30FF}' => counts.kana += 1,
            '\u{AC00}'..='\u{D7AF}' => counts.hangul += 1,
            '\u{0600}'..='\u{06FF}' => counts.arabic += 1,
            '\u{0400}'..='\u{04FF}' => counts.cyrillic += 1,
            'a'..='z' | 'A'..='Z' | '\u{00C0}'..='\u{024F}' => counts.latin += 1,
            _ => {}
        }
    }
    counts
}

/// Stopword profiles for Latin-script languages. A language wins when it matches
/// strictly more distinct markers than every other candidate.
const LATIN_PROFILES: [(Lang, &[&str]); 5] = [
    (
        Lang::Es,
        &["el", "la", "los", "las", "de", "que", "una", "para", "seguro", "póliza"],
    ),
    (
        Lang::Fr,
        &["le", "la", "les", "des", "une", "est", "pour", "dans", "assurance", "mois"],
    ),
    (
        Lang::De,
        &["der", "die", "das", "und", "ist", "nicht", "eine", "für", "versicherung"],
    ),
    (
        Lang::Pt,
        &["o", "os", "uma", "não", "com", "para", "seguro", "apólice", "meses"],
    ),
    (
        Lang::It,
        &["il", "lo", "gli", "una", "che", "per", "non", "assicurazione", "mesi"],
    ),
];

impl LanguageDetector for HeuristicDetector {
    fn detect(&self, text: &str) -> Lang {
        let trimmed = text.trim();
        if trimmed.chars().filter(|c| !c.is_whitespace()).count() < 3 {
            return Lang::En;
        }

        let counts = count_scripts(trimmed);

        // Non-Latin scripts are unambiguous.
        if counts.kana > 0 {
            return Lang::Ja;
        }
        if counts.han > counts.latin {
            return Lang::Zh;
        }
        if counts.devanagari > counts.latin {
            return Lang::Hi;
        }
        if counts.hangul > counts.latin {
            return Lang::Ko;
        }
        if counts.arabic > counts.latin {
            return Lang::Ar;
        }
        if counts.cyrillic > counts.latin {
            return Lang::Ru;
        }

        let words: Vec<String> = trimmed
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(|w| w.to_lowercase())
            .collect();

        let mut best = (Lang::En, 0usize);
        for (lang, markers) in LATIN_PROFILES {
            let hits = markers
                .iter()
                .filter(|marker| words.iter().any(|w| w == *marker))
                .count();
            if hits > best.1 {
                best = (lang, hits);
            }
        }

        // Require at least two markers before leaving the English default.
        if best.1 >= 2 { best.0 } else { Lang::En }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_defaults_to_english() {
        let detector = HeuristicDetector::new();
        assert_eq!(detector.detect(""), Lang::En);
        assert_eq!(detector.detect("ok"), Lang::En);
    }

    #[test]
    fn detects_common_scripts() {
        let detector = HeuristicDetector::new();
        assert_eq!(detector.detect("बीमा दावा प्रक्रिया"), Lang::Hi);
        assert_eq!(detector.detect("保险索赔处理"), Lang::Zh);
        assert_eq!(detector.detect("страховой полис на год"), Lang::Ru);
        assert_eq!(detector.detect("보험 청구 처리"), Lang::Ko);
    }

    #[test]
    fn detects_spanish_by_stopwords() {
        let detector = HeuristicDetector::new();
        let lang = detector.detect("el seguro cubre la cirugía de rodilla para una póliza");
        assert_eq!(lang, Lang::Es);
    }

    #[test]
    fn plain_english_stays_english() {
        let detector = HeuristicDetector::new();
        let lang = detector.detect("46-year-old male, knee surgery in Pune, 3-month-old policy");
        assert_eq!(lang, Lang::En);
    }

    #[test]
    fn from_code_folds_regional_chinese() {
        assert_eq!(Lang::from_code("zh-CN"), Some(Lang::Zh));
        assert_eq!(Lang::from_code("zh-tw"), Some(Lang::Zh));
        assert_eq!(Lang::from_code("xx"), None);
    }
}
