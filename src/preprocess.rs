use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

static NOISE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z가-힣\s.?!]").unwrap());
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Replace digits, symbols and non-Hangul scripts with spaces, then collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let s: String = s.nfc().collect();
    let s = NOISE_RE.replace_all(&s, " ");
    SPACE_RE.replace_all(&s, " ").into_owned()
}

/// Short posts ("ㅋㅋ", "감사합니다") carry no topic signal.
pub fn is_meaningful(raw: &str, min_chars: usize) -> bool {
    raw.chars().count() > min_chars
}

#[derive(Debug, Clone)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Default for Stopwords {
    fn default() -> Self {
        Self {
            words: KOREAN_STOPWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Stopwords {
    pub fn empty() -> Self {
        Self { words: HashSet::new() }
    }

    /// Newline-delimited file; blank lines and a leading `stopwords` header are skipped.
    pub fn extend_from_file(&mut self, path: &Path) -> Result<usize> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading stopwords {}", path.display()))?;
        let before = self.words.len();
        for line in text.trim_start_matches('\u{feff}').lines() {
            let w = line.trim();
            if w.is_empty() || w == "stopwords" {
                continue;
            }
            self.words.insert(w.nfc().collect());
        }
        Ok(self.words.len() - before)
    }

    pub fn contains(&self, w: &str) -> bool {
        self.words.contains(w)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

pub fn filter_tokens(tokens: &[String], stop: &Stopwords) -> Vec<String> {
    tokens
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty() && !stop.contains(t))
        .map(str::to_string)
        .collect()
}

static KOREAN_STOPWORDS: &[&str] = &[
    "하다", "있다", "되다", "없다", "않다", "이다", "같다", "보다", "그렇다", "이렇다",
    "것", "수", "등", "들", "및", "더", "또", "좀", "잘", "그", "이", "저", "때", "곳",
    "거", "뭐", "왜", "어떻다", "그냥", "너무", "정말", "진짜", "그리고", "그래서", "하지만",
    "우리", "저희", "제", "내", "나", "너", "분", "님", "중", "안", "번", "개", "게",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn clean_text_strips_digits_and_symbols() {
        assert_eq!(clean_text("보청기 #2개 샀어요!! ^^"), "보청기 개 샀어요!! ");
        assert_eq!(clean_text("hello,   world?"), "hello world?");
    }

    #[test]
    fn clean_text_keeps_sentence_punctuation() {
        assert_eq!(clean_text("좋아요. 진짜?"), "좋아요. 진짜?");
    }

    #[test]
    fn meaningful_counts_chars_not_bytes() {
        // 8 Hangul syllables = 24 bytes but only 8 chars
        assert!(!is_meaningful("청각장애인입니다", 15));
        assert!(is_meaningful("인공와우 수술 후기 공유합니다 감사", 15));
        assert!(!is_meaningful("0123456789abcde", 15));
        assert!(is_meaningful("0123456789abcdef", 15));
    }

    #[test]
    fn filter_tokens_drops_stopwords_and_blanks() {
        let stop = Stopwords::default();
        let toks: Vec<String> = ["보청기", "하다", " ", "수어"].iter().map(|s| s.to_string()).collect();
        assert_eq!(filter_tokens(&toks, &stop), vec!["보청기", "수어"]);
    }

    #[test]
    fn extend_from_file_skips_header() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "stopwords\n\n소리\n듣다").unwrap();
        let mut stop = Stopwords::empty();
        assert_eq!(stop.extend_from_file(f.path()).unwrap(), 2);
        assert!(stop.contains("소리"));
        assert!(!stop.contains("stopwords"));
    }
}
