//! Sentiment lexicon: word → integer polarity.
//!
//! Entries keep their load order. Homonyms (the same word listed more than
//! once) are all retained so the scorer can decide how many of them count.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};
use unicode_normalization::UnicodeNormalization;

use crate::error::PipelineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub word: String,
    pub polarity: i32,
}

/// How many lexicon entries a single token may match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Every entry with the token's word contributes.
    #[default]
    All,
    /// Only the first entry with the token's word contributes.
    First,
}

// SentiWord_info.json layout; polarity is usually a string there.
#[derive(Debug, Deserialize)]
struct RawEntry {
    word: String,
    polarity: RawPolarity,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPolarity {
    Int(i64),
    Text(String),
}

impl RawEntry {
    fn into_entry(self) -> Result<LexiconEntry, PipelineError> {
        let polarity = match &self.polarity {
            RawPolarity::Int(v) => i32::try_from(*v).ok(),
            RawPolarity::Text(s) => s.trim().parse::<i32>().ok(),
        };
        let raw = match self.polarity {
            RawPolarity::Int(v) => v.to_string(),
            RawPolarity::Text(s) => s,
        };
        match polarity {
            Some(polarity) => Ok(LexiconEntry { word: self.word, polarity }),
            None => Err(PipelineError::InvalidPolarity { word: self.word, raw }),
        }
    }
}

/// Immutable lookup built once per run.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: Vec<LexiconEntry>,
    index: HashMap<String, Vec<usize>>, // word -> entry positions, load order
}

impl Lexicon {
    pub fn from_entries(entries: impl IntoIterator<Item = LexiconEntry>) -> Self {
        let mut out = Vec::new();
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for e in entries {
            let word: String = e.word.nfc().collect();
            index.entry(word.clone()).or_default().push(out.len());
            out.push(LexiconEntry { word, polarity: e.polarity });
        }
        Self { entries: out, index }
    }

    /// Parse a SentiWord-style JSON array.
    pub fn from_json_str(s: &str) -> Result<Self> {
        // the published SentiWord file carries a UTF-8 BOM
        let s = s.trim_start_matches('\u{feff}');
        let raw: Vec<RawEntry> = serde_json::from_str(s).context("decoding lexicon JSON")?;
        let entries = raw
            .into_iter()
            .map(RawEntry::into_entry)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_entries(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Polarity of the first entry for `word`; duplicates never override it.
    pub fn polarity(&self, word: &str) -> Option<i32> {
        self.index
            .get(word)
            .and_then(|idxs| idxs.first())
            .map(|&i| self.entries[i].polarity)
    }

    /// Entries for `word` in load order, limited by `policy`.
    pub fn matches<'a>(
        &'a self,
        word: &str,
        policy: MatchPolicy,
    ) -> impl Iterator<Item = &'a LexiconEntry> + 'a {
        let idxs: &[usize] = self.index.get(word).map(Vec::as_slice).unwrap_or(&[]);
        let take = match policy {
            MatchPolicy::All => idxs.len(),
            MatchPolicy::First => idxs.len().min(1),
        };
        idxs[..take].iter().map(move |&i| &self.entries[i])
    }

    /// Count of each polarity value, ascending.
    pub fn polarity_distribution(&self) -> Vec<(i32, usize)> {
        let mut counts: HashMap<i32, usize> = HashMap::new();
        for e in &self.entries {
            *counts.entry(e.polarity).or_insert(0) += 1;
        }
        let mut v: Vec<(i32, usize)> = counts.into_iter().collect();
        v.sort();
        v
    }
}

pub fn load_lexicon(path: &Path) -> Result<Lexicon> {
    let start = std::time::Instant::now();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading lexicon {}", path.display()))?;
    let lexicon = Lexicon::from_json_str(&text)
        .with_context(|| format!("parsing lexicon {}", path.display()))?;

    debug!("Lexicon polarity distribution - {:?}", lexicon.polarity_distribution());
    info!(
        "Lexicon loaded - entries={}, distinct_words={}, duration={:.2}s",
        lexicon.len(),
        lexicon.index.len(),
        start.elapsed().as_secs_f32()
    );
    Ok(lexicon)
}
