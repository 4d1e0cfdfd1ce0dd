use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;
use xxhash_rust::xxh3::xxh3_64;

use crate::models::Document;
use crate::preprocess::clean_text;

/// One row of the tagged corpus file produced by the collection scripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub cluster: Option<i64>,
    #[serde(default)]
    pub action: Option<i64>,
    #[serde(default)]
    pub vector: Option<Vec<f32>>,
}

pub fn make_document_id(text: &str) -> String {
    format!("{:016x}", xxh3_64(text.as_bytes()))
}

fn nfc(s: &str) -> String {
    s.trim().nfc().collect()
}

impl CorpusRecord {
    pub fn into_document(self) -> Document {
        let text = clean_text(&self.text).trim().to_string();
        let id = match self.id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => make_document_id(&text),
        };
        Document {
            id,
            text,
            tokens: self.tokens.iter().map(|t| nfc(t)).collect(),
            cluster: self.cluster,
            action: self.action,
            vector: self.vector,
        }
    }
}

pub fn parse_corpus(json: &str) -> Result<Vec<Document>> {
    let json = json.trim_start_matches('\u{feff}');
    let records: Vec<CorpusRecord> = serde_json::from_str(json).context("decoding corpus JSON")?;
    let docs: Vec<Document> = records.into_iter().map(CorpusRecord::into_document).collect();

    // derived ids collide when the same text was collected twice
    let mut seen: HashSet<&str> = HashSet::new();
    let dupes = docs.iter().filter(|d| !seen.insert(d.id.as_str())).count();
    if dupes > 0 {
        warn!("Duplicate document ids in corpus - duplicates={}", dupes);
    }
    Ok(docs)
}

pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let start = std::time::Instant::now();
    debug!("Loading corpus - path={}", path.display());

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading corpus {}", path.display()))?;
    let docs = parse_corpus(&text).with_context(|| format!("parsing corpus {}", path.display()))?;

    let assigned = docs.iter().filter(|d| d.cluster.is_some() && d.action.is_some()).count();
    let embedded = docs.iter().filter(|d| d.vector.is_some()).count();
    info!(
        "Corpus loaded - documents={}, assigned={}, embedded={}, duration={:.2}s",
        docs.len(),
        assigned,
        embedded,
        start.elapsed().as_secs_f32()
    );
    Ok(docs)
}
