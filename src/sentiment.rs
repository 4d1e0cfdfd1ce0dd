use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::Result;
use crate::lexicon::{Lexicon, MatchPolicy};
use crate::models::{Document, LexiconMatch, ScoredDocument};

/// Every lexicon hit for `tokens`, in token order.
pub fn lexicon_matches(lexicon: &Lexicon, tokens: &[String], policy: MatchPolicy) -> Vec<LexiconMatch> {
    tokens
        .iter()
        .flat_map(|t| lexicon.matches(t, policy))
        .map(|e| LexiconMatch {
            word: e.word.clone(),
            polarity: e.polarity,
        })
        .collect()
}

/// Sum of matched polarities. Unmatched tokens contribute nothing.
pub fn sentiment_score(lexicon: &Lexicon, tokens: &[String], policy: MatchPolicy) -> i64 {
    tokens
        .iter()
        .flat_map(|t| lexicon.matches(t, policy))
        .map(|e| i64::from(e.polarity))
        .sum()
}

/// Score every document. Group membership is resolved first so an
/// unassigned document fails before any scoring work is done.
pub fn score_documents(
    docs: &[Document],
    lexicon: &Lexicon,
    policy: MatchPolicy,
) -> Result<Vec<ScoredDocument>> {
    let keys = docs.iter().map(Document::group_key).collect::<Result<Vec<_>>>()?;

    let start = std::time::Instant::now();
    let scored: Vec<ScoredDocument> = docs
        .par_iter()
        .zip(keys.into_par_iter())
        .map(|(d, key)| {
            let matches = lexicon_matches(lexicon, &d.tokens, policy);
            let sentiment = matches.iter().map(|m| i64::from(m.polarity)).sum();
            ScoredDocument {
                id: d.id.clone(),
                key,
                sentiment,
                matches,
            }
        })
        .collect();

    let matched_docs = scored.iter().filter(|s| !s.matches.is_empty()).count();
    if let (Some(lo), Some(hi)) = (
        scored.iter().map(|s| s.sentiment).min(),
        scored.iter().map(|s| s.sentiment).max(),
    ) {
        debug!("Sentiment score range - min={}, max={}", lo, hi);
    }
    info!(
        "Sentiment scoring completed - documents={}, with_matches={}, policy={:?}, duration={:.2}s",
        scored.len(),
        matched_docs,
        policy,
        start.elapsed().as_secs_f32()
    );
    Ok(scored)
}
