//! In-process scoring pipeline: documents with assignments in, one
//! opportunity row per actor-action group out.

use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::aggregate;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::lexicon::Lexicon;
use crate::models::{Document, GroupStats, OpportunityRow, ScoredDocument};
use crate::opportunity::{score_groups, ScoringOptions};
use crate::preprocess::{filter_tokens, is_meaningful, Stopwords};
use crate::sentiment::score_documents;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub documents: usize,
    pub groups: usize,
    pub mean_satisfaction: f64,
    pub mean_importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityReport {
    pub scored: Vec<ScoredDocument>,
    pub groups: Vec<GroupStats>,
    pub rows: Vec<OpportunityRow>,
    pub summary: ReportSummary,
}

/// Drop posts too short to carry a topic. Only used ahead of clustering;
/// an already-assigned corpus is scored as given.
pub fn drop_short_documents(docs: Vec<Document>, min_chars: usize) -> Vec<Document> {
    let before = docs.len();
    let kept: Vec<Document> = docs
        .into_iter()
        .filter(|d| {
            let keep = is_meaningful(&d.text, min_chars);
            if !keep {
                debug!("Dropping short document - id={}, chars={}", d.id, d.text.chars().count());
            }
            keep
        })
        .collect();
    info!(
        "Short-document filter completed - kept={}, dropped={}, min_chars={}",
        kept.len(),
        before - kept.len(),
        min_chars
    );
    kept
}

/// Stop-word-free copies of each document's tokens, for topic modeling
/// and keywords. Sentiment always reads the full `Document::tokens`.
pub fn topic_tokens(docs: &[Document], stop: &Stopwords) -> Vec<Vec<String>> {
    let out: Vec<Vec<String>> = docs.iter().map(|d| filter_tokens(&d.tokens, stop)).collect();
    let removed: usize = docs
        .iter()
        .zip(&out)
        .map(|(d, t)| d.tokens.len() - t.len())
        .sum();
    debug!("Topic tokens prepared - documents={}, removed_tokens={}, stopwords={}", docs.len(), removed, stop.len());
    out
}

/// Score, aggregate, normalize and rank. Every document must already
/// carry both a cluster id and an action id.
pub fn score_corpus(docs: &[Document], lexicon: &Lexicon, cfg: &PipelineConfig) -> Result<OpportunityReport> {
    if docs.is_empty() {
        return Err(PipelineError::EmptyCorpus { stage: "scoring" });
    }

    let scored = score_documents(docs, lexicon, cfg.sentiment.match_policy)?;
    let groups = aggregate(&scored)?;
    let rows = score_groups(
        &groups,
        ScoringOptions {
            precision: cfg.scaling.precision,
            on_degenerate: cfg.scaling.on_degenerate,
        },
    )?;

    let n = rows.len() as f64;
    let summary = ReportSummary {
        documents: scored.len(),
        groups: rows.len(),
        mean_satisfaction: rows.iter().map(|r| r.satisfaction).sum::<f64>() / n,
        mean_importance: rows.iter().map(|r| r.importance).sum::<f64>() / n,
    };
    debug!(
        "Report summary - mean_satisfaction={:.4}, mean_importance={:.4}",
        summary.mean_satisfaction, summary.mean_importance
    );

    Ok(OpportunityReport {
        scored,
        groups,
        rows,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::LexiconEntry;

    fn doc(id: &str, text: &str, tokens: &[&str], cluster: i64, action: i64) -> Document {
        Document {
            id: id.into(),
            text: text.into(),
            tokens: tokens.iter().map(|s| s.to_string()).collect(),
            cluster: Some(cluster),
            action: Some(action),
            vector: None,
        }
    }

    fn lexicon() -> Lexicon {
        Lexicon::from_entries([
            LexiconEntry { word: "좋다".into(), polarity: 2 },
            LexiconEntry { word: "싫다".into(), polarity: -2 },
            LexiconEntry { word: "불편하다".into(), polarity: -1 },
        ])
    }

    #[test]
    fn end_to_end_scores_each_group() {
        let docs = vec![
            doc("1", "", &["좋다", "싫다", "좋다"], 0, 0),
            doc("2", "", &["좋다"], 0, 0),
            doc("3", "", &["불편하다"], 0, 1),
            doc("4", "", &["싫다", "불편하다"], 1, 0),
        ];
        let report = score_corpus(&docs, &lexicon(), &PipelineConfig::default()).unwrap();

        assert_eq!(report.scored[0].sentiment, 2);
        assert_eq!(report.groups.len(), 3);
        // raw satisfaction: (0,0)=2, (0,1)=-1, (1,0)=-3
        assert_eq!(report.rows[0].satisfaction, 10.0);
        assert_eq!(report.rows[1].satisfaction, -2.0);
        assert_eq!(report.rows[2].satisfaction, -10.0);
        // raw importance: 50, 25, 25
        assert_eq!(report.rows[0].importance, 10.0);
        assert_eq!(report.rows[1].importance, 0.0);
        assert_eq!(report.rows[0].opportunity, 10.0);
        assert_eq!(report.rows[1].opportunity, 2.0);
        assert_eq!(report.rows[2].opportunity, 10.0);
        assert_eq!(report.summary.documents, 4);
        assert_eq!(report.summary.groups, 3);
    }

    #[test]
    fn empty_corpus_fails_before_scoring() {
        let err = score_corpus(&[], &lexicon(), &PipelineConfig::default()).unwrap_err();
        assert_eq!(err, PipelineError::EmptyCorpus { stage: "scoring" });
    }

    #[test]
    fn short_posts_are_dropped() {
        let docs = vec![
            doc("short", "짧은 글", &["짧다"], 0, 0),
            doc("long", "인공와우 수술을 받고 나서 많이 좋아졌어요", &["인공와우", "하다", "좋다"], 0, 0),
        ];
        let out = drop_short_documents(docs, 15);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "long");
        assert_eq!(out[0].tokens, vec!["인공와우", "하다", "좋다"]);
    }

    #[test]
    fn stopwords_only_leave_topic_tokens() {
        let docs = vec![doc("1", "", &["보청기", "없다", "하다"], 0, 0)];
        assert_eq!(topic_tokens(&docs, &Stopwords::default()), vec![vec!["보청기".to_string()]]);
        assert_eq!(docs[0].tokens.len(), 3);
    }

    #[test]
    fn stopword_listed_lexicon_words_still_score() {
        let lex = Lexicon::from_entries([
            LexiconEntry { word: "없다".into(), polarity: -1 },
            LexiconEntry { word: "좋다".into(), polarity: 2 },
        ]);
        let docs = vec![
            doc("1", "", &["보청기", "소리", "없다"], 0, 0),
            doc("2", "", &["보청기", "좋다"], 0, 1),
        ];
        let report = score_corpus(&docs, &lex, &PipelineConfig::default()).unwrap();
        let s: Vec<i64> = report.scored.iter().map(|d| d.sentiment).collect();
        assert_eq!(s, vec![-1, 2]);
    }
}
