use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PipelineError, Result};

/// One social-media post or comment after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub tokens: Vec<String>, // morpheme-tagged, order preserved
    pub cluster: Option<i64>,
    pub action: Option<i64>,
    pub vector: Option<Vec<f32>>, // document embedding, only needed for clustering
}

impl Document {
    /// The (cluster, action) pair this document belongs to.
    pub fn group_key(&self) -> Result<GroupKey> {
        let cluster = self.cluster.ok_or_else(|| PipelineError::MissingAssignment {
            document_id: self.id.clone(),
            field: "cluster",
        })?;
        let action = self.action.ok_or_else(|| PipelineError::MissingAssignment {
            document_id: self.id.clone(),
            field: "action",
        })?;
        Ok(GroupKey { cluster, action })
    }
}

/// Actor-action group key. Orders by cluster first, then action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub cluster: i64,
    pub action: i64,
}

impl GroupKey {
    pub fn new(cluster: i64, action: i64) -> Self {
        Self { cluster, action }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Actor{}_Action{}", self.cluster, self.action)
    }
}

/// Output row of the topic/cluster assigner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub document_id: String,
    pub cluster: i64,
    pub action: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconMatch {
    pub word: String,
    pub polarity: i32,
}

/// A document whose group membership and sentiment are fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub id: String,
    pub key: GroupKey,
    pub sentiment: i64,
    pub matches: Vec<LexiconMatch>,
}

/// Raw per-group statistics before scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub key: GroupKey,
    pub count: usize,
    pub raw_satisfaction: f64, // mean sentiment
    pub raw_importance: f64,   // share of corpus, percent
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityRow {
    pub key: GroupKey,
    pub label: String,
    pub count: usize,
    pub raw_satisfaction: f64,
    pub raw_importance: f64,
    pub satisfaction: f64, // [-10, 10]
    pub importance: f64,   // [0, 10]
    pub opportunity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterKeywords {
    pub cluster: i64,
    pub documents: usize,
    pub keywords: Vec<(String, f64)>,
}
