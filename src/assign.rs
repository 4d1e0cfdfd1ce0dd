//! Actor/action assignment: clusters over embeddings, then per-cluster
//! topics. Produces exactly one (cluster, action) row per document.

use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::cluster::{cluster_vectors, ClusterOutcome, ClusterParams};
use crate::error::{PipelineError, Result};
use crate::models::{Assignment, Document};
use crate::topics::{assign_actions, TopicModelSummary, TopicParams};

#[derive(Debug, Clone)]
pub struct AssignOutcome {
    pub assignments: Vec<Assignment>,
    pub clustering: ClusterOutcome,
    pub topic_models: Vec<TopicModelSummary>,
}

fn embeddings(docs: &[Document]) -> Result<Vec<Vec<f32>>> {
    let mut dim: Option<usize> = None;
    docs.iter()
        .map(|d| {
            let v = d.vector.as_ref().ok_or_else(|| PipelineError::MissingEmbedding {
                document_id: d.id.clone(),
            })?;
            match dim {
                None => dim = Some(v.len()),
                Some(expected) if expected != v.len() => {
                    return Err(PipelineError::DimensionMismatch {
                        document_id: d.id.clone(),
                        expected,
                        found: v.len(),
                    })
                }
                Some(_) => {}
            }
            // f32 overflow while parsing yields inf
            if let Some(index) = v.iter().position(|x| !x.is_finite()) {
                return Err(PipelineError::NonFiniteEmbedding {
                    document_id: d.id.clone(),
                    index,
                });
            }
            Ok(v.clone())
        })
        .collect()
}

/// Cluster documents by embedding, then model topics inside each cluster.
///
/// `topic_tokens[i]` is the topic-model input for `docs[i]`, usually the
/// document's tokens with stop words removed.
pub fn assign(
    docs: &[Document],
    topic_tokens: &[Vec<String>],
    cluster_params: ClusterParams,
    topic_params: &TopicParams,
) -> Result<AssignOutcome> {
    if docs.is_empty() {
        return Err(PipelineError::EmptyCorpus { stage: "assignment" });
    }
    debug_assert_eq!(docs.len(), topic_tokens.len());
    topic_params.validate()?;
    let vectors = embeddings(docs)?;

    let clustering = cluster_vectors(&vectors, cluster_params);

    let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in clustering.labels.iter().enumerate() {
        members.entry(label).or_default().push(i);
    }

    let per_cluster: Vec<(i64, Vec<usize>, Vec<i64>, TopicModelSummary)> = members
        .into_par_iter()
        .map(|(cluster, idxs)| {
            let token_lists: Vec<Vec<String>> = idxs.iter().map(|&i| topic_tokens[i].clone()).collect();
            let (actions, summary) = assign_actions(cluster, &token_lists, topic_params);
            (cluster, idxs, actions, summary)
        })
        .collect();

    let mut actions = vec![0i64; docs.len()];
    let mut topic_models = Vec::with_capacity(per_cluster.len());
    for (_, idxs, acts, summary) in per_cluster {
        for (i, a) in idxs.into_iter().zip(acts) {
            actions[i] = a;
        }
        topic_models.push(summary);
    }

    let assignments: Vec<Assignment> = docs
        .iter()
        .zip(clustering.labels.iter().zip(actions))
        .map(|(d, (&cluster, action))| Assignment {
            document_id: d.id.clone(),
            cluster,
            action,
        })
        .collect();

    info!(
        "Assignment completed - documents={}, clusters={}, actor_action_pairs={}",
        assignments.len(),
        clustering.n_clusters,
        topic_models.iter().map(|t| t.n_topics).sum::<usize>()
    );
    Ok(AssignOutcome {
        assignments,
        clustering,
        topic_models,
    })
}

/// Write assignments onto documents, matched by position.
pub fn apply_assignments(docs: &mut [Document], assignments: &[Assignment]) {
    let mut replaced = 0usize;
    for (d, a) in docs.iter_mut().zip(assignments) {
        debug_assert_eq!(d.id, a.document_id);
        if d.cluster.is_some() || d.action.is_some() {
            replaced += 1;
        }
        d.cluster = Some(a.cluster);
        d.action = Some(a.action);
    }
    if replaced > 0 {
        warn!("Replaced pre-existing assignments - documents={}", replaced);
    }
}

/// Assignments already present on the documents; fails on the first gap.
pub fn existing_assignments(docs: &[Document]) -> Result<Vec<Assignment>> {
    docs.iter()
        .map(|d| {
            let key = d.group_key()?;
            Ok(Assignment {
                document_id: d.id.clone(),
                cluster: key.cluster,
                action: key.action,
            })
        })
        .collect()
}
