//! Per-cluster LDA topic modeling: each document's dominant topic becomes
//! its action id inside the cluster.
//!
//! LDA is fit with collapsed Gibbs sampling from a fixed seed, so a given
//! corpus always yields the same assignments.

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};

/// Score used to pick the topic count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoherenceMeasure {
    /// NPMI over boolean sliding windows, indirect cosine against the topic's top words.
    #[default]
    #[serde(rename = "c_v")]
    CV,
    /// Document co-occurrence log ratio.
    #[serde(rename = "u_mass")]
    UMass,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicParams {
    pub min_topics: usize,
    pub max_topics: usize,
    pub alpha: f64,
    pub beta: f64,
    pub iterations: usize,           // final model
    pub selection_iterations: usize, // each candidate topic count
    pub seed: u64,
    pub no_below: usize,
    pub no_above: f64,
    pub coherence: CoherenceMeasure,
    pub coherence_top_n: usize,
    pub coherence_window: usize, // c_v sliding window, in tokens
    pub top_words: usize,
}

impl Default for TopicParams {
    fn default() -> Self {
        Self {
            min_topics: 2,
            max_topics: 9,
            alpha: 0.1,
            beta: 0.01,
            iterations: 500,
            selection_iterations: 200,
            seed: 42,
            no_below: 2,
            no_above: 0.5,
            coherence: CoherenceMeasure::CV,
            coherence_top_n: 3,
            coherence_window: 110,
            top_words: 5,
        }
    }
}

impl TopicParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_topics == 0 || self.min_topics > self.max_topics {
            return Err(PipelineError::InvalidConfig(format!(
                "topic range {}..={} is empty or starts at zero",
                self.min_topics, self.max_topics
            )));
        }
        if self.alpha <= 0.0 || self.beta <= 0.0 {
            return Err(PipelineError::InvalidConfig("LDA priors must be positive".into()));
        }
        if !(self.no_above > 0.0 && self.no_above <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "no_above must be in (0, 1], got {}",
                self.no_above
            )));
        }
        if self.coherence_top_n == 0 || self.coherence_window == 0 {
            return Err(PipelineError::InvalidConfig(
                "coherence_top_n and coherence_window must be positive".into(),
            ));
        }
        if self.iterations == 0 || self.selection_iterations == 0 {
            return Err(PipelineError::InvalidConfig("LDA iterations must be positive".into()));
        }
        Ok(())
    }
}

/// Token ↔ id mapping restricted to informative words.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    ids: HashMap<String, usize>,
    terms: Vec<String>,
    doc_freq: Vec<usize>,
}

impl Dictionary {
    /// Keep words found in at least `no_below` documents and in no more
    /// than `no_above` (fraction) of them. Ids follow first appearance.
    pub fn build(docs: &[Vec<String>], no_below: usize, no_above: f64) -> Self {
        let mut order: Vec<&str> = Vec::new();
        let mut df: HashMap<&str, usize> = HashMap::new();
        for doc in docs {
            let mut uniq: Vec<&str> = Vec::new();
            for w in doc {
                if !uniq.contains(&w.as_str()) {
                    uniq.push(w.as_str());
                }
            }
            for w in uniq {
                let e = df.entry(w).or_insert_with(|| {
                    order.push(w);
                    0
                });
                *e += 1;
            }
        }

        let max_df = (no_above * docs.len() as f64) as usize;
        let mut dict = Dictionary::default();
        for w in order {
            let f = df[w];
            if f >= no_below && f <= max_df {
                dict.ids.insert(w.to_string(), dict.terms.len());
                dict.terms.push(w.to_string());
                dict.doc_freq.push(f);
            }
        }
        dict
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn id(&self, term: &str) -> Option<usize> {
        self.ids.get(term).copied()
    }

    pub fn term(&self, id: usize) -> &str {
        &self.terms[id]
    }

    /// Bag of words as (id, count), ids ascending; unknown words dropped.
    pub fn doc2bow(&self, doc: &[String]) -> Vec<(usize, usize)> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for w in doc {
            if let Some(&id) = self.ids.get(w) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let mut bow: Vec<(usize, usize)> = counts.into_iter().collect();
        bow.sort_unstable();
        bow
    }
}

/// A fitted LDA model over a bag-of-words corpus.
#[derive(Debug, Clone)]
pub struct Lda {
    n_topics: usize,
    n_words: usize,
    alpha: f64,
    beta: f64,
    topic_word: Vec<f64>, // n_topics × n_words counts
    topic_totals: Vec<f64>,
    doc_topic: Vec<f64>, // n_docs × n_topics counts
    doc_len: Vec<f64>,
}

impl Lda {
    pub fn fit(
        bows: &[Vec<(usize, usize)>],
        n_words: usize,
        n_topics: usize,
        params: &TopicParams,
        iterations: usize,
    ) -> Self {
        let n_docs = bows.len();
        let mut rng = StdRng::seed_from_u64(params.seed);

        let mut topic_word = vec![0.0; n_topics * n_words];
        let mut topic_totals = vec![0.0; n_topics];
        let mut doc_topic = vec![0.0; n_docs * n_topics];
        let mut doc_len = vec![0.0; n_docs];

        // flatten each document into word tokens with a current topic
        let mut tokens: Vec<Vec<(usize, usize)>> = Vec::with_capacity(n_docs);
        for (d, bow) in bows.iter().enumerate() {
            let mut doc_tokens = Vec::new();
            for &(w, count) in bow {
                for _ in 0..count {
                    let z = rng.gen_range(0..n_topics);
                    topic_word[z * n_words + w] += 1.0;
                    topic_totals[z] += 1.0;
                    doc_topic[d * n_topics + z] += 1.0;
                    doc_len[d] += 1.0;
                    doc_tokens.push((w, z));
                }
            }
            tokens.push(doc_tokens);
        }

        let beta_sum = params.beta * n_words as f64;
        let mut probs = vec![0.0; n_topics];
        for _ in 0..iterations {
            for (d, doc_tokens) in tokens.iter_mut().enumerate() {
                for tok in doc_tokens.iter_mut() {
                    let (w, old) = *tok;
                    topic_word[old * n_words + w] -= 1.0;
                    topic_totals[old] -= 1.0;
                    doc_topic[d * n_topics + old] -= 1.0;

                    // the document-length denominator is constant across topics
                    let mut total = 0.0;
                    for (z, p) in probs.iter_mut().enumerate() {
                        *p = (doc_topic[d * n_topics + z] + params.alpha)
                            * (topic_word[z * n_words + w] + params.beta)
                            / (topic_totals[z] + beta_sum);
                        total += *p;
                    }
                    let threshold = rng.gen::<f64>() * total;
                    let mut cumsum = 0.0;
                    let mut new = n_topics - 1;
                    for (z, &p) in probs.iter().enumerate() {
                        cumsum += p;
                        if cumsum >= threshold {
                            new = z;
                            break;
                        }
                    }

                    topic_word[new * n_words + w] += 1.0;
                    topic_totals[new] += 1.0;
                    doc_topic[d * n_topics + new] += 1.0;
                    tok.1 = new;
                }
            }
        }

        Self {
            n_topics,
            n_words,
            alpha: params.alpha,
            beta: params.beta,
            topic_word,
            topic_totals,
            doc_topic,
            doc_len,
        }
    }

    pub fn n_topics(&self) -> usize {
        self.n_topics
    }

    /// Topic distribution of training document `d`.
    pub fn document_topics(&self, d: usize) -> Vec<f64> {
        let denom = self.doc_len[d] + self.n_topics as f64 * self.alpha;
        (0..self.n_topics)
            .map(|z| (self.doc_topic[d * self.n_topics + z] + self.alpha) / denom)
            .collect()
    }

    /// Most probable topic of document `d`; the lowest index wins ties.
    pub fn dominant_topic(&self, d: usize) -> usize {
        let theta = self.document_topics(d);
        let mut best = 0;
        for z in 1..theta.len() {
            if theta[z] > theta[best] {
                best = z;
            }
        }
        best
    }

    pub fn word_probability(&self, z: usize, w: usize) -> f64 {
        (self.topic_word[z * self.n_words + w] + self.beta)
            / (self.topic_totals[z] + self.beta * self.n_words as f64)
    }

    /// Word ids of topic `z` by descending probability, ties by id.
    pub fn top_word_ids(&self, z: usize, n: usize) -> Vec<usize> {
        let mut ids: Vec<usize> = (0..self.n_words).collect();
        ids.sort_by(|&a, &b| {
            self.word_probability(z, b)
                .total_cmp(&self.word_probability(z, a))
                .then(a.cmp(&b))
        });
        ids.truncate(n);
        ids
    }

    /// Mean per-token log-likelihood of the training corpus.
    pub fn log_perplexity(&self) -> f64 {
        let n_docs = self.doc_len.len();
        let total_tokens: f64 = self.doc_len.iter().sum();
        if total_tokens == 0.0 {
            return 0.0;
        }
        let mut ll = 0.0;
        for z in 0..self.n_topics {
            for w in 0..self.n_words {
                let c = self.topic_word[z * self.n_words + w];
                if c > 0.0 {
                    ll += c * self.word_probability(z, w).ln();
                }
            }
        }
        for d in 0..n_docs {
            for (z, p) in self.document_topics(d).into_iter().enumerate() {
                let c = self.doc_topic[d * self.n_topics + z];
                if c > 0.0 {
                    ll += c * p.ln();
                }
            }
        }
        ll / total_tokens
    }
}

const COHERENCE_EPS: f64 = 1e-12;

/// UMass coherence averaged over topics, using each topic's top words.
pub fn umass_coherence(lda: &Lda, bows: &[Vec<(usize, usize)>], top_n: usize) -> f64 {
    let n_docs = bows.len() as f64;
    if n_docs == 0.0 || lda.n_topics() == 0 {
        return 0.0;
    }
    let doc_sets: Vec<Vec<usize>> = bows.iter().map(|b| b.iter().map(|&(w, _)| w).collect()).collect();
    let df = |w: usize| doc_sets.iter().filter(|s| s.binary_search(&w).is_ok()).count() as f64;
    let co_df = |a: usize, b: usize| {
        doc_sets
            .iter()
            .filter(|s| s.binary_search(&a).is_ok() && s.binary_search(&b).is_ok())
            .count() as f64
    };

    let mut total = 0.0;
    for z in 0..lda.n_topics() {
        let top = lda.top_word_ids(z, top_n);
        let mut sum = 0.0;
        let mut pairs = 0usize;
        for m in 1..top.len() {
            for l in 0..m {
                let dl = df(top[l]);
                if dl == 0.0 {
                    continue;
                }
                sum += ((co_df(top[m], top[l]) / n_docs + COHERENCE_EPS) / (dl / n_docs)).ln();
                pairs += 1;
            }
        }
        if pairs > 0 {
            total += sum / pairs as f64;
        }
    }
    total / lda.n_topics() as f64
}

/// Window counts for a fixed set of word ids.
#[derive(Debug, Clone, Default)]
struct WindowCounts {
    windows: f64,
    single: HashMap<usize, f64>,
    pair: HashMap<(usize, usize), f64>, // (low id, high id)
}

impl WindowCounts {
    fn add_window(&mut self, window: &[Option<usize>]) {
        self.windows += 1.0;
        let mut present: Vec<usize> = window.iter().flatten().copied().collect();
        present.sort_unstable();
        present.dedup();
        for (i, &a) in present.iter().enumerate() {
            *self.single.entry(a).or_insert(0.0) += 1.0;
            for &b in &present[i + 1..] {
                *self.pair.entry((a, b)).or_insert(0.0) += 1.0;
            }
        }
    }

    fn occurrences(&self, w: usize) -> f64 {
        self.single.get(&w).copied().unwrap_or(0.0)
    }

    fn joint(&self, a: usize, b: usize) -> f64 {
        if a == b {
            return self.occurrences(a);
        }
        self.pair.get(&(a.min(b), a.max(b))).copied().unwrap_or(0.0)
    }

    /// Normalized PMI of `a` and `b` over windows.
    fn npmi(&self, a: usize, b: usize) -> f64 {
        let p_a = self.occurrences(a) / self.windows;
        let p_b = self.occurrences(b) / self.windows;
        if p_a == 0.0 || p_b == 0.0 {
            return 0.0;
        }
        let p_ab = self.joint(a, b) / self.windows + COHERENCE_EPS;
        (p_ab / (p_a * p_b)).ln() / -p_ab.ln()
    }
}

/// Boolean sliding windows of `size` tokens over every text. A text no
/// longer than the window counts as a single window. Only `relevant`
/// ids are tracked; other tokens still occupy window positions.
fn boolean_sliding_windows(texts: &[Vec<String>], dict: &Dictionary, relevant: &[usize], size: usize) -> WindowCounts {
    let relevant: HashSet<usize> = relevant.iter().copied().collect();
    let mut counts = WindowCounts::default();
    for text in texts {
        let ids: Vec<Option<usize>> = text
            .iter()
            .map(|w| dict.id(w).filter(|id| relevant.contains(id)))
            .collect();
        if ids.len() <= size {
            counts.add_window(&ids);
        } else {
            for w in ids.windows(size) {
                counts.add_window(w);
            }
        }
    }
    counts
}

fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// C_V coherence averaged over topics.
///
/// Each top word's context vector holds its NPMI against every top word
/// of the topic; the topic set's vector is their sum. A topic scores the
/// mean cosine between each word vector and the set vector.
pub fn cv_coherence(topics: &[Vec<usize>], texts: &[Vec<String>], dict: &Dictionary, window: usize) -> f64 {
    if topics.is_empty() {
        return 0.0;
    }
    let mut relevant: Vec<usize> = topics.iter().flatten().copied().collect();
    relevant.sort_unstable();
    relevant.dedup();
    let counts = boolean_sliding_windows(texts, dict, &relevant, window);
    if counts.windows == 0.0 {
        return 0.0;
    }

    let total: f64 = topics
        .iter()
        .map(|top| {
            if top.is_empty() {
                return 0.0;
            }
            let vectors: Vec<Vec<f64>> = top
                .iter()
                .map(|&w| top.iter().map(|&v| counts.npmi(w, v)).collect())
                .collect();
            let set: Vec<f64> = (0..top.len()).map(|j| vectors.iter().map(|v| v[j]).sum()).collect();
            vectors.iter().map(|v| cosine(v, &set)).sum::<f64>() / top.len() as f64
        })
        .sum();
    total / topics.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicCandidate {
    pub n_topics: usize,
    pub coherence: f64,
    pub log_perplexity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicModelSummary {
    pub cluster: i64,
    pub documents: usize,
    pub vocabulary: usize,
    pub n_topics: usize,
    pub candidates: Vec<TopicCandidate>,
    pub topics: Vec<Vec<(String, f64)>>,
}

/// Assign an action id to every document of one cluster.
///
/// Returns one action per input document, in input order.
pub fn assign_actions(cluster: i64, docs: &[Vec<String>], params: &TopicParams) -> (Vec<i64>, TopicModelSummary) {
    let start = std::time::Instant::now();
    let dict = Dictionary::build(docs, params.no_below, params.no_above);
    let bows: Vec<Vec<(usize, usize)>> = docs.iter().map(|d| dict.doc2bow(d)).collect();
    debug!(
        "Topic dictionary - cluster={}, documents={}, vocabulary={}",
        cluster,
        docs.len(),
        dict.len()
    );

    if dict.is_empty() {
        warn!(
            "Empty topic dictionary - cluster={}, documents={}; every document gets action 0",
            cluster,
            docs.len()
        );
        return (
            vec![0; docs.len()],
            TopicModelSummary {
                cluster,
                documents: docs.len(),
                vocabulary: 0,
                n_topics: 1,
                candidates: Vec::new(),
                topics: Vec::new(),
            },
        );
    }

    let mut candidates = Vec::new();
    let mut best: Option<(usize, f64)> = None;
    for k in params.min_topics..=params.max_topics {
        let lda = Lda::fit(&bows, dict.len(), k, params, params.selection_iterations);
        let coherence = match params.coherence {
            CoherenceMeasure::CV => {
                let tops: Vec<Vec<usize>> = (0..k).map(|z| lda.top_word_ids(z, params.coherence_top_n)).collect();
                cv_coherence(&tops, docs, &dict, params.coherence_window)
            }
            CoherenceMeasure::UMass => umass_coherence(&lda, &bows, params.coherence_top_n),
        };
        let log_perplexity = lda.log_perplexity();
        debug!(
            "Topic candidate - cluster={}, topics={}, coherence={:.4}, log_perplexity={:.4}",
            cluster, k, coherence, log_perplexity
        );
        candidates.push(TopicCandidate {
            n_topics: k,
            coherence,
            log_perplexity,
        });
        if best.map_or(true, |(_, c)| coherence > c) {
            best = Some((k, coherence));
        }
    }
    let n_topics = best.map(|(k, _)| k).unwrap_or(params.min_topics);

    let lda = Lda::fit(&bows, dict.len(), n_topics, params, params.iterations);
    let actions: Vec<i64> = (0..docs.len()).map(|d| lda.dominant_topic(d) as i64).collect();
    let topics: Vec<Vec<(String, f64)>> = (0..n_topics)
        .map(|z| {
            lda.top_word_ids(z, params.top_words)
                .into_iter()
                .map(|w| (dict.term(w).to_string(), lda.word_probability(z, w)))
                .collect()
        })
        .collect();

    info!(
        "Topic modeling completed - cluster={}, documents={}, topics={}, duration={:.2}s",
        cluster,
        docs.len(),
        n_topics,
        start.elapsed().as_secs_f32()
    );

    (
        actions,
        TopicModelSummary {
            cluster,
            documents: docs.len(),
            vocabulary: dict.len(),
            n_topics,
            candidates,
            topics,
        },
    )
}
