use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::assign::{apply_assignments, assign, existing_assignments};
use crate::config::PipelineConfig;
use crate::corpus::load_corpus;
use crate::keywords::cluster_keywords;
use crate::lexicon::load_lexicon;
use crate::pipeline::{drop_short_documents, score_corpus, topic_tokens};
use crate::preprocess::Stopwords;
use crate::render::{ranked, render_opportunity_markdown};
use crate::topics::TopicModelSummary;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub corpus: PathBuf,
    pub lexicon: PathBuf,
    pub output_dir: PathBuf,
    pub date: String, // YYYY-MM-DD, names the output subdirectory
    pub assign: bool,
    pub stopwords: Option<PathBuf>,
}

fn write_json<P: AsRef<Path>, T: ?Sized + Serialize>(path: P, value: &T) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, serde_json::to_vec_pretty(value)?)
        .with_context(|| format!("writing {}", path.display()))
}

fn load_stopwords(cfg: &PipelineConfig, extra: Option<&Path>) -> Result<Stopwords> {
    let mut stop = Stopwords::default();
    for p in cfg.preprocess.stopwords_path.as_deref().into_iter().chain(extra) {
        let added = stop.extend_from_file(p)?;
        debug!("Stopwords extended - path={}, added={}", p.display(), added);
    }
    Ok(stop)
}

/// Load, assign if asked, score and persist. Returns the output directory.
/// The short-post filter only applies when assigning.
pub fn run(opts: &RunOptions, cfg: &PipelineConfig) -> Result<PathBuf> {
    let pipeline_start = std::time::Instant::now();
    info!(
        "Pipeline started - corpus={}, lexicon={}, assign={}",
        opts.corpus.display(),
        opts.lexicon.display(),
        opts.assign
    );

    // 1) inputs
    let lexicon = load_lexicon(&opts.lexicon)?;
    let docs = load_corpus(&opts.corpus)?;
    let stop = load_stopwords(cfg, opts.stopwords.as_deref())?;

    // 2) actor/action assignment
    let mut topic_models: Vec<TopicModelSummary> = Vec::new();
    let (docs, assignments, topic_input) = if opts.assign {
        let assign_start = std::time::Instant::now();
        let mut docs = drop_short_documents(docs, cfg.preprocess.min_chars);
        if docs.is_empty() {
            bail!(
                "No documents left after preprocessing (min_chars={}) in {}",
                cfg.preprocess.min_chars,
                opts.corpus.display()
            );
        }
        let topic_input = topic_tokens(&docs, &stop);
        let outcome = assign(&docs, &topic_input, cfg.clustering.into(), &cfg.topics)?;
        apply_assignments(&mut docs, &outcome.assignments);
        topic_models = outcome.topic_models;
        info!(
            "Assignment stage completed - duration={:.2}s, clusters={}",
            assign_start.elapsed().as_secs_f32(),
            outcome.clustering.n_clusters
        );
        (docs, outcome.assignments, topic_input)
    } else {
        let assignments = existing_assignments(&docs)?;
        let topic_input = topic_tokens(&docs, &stop);
        (docs, assignments, topic_input)
    };

    // 3) scoring over the full token lists
    let report = score_corpus(&docs, &lexicon, cfg)?;

    // 4) interpretation
    let labeled: Vec<(i64, &[String])> = assignments
        .iter()
        .zip(&topic_input)
        .map(|(a, t)| (a.cluster, t.as_slice()))
        .collect();
    let keywords = cluster_keywords(&labeled, cfg.keywords.top_n);

    // 5) persist to date-scoped directory
    let persist_start = std::time::Instant::now();
    let date_dir = opts.output_dir.join(&opts.date);
    std::fs::create_dir_all(&date_dir).with_context(|| format!("creating {}", date_dir.display()))?;
    debug!("Output directory: {}", date_dir.display());

    write_json(
        date_dir.join("opportunity.json"),
        &json!({
            "date": opts.date,
            "summary": report.summary,
            "groups": report.rows,
        }),
    )?;
    write_json(date_dir.join("documents.scored.json"), &report.scored)?;
    write_json(date_dir.join("assignments.json"), &assignments)?;
    write_json(date_dir.join("keywords.json"), &keywords)?;
    if !topic_models.is_empty() {
        write_json(date_dir.join("topics.json"), &topic_models)?;
    }

    let md = render_opportunity_markdown(&opts.date, &report.summary, &report.rows, &keywords, &topic_models);
    std::fs::write(date_dir.join("opportunity.md"), md.as_bytes())
        .with_context(|| format!("writing {}", date_dir.join("opportunity.md").display()))?;

    info!(
        "Output persisted - duration={:.2}s, directory={}",
        persist_start.elapsed().as_secs_f32(),
        date_dir.display()
    );

    if let Some(top) = ranked(&report.rows).first() {
        info!("Top opportunity - group={}, score={:.4}", top.label, top.opportunity);
    }
    info!(
        "Pipeline completed successfully - total_duration={:.2}s, documents={}, groups={}",
        pipeline_start.elapsed().as_secs_f32(),
        report.summary.documents,
        report.summary.groups
    );
    Ok(date_dir)
}
