use itertools::Itertools;

use crate::models::{ClusterKeywords, OpportunityRow};
use crate::pipeline::ReportSummary;
use crate::topics::TopicModelSummary;

/// Rows sorted by descending opportunity, ties by group key.
pub fn ranked(rows: &[OpportunityRow]) -> Vec<&OpportunityRow> {
    let mut v: Vec<&OpportunityRow> = rows.iter().collect();
    v.sort_by(|a, b| b.opportunity.total_cmp(&a.opportunity).then(a.key.cmp(&b.key)));
    v
}

pub fn render_opportunity_markdown(
    date: &str,
    summary: &ReportSummary,
    rows: &[OpportunityRow],
    keywords: &[ClusterKeywords],
    topic_models: &[TopicModelSummary],
) -> String {
    let mut md = String::new();
    md.push_str(&format!("# Opportunity Report ({})\n\n", date));
    md.push_str(&format!(
        "{} documents in {} actor-action groups. Mean satisfaction {:.2}, mean importance {:.2}.\n\n",
        summary.documents, summary.groups, summary.mean_satisfaction, summary.mean_importance
    ));

    md.push_str("## Opportunity Ranking\n\n");
    md.push_str("| Group | Docs | Importance | Satisfaction | Opportunity |\n");
    md.push_str("|---|---:|---:|---:|---:|\n");
    for r in ranked(rows) {
        md.push_str(&format!(
            "| {} | {} | {:.4} | {:.4} | {:.4} |\n",
            r.label, r.count, r.importance, r.satisfaction, r.opportunity
        ));
    }
    md.push('\n');

    // underserved: above-average importance, below-average satisfaction
    let underserved: Vec<&OpportunityRow> = ranked(rows)
        .into_iter()
        .filter(|r| r.importance > summary.mean_importance && r.satisfaction < summary.mean_satisfaction)
        .collect();
    if !underserved.is_empty() {
        md.push_str("## Underserved Groups\n");
        for r in underserved {
            md.push_str(&format!(
                "- **{}**: importance {:.2}, satisfaction {:.2}\n",
                r.label, r.importance, r.satisfaction
            ));
        }
        md.push('\n');
    }

    if !keywords.is_empty() {
        md.push_str("## Cluster Keywords\n");
        for k in keywords {
            let words = k.keywords.iter().take(10).map(|(w, _)| w.as_str()).join(", ");
            md.push_str(&format!("- **Actor{}** ({} docs): {}\n", k.cluster, k.documents, words));
        }
        md.push('\n');
    }

    if !topic_models.is_empty() {
        md.push_str("## Actions per Actor\n");
        for t in topic_models {
            md.push_str(&format!("### Actor{} ({} topics)\n", t.cluster, t.n_topics));
            for (z, words) in t.topics.iter().enumerate() {
                md.push_str(&format!("- Action{}: {}\n", z, words.iter().map(|(w, _)| w.as_str()).join(", ")));
            }
        }
        md.push('\n');
    }

    md
}
