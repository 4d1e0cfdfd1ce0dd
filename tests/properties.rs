use opportunity_scorer::aggregate::aggregate;
use opportunity_scorer::lexicon::{Lexicon, LexiconEntry, MatchPolicy};
use opportunity_scorer::models::{GroupKey, ScoredDocument};
use opportunity_scorer::normalize::{round_to, DegeneratePolicy, IMPORTANCE_RANGE, SATISFACTION_RANGE};
use opportunity_scorer::opportunity::{score_groups, ScoringOptions};
use opportunity_scorer::sentiment::sentiment_score;
use opportunity_scorer::PipelineError;
use proptest::prelude::*;

fn scored(rows: &[(i64, i64, i64)]) -> Vec<ScoredDocument> {
    rows.iter()
        .enumerate()
        .map(|(i, &(c, a, s))| ScoredDocument {
            id: i.to_string(),
            key: GroupKey::new(c, a),
            sentiment: s,
            matches: vec![],
        })
        .collect()
}

fn corpus() -> impl Strategy<Value = Vec<(i64, i64, i64)>> {
    prop::collection::vec((0i64..4, 0i64..3, -20i64..20), 1..60)
}

fn midpoint() -> ScoringOptions {
    ScoringOptions {
        on_degenerate: DegeneratePolicy::Midpoint,
        ..ScoringOptions::default()
    }
}

proptest! {
    #[test]
    fn importance_shares_sum_to_one_hundred(rows in corpus()) {
        let groups = aggregate(&scored(&rows)).unwrap();
        let total: f64 = groups.iter().map(|g| g.raw_importance).sum();
        prop_assert!((total - 100.0).abs() < 1e-9);
        prop_assert_eq!(groups.iter().map(|g| g.count).sum::<usize>(), rows.len());
        prop_assert!(groups.windows(2).all(|w| w[0].key < w[1].key));
    }

    #[test]
    fn scaled_scores_stay_in_range(rows in corpus()) {
        let groups = aggregate(&scored(&rows)).unwrap();
        let out = score_groups(&groups, midpoint()).unwrap();
        prop_assert_eq!(out.len(), groups.len());
        for r in &out {
            prop_assert!(SATISFACTION_RANGE.contains(r.satisfaction));
            prop_assert!(IMPORTANCE_RANGE.contains(r.importance));
            prop_assert!(r.opportunity >= r.importance);
            prop_assert!(r.opportunity <= 2.0 * r.importance + 10.0);
        }
    }

    #[test]
    fn scaling_preserves_raw_order(rows in corpus()) {
        let groups = aggregate(&scored(&rows)).unwrap();
        let out = score_groups(&groups, midpoint()).unwrap();
        for a in &out {
            for b in &out {
                if a.raw_satisfaction < b.raw_satisfaction {
                    prop_assert!(a.satisfaction <= b.satisfaction);
                }
                if a.raw_importance < b.raw_importance {
                    prop_assert!(a.importance <= b.importance);
                }
            }
        }
    }

    #[test]
    fn extremes_map_to_range_bounds(rows in corpus()) {
        let groups = aggregate(&scored(&rows)).unwrap();
        match score_groups(&groups, ScoringOptions::default()) {
            Ok(out) => {
                let lo = out.iter().map(|r| r.satisfaction).fold(f64::INFINITY, f64::min);
                let hi = out.iter().map(|r| r.satisfaction).fold(f64::NEG_INFINITY, f64::max);
                prop_assert_eq!(lo, -10.0);
                prop_assert_eq!(hi, 10.0);
            }
            Err(e) => {
                let is_degenerate = matches!(e, PipelineError::DegenerateInput { .. });
                prop_assert!(is_degenerate);
            }
        }
    }

    #[test]
    fn raising_a_document_score_never_lowers_its_group(rows in corpus(), pick in any::<prop::sample::Index>(), bump in 1i64..10) {
        let before = aggregate(&scored(&rows)).unwrap();
        let i = pick.index(rows.len());
        let mut raised = rows.clone();
        raised[i].2 += bump;
        let after = aggregate(&scored(&raised)).unwrap();

        let key = GroupKey::new(rows[i].0, rows[i].1);
        let old = before.iter().find(|g| g.key == key).unwrap();
        let new = after.iter().find(|g| g.key == key).unwrap();
        prop_assert!(new.raw_satisfaction > old.raw_satisfaction);
        for (b, a) in before.iter().zip(&after) {
            if b.key != key {
                prop_assert_eq!(b.raw_satisfaction, a.raw_satisfaction);
            }
        }
    }

    #[test]
    fn sentiment_is_additive_over_token_lists(
        a in prop::collection::vec(prop::sample::select(vec!["좋다", "싫다", "보청기", "아프다"]), 0..10),
        b in prop::collection::vec(prop::sample::select(vec!["좋다", "싫다", "보청기", "아프다"]), 0..10),
    ) {
        let lex = Lexicon::from_entries([
            LexiconEntry { word: "좋다".into(), polarity: 2 },
            LexiconEntry { word: "싫다".into(), polarity: -2 },
            LexiconEntry { word: "아프다".into(), polarity: -1 },
            LexiconEntry { word: "아프다".into(), polarity: -2 },
        ]);
        let a: Vec<String> = a.into_iter().map(String::from).collect();
        let b: Vec<String> = b.into_iter().map(String::from).collect();
        let joined: Vec<String> = a.iter().chain(&b).cloned().collect();
        for policy in [MatchPolicy::All, MatchPolicy::First] {
            prop_assert_eq!(
                sentiment_score(&lex, &joined, policy),
                sentiment_score(&lex, &a, policy) + sentiment_score(&lex, &b, policy)
            );
        }
    }

    #[test]
    fn rounding_is_idempotent(v in -1.0e6f64..1.0e6) {
        let once = round_to(v, 4);
        prop_assert_eq!(round_to(once, 4), once);
    }
}

#[test]
fn single_group_is_degenerate() {
    let groups = aggregate(&scored(&[(0, 0, 3), (0, 0, -1)])).unwrap();
    let err = score_groups(&groups, ScoringOptions::default()).unwrap_err();
    assert!(matches!(err, PipelineError::DegenerateInput { what: "satisfaction", count: 1, .. }));
}
