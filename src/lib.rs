//! Opportunity scoring for clustered social-listening corpora.
//!
//! Documents carry morpheme-tagged tokens and an actor (cluster) / action
//! (topic) assignment. Each actor-action group gets a satisfaction score
//! from lexicon sentiment, an importance score from its share of the
//! corpus, and an opportunity score combining the two.

pub mod aggregate;
pub mod assign;
pub mod cluster;
pub mod config;
pub mod corpus;
pub mod error;
pub mod keywords;
pub mod lexicon;
pub mod models;
pub mod normalize;
pub mod opportunity;
pub mod orchestrator;
pub mod pipeline;
pub mod preprocess;
pub mod render;
pub mod sentiment;
pub mod similarity;
pub mod topics;

pub use error::{PipelineError, Result};
pub use lexicon::{Lexicon, LexiconEntry, MatchPolicy};
pub use models::{Document, GroupKey, OpportunityRow};
pub use opportunity::opportunity;
pub use pipeline::{score_corpus, OpportunityReport};
