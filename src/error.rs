use thiserror::Error;

/// Errors raised by the scoring pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("corpus is empty: no documents reached {stage}")]
    EmptyCorpus { stage: &'static str },

    #[error("degenerate {what} scaling: all {count} values equal {value}")]
    DegenerateInput {
        what: &'static str,
        count: usize,
        value: f64,
    },

    #[error("document {document_id} has no {field} assignment")]
    MissingAssignment {
        document_id: String,
        field: &'static str,
    },

    #[error("document {document_id} has no embedding vector")]
    MissingEmbedding { document_id: String },

    #[error("document {document_id} has a non-finite embedding component at index {index}")]
    NonFiniteEmbedding { document_id: String, index: usize },

    #[error("embedding dimension mismatch: expected {expected}, document {document_id} has {found}")]
    DimensionMismatch {
        document_id: String,
        expected: usize,
        found: usize,
    },

    #[error("lexicon entry {word:?} has non-integer polarity {raw:?}")]
    InvalidPolarity { word: String, raw: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
