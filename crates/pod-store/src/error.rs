/// Errors from dataset and codec operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    /// The Turtle document could not be parsed.
    #[error("turtle syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// An IRI could not be resolved against the document base.
    #[error("cannot resolve <{iri}> against <{base}>: {reason}")]
    IriResolution { iri: String, base: String, reason: String },

    /// A prefixed name used a prefix that was never declared.
    #[error("undeclared prefix '{prefix}:' at line {line}")]
    UndeclaredPrefix { prefix: String, line: usize },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
