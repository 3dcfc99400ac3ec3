use thiserror::Error;

/// The crate's error type. Covers every failure mode of vocabulary
/// construction/loading and of a single recognition query.
#[derive(Debug, Error)]
pub enum NdbError {
    #[error("failed to load vocabulary store: {0}")]
    StoreLoadFailed(String),

    #[error("vocabulary build produced no patterns")]
    EmptyVocabulary,

    #[error("vocabulary is inconsistent: {0}")]
    InconsistentVocabulary(String),

    #[error("input contains no symbols resolvable against this store")]
    MalformedInput,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
