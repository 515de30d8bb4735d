#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("search term is empty")]
    EmptyTerm,
    #[error("failed to read taxonomy file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write taxonomy file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to deserialize taxonomy: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to serialize taxonomy: {0}")]
    Serialization(serde_json::Error),
    #[error("duplicate classification code: {0}")]
    DuplicateCode(String),
    #[error("classification code not found: {0}")]
    CodeNotFound(String),
    #[error("classification code already in use: {0}")]
    CodeTaken(String),
    #[error("classification store lock poisoned")]
    LockPoisoned,
}

pub type ClassificationResult<T> = std::result::Result<T, ClassificationError>;
