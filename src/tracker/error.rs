use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Contributor not found: {0}")]
    ContributorNotFound(String),

    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Unknown CSV schema: {0}")]
    UnknownSchema(String),
}
