use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Redb(#[from] redb::Error),

    #[error("database open error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("database storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("database transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("database table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("database commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("model error: {0}")]
    Model(#[from] pylate_rs::ColbertError),

    #[error("tensor error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("LLM backend error: {0}")]
    Llm(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error("file extension '{extension}' not supported, must be PDF: {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("vector index already exists at {0}")]
    IndexExists(PathBuf),

    #[error("the vector index is empty, ingest documents first")]
    EmptyIndex,
}
