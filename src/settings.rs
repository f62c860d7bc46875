//! Process-wide configuration, read once from the environment at startup
//! and threaded explicitly into every constructor.

use std::{fmt::Display, path::PathBuf, str::FromStr};

use crate::{
    chunking::{ChunkingConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE},
    error::{Error, Result},
    llm::LlmKind,
    ranker::RankerKind,
    vector_db::VectorDbKind,
};

/// Candidates pulled from the vector store per query.
pub const DEFAULT_RETRIEVER_CHUNKS: usize = 100;

/// Candidates kept after reranking, used to build the final prompt.
pub const DEFAULT_RANKER_CHUNKS: usize = 5;

pub const DEFAULT_LLM_TYPE: &str = "openai";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_RANKER_TYPE: &str = "colbert";
pub const DEFAULT_VECTOR_DB_TYPE: &str = "embedded";
pub const DEFAULT_MODEL_ID: &str = "lightonai/GTE-ModernColBERT-v1";
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Configuration for the whole pipeline.
///
/// Built once via [`Settings::from_env`] (with [`Default`] fallbacks) and
/// passed into constructors; core logic never reads the environment on its
/// own.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Chunk size in words.
    pub chunk_size: usize,
    /// Words shared between adjacent chunks.
    pub chunk_overlap: usize,
    /// Retrieval breadth: candidates pulled from the vector store.
    pub retriever_chunks: usize,
    /// Rerank breadth: candidates kept after cross-encoder scoring.
    pub ranker_chunks: usize,
    /// LLM backend selector (`openai`, `ollama`).
    pub llm_type: String,
    /// Model identifier passed to the LLM backend.
    pub llm_model: String,
    /// Ranker backend selector (`colbert`).
    pub ranker_type: String,
    /// Model identifier for the ranker backend.
    pub ranker_model: String,
    /// Vector store backend selector (`embedded`).
    pub vector_db_type: String,
    /// Model identifier the vector store embeds documents with.
    pub embed_model: String,
    /// On-disk location of the vector index.
    pub cache_dir: PathBuf,
    /// Credential for the OpenAI backend.
    pub openai_api_key: Option<String>,
    /// Base URL of the Ollama server.
    pub ollama_host: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            retriever_chunks: DEFAULT_RETRIEVER_CHUNKS,
            ranker_chunks: DEFAULT_RANKER_CHUNKS,
            llm_type: DEFAULT_LLM_TYPE.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            ranker_type: DEFAULT_RANKER_TYPE.to_string(),
            ranker_model: DEFAULT_MODEL_ID.to_string(),
            vector_db_type: DEFAULT_VECTOR_DB_TYPE.to_string(),
            embed_model: DEFAULT_MODEL_ID.to_string(),
            cache_dir: default_cache_dir(),
            openai_api_key: None,
            ollama_host: DEFAULT_OLLAMA_HOST.to_string(),
        }
    }
}

/// Resolve the default vector index location from the XDG data directory
/// (`~/.local/share/ragbert/vector_db`), falling back to a relative path.
fn default_cache_dir() -> PathBuf {
    xdg::BaseDirectories::with_prefix("ragbert")
        .get_data_home()
        .map(|home| home.join("vector_db"))
        .unwrap_or_else(|| PathBuf::from("data").join("vector_db"))
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| Error::Config(format!("invalid value for {key}: {e}")))
}

impl Settings {
    /// Load settings from the environment, applying defaults for anything
    /// unset, and validate them. Unknown backend selectors and broken
    /// invariants fail here, before any component is constructed.
    pub fn from_env() -> Result<Self> {
        let mut settings = Self::default();

        if let Ok(v) = std::env::var("RAGBERT_CHUNK_SIZE") {
            settings.chunk_size = parse_env("RAGBERT_CHUNK_SIZE", &v)?;
        }
        if let Ok(v) = std::env::var("RAGBERT_CHUNK_OVERLAP") {
            settings.chunk_overlap = parse_env("RAGBERT_CHUNK_OVERLAP", &v)?;
        }
        if let Ok(v) = std::env::var("RAGBERT_RETRIEVER_CHUNKS") {
            settings.retriever_chunks = parse_env("RAGBERT_RETRIEVER_CHUNKS", &v)?;
        }
        if let Ok(v) = std::env::var("RAGBERT_RANKER_CHUNKS") {
            settings.ranker_chunks = parse_env("RAGBERT_RANKER_CHUNKS", &v)?;
        }
        if let Ok(v) = std::env::var("RAGBERT_LLM") {
            settings.llm_type = v;
        }
        if let Ok(v) = std::env::var("RAGBERT_LLM_MODEL") {
            settings.llm_model = v;
        }
        if let Ok(v) = std::env::var("RAGBERT_RANKER") {
            settings.ranker_type = v;
        }
        if let Ok(v) = std::env::var("RAGBERT_RANKER_MODEL") {
            settings.ranker_model = v;
        }
        if let Ok(v) = std::env::var("RAGBERT_VECTOR_DB") {
            settings.vector_db_type = v;
        }
        if let Ok(v) = std::env::var("RAGBERT_EMBED_MODEL") {
            settings.embed_model = v;
        }
        if let Ok(v) = std::env::var("RAGBERT_CACHE_DIR") {
            settings.cache_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            settings.openai_api_key = Some(v);
        }
        if let Ok(v) = std::env::var("OLLAMA_HOST") {
            settings.ollama_host = v;
        }

        settings.validate()?;
        Ok(settings)
    }

    /// The chunking parameters as a standalone config.
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
        }
    }

    /// Check cross-field invariants and backend selectors.
    pub fn validate(&self) -> Result<()> {
        self.chunking().validate()?;

        if self.retriever_chunks == 0 {
            return Err(Error::Config(
                "retriever chunk count must be positive".into(),
            ));
        }
        if self.ranker_chunks == 0 {
            return Err(Error::Config("ranker chunk count must be positive".into()));
        }
        if self.ranker_chunks > self.retriever_chunks {
            return Err(Error::Config(format!(
                "ranker chunk count ({}) must not exceed retriever chunk count ({})",
                self.ranker_chunks, self.retriever_chunks
            )));
        }

        self.llm_type.parse::<LlmKind>()?;
        self.ranker_type.parse::<RankerKind>()?;
        self.vector_db_type.parse::<VectorDbKind>()?;

        Ok(())
    }
}
