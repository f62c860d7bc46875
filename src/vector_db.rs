//! The vector store adapter: persistence plus similarity search over
//! indexed chunks.

use std::{
    path::{Path, PathBuf},
    str::FromStr,
};

use candle_core::{Device, Tensor};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    chunk_db::{ChunkDb, ChunkPayload, EmbeddingMatrix},
    chunking::{ChunkingConfig, TextMetadata},
    error::{Error, Result},
    ingestion,
    model_manager::ModelManager,
    ranker,
};

/// One hit from a similarity search.
///
/// `similarity` starts out as the vector store's score; after reranking
/// the orchestrator overwrites it with the ranker's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub text: String,
    pub similarity: f32,
    pub metadata: TextMetadata,
}

/// A similarity-searchable store of text chunks.
///
/// Implementations own persistence and scoring; the rest of the pipeline
/// stays agnostic to the backing engine.
pub trait VectorDb: std::fmt::Debug {
    /// Add chunks with their metadata to the store.
    fn add_documents(&mut self, documents: &[(String, TextMetadata)]) -> Result<()>;

    /// Return up to `limit` results, sorted by descending similarity.
    ///
    /// Fails with [`Error::EmptyIndex`] when nothing has been indexed yet.
    fn search(&mut self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;

    /// Extract, chunk, and index a batch of PDF documents.
    ///
    /// Every path is validated before any extraction work begins; all
    /// resulting chunks are forwarded to [`VectorDb::add_documents`] in a
    /// single call.
    fn add_pdf_documents(
        &mut self,
        paths: &[PathBuf],
        chunking: &ChunkingConfig,
        verbose: bool,
    ) -> Result<()> {
        let chunks = ingestion::extract_pdf_chunks(paths, chunking, verbose)?;
        let documents: Vec<(String, TextMetadata)> = chunks
            .into_iter()
            .map(|chunk| (chunk.text, chunk.metadata))
            .collect();
        self.add_documents(&documents)
    }
}

/// The closed set of supported vector store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorDbKind {
    Embedded,
}

impl FromStr for VectorDbKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "embedded" => Ok(Self::Embedded),
            other => Err(Error::Config(format!(
                "unknown vector DB type: {other}"
            ))),
        }
    }
}

/// Instantiate a vector store backend by kind.
///
/// With `exist_ok = false` a pre-existing cache directory is an error, so
/// document embeddings are never silently appended to an unrelated index.
pub fn create_vector_db(
    kind: VectorDbKind,
    cache_dir: &Path,
    exist_ok: bool,
    model_id: &str,
) -> Result<Box<dyn VectorDb>> {
    match kind {
        VectorDbKind::Embedded => Ok(Box::new(EmbeddedVectorDb::create(
            cache_dir, exist_ok, model_id,
        )?)),
    }
}

/// A local, file-backed vector store.
///
/// Chunk payloads and per-token embedding matrices live in a redb database
/// under the cache directory; queries are scored against every stored
/// chunk with MaxSim. Brute force, but plenty for a per-project document
/// collection, and it keeps the whole pipeline offline.
pub struct EmbeddedVectorDb {
    db: ChunkDb,
    model: ModelManager,
}

impl EmbeddedVectorDb {
    /// Create a store under `cache_dir`, refusing to touch an existing
    /// directory unless `exist_ok` is set.
    pub fn create(cache_dir: &Path, exist_ok: bool, model_id: &str) -> Result<Self> {
        if cache_dir.exists() {
            if !exist_ok {
                return Err(Error::IndexExists(cache_dir.to_path_buf()));
            }
            info!("loading existing vector index at {}", cache_dir.display());
        } else {
            info!("creating new vector index at {}", cache_dir.display());
        }
        std::fs::create_dir_all(cache_dir)?;

        Ok(Self {
            db: ChunkDb::open(&cache_dir.join("chunks.redb"))?,
            model: ModelManager::new(model_id),
        })
    }

    /// Number of chunks currently indexed.
    pub fn len(&self) -> Result<u64> {
        self.db.count()
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.db.count()? == 0)
    }
}

impl VectorDb for EmbeddedVectorDb {
    fn add_documents(&mut self, documents: &[(String, TextMetadata)]) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> =
            documents.iter().map(|(text, _)| text.clone()).collect();
        let embeddings = self.model.encode_documents(&texts)?;
        let (batch, _num_tokens, dimension) = embeddings.dims3()?;
        if batch != documents.len() {
            return Err(Error::Config(format!(
                "encoded {batch} documents, expected {}",
                documents.len()
            )));
        }

        let mut entries = Vec::with_capacity(batch);
        for (i, (text, metadata)) in documents.iter().enumerate() {
            let doc_embedding = embeddings.get(i)?;
            let data: Vec<f32> = doc_embedding.flatten_all()?.to_vec1::<f32>()?;
            let num_tokens = data.len() / dimension;

            entries.push((
                ChunkPayload {
                    text: text.clone(),
                    metadata: metadata.clone(),
                },
                EmbeddingMatrix {
                    num_tokens: num_tokens as u32,
                    dimension: dimension as u32,
                    data,
                },
            ));
        }

        self.db.append(&entries)?;
        debug!(added = entries.len(), "indexed chunks");
        Ok(())
    }

    fn search(&mut self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        // Checked before any model work so a fresh index fails fast.
        if self.db.count()? == 0 {
            return Err(Error::EmptyIndex);
        }

        let query_embedding = self.model.encode_query(query)?;
        let ids = self.db.ids()?;

        let db = &self.db;
        let mut scored: Vec<(u64, f32)> = ids
            .par_iter()
            .filter_map(|&chunk_id| {
                let matrix = db.embedding(chunk_id).ok().flatten()?;
                let embedding = matrix_to_tensor(&matrix).ok()?;
                let score = ranker::maxsim(&query_embedding, &embedding).ok()?;
                Some((chunk_id, score))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);

        let mut results = Vec::with_capacity(scored.len());
        for (chunk_id, score) in scored {
            let Some(payload) = self.db.payload(chunk_id)? else {
                continue;
            };
            results.push(SearchResult {
                text: payload.text,
                similarity: score,
                metadata: payload.metadata,
            });
        }

        Ok(results)
    }
}

impl std::fmt::Debug for EmbeddedVectorDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedVectorDb")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Convert a stored embedding matrix into a `[T, D]` tensor.
fn matrix_to_tensor(matrix: &EmbeddingMatrix) -> Result<Tensor> {
    Ok(Tensor::from_vec(
        matrix.data.clone(),
        (matrix.num_tokens as usize, matrix.dimension as usize),
        &Device::Cpu,
    )?)
}
