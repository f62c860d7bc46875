use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::{chunking::TextMetadata, error::Result};

const CHUNKS: TableDefinition<u64, &[u8]> = TableDefinition::new("chunks");
const EMBEDDINGS: TableDefinition<u64, &[u8]> =
    TableDefinition::new("embeddings");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const NEXT_ID_KEY: &str = "next_chunk_id";

/// Header size: 4 bytes token count + 4 bytes dimension.
const HEADER_SIZE: usize = 8;

/// The stored payload of one indexed chunk: its text plus source metadata,
/// serialized as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub metadata: TextMetadata,
}

/// A per-token embedding matrix for one chunk.
///
/// Binary format per entry:
/// - 4 bytes: token count T (u32 LE)
/// - 4 bytes: embedding dimension D (u32 LE)
/// - T * D * 4 bytes: f32 LE values in row-major order
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    pub num_tokens: u32,
    pub dimension: u32,
    pub data: Vec<f32>,
}

/// On-disk storage for indexed chunks: one table for payloads, one for
/// embedding matrices, keyed by a sequential chunk id.
pub struct ChunkDb {
    db: Database,
}

impl ChunkDb {
    /// Open or create a chunk database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(CHUNKS)?;
        txn.open_table(EMBEDDINGS)?;
        txn.open_table(META)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Append a batch of chunks in a single transaction, assigning
    /// sequential ids.
    pub fn append(&self, entries: &[(ChunkPayload, EmbeddingMatrix)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let txn = self.db.begin_write()?;
        {
            let mut chunks = txn.open_table(CHUNKS)?;
            let mut embeddings = txn.open_table(EMBEDDINGS)?;
            let mut meta = txn.open_table(META)?;

            let mut next_id =
                meta.get(NEXT_ID_KEY)?.map(|v| v.value()).unwrap_or(0);

            for (payload, matrix) in entries {
                assert_eq!(
                    matrix.data.len(),
                    (matrix.num_tokens as usize) * (matrix.dimension as usize),
                    "data length must equal num_tokens * dimension"
                );

                let encoded = serde_json::to_vec(payload)?;
                chunks.insert(next_id, encoded.as_slice())?;

                let byte_len =
                    HEADER_SIZE + std::mem::size_of_val(matrix.data.as_slice());
                let mut guard = embeddings.insert_reserve(next_id, byte_len)?;
                let dest = guard.as_mut();
                dest[0..4].copy_from_slice(&matrix.num_tokens.to_le_bytes());
                dest[4..8].copy_from_slice(&matrix.dimension.to_le_bytes());
                dest[HEADER_SIZE..]
                    .copy_from_slice(bytemuck::cast_slice(&matrix.data));
                drop(guard);

                next_id += 1;
            }

            meta.insert(NEXT_ID_KEY, next_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Number of chunks stored so far.
    pub fn count(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let meta = txn.open_table(META)?;
        Ok(meta.get(NEXT_ID_KEY)?.map(|v| v.value()).unwrap_or(0))
    }

    /// List all stored chunk ids.
    pub fn ids(&self) -> Result<Vec<u64>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CHUNKS)?;
        let mut result = Vec::new();
        for entry in table.iter()? {
            let (k, _) = entry?;
            result.push(k.value());
        }
        Ok(result)
    }

    /// Retrieve the payload for a chunk, or None if not found.
    pub fn payload(&self, chunk_id: u64) -> Result<Option<ChunkPayload>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(CHUNKS)?;

        let Some(guard) = table.get(chunk_id)? else {
            return Ok(None);
        };

        Ok(Some(serde_json::from_slice(guard.value())?))
    }

    /// Retrieve the embedding matrix for a chunk.
    ///
    /// Returns None for unknown ids or malformed entries.
    pub fn embedding(&self, chunk_id: u64) -> Result<Option<EmbeddingMatrix>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(EMBEDDINGS)?;

        let Some(guard) = table.get(chunk_id)? else {
            return Ok(None);
        };

        let bytes = guard.value();
        if bytes.len() < HEADER_SIZE {
            return Ok(None);
        }

        let num_tokens = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
        let dimension = u32::from_le_bytes(bytes[4..8].try_into().unwrap());

        let expected_len =
            HEADER_SIZE + (num_tokens as usize) * (dimension as usize) * 4;
        if bytes.len() != expected_len {
            return Ok(None);
        }

        let data: Vec<f32> =
            bytemuck::cast_slice(&bytes[HEADER_SIZE..]).to_vec();

        Ok(Some(EmbeddingMatrix {
            num_tokens,
            dimension,
            data,
        }))
    }
}

impl std::fmt::Debug for ChunkDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkDb").finish_non_exhaustive()
    }
}
