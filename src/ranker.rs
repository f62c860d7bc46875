//! The ranker adapter: cross-encoder style relevance scoring for
//! retrieved candidates.

use std::str::FromStr;

use candle_core::Tensor;

use crate::{
    error::{Error, Result},
    model_manager::ModelManager,
};

/// Scores a batch of documents against a query.
///
/// Scores come back in document order, one per input; higher means more
/// relevant. No range or calibration is guaranteed, only the relative
/// ordering is meaningful. The caller sorts.
pub trait Ranker {
    fn predict(&mut self, query: &str, documents: &[String]) -> Result<Vec<f32>>;
}

/// The closed set of supported ranker backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankerKind {
    Colbert,
}

impl FromStr for RankerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "colbert" => Ok(Self::Colbert),
            other => Err(Error::Config(format!("unknown ranker type: {other}"))),
        }
    }
}

/// Instantiate a ranker backend by kind.
pub fn load_ranker(kind: RankerKind, model_id: &str) -> Result<Box<dyn Ranker>> {
    match kind {
        RankerKind::Colbert => Ok(Box::new(ColbertRanker::new(model_id))),
    }
}

/// Late-interaction relevance scoring with a ColBERT checkpoint.
///
/// Each (query, document) pair is scored with MaxSim over their per-token
/// embeddings, which behaves like a cross-encoder for ranking purposes
/// while only needing one forward pass per side.
#[derive(Debug)]
pub struct ColbertRanker {
    model: ModelManager,
}

impl ColbertRanker {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model: ModelManager::new(model_id),
        }
    }
}

impl Ranker for ColbertRanker {
    fn predict(&mut self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self.model.encode_query(query)?;
        let doc_embeddings = self.model.encode_documents(documents)?;
        let (batch, _num_tokens, _dimension) = doc_embeddings.dims3()?;
        if batch != documents.len() {
            return Err(Error::Config(format!(
                "ranker encoded {batch} documents, expected {}",
                documents.len()
            )));
        }

        let mut scores = Vec::with_capacity(batch);
        for i in 0..batch {
            let doc_embedding = doc_embeddings.get(i)?;
            scores.push(maxsim(&query_embedding, &doc_embedding)?);
        }

        Ok(scores)
    }
}

/// Compute the MaxSim score between a query embedding and a document embedding.
///
/// query_embedding: [Q, D] where Q = query tokens, D = embedding dimension
/// doc_embedding: [T, D] where T = document tokens, D = embedding dimension
///
/// MaxSim = sum over query tokens of max(query_token . doc_token for all doc tokens)
pub(crate) fn maxsim(query_embedding: &Tensor, doc_embedding: &Tensor) -> Result<f32> {
    // Similarity matrix [Q, T] = query_emb @ doc_emb^T
    let sim_matrix = query_embedding.matmul(&doc_embedding.t()?)?;

    // Best matching document token per query token.
    let row_maxes = sim_matrix.max(1)?;

    let score = row_maxes.sum_all()?.to_scalar::<f32>()?;

    Ok(score)
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;

    fn make_tensor(data: &[f32], shape: (usize, usize)) -> Tensor {
        Tensor::from_vec(data.to_vec(), shape, &Device::Cpu).unwrap()
    }

    #[test]
    fn maxsim_identical_vectors() {
        // Dot product of identical unit vectors is 1.
        let q = make_tensor(&[1.0, 0.0, 0.0], (1, 3));
        let d = make_tensor(&[1.0, 0.0, 0.0], (1, 3));
        let score = maxsim(&q, &d).unwrap();
        assert!((score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn maxsim_orthogonal_vectors() {
        let q = make_tensor(&[1.0, 0.0, 0.0], (1, 3));
        let d = make_tensor(&[0.0, 1.0, 0.0], (1, 3));
        let score = maxsim(&q, &d).unwrap();
        assert!(score.abs() < 1e-6);
    }

    #[test]
    fn maxsim_multiple_query_tokens() {
        // 2 query tokens, 3 doc tokens, dim=2
        let q = make_tensor(&[1.0, 0.0, 0.0, 1.0], (2, 2));
        let d = make_tensor(&[1.0, 0.0, 0.0, 1.0, 0.5, 0.5], (3, 2));
        // sim_matrix [2, 3]:
        // q[0]=[1,0] . d[0]=[1,0]=1.0, d[1]=[0,1]=0.0, d[2]=[0.5,0.5]=0.5
        // q[1]=[0,1] . d[0]=[1,0]=0.0, d[1]=[0,1]=1.0, d[2]=[0.5,0.5]=0.5
        // row maxes: [1.0, 1.0], sum = 2.0
        let score = maxsim(&q, &d).unwrap();
        assert!((score - 2.0).abs() < 1e-6);
    }

    #[test]
    fn kind_parses_known_selector() {
        assert_eq!("colbert".parse::<RankerKind>().unwrap(), RankerKind::Colbert);
    }

    #[test]
    fn kind_rejects_unknown_selector() {
        let err = "sbert".parse::<RankerKind>().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn load_ranker_is_lazy() {
        // Constructing a backend must not touch the network or disk.
        let ranker = load_ranker(RankerKind::Colbert, "some/model");
        assert!(ranker.is_ok());
    }
}
