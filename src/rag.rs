//! The retrieval-augmented generation orchestrator.
//!
//! Composes the three adapters into a retrieve, rerank, prompt, generate
//! pipeline. Any adapter failure aborts the call and propagates unchanged;
//! retrieval is read-only, so there is nothing to roll back.

use std::path::PathBuf;

use serde::Serialize;
use tracing::debug;

use crate::{
    chunking::ChunkingConfig,
    error::{Error, Result},
    llm::{load_llm, Llm},
    ranker::{load_ranker, Ranker},
    settings::Settings,
    vector_db::{create_vector_db, SearchResult, VectorDb},
};

/// The literal answer the model is instructed to return when the supplied
/// documents cannot answer the question.
pub const UNKNOWN_SENTINEL: &str = "UNKNOWN";

/// The terminal output of one [`Rag::generate`] call: the completion, the
/// fully composed prompt it was produced from, and the reranked chunks it
/// was grounded on (in ascending score order, best last).
#[derive(Debug, Clone, Serialize)]
pub struct RagResult {
    pub text: String,
    pub prompt: String,
    pub search_results: Vec<SearchResult>,
}

/// Retrieval-augmented generation over a chunked document collection,
/// inter-operable with pluggable LLM, ranker, and vector store backends.
pub struct Rag {
    llm: Box<dyn Llm>,
    ranker: Box<dyn Ranker>,
    vector_db: Box<dyn VectorDb>,
    chunking: ChunkingConfig,
    retriever_chunks: usize,
    ranker_chunks: usize,
}

impl Rag {
    /// Wire an orchestrator from already-constructed adapters.
    pub fn new(
        llm: Box<dyn Llm>,
        ranker: Box<dyn Ranker>,
        vector_db: Box<dyn VectorDb>,
        chunking: ChunkingConfig,
        retriever_chunks: usize,
        ranker_chunks: usize,
    ) -> Result<Self> {
        chunking.validate()?;
        if ranker_chunks == 0 || retriever_chunks == 0 {
            return Err(Error::Config(
                "retriever and ranker chunk counts must be positive".into(),
            ));
        }
        if ranker_chunks > retriever_chunks {
            return Err(Error::Config(format!(
                "ranker chunk count ({ranker_chunks}) must not exceed retriever chunk count ({retriever_chunks})"
            )));
        }

        Ok(Self {
            llm,
            ranker,
            vector_db,
            chunking,
            retriever_chunks,
            ranker_chunks,
        })
    }

    /// Instantiate every backend named in `settings` and wire them up.
    ///
    /// `vector_db_exists_ok` controls whether an existing index at the
    /// configured cache directory is opened or rejected; rejecting is the
    /// safe default for fresh ingestion runs.
    pub fn from_settings(settings: &Settings, vector_db_exists_ok: bool) -> Result<Self> {
        let llm = load_llm(
            settings.llm_type.parse()?,
            &settings.llm_model,
            settings,
        )?;
        let ranker = load_ranker(settings.ranker_type.parse()?, &settings.ranker_model)?;
        let vector_db = create_vector_db(
            settings.vector_db_type.parse()?,
            &settings.cache_dir,
            vector_db_exists_ok,
            &settings.embed_model,
        )?;

        Self::new(
            llm,
            ranker,
            vector_db,
            settings.chunking(),
            settings.retriever_chunks,
            settings.ranker_chunks,
        )
    }

    /// Add one or more PDF documents to the vector store, chunked with the
    /// configured window. With `verbose` a progress bar tracks extraction.
    pub fn add_pdf_documents(&mut self, paths: &[PathBuf], verbose: bool) -> Result<()> {
        self.vector_db
            .add_pdf_documents(paths, &self.chunking, verbose)
    }

    /// Run retrieval-augmented generation on a prompt.
    ///
    /// Retrieves `retriever_chunks` candidates, reranks them, keeps the
    /// best `ranker_chunks` (each hit's similarity replaced by the ranker
    /// score), and asks the LLM to answer strictly from those chunks.
    pub fn generate(&mut self, prompt: &str) -> Result<RagResult> {
        let retrieved = self.vector_db.search(prompt, self.retriever_chunks)?;
        debug!(candidates = retrieved.len(), "retrieved candidates");

        let texts: Vec<String> = retrieved.iter().map(|r| r.text.clone()).collect();
        let scores = self.ranker.predict(prompt, &texts)?;

        // Stable ascending argsort; the trailing ranker_chunks entries are
        // the winners, ties resolved by retrieval order.
        let mut order: Vec<usize> = (0..retrieved.len()).collect();
        order.sort_by(|&a, &b| {
            scores[a]
                .partial_cmp(&scores[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let cut = order.len().saturating_sub(self.ranker_chunks);

        let reranked: Vec<SearchResult> = order[cut..]
            .iter()
            .map(|&i| {
                let mut result = retrieved[i].clone();
                result.similarity = scores[i];
                result
            })
            .collect();

        let documents = reranked
            .iter()
            .map(render_document)
            .collect::<Vec<_>>()
            .join("\n");
        let llm_prompt = render_prompt(prompt, &documents);

        let text = self.llm.generate(&llm_prompt)?;

        Ok(RagResult {
            text,
            prompt: llm_prompt,
            search_results: reranked,
        })
    }
}

impl std::fmt::Debug for Rag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rag")
            .field("retriever_chunks", &self.retriever_chunks)
            .field("ranker_chunks", &self.ranker_chunks)
            .finish_non_exhaustive()
    }
}

fn render_document(result: &SearchResult) -> String {
    format!("\n(similarity={})\n{}\n", result.similarity, result.text)
}

fn render_prompt(question: &str, documents: &str) -> String {
    format!(
        "Answer a question based on a collection of documents.\n\
         \n\
         QUESTION: {question}\n\
         \n\
         DOCUMENTS:\n\
         \n\
         {documents}\n\
         \n\
         END OF DOCUMENTS\n\
         \n\
         Base your answer ONLY on the documents above.  Answer as concisely as possible, while\n\
         still being complete.  If you cannot answer, respond with the word {UNKNOWN_SENTINEL}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::TextMetadata;

    /// Returns the prompt back, so tests can inspect exactly what the
    /// orchestrator sent.
    #[derive(Debug)]
    struct EchoLlm;

    impl Llm for EchoLlm {
        fn generate(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }
    }

    /// Replays a fixed score list, verifying the document order matches
    /// retrieval order.
    struct ScriptedRanker {
        scores: Vec<f32>,
    }

    impl Ranker for ScriptedRanker {
        fn predict(&mut self, _query: &str, documents: &[String]) -> Result<Vec<f32>> {
            assert_eq!(documents.len(), self.scores.len());
            Ok(self.scores.clone())
        }
    }

    /// Serves canned results; errors with `EmptyIndex` when none are set.
    #[derive(Debug)]
    struct CannedVectorDb {
        results: Vec<SearchResult>,
    }

    impl VectorDb for CannedVectorDb {
        fn add_documents(&mut self, documents: &[(String, TextMetadata)]) -> Result<()> {
            for (i, (text, metadata)) in documents.iter().enumerate() {
                self.results.push(SearchResult {
                    text: text.clone(),
                    similarity: 1.0 / (i + 1) as f32,
                    metadata: metadata.clone(),
                });
            }
            Ok(())
        }

        fn search(&mut self, _query: &str, limit: usize) -> Result<Vec<SearchResult>> {
            if self.results.is_empty() {
                return Err(Error::EmptyIndex);
            }
            Ok(self.results.iter().take(limit).cloned().collect())
        }
    }

    fn result(text: &str, similarity: f32) -> SearchResult {
        SearchResult {
            text: text.to_string(),
            similarity,
            metadata: TextMetadata {
                path: "doc.pdf".to_string(),
                page_range: (0, 1),
            },
        }
    }

    fn rag(results: Vec<SearchResult>, scores: Vec<f32>, ranker_chunks: usize) -> Rag {
        Rag::new(
            Box::new(EchoLlm),
            Box::new(ScriptedRanker { scores }),
            Box::new(CannedVectorDb { results }),
            ChunkingConfig::default(),
            10,
            ranker_chunks,
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_ranker_breadth_above_retriever_breadth() {
        let err = Rag::new(
            Box::new(EchoLlm),
            Box::new(ScriptedRanker { scores: vec![] }),
            Box::new(CannedVectorDb { results: vec![] }),
            ChunkingConfig::default(),
            5,
            6,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn generate_propagates_empty_index() {
        let mut rag = rag(vec![], vec![], 2);
        let err = rag.generate("anything").unwrap_err();
        assert!(matches!(err, Error::EmptyIndex));
    }

    #[test]
    fn generate_keeps_top_scoring_chunks_in_ascending_order() {
        let retrieved = vec![
            result("first", 0.9),
            result("second", 0.8),
            result("third", 0.7),
            result("fourth", 0.6),
        ];
        let mut rag = rag(retrieved, vec![1.0, 3.0, 2.0, 0.5], 2);

        let output = rag.generate("question").unwrap();
        let texts: Vec<&str> = output
            .search_results
            .iter()
            .map(|r| r.text.as_str())
            .collect();

        // Ascending by ranker score: "third" (2.0) before "second" (3.0).
        assert_eq!(texts, vec!["third", "second"]);
    }

    #[test]
    fn generate_overwrites_similarity_with_ranker_score() {
        let retrieved = vec![result("a", 0.9), result("b", 0.1)];
        let mut rag = rag(retrieved, vec![5.0, 7.0], 2);

        let output = rag.generate("question").unwrap();
        let similarities: Vec<f32> = output
            .search_results
            .iter()
            .map(|r| r.similarity)
            .collect();
        assert_eq!(similarities, vec![5.0, 7.0]);
    }

    #[test]
    fn kept_scores_dominate_discarded_scores() {
        let retrieved = vec![
            result("a", 0.5),
            result("b", 0.5),
            result("c", 0.5),
            result("d", 0.5),
            result("e", 0.5),
        ];
        let scores = vec![0.3, 9.0, 2.5, 7.1, 0.1];
        let mut rag = rag(retrieved, scores.clone(), 2);

        let output = rag.generate("question").unwrap();
        let kept: Vec<f32> = output
            .search_results
            .iter()
            .map(|r| r.similarity)
            .collect();
        assert_eq!(output.search_results.len(), 2);

        let min_kept = kept.iter().cloned().fold(f32::INFINITY, f32::min);
        for score in scores {
            if !kept.contains(&score) {
                assert!(score <= min_kept);
            }
        }
    }

    #[test]
    fn ties_keep_retrieval_order() {
        let retrieved = vec![result("a", 0.9), result("b", 0.8), result("c", 0.7)];
        let mut rag = rag(retrieved, vec![1.0, 1.0, 1.0], 2);

        let output = rag.generate("question").unwrap();
        let texts: Vec<&str> = output
            .search_results
            .iter()
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn ranker_breadth_above_result_count_keeps_everything() {
        let retrieved = vec![result("a", 0.9), result("b", 0.8)];
        let mut rag = rag(retrieved, vec![2.0, 1.0], 5);

        let output = rag.generate("question").unwrap();
        assert_eq!(output.search_results.len(), 2);
    }

    #[test]
    fn prompt_embeds_question_documents_and_sentinel() {
        let retrieved = vec![result("the rabbit had a watch", 0.9)];
        let mut rag = rag(retrieved, vec![4.5], 1);

        let output = rag.generate("What did the rabbit have?").unwrap();
        assert!(output.prompt.contains("QUESTION: What did the rabbit have?"));
        assert!(output.prompt.contains("(similarity=4.5)\nthe rabbit had a watch"));
        assert!(output.prompt.contains(UNKNOWN_SENTINEL));
        assert!(output.prompt.ends_with("respond with the word UNKNOWN."));

        // EchoLlm returns the prompt: the reported prompt is exactly what
        // the LLM received.
        assert_eq!(output.text, output.prompt);
    }

    #[test]
    fn document_sections_are_blank_line_separated() {
        let retrieved = vec![result("alpha", 0.9), result("beta", 0.8)];
        let mut rag = rag(retrieved, vec![1.0, 2.0], 2);

        let output = rag.generate("question").unwrap();
        assert!(output
            .prompt
            .contains("(similarity=1)\nalpha\n\n\n(similarity=2)\nbeta"));
    }
}
