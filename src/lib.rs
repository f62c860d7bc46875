//! ragbert - retrieval-augmented generation over local PDF collections.
//!
//! ragbert extracts text from PDF documents, splits it into overlapping
//! word-window chunks tagged with their source page ranges, indexes the
//! chunks in a similarity-searchable store, and answers questions with a
//! retrieve-then-rerank pipeline feeding a grounded prompt to a language
//! model. The LLM, ranker, and vector store are pluggable backends behind
//! small capability traits.
//!
//! # Quick start
//!
//! ```no_run
//! use ragbert::{Rag, Settings};
//!
//! let settings = Settings::from_env().unwrap();
//! let mut rag = Rag::from_settings(&settings, false).unwrap();
//!
//! rag.add_pdf_documents(&["alice-in-wonderland.pdf".into()], true)
//!     .unwrap();
//!
//! let result = rag.generate("What does the rabbit have in its pocket?").unwrap();
//! println!("{}", result.text);
//! for reference in &result.search_results {
//!     println!(
//!         "{} {}",
//!         reference.metadata.path,
//!         reference.metadata.page_label()
//!     );
//! }
//! ```

pub mod chunk_db;
pub mod chunking;
pub mod cli;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod model_manager;
pub mod pdf;
pub mod rag;
pub mod ranker;
pub mod settings;
pub mod vector_db;

pub use chunking::{ChunkingConfig, TextChunk, TextMetadata};
pub use error::{Error, Result};
pub use llm::{load_llm, Llm, LlmKind};
pub use model_manager::ModelManager;
pub use rag::{Rag, RagResult, UNKNOWN_SENTINEL};
pub use ranker::{load_ranker, Ranker, RankerKind};
pub use settings::Settings;
pub use vector_db::{create_vector_db, SearchResult, VectorDb, VectorDbKind};
