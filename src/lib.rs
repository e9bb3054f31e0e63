/// This crate is a dictionary expansion and corpus scoring engine.
///
/// It measures how strongly predefined semantic categories appear in a
/// line-oriented text corpus: a small seed vocabulary per category is
/// expanded into a ranked word list through a trained embedding space,
/// and every document is scored against the expanded dictionary under
/// term-frequency and frequency-weighted variants, tracking which words
/// drove each score.
pub mod config;
pub mod corpus;
pub mod dictionary;
pub mod embedding;
pub mod error;
pub mod score;

/// Per-run pipeline configuration
/// Paths, chunk size, expansion thresholds and seed words, constructed
/// once per run and passed into each stage. No ambient global state.
pub use config::PipelineConfig;

/// Chunked Corpus Transformer
/// Streams a line corpus and its aligned ids through a per-line transform
/// in fixed-size chunks with bounded memory, appending results chunk by
/// chunk. Supports resuming from a line offset after a partial run.
///
/// Per-item failures commit an explicit placeholder record instead of
/// being dropped, so output/id alignment always holds.
pub use corpus::transform::transform_corpus;

/// Corpus record and structured sentence identifier types.
pub use corpus::{CorpusRecord, SentenceId};

/// Expanded category dictionary
/// Built from seed words by nearest-neighbor expansion over an embedding
/// space, deduplicated so categories partition their words, and ranked by
/// similarity to each category's seed centroid.
///
/// # Persistence
/// Two forms are supported: a word-list CSV (one row per category, rank
/// order preserved) and an extended CBOR artifact that also carries
/// similarity scores. Both round-trip exactly; both are validated on load.
pub use dictionary::{DictEntry, Dictionary};

/// Embedding space boundary
/// The trait the dictionary builder consumes (vector lookup,
/// nearest-neighbor query, frequency-restricted vocabulary) and a
/// concrete in-memory implementation over unit-normalized vectors.
/// Training the space is out of scope.
pub use embedding::{EmbeddingSpace, VectorSpace};

/// Error type for corpus transforms, dictionary building, and artifact
/// persistence. Precondition violations and artifact shape mismatches
/// are fatal; per-item transform failures are logged and placeheld.
pub use error::ScoreError;

/// Scoring engine
/// The closed set of scoring methods, the streaming document scorer with
/// per-word contribution tracking, and the full pipeline entry point that
/// loads or builds each persisted artifact before scoring.
pub use score::{run_pipeline, Scorer, ScoringMethod};
