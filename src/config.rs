use std::fs;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-run pipeline configuration.
///
/// Constructed once and passed by reference into each stage; there is no
/// ambient global state. The seed vocabulary maps each category name to its
/// hand-curated starting words. All intermediate and final artifacts live
/// under `output_dir`:
///
/// - `dict/expanded_dict.csv`: the expanded dictionary (word-list form)
/// - `dict/word_weights.cbor`: the similarity weight table
/// - `scores/temp/`: document-level corpus, ids, and document frequencies
/// - `scores/scores_<METHOD>.csv`: one score table per scoring method
/// - `scores/word_contributions/`: one contribution table per method
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Sentence-level corpus file, one sentence per line.
    pub sentence_corpus: PathBuf,
    /// Sentence id file, positionally aligned with the corpus.
    pub sentence_ids: PathBuf,
    /// Root directory for all produced artifacts.
    pub output_dir: PathBuf,
    /// Number of input lines processed per chunk by streaming transforms.
    pub chunk_size: usize,
    /// Maximum number of words per category in the expanded dictionary.
    pub top_n_words: usize,
    /// Restrict expansion to the top fraction of the frequency-ordered
    /// vocabulary, as a ratio in (0, 1]. `None` searches the full vocabulary.
    pub restrict_vocab: Option<f64>,
    /// Lower bound on recorded document frequencies during IDF scoring;
    /// frequencies below it (including zero) are clamped up to it so
    /// `ln(total / df)` stays defined.
    pub df_floor: u32,
    /// Seed words per category, in category order.
    pub seed_words: IndexMap<String, Vec<String>>,
}

impl PipelineConfig {
    /// Create a configuration with the default thresholds.
    pub fn new(
        sentence_corpus: impl Into<PathBuf>,
        sentence_ids: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sentence_corpus: sentence_corpus.into(),
            sentence_ids: sentence_ids.into(),
            output_dir: output_dir.into(),
            chunk_size: 1000,
            top_n_words: 500,
            restrict_vocab: None,
            df_floor: 1,
            seed_words: IndexMap::new(),
        }
    }

    /// Create every artifact directory this run may write into.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(self.output_dir.join("dict"))?;
        fs::create_dir_all(self.output_dir.join("scores").join("temp"))?;
        fs::create_dir_all(self.output_dir.join("scores").join("word_contributions"))?;
        Ok(())
    }

    pub fn dict_csv_path(&self) -> PathBuf {
        self.output_dir.join("dict").join("expanded_dict.csv")
    }

    pub fn weights_path(&self) -> PathBuf {
        self.output_dir.join("dict").join("word_weights.cbor")
    }

    pub fn doc_corpus_path(&self) -> PathBuf {
        self.temp_dir().join("corpus_doc_level.txt")
    }

    pub fn doc_ids_path(&self) -> PathBuf {
        self.temp_dir().join("doc_ids.txt")
    }

    pub fn doc_freq_path(&self) -> PathBuf {
        self.temp_dir().join("doc_freq.cbor")
    }

    pub fn scores_path(&self, method_label: &str) -> PathBuf {
        self.output_dir
            .join("scores")
            .join(format!("scores_{}.csv", method_label))
    }

    pub fn contributions_path(&self, method_label: &str) -> PathBuf {
        self.output_dir
            .join("scores")
            .join("word_contributions")
            .join(format!("word_contribution_{}.csv", method_label))
    }

    fn temp_dir(&self) -> PathBuf {
        self.output_dir.join("scores").join("temp")
    }
}
