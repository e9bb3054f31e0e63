use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use tracing::info;

use crate::config::PipelineConfig;
use crate::corpus::aggregate::aggregate_documents;
use crate::corpus::frequency::{
    document_frequency, load_frequency, save_frequency, DocumentFrequency,
};
use crate::corpus::line_count;
use crate::dictionary::{load_weights, save_weights, Dictionary, WordWeights};
use crate::embedding::EmbeddingSpace;
use crate::error::{Result, ScoreError};

/// Closed set of scoring methods.
///
/// - `Tf`: raw term-frequency counts.
/// - `TfIdf`: counts weighted by `ln(total_docs / df)`.
/// - `WfIdf`: the log-dampened variant, `ln(1 + count)` in the numerator.
/// - `*SimWeight`: the same, additionally weighted by each word's
///   rank-derived similarity confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScoringMethod {
    Tf,
    TfIdf,
    WfIdf,
    TfIdfSimWeight,
    WfIdfSimWeight,
}

impl ScoringMethod {
    /// Stable label used in artifact file names.
    pub fn label(&self) -> &'static str {
        match self {
            ScoringMethod::Tf => "TF",
            ScoringMethod::TfIdf => "TFIDF",
            ScoringMethod::WfIdf => "WFIDF",
            ScoringMethod::TfIdfSimWeight => "TFIDF_SIMWEIGHT",
            ScoringMethod::WfIdfSimWeight => "WFIDF_SIMWEIGHT",
        }
    }

    pub fn uses_idf(&self) -> bool {
        !matches!(self, ScoringMethod::Tf)
    }

    pub fn dampened(&self) -> bool {
        matches!(self, ScoringMethod::WfIdf | ScoringMethod::WfIdfSimWeight)
    }

    pub fn sim_weighted(&self) -> bool {
        matches!(
            self,
            ScoringMethod::TfIdfSimWeight | ScoringMethod::WfIdfSimWeight
        )
    }
}

impl fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ScoringMethod {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TF" => Ok(ScoringMethod::Tf),
            "TFIDF" => Ok(ScoringMethod::TfIdf),
            "WFIDF" => Ok(ScoringMethod::WfIdf),
            "TFIDF_SIMWEIGHT" => Ok(ScoringMethod::TfIdfSimWeight),
            "WFIDF_SIMWEIGHT" => Ok(ScoringMethod::WfIdfSimWeight),
            other => Err(ScoreError::UnknownMethod(other.to_string())),
        }
    }
}

/// Per-document score row: the document id and one value per category,
/// in dictionary category order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRow {
    pub doc_id: String,
    pub scores: Vec<f64>,
}

/// Scores documents against an expanded dictionary.
///
/// Holds references to the run's artifacts; the document corpus itself is
/// streamed from disk row by row, so only the dictionary, the frequency
/// table and the per-word contribution accumulator are resident.
pub struct Scorer<'a> {
    dictionary: &'a Dictionary,
    doc_freq: &'a DocumentFrequency,
    total_docs: usize,
    weights: &'a WordWeights,
    df_floor: u32,
}

impl<'a> Scorer<'a> {
    pub fn new(
        dictionary: &'a Dictionary,
        doc_freq: &'a DocumentFrequency,
        total_docs: usize,
        weights: &'a WordWeights,
        df_floor: u32,
    ) -> Self {
        Self {
            dictionary,
            doc_freq,
            total_docs,
            weights,
            df_floor: df_floor.max(1),
        }
    }

    /// Category names in score-column order.
    pub fn categories(&self) -> Vec<&str> {
        self.dictionary.categories.keys().map(String::as_str).collect()
    }

    /// Zeroed contribution accumulator with one slot per dictionary word,
    /// in dictionary order, so the emitted table is deterministic and
    /// complete even for words never observed.
    pub fn empty_contributions(&self) -> IndexMap<String, f64> {
        self.dictionary
            .categories
            .values()
            .flatten()
            .map(|entry| (entry.word.clone(), 0.0))
            .collect()
    }

    /// Score one document text under `method`, returning one value per
    /// category and folding each word's contribution into `contributions`.
    pub fn score_text(
        &self,
        text: &str,
        method: ScoringMethod,
        contributions: &mut IndexMap<String, f64>,
    ) -> Vec<f64> {
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for word in text.split_whitespace() {
            *counts.entry(word).or_insert(0) += 1;
        }

        let mut scores = Vec::with_capacity(self.dictionary.categories.len());
        for entries in self.dictionary.categories.values() {
            let mut total = 0.0f64;
            for entry in entries {
                let Some(&count) = counts.get(entry.word.as_str()) else {
                    continue;
                };
                let term = if method.dampened() {
                    (1.0 + count as f64).ln()
                } else {
                    count as f64
                };
                let mut value = term;
                if method.uses_idf() {
                    // Frequencies below the floor are clamped up to it so
                    // ln(total / df) stays defined.
                    let df = self
                        .doc_freq
                        .get(entry.word.as_str())
                        .copied()
                        .unwrap_or(0)
                        .max(self.df_floor);
                    value *= (self.total_docs as f64 / df as f64).ln();
                }
                if method.sim_weighted() {
                    // A word without a weight carries no confidence.
                    value *= self.weights.get(entry.word.as_str()).copied().unwrap_or(0.0);
                }
                if let Some(slot) = contributions.get_mut(entry.word.as_str()) {
                    *slot += value;
                }
                total += value;
            }
            scores.push(total);
        }
        scores
    }

    /// Stream the document corpus and id files, writing one score row per
    /// document to `scores_out` and, when requested, the per-word
    /// contribution table to `contributions_out`. Returns the number of
    /// documents scored.
    pub fn score_files(
        &self,
        doc_corpus: &Path,
        doc_ids: &Path,
        method: ScoringMethod,
        scores_out: &Path,
        contributions_out: Option<&Path>,
    ) -> Result<usize> {
        let mut writer = BufWriter::new(File::create(scores_out)?);
        writer.write_all(b"doc_id")?;
        for category in self.categories() {
            write!(writer, ",{}", category)?;
        }
        writer.write_all(b"\n")?;

        let mut contributions = self.empty_contributions();
        let documents = BufReader::new(File::open(doc_corpus)?).lines();
        let ids = BufReader::new(File::open(doc_ids)?).lines();
        let mut scored = 0usize;
        for (document, id) in documents.zip(ids) {
            let (document, id) = (document?, id?);
            let scores = self.score_text(&document, method, &mut contributions);
            write!(writer, "{}", id)?;
            for score in scores {
                write!(writer, ",{}", score)?;
            }
            writer.write_all(b"\n")?;
            scored += 1;
        }
        writer.flush()?;

        if let Some(path) = contributions_out {
            let mut writer = BufWriter::new(File::create(path)?);
            writer.write_all(b"word,contribution\n")?;
            for (word, contribution) in &contributions {
                writeln!(writer, "{},{}", word, contribution)?;
            }
            writer.flush()?;
        }
        info!(method = %method, documents = scored, "scoring pass complete");
        Ok(scored)
    }
}

/// Convenience entry point for the in-memory term-frequency contract:
/// one score row per document, in input order. Fails when the document
/// and id sequences differ in length.
pub fn score_term_frequency(
    documents: &[String],
    doc_ids: &[String],
    dictionary: &Dictionary,
) -> Result<Vec<ScoreRow>> {
    if documents.len() != doc_ids.len() {
        return Err(ScoreError::ArtifactShape {
            artifact: "in-memory document corpus".to_string(),
            details: format!("{} documents but {} ids", documents.len(), doc_ids.len()),
        });
    }
    let doc_freq = DocumentFrequency::new();
    let weights = WordWeights::new();
    let scorer = Scorer::new(dictionary, &doc_freq, documents.len(), &weights, 1);
    let mut contributions = scorer.empty_contributions();
    let rows = documents
        .iter()
        .zip(doc_ids)
        .map(|(document, id)| ScoreRow {
            doc_id: id.clone(),
            scores: scorer.score_text(document, ScoringMethod::Tf, &mut contributions),
        })
        .collect();
    Ok(rows)
}

/// Run the full scoring pipeline against a sentence-level corpus.
///
/// Each persisted artifact is loaded when present and built (then
/// persisted) when absent, so interrupted runs restart from their own
/// intermediates: the expanded dictionary, the similarity weight table,
/// the document-level corpus and ids, and the document-frequency table.
/// One score table (and, for IDF methods, one contribution table) is
/// written per requested method.
pub fn run_pipeline<S: EmbeddingSpace>(
    config: &PipelineConfig,
    space: &S,
    methods: &[ScoringMethod],
) -> Result<()> {
    config.ensure_dirs()?;

    let dict_path = config.dict_csv_path();
    let dictionary = if dict_path.exists() {
        info!(path = %dict_path.display(), "loading expanded dictionary");
        Dictionary::read_csv(&dict_path)?
    } else {
        let dictionary = Dictionary::build(
            space,
            &config.seed_words,
            config.restrict_vocab,
            config.top_n_words,
        );
        dictionary.write_csv(&dict_path)?;
        info!(path = %dict_path.display(), "expanded dictionary written");
        dictionary
    };

    let weights_path = config.weights_path();
    let weights = if weights_path.exists() {
        load_weights(&weights_path, &dictionary)?
    } else {
        let weights = dictionary.similarity_weights();
        save_weights(&weights, &weights_path)?;
        weights
    };

    let doc_corpus = config.doc_corpus_path();
    let doc_ids = config.doc_ids_path();
    if !doc_corpus.exists() || !doc_ids.exists() {
        aggregate_documents(
            &config.sentence_corpus,
            &config.sentence_ids,
            &doc_corpus,
            &doc_ids,
        )?;
    }
    let total_docs = line_count(&doc_corpus)?;
    let id_lines = line_count(&doc_ids)?;
    if total_docs != id_lines {
        return Err(ScoreError::AlignmentMismatch {
            path: doc_corpus,
            corpus_lines: total_docs,
            id_lines,
        });
    }

    let freq_path = config.doc_freq_path();
    let doc_freq = if freq_path.exists() {
        load_frequency(&freq_path)?
    } else {
        let table = document_frequency(&doc_corpus)?;
        save_frequency(&table, &freq_path)?;
        table
    };

    let scorer = Scorer::new(&dictionary, &doc_freq, total_docs, &weights, config.df_floor);
    for method in methods {
        let contributions_out = method
            .uses_idf()
            .then(|| config.contributions_path(method.label()));
        scorer.score_files(
            &doc_corpus,
            &doc_ids,
            *method,
            &config.scores_path(method.label()),
            contributions_out.as_deref(),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::DictEntry;

    fn urgency_dictionary(words: &[(&str, f32)]) -> Dictionary {
        let mut dictionary = Dictionary::default();
        dictionary.categories.insert(
            "Urgency".to_string(),
            words
                .iter()
                .map(|(word, sim)| DictEntry::new(*word, *sim))
                .collect(),
        );
        dictionary
    }

    #[test]
    fn raw_term_frequency_counts_occurrences() {
        let dictionary = urgency_dictionary(&[("motivated", 0.9)]);
        let rows = score_term_frequency(
            &["motivated motivated sale".to_string()],
            &["doc1".to_string()],
            &dictionary,
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].doc_id, "doc1");
        assert_eq!(rows[0].scores, vec![2.0]);
    }

    #[test]
    fn tfidf_weighs_counts_by_inverse_document_frequency() {
        let dictionary = urgency_dictionary(&[("motivated", 0.9)]);
        let mut doc_freq = DocumentFrequency::new();
        doc_freq.insert("motivated".to_string(), 2);
        let weights = WordWeights::new();
        let scorer = Scorer::new(&dictionary, &doc_freq, 10, &weights, 1);
        let mut contributions = scorer.empty_contributions();
        let scores =
            scorer.score_text("motivated motivated sale", ScoringMethod::TfIdf, &mut contributions);
        let expected = 2.0 * (10.0f64 / 2.0).ln();
        assert!((scores[0] - expected).abs() < 1e-12);
        assert!((contributions["motivated"] - expected).abs() < 1e-12);
    }

    #[test]
    fn wfidf_dampens_the_term_component() {
        let dictionary = urgency_dictionary(&[("motivated", 0.9)]);
        let mut doc_freq = DocumentFrequency::new();
        doc_freq.insert("motivated".to_string(), 2);
        let weights = WordWeights::new();
        let scorer = Scorer::new(&dictionary, &doc_freq, 10, &weights, 1);
        let mut contributions = scorer.empty_contributions();
        let scores =
            scorer.score_text("motivated motivated", ScoringMethod::WfIdf, &mut contributions);
        let expected = 3.0f64.ln() * (10.0f64 / 2.0).ln();
        assert!((scores[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn mismatched_document_and_id_counts_are_rejected() {
        let dictionary = urgency_dictionary(&[("motivated", 0.9)]);
        let err = score_term_frequency(
            &["motivated".to_string(), "sale".to_string()],
            &["doc1".to_string()],
            &dictionary,
        )
        .unwrap_err();
        assert!(matches!(err, ScoreError::ArtifactShape { .. }));
    }

    #[test]
    fn zero_document_frequency_is_floored_not_divided() {
        let dictionary = urgency_dictionary(&[("unseen", 0.9)]);
        let doc_freq = DocumentFrequency::new();
        let weights = WordWeights::new();
        let scorer = Scorer::new(&dictionary, &doc_freq, 10, &weights, 1);
        let mut contributions = scorer.empty_contributions();
        let scores = scorer.score_text("unseen", ScoringMethod::TfIdf, &mut contributions);
        let expected = 10.0f64.ln();
        assert!(scores[0].is_finite());
        assert!((scores[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn frequencies_below_the_floor_are_clamped() {
        let dictionary = urgency_dictionary(&[("motivated", 0.9)]);
        let mut doc_freq = DocumentFrequency::new();
        doc_freq.insert("motivated".to_string(), 2);
        let weights = WordWeights::new();
        let scorer = Scorer::new(&dictionary, &doc_freq, 10, &weights, 3);
        let mut contributions = scorer.empty_contributions();
        let scores = scorer.score_text("motivated", ScoringMethod::TfIdf, &mut contributions);
        let expected = (10.0f64 / 3.0).ln();
        assert!((scores[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn words_without_weights_carry_no_confidence() {
        let dictionary = urgency_dictionary(&[("motivated", 0.9)]);
        let mut doc_freq = DocumentFrequency::new();
        doc_freq.insert("motivated".to_string(), 1);
        let weights = WordWeights::new();
        let scorer = Scorer::new(&dictionary, &doc_freq, 10, &weights, 1);
        let mut contributions = scorer.empty_contributions();
        let scores = scorer.score_text(
            "motivated",
            ScoringMethod::TfIdfSimWeight,
            &mut contributions,
        );
        assert_eq!(scores[0], 0.0);
        assert_eq!(contributions["motivated"], 0.0);
    }

    #[test]
    fn similarity_weight_scales_each_contribution() {
        let dictionary = urgency_dictionary(&[("motivated", 0.9), ("sale", 0.5)]);
        let mut doc_freq = DocumentFrequency::new();
        doc_freq.insert("motivated".to_string(), 5);
        doc_freq.insert("sale".to_string(), 5);
        let weights = dictionary.similarity_weights();
        let scorer = Scorer::new(&dictionary, &doc_freq, 10, &weights, 1);
        let mut contributions = scorer.empty_contributions();
        let scores = scorer.score_text(
            "motivated sale",
            ScoringMethod::TfIdfSimWeight,
            &mut contributions,
        );
        let idf = (10.0f64 / 5.0).ln();
        let expected = 1.0 * idf + 0.5 * idf;
        assert!((scores[0] - expected).abs() < 1e-12);
        assert!((contributions["sale"] - 0.5 * idf).abs() < 1e-12);
    }

    #[test]
    fn contribution_table_covers_every_dictionary_word() {
        let dictionary = urgency_dictionary(&[("motivated", 0.9), ("ghost", 0.5)]);
        let doc_freq = DocumentFrequency::new();
        let weights = WordWeights::new();
        let scorer = Scorer::new(&dictionary, &doc_freq, 10, &weights, 1);
        let mut contributions = scorer.empty_contributions();
        scorer.score_text("motivated", ScoringMethod::TfIdf, &mut contributions);
        assert_eq!(contributions.len(), 2);
        assert_eq!(contributions["ghost"], 0.0);
    }

    #[test]
    fn method_labels_round_trip_through_from_str() {
        for method in [
            ScoringMethod::Tf,
            ScoringMethod::TfIdf,
            ScoringMethod::WfIdf,
            ScoringMethod::TfIdfSimWeight,
            ScoringMethod::WfIdfSimWeight,
        ] {
            assert_eq!(method.label().parse::<ScoringMethod>().unwrap(), method);
        }
        assert!("BM25".parse::<ScoringMethod>().is_err());
    }
}
