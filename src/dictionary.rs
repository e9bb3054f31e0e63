use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::embedding::{seed_centroid, EmbeddingSpace};
use crate::error::{Result, ScoreError};

/// Seed vocabulary: category name to hand-curated starting words.
pub type SeedWords = IndexMap<String, Vec<String>>;

/// One expanded dictionary word with its similarity to the category's
/// seed centroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictEntry {
    pub word: String,
    pub similarity: f32,
}

impl DictEntry {
    pub fn new(word: impl Into<String>, similarity: f32) -> Self {
        Self {
            word: word.into(),
            similarity,
        }
    }
}

/// Expanded category dictionary.
///
/// Maps each category to its ranked word list, insertion order being rank
/// order (descending similarity). After [`Dictionary::deduplicate`] the
/// categories partition the union of their words: every word belongs to
/// exactly one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    pub categories: IndexMap<String, Vec<DictEntry>>,
}

impl Dictionary {
    /// Expand every category's seed words through the embedding space.
    ///
    /// Per category: average the vectors of the seeds found in vocabulary
    /// (absent seeds are skipped, never an error) and take the `top_n`
    /// nearest vocabulary words to that centroid, optionally restricted
    /// to the most frequent `restrict_vocab` fraction of the vocabulary.
    /// A category whose seeds are all out of vocabulary expands to an
    /// empty word list.
    pub fn expand<S: EmbeddingSpace>(
        space: &S,
        seeds: &SeedWords,
        restrict_vocab: Option<f64>,
        top_n: usize,
    ) -> Self {
        let mut categories = IndexMap::new();
        for (category, seed_list) in seeds {
            let entries = match seed_centroid(space, seed_list) {
                Some(centroid) => space
                    .nearest(&centroid, top_n, restrict_vocab)
                    .into_iter()
                    .map(|(word, similarity)| DictEntry::new(word, similarity))
                    .collect(),
                None => {
                    warn!(category = %category, "no seed word in vocabulary, category left empty");
                    Vec::new()
                }
            };
            categories.insert(category.clone(), entries);
        }
        Self { categories }
    }

    /// Resolve words claimed by more than one category.
    ///
    /// Each duplicated word is kept only in the category where its
    /// similarity to that category's seed centroid is strictly highest;
    /// ties go to the first-seen category. Postcondition: the dictionary
    /// partitions its words.
    pub fn deduplicate<S: EmbeddingSpace>(&mut self, space: &S, seeds: &SeedWords) {
        let centroids = category_centroids(space, seeds);
        // word -> (winning category index, similarity to its centroid)
        let mut winners: IndexMap<&str, (usize, f32)> = IndexMap::new();
        for (cat_index, (category, entries)) in self.categories.iter().enumerate() {
            let centroid = centroids.get(category).and_then(|c| c.as_deref());
            for entry in entries {
                let similarity = centroid
                    .and_then(|c| space.similarity(&entry.word, c))
                    .unwrap_or(entry.similarity);
                match winners.get_mut(entry.word.as_str()) {
                    Some(best) => {
                        if similarity > best.1 {
                            *best = (cat_index, similarity);
                        }
                    }
                    None => {
                        winners.insert(&entry.word, (cat_index, similarity));
                    }
                }
            }
        }
        let keep: Vec<(String, usize)> = winners
            .into_iter()
            .map(|(word, (cat_index, _))| (word.to_string(), cat_index))
            .collect();
        for (cat_index, (_, entries)) in self.categories.iter_mut().enumerate() {
            entries.retain(|entry| {
                keep.iter()
                    .any(|(word, winner)| *winner == cat_index && *word == entry.word)
            });
        }
    }

    /// Re-sort each category's words by descending similarity to the
    /// category's seed centroid, refreshing the stored similarities.
    pub fn rank<S: EmbeddingSpace>(&mut self, space: &S, seeds: &SeedWords) {
        let centroids = category_centroids(space, seeds);
        for (category, entries) in self.categories.iter_mut() {
            if let Some(Some(centroid)) = centroids.get(category) {
                for entry in entries.iter_mut() {
                    if let Some(similarity) = space.similarity(&entry.word, centroid) {
                        entry.similarity = similarity;
                    }
                }
            }
            entries.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        }
    }

    /// Expand, deduplicate and rank in one step.
    pub fn build<S: EmbeddingSpace>(
        space: &S,
        seeds: &SeedWords,
        restrict_vocab: Option<f64>,
        top_n: usize,
    ) -> Self {
        let mut dictionary = Self::expand(space, seeds, restrict_vocab, top_n);
        dictionary.deduplicate(space, seeds);
        dictionary.rank(space, seeds);
        info!(
            categories = dictionary.categories.len(),
            words = dictionary.word_count(),
            "dictionary built"
        );
        dictionary
    }

    pub fn word_count(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// True when no word appears in more than one category.
    pub fn is_partition(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.categories
            .values()
            .flatten()
            .all(|entry| seen.insert(entry.word.as_str()))
    }

    /// Write the word-list form: one row per category, the category name
    /// followed by its words in rank order. Similarity scores are not
    /// part of this form; rank order carries them (see [`Dictionary::save`]
    /// for the extended form).
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        for (row, (category, entries)) in self.categories.iter().enumerate() {
            for cell in std::iter::once(category.as_str())
                .chain(entries.iter().map(|entry| entry.word.as_str()))
            {
                if cell.contains([',', '\n', '\r']) {
                    return Err(ScoreError::DictionaryFormat {
                        row,
                        details: format!("cell '{}' contains a delimiter", cell),
                    });
                }
            }
            writer.write_all(category.as_bytes())?;
            for entry in entries {
                writer.write_all(b",")?;
                writer.write_all(entry.word.as_bytes())?;
            }
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read the word-list form back. Category set, word membership and
    /// rank order are preserved exactly; similarities are not stored in
    /// this form and load as zero. The partition invariant is
    /// re-validated: a word in two categories is fatal.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let mut categories: IndexMap<String, Vec<DictEntry>> = IndexMap::new();
        for (row, line) in reader.lines().enumerate() {
            let line = line?;
            let mut cells = line.split(',');
            let category = match cells.next() {
                Some(c) if !c.is_empty() => c.to_string(),
                _ => {
                    return Err(ScoreError::DictionaryFormat {
                        row,
                        details: "empty category name".to_string(),
                    })
                }
            };
            if categories.contains_key(&category) {
                return Err(ScoreError::DictionaryFormat {
                    row,
                    details: format!("duplicate category '{}'", category),
                });
            }
            let entries = cells
                .filter(|word| !word.is_empty())
                .map(|word| DictEntry::new(word, 0.0))
                .collect();
            categories.insert(category, entries);
        }
        let dictionary = Self { categories };
        if !dictionary.is_partition() {
            return Err(ScoreError::DictionaryFormat {
                row: 0,
                details: "a word appears in more than one category".to_string(),
            });
        }
        Ok(dictionary)
    }

    /// Persist the extended form, including similarity scores.
    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_cbor::to_writer(writer, self)?;
        Ok(())
    }

    /// Reload the extended form, validating the partition invariant and
    /// the non-increasing similarity order within each category.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let dictionary: Dictionary = serde_cbor::from_reader(reader)?;
        if !dictionary.is_partition() {
            return Err(ScoreError::ArtifactShape {
                artifact: path.display().to_string(),
                details: "a word appears in more than one category".to_string(),
            });
        }
        for (category, entries) in &dictionary.categories {
            if entries
                .windows(2)
                .any(|pair| pair[0].similarity < pair[1].similarity)
            {
                return Err(ScoreError::ArtifactShape {
                    artifact: path.display().to_string(),
                    details: format!("category '{}' is not in rank order", category),
                });
            }
        }
        Ok(dictionary)
    }

    /// Per-word confidence weights from rank position: the word at
    /// 0-based rank `r` in a category of `n` words weighs `1 - r/n`,
    /// decaying linearly from 1.0 at rank 0 to a floor of `1/n` at the
    /// last rank. The partition invariant guarantees one weight per word.
    pub fn similarity_weights(&self) -> WordWeights {
        let mut weights = WordWeights::new();
        for entries in self.categories.values() {
            let n = entries.len() as f64;
            for (rank, entry) in entries.iter().enumerate() {
                weights.insert(entry.word.clone(), 1.0 - rank as f64 / n);
            }
        }
        weights
    }
}

/// Word-weight table derived from dictionary rank positions.
pub type WordWeights = IndexMap<String, f64>;

pub fn save_weights(weights: &WordWeights, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_cbor::to_writer(writer, weights)?;
    Ok(())
}

/// Reload a weight table for a dictionary, rejecting weights outside
/// (0, 1] and tables that do not cover every dictionary word. A stale
/// table from an earlier dictionary build is fatal, not coerced.
pub fn load_weights(path: &Path, dictionary: &Dictionary) -> Result<WordWeights> {
    let reader = BufReader::new(File::open(path)?);
    let weights: WordWeights = serde_cbor::from_reader(reader)?;
    if let Some((word, weight)) = weights.iter().find(|(_, w)| **w <= 0.0 || **w > 1.0) {
        return Err(ScoreError::ArtifactShape {
            artifact: path.display().to_string(),
            details: format!("weight {} for '{}' outside (0, 1]", weight, word),
        });
    }
    if let Some(missing) = dictionary
        .categories
        .values()
        .flatten()
        .find(|entry| !weights.contains_key(entry.word.as_str()))
    {
        return Err(ScoreError::ArtifactShape {
            artifact: path.display().to_string(),
            details: format!("no weight for dictionary word '{}'", missing.word),
        });
    }
    Ok(weights)
}

/// Read a seed-word file in the same row format as the dictionary CSV.
pub fn read_seed_words(path: &Path) -> Result<SeedWords> {
    let dictionary = Dictionary::read_csv(path)?;
    Ok(dictionary
        .categories
        .into_iter()
        .map(|(category, entries)| {
            let words = entries.into_iter().map(|entry| entry.word).collect();
            (category, words)
        })
        .collect())
}

fn category_centroids<S: EmbeddingSpace>(
    space: &S,
    seeds: &SeedWords,
) -> IndexMap<String, Option<Vec<f32>>> {
    seeds
        .iter()
        .map(|(category, seed_list)| (category.clone(), seed_centroid(space, seed_list)))
        .collect()
}
