use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ScoreError};

/// A trained embedding space, consumed as an opaque capability.
///
/// Implementations must expose vector lookup by word (absent for
/// out-of-vocabulary words), a nearest-neighbor-by-vector query, and
/// restriction of that query to the most frequent fraction of the
/// vocabulary. Training the space is out of scope.
pub trait EmbeddingSpace {
    /// Unit-normalized vector for a word, if in vocabulary.
    fn vector(&self, word: &str) -> Option<&[f32]>;

    /// The `top_n` vocabulary words closest to `query`, with similarity
    /// scores in descending order. `restrict_vocab` limits the search to
    /// the top fraction (in (0, 1]) of the frequency-ordered vocabulary.
    fn nearest(&self, query: &[f32], top_n: usize, restrict_vocab: Option<f64>)
        -> Vec<(String, f32)>;

    fn vocab_len(&self) -> usize;

    /// Cosine similarity between a vocabulary word and a query vector.
    fn similarity(&self, word: &str, query: &[f32]) -> Option<f32> {
        let vector = self.vector(word)?;
        let mut unit = query.to_vec();
        if !normalize(&mut unit) {
            return None;
        }
        Some(dot(vector, &unit))
    }
}

/// In-memory embedding space over unit-normalized vectors.
///
/// Words are stored in vocabulary-frequency order, most frequent first,
/// which is what makes fractional vocabulary restriction meaningful.
/// Persisted as a CBOR artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VectorSpace {
    index: IndexMap<String, usize>,
    vectors: Vec<Vec<f32>>,
    dim: usize,
}

impl VectorSpace {
    pub fn new(dim: usize) -> Self {
        Self {
            index: IndexMap::new(),
            vectors: Vec::new(),
            dim,
        }
    }

    /// Insert a word vector. Words must be inserted most-frequent first;
    /// re-inserting a word replaces its vector in place. Zero vectors and
    /// dimension mismatches are rejected.
    pub fn insert(&mut self, word: impl Into<String>, mut vector: Vec<f32>) -> Result<()> {
        let word = word.into();
        if vector.len() != self.dim {
            return Err(ScoreError::ArtifactShape {
                artifact: "embedding space".to_string(),
                details: format!(
                    "vector for '{}' has dimension {}, expected {}",
                    word,
                    vector.len(),
                    self.dim
                ),
            });
        }
        if !normalize(&mut vector) {
            return Err(ScoreError::ArtifactShape {
                artifact: "embedding space".to_string(),
                details: format!("vector for '{}' has zero norm", word),
            });
        }
        match self.index.get(&word) {
            Some(&slot) => self.vectors[slot] = vector,
            None => {
                self.index.insert(word, self.vectors.len());
                self.vectors.push(vector);
            }
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_cbor::to_writer(writer, self)?;
        Ok(())
    }

    /// Reload a persisted space, validating index/vector consistency.
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let space: VectorSpace = serde_cbor::from_reader(reader)?;
        if space.index.len() != space.vectors.len() {
            return Err(ScoreError::ArtifactShape {
                artifact: path.display().to_string(),
                details: format!(
                    "{} vocabulary entries but {} vectors",
                    space.index.len(),
                    space.vectors.len()
                ),
            });
        }
        if let Some(bad) = space.vectors.iter().find(|v| v.len() != space.dim) {
            return Err(ScoreError::ArtifactShape {
                artifact: path.display().to_string(),
                details: format!("vector of dimension {} in a {}-dim space", bad.len(), space.dim),
            });
        }
        Ok(space)
    }
}

impl EmbeddingSpace for VectorSpace {
    fn vector(&self, word: &str) -> Option<&[f32]> {
        self.index
            .get(word)
            .map(|&slot| self.vectors[slot].as_slice())
    }

    fn nearest(
        &self,
        query: &[f32],
        top_n: usize,
        restrict_vocab: Option<f64>,
    ) -> Vec<(String, f32)> {
        let mut unit = query.to_vec();
        if unit.len() != self.dim || !normalize(&mut unit) {
            return Vec::new();
        }
        let limit = match restrict_vocab {
            Some(fraction) => {
                // Domain is (0, 1]; a non-positive fraction still scans
                // the single most frequent word, never an empty pool.
                let clamped = fraction.clamp(0.0, 1.0);
                ((self.vectors.len() as f64 * clamped).ceil() as usize)
                    .clamp(self.vectors.len().min(1), self.vectors.len())
            }
            None => self.vectors.len(),
        };
        debug!(limit, top_n, "nearest-neighbor scan");
        let mut scored: Vec<(usize, f32)> = self.vectors[..limit]
            .par_iter()
            .enumerate()
            .map(|(slot, vector)| (slot, dot(vector, &unit)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
            .into_iter()
            .take(top_n)
            .filter_map(|(slot, score)| {
                let (word, _) = self.index.get_index(slot)?;
                Some((word.clone(), score))
            })
            .collect()
    }

    fn vocab_len(&self) -> usize {
        self.index.len()
    }
}

/// Mean of the vectors of the seed words present in vocabulary. Absent
/// seeds are skipped; `None` when no seed is in vocabulary.
pub fn seed_centroid<S: EmbeddingSpace + ?Sized>(space: &S, seeds: &[String]) -> Option<Vec<f32>> {
    let mut sum: Option<Vec<f32>> = None;
    let mut found = 0usize;
    for seed in seeds {
        let Some(vector) = space.vector(seed) else {
            debug!(seed = %seed, "seed word not in vocabulary, skipped");
            continue;
        };
        found += 1;
        match sum.as_mut() {
            Some(sum) => {
                for (acc, v) in sum.iter_mut().zip(vector) {
                    *acc += v;
                }
            }
            None => sum = Some(vector.to_vec()),
        }
    }
    let mut sum = sum?;
    for v in sum.iter_mut() {
        *v /= found as f32;
    }
    Some(sum)
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Scale a vector to unit length in place. Returns false for zero norm.
fn normalize(vector: &mut [f32]) -> bool {
    let norm = dot(vector, vector).sqrt();
    if norm <= f32::EPSILON {
        return false;
    }
    for v in vector.iter_mut() {
        *v /= norm;
    }
    true
}
