use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use tracing::info;

use crate::error::{Result, ScoreError};

/// Document frequency per word: the number of documents containing the
/// word at least once. Duplicates within a document count once.
pub type DocumentFrequency = IndexMap<String, u32>;

/// Compute document frequencies in one streaming pass over a
/// document-level corpus. Words are whitespace-delimited; insertion
/// order follows first occurrence in the stream, so the persisted table
/// is deterministic for a given input.
pub fn document_frequency(doc_corpus: &Path) -> Result<DocumentFrequency> {
    let reader = BufReader::new(File::open(doc_corpus)?);
    let mut table = DocumentFrequency::new();
    let mut documents = 0usize;
    for line in reader.lines() {
        let line = line?;
        let mut seen: HashSet<&str> = HashSet::new();
        for word in line.split_whitespace() {
            if seen.insert(word) {
                *table.entry(word.to_string()).or_insert(0) += 1;
            }
        }
        documents += 1;
    }
    info!(documents, words = table.len(), "document frequencies computed");
    Ok(table)
}

/// Persist a document-frequency table.
pub fn save_frequency(table: &DocumentFrequency, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_cbor::to_writer(writer, table)?;
    Ok(())
}

/// Reload a persisted document-frequency table. A table carrying a zero
/// count is malformed and rejected rather than silently coerced.
pub fn load_frequency(path: &Path) -> Result<DocumentFrequency> {
    let reader = BufReader::new(File::open(path)?);
    let table: DocumentFrequency = serde_cbor::from_reader(reader)?;
    if let Some((word, _)) = table.iter().find(|(_, count)| **count == 0) {
        return Err(ScoreError::ArtifactShape {
            artifact: path.display().to_string(),
            details: format!("word '{}' has a document frequency of zero", word),
        });
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::write_lines;
    use std::fs;

    #[test]
    fn duplicates_within_a_document_count_once() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("docs.txt");
        write_lines(&corpus, &["sale sale now", "now later"]).unwrap();
        let table = document_frequency(&corpus).unwrap();
        assert_eq!(table.get("sale"), Some(&1));
        assert_eq!(table.get("now"), Some(&2));
        assert_eq!(table.get("later"), Some(&1));
    }

    #[test]
    fn persisted_table_is_idempotent_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("docs.txt");
        write_lines(&corpus, &["b a", "a c"]).unwrap();
        let table = document_frequency(&corpus).unwrap();
        let path = dir.path().join("df.cbor");
        save_frequency(&table, &path).unwrap();
        let first = fs::read(&path).unwrap();

        let again = document_frequency(&corpus).unwrap();
        save_frequency(&again, &path).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
        assert_eq!(load_frequency(&path).unwrap(), table);
    }

    #[test]
    fn zero_counts_are_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("df.cbor");
        let mut table = DocumentFrequency::new();
        table.insert("ghost".to_string(), 0);
        save_frequency(&table, &path).unwrap();
        let err = load_frequency(&path).unwrap_err();
        assert!(matches!(err, ScoreError::ArtifactShape { .. }));
    }
}
