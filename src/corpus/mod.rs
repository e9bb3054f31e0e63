pub mod aggregate;
pub mod frequency;
pub mod transform;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoreError};

/// One record of a line-oriented corpus: an opaque identifier and a
/// single line of text. Records are produced by streaming transforms and
/// never mutated in place; each pipeline stage reads one file-backed
/// sequence and writes a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub id: String,
    pub text: String,
}

impl CorpusRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }

    /// Placeholder committed when a per-line transform fails: empty text
    /// keyed to the original identifier, so positional alignment holds.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: String::new(),
        }
    }
}

/// Structured sentence identifier: document id plus sentence index.
///
/// The encoded form is `<doc>_<sentence>`. Producers should build ids
/// through this type; the encoded string is only split back apart (at the
/// first underscore) when consuming id files written by external tools.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SentenceId {
    pub doc: String,
    pub sentence: u32,
}

impl SentenceId {
    pub fn new(doc: impl Into<String>, sentence: u32) -> Self {
        Self {
            doc: doc.into(),
            sentence,
        }
    }

    /// Document segment of an encoded sentence id: everything before the
    /// first underscore. Ids without an underscore are whole-document ids
    /// and are returned unchanged.
    pub fn doc_part(encoded: &str) -> &str {
        match encoded.split_once('_') {
            Some((doc, _)) => doc,
            None => encoded,
        }
    }
}

impl fmt::Display for SentenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.doc, self.sentence)
    }
}

/// Count the lines of a text file without holding it in memory.
pub fn line_count(path: &Path) -> Result<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut n = 0usize;
    for line in reader.lines() {
        line?;
        n += 1;
    }
    Ok(n)
}

/// Read a whole line file into memory, one element per line.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        lines.push(line?);
    }
    Ok(lines)
}

/// Replace embedded line breaks with spaces so a record stays one line.
pub fn sanitize_line(text: &str) -> String {
    if text.contains(['\n', '\r']) {
        text.replace(['\n', '\r'], " ")
    } else {
        text.to_string()
    }
}

/// Write a line file, one element per line, then re-count the written
/// lines against the input length. A mismatch is fatal, not coerced.
pub fn write_lines<S: AsRef<str>>(path: &Path, lines: &[S]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writer.write_all(sanitize_line(line.as_ref()).as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    let written = line_count(path)?;
    if written != lines.len() {
        return Err(ScoreError::ArtifactShape {
            artifact: path.display().to_string(),
            details: format!("wrote {} lines, expected {}", written, lines.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_id_round_trips_through_display() {
        let id = SentenceId::new("doc42", 7);
        assert_eq!(id.to_string(), "doc42_7");
        assert_eq!(SentenceId::doc_part("doc42_7"), "doc42");
    }

    #[test]
    fn doc_part_splits_at_first_underscore_only() {
        assert_eq!(SentenceId::doc_part("1_0"), "1");
        assert_eq!(SentenceId::doc_part("a_b_2"), "a");
        assert_eq!(SentenceId::doc_part("plain"), "plain");
    }

    #[test]
    fn write_lines_sanitizes_embedded_breaks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        write_lines(&path, &["one\ntwo", "three\r"]).unwrap();
        let back = read_lines(&path).unwrap();
        assert_eq!(back, vec!["one two".to_string(), "three ".to_string()]);
        assert_eq!(line_count(&path).unwrap(), 2);
    }
}
