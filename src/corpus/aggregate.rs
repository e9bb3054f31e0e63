use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::IndexMap;
use tracing::info;

use crate::corpus::{line_count, write_lines, SentenceId};
use crate::error::{Result, ScoreError};

/// Regroup a sentence-level corpus into a document-level corpus.
///
/// Both inputs are streamed line by line; the working set holds one
/// accumulated string per distinct document, never the sentence corpus
/// itself. Sentences sharing a document id are space-joined in stream
/// order, and documents are emitted in order of first appearance.
///
/// Writes the document corpus and the aligned document id file, and
/// returns the number of documents. Re-running on identical inputs
/// produces byte-identical outputs.
pub fn aggregate_documents(
    sentence_corpus: &Path,
    sentence_ids: &Path,
    out_corpus: &Path,
    out_ids: &Path,
) -> Result<usize> {
    let corpus_lines = line_count(sentence_corpus)?;
    let id_lines = line_count(sentence_ids)?;
    if corpus_lines != id_lines {
        return Err(ScoreError::AlignmentMismatch {
            path: sentence_corpus.to_path_buf(),
            corpus_lines,
            id_lines,
        });
    }

    let sentences = BufReader::new(File::open(sentence_corpus)?).lines();
    let ids = BufReader::new(File::open(sentence_ids)?).lines();
    let mut documents: IndexMap<String, String> = IndexMap::new();
    for (sentence, id) in sentences.zip(ids) {
        let (sentence, id) = (sentence?, id?);
        fold_sentence(&mut documents, SentenceId::doc_part(&id), &sentence);
    }

    let texts: Vec<&String> = documents.values().collect();
    write_lines(out_corpus, &texts)?;
    let doc_ids: Vec<&String> = documents.keys().collect();
    write_lines(out_ids, &doc_ids)?;
    info!(
        sentences = corpus_lines,
        documents = documents.len(),
        "aggregated sentence corpus to document level"
    );
    Ok(documents.len())
}

/// Append one sentence to its document's accumulated text.
fn fold_sentence(documents: &mut IndexMap<String, String>, doc_id: &str, sentence: &str) {
    match documents.get_mut(doc_id) {
        Some(text) => {
            if !sentence.is_empty() {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(sentence);
            }
        }
        None => {
            documents.insert(doc_id.to_string(), sentence.to_string());
        }
    }
}

/// In-memory form of the same regrouping, for already-loaded records.
/// Returns parallel document text and document id sequences.
pub fn aggregate_records<'a, I>(pairs: I) -> (Vec<String>, Vec<String>)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut documents: IndexMap<String, String> = IndexMap::new();
    for (id, sentence) in pairs {
        fold_sentence(&mut documents, SentenceId::doc_part(id), sentence);
    }
    let ids = documents.keys().cloned().collect();
    let texts = documents.into_values().collect();
    (texts, ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::read_lines;
    use std::fs;

    #[test]
    fn sentences_regroup_in_first_seen_order() {
        let (texts, ids) = aggregate_records(vec![("1_0", "a"), ("1_1", "b"), ("2_0", "c")]);
        assert_eq!(texts, vec!["a b".to_string(), "c".to_string()]);
        assert_eq!(ids, vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn interleaved_documents_keep_first_appearance_order() {
        let (texts, ids) =
            aggregate_records(vec![("b_0", "x"), ("a_0", "y"), ("b_1", "z")]);
        assert_eq!(ids, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(texts, vec!["x z".to_string(), "y".to_string()]);
    }

    #[test]
    fn empty_sentences_do_not_leave_double_spaces() {
        let (texts, _) = aggregate_records(vec![("1_0", "a"), ("1_1", ""), ("1_2", "b")]);
        assert_eq!(texts, vec!["a b".to_string()]);
    }

    #[test]
    fn file_aggregation_matches_the_record_form_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("sentences.txt");
        let ids = dir.path().join("sentence_ids.txt");
        write_lines(&corpus, &["a", "b", "c"]).unwrap();
        write_lines(&ids, &["1_0", "1_1", "2_0"]).unwrap();
        let out_corpus = dir.path().join("docs.txt");
        let out_ids = dir.path().join("doc_ids.txt");

        let n = aggregate_documents(&corpus, &ids, &out_corpus, &out_ids).unwrap();
        assert_eq!(n, 2);
        assert_eq!(read_lines(&out_corpus).unwrap(), vec!["a b", "c"]);
        assert_eq!(read_lines(&out_ids).unwrap(), vec!["1", "2"]);

        let first = fs::read(&out_corpus).unwrap();
        aggregate_documents(&corpus, &ids, &out_corpus, &out_ids).unwrap();
        assert_eq!(fs::read(&out_corpus).unwrap(), first);
    }

    #[test]
    fn misaligned_inputs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("sentences.txt");
        let ids = dir.path().join("sentence_ids.txt");
        write_lines(&corpus, &["a", "b"]).unwrap();
        write_lines(&ids, &["1_0"]).unwrap();
        let err = aggregate_documents(
            &corpus,
            &ids,
            &dir.path().join("docs.txt"),
            &dir.path().join("doc_ids.txt"),
        )
        .unwrap_err();
        assert!(matches!(err, ScoreError::AlignmentMismatch { .. }));
    }
}
