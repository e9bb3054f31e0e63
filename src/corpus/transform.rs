use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::corpus::{line_count, sanitize_line, CorpusRecord};
use crate::error::{Result, ScoreError};

/// Error type a per-line transform may raise.
pub type TransformError = Box<dyn std::error::Error + Send + Sync>;

/// Counters returned by a (possibly partial) transform run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransformStats {
    /// Input lines consumed this run (excluding any skipped by resume).
    pub lines_consumed: usize,
    /// Output records appended this run.
    pub records_written: usize,
}

/// Stream a line corpus and its aligned ids through a per-line transform in
/// fixed-size chunks, appending results to the output files chunk by chunk.
///
/// The transform receives one (line, id) pair and returns zero or more
/// output records. Items within a chunk run on the rayon pool; results are
/// joined back into input order before the append, so output order always
/// equals input order. Each chunk is flushed before the next one starts,
/// bounding peak memory to a single chunk and making the flushed line count
/// a safe resume point.
///
/// With `start_index: None` any pre-existing output files are discarded
/// before processing (fresh run). With `Some(n)` the outputs are preserved
/// and processing resumes at input line `n`, the recovery path after a
/// partial run.
///
/// A transform failure is logged with the offending id and commits an
/// explicit placeholder record (empty text, original id) instead of
/// dropping the item, so downstream positional assumptions never break.
///
/// # Errors
/// Fails before any file is touched when the input line count does not
/// match the id count, or when `start_index` lies past the end of input.
pub fn transform_corpus<F>(
    input: &Path,
    input_ids: &[String],
    output: &Path,
    output_ids: &Path,
    transform: F,
    chunk_size: usize,
    start_index: Option<usize>,
) -> Result<TransformStats>
where
    F: Fn(&str, &str) -> std::result::Result<Vec<CorpusRecord>, TransformError> + Sync,
{
    let total = line_count(input)?;
    if total != input_ids.len() {
        return Err(ScoreError::AlignmentMismatch {
            path: input.to_path_buf(),
            corpus_lines: total,
            id_lines: input_ids.len(),
        });
    }
    let start = start_index.unwrap_or(0);
    let pending_ids = input_ids
        .get(start..)
        .ok_or_else(|| ScoreError::ArtifactShape {
            artifact: input.display().to_string(),
            details: format!("resume index {} past end of {} input lines", start, total),
        })?;
    if start_index.is_none() {
        remove_if_exists(output)?;
        remove_if_exists(output_ids)?;
    }

    let chunk_size = chunk_size.max(1);
    let mut reader = BufReader::new(File::open(input)?).lines();
    for _ in 0..start {
        if reader.next().transpose()?.is_none() {
            break;
        }
    }

    let mut out_text = append_writer(output)?;
    let mut out_ids = append_writer(output_ids)?;
    let mut stats = TransformStats::default();
    let mut ids_iter = pending_ids.iter();
    loop {
        let mut chunk: Vec<(String, &str)> = Vec::with_capacity(chunk_size);
        for _ in 0..chunk_size {
            let (Some(line), Some(id)) = (reader.next(), ids_iter.next()) else {
                break;
            };
            chunk.push((line?, id.as_str()));
        }
        if chunk.is_empty() {
            break;
        }

        let results: Vec<Vec<CorpusRecord>> = chunk
            .par_iter()
            .map(|(line, id)| match transform(line, id) {
                Ok(records) => records,
                Err(error) => {
                    warn!(id = %id, error = %error, "per-line transform failed, committing placeholder");
                    vec![CorpusRecord::placeholder(*id)]
                }
            })
            .collect();

        let mut appended = 0usize;
        for record in results.into_iter().flatten() {
            out_text.write_all(sanitize_line(&record.text).as_bytes())?;
            out_text.write_all(b"\n")?;
            out_ids.write_all(sanitize_line(&record.id).as_bytes())?;
            out_ids.write_all(b"\n")?;
            appended += 1;
        }
        out_text.flush()?;
        out_ids.flush()?;
        stats.lines_consumed += chunk.len();
        stats.records_written += appended;
        debug!(
            consumed = start + stats.lines_consumed,
            total,
            appended,
            "chunk flushed"
        );
    }
    Ok(stats)
}

fn append_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
