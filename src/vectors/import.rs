//! Streaming import of plain-text word embeddings (GloVe style).
//!
//! Each line is `token f1 f2 ... fN`. Lines are read one at a time into a
//! reused buffer, so peak memory tracks the vocabulary, not the file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{EngramError, EngramResult};

use super::index::VectorIndex;

/// Records between two progress callbacks.
pub const PROGRESS_INTERVAL: usize = 10_000;

/// Progress snapshot passed to the import callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportProgress {
    pub records: usize,
    pub bytes_read: u64,
}

/// Summary of a finished import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub records: usize,
    pub dimension: usize,
    pub skipped_lines: usize,
}

impl VectorIndex {
    /// Import word vectors from `reader`.
    ///
    /// The first record fixes the dimension (unless the index already has
    /// one); any later record of another width aborts with
    /// `DimensionMismatch`.
    pub fn import_embeddings<R, F>(
        &mut self,
        mut reader: R,
        mut progress: F,
    ) -> EngramResult<ImportStats>
    where
        R: BufRead,
        F: FnMut(ImportProgress),
    {
        let mut line = String::new();
        let mut line_no = 0usize;
        let mut records = 0usize;
        let mut skipped = 0usize;
        let mut bytes_read = 0u64;
        let mut values: Vec<f32> = Vec::new();

        loop {
            line.clear();
            let n = reader.read_line(&mut line)?;
            if n == 0 {
                break;
            }
            line_no += 1;
            bytes_read += n as u64;

            let mut fields = line.split_whitespace();
            let Some(token) = fields.next() else {
                skipped += 1;
                continue;
            };

            values.clear();
            for raw in fields {
                let v: f32 = raw.parse().map_err(|_| {
                    EngramError::corrupt(format!(
                        "line {}: invalid float '{}' for token '{}'",
                        line_no, raw, token
                    ))
                })?;
                values.push(v);
            }
            if values.is_empty() {
                return Err(EngramError::corrupt(format!(
                    "line {}: token '{}' has no vector values",
                    line_no, token
                )));
            }

            if let Some(dim) = self.dimension() {
                if values.len() != dim {
                    debug!(
                        line = line_no,
                        expected = dim,
                        found = values.len(),
                        "Dimension mismatch in embedding source"
                    );
                    return Err(EngramError::DimensionMismatch {
                        expected: dim,
                        found: values.len(),
                    });
                }
            }
            self.insert_word(token, values.clone())?;
            records += 1;

            if records % PROGRESS_INTERVAL == 0 {
                progress(ImportProgress {
                    records,
                    bytes_read,
                });
            }
        }

        if records == 0 || records % PROGRESS_INTERVAL != 0 {
            progress(ImportProgress {
                records,
                bytes_read,
            });
        }
        let stats = ImportStats {
            records,
            dimension: self.dimension().unwrap_or(0),
            skipped_lines: skipped,
        };
        info!(
            records = stats.records,
            dimension = stats.dimension,
            skipped = stats.skipped_lines,
            "Imported word embeddings"
        );
        Ok(stats)
    }

    /// Import word vectors from a file on disk.
    pub fn import_embeddings_file<F>(
        &mut self,
        path: &Path,
        progress: F,
    ) -> EngramResult<ImportStats>
    where
        F: FnMut(ImportProgress),
    {
        let file = File::open(path)?;
        self.import_embeddings(BufReader::new(file), progress)
    }
}
