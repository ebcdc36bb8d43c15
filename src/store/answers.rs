//! Persistent question → answer cache.
//!
//! Loaded in bulk at startup, appended to the moment a new question is
//! classified. Keys are question text verbatim as captured from the page,
//! case-sensitive. The file never shrinks — question cardinality on one site
//! is small enough that eviction would be pointless bookkeeping.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

const HEADERS: [&str; 2] = ["Question", "Answer"];

/// In-memory view of the answer cache, write-through to CSV.
pub struct AnswerStore {
    path: PathBuf,
    answers: HashMap<String, String>,
}

impl AnswerStore {
    /// Load the cache from `path`. Never fails: a missing file is created
    /// (header only), an unreadable or malformed file yields an empty cache
    /// with a warning.
    pub fn load(path: &Path) -> Self {
        let mut answers = HashMap::new();

        if path.exists() {
            match csv::Reader::from_path(path) {
                Ok(mut reader) => {
                    for row in reader.records() {
                        match row {
                            Ok(rec) => {
                                if let (Some(q), Some(a)) = (rec.get(0), rec.get(1)) {
                                    answers.insert(q.to_string(), a.to_string());
                                }
                            }
                            Err(e) => warn!("answer cache: skipping malformed row: {}", e),
                        }
                    }
                    info!("answer cache: loaded {} entries from {}", answers.len(), path.display());
                }
                Err(e) => warn!("answer cache: could not read {}: {}", path.display(), e),
            }
        } else if let Err(e) = Self::write_header(path) {
            warn!("answer cache: could not create {}: {}", path.display(), e);
        }

        Self {
            path: path.to_path_buf(),
            answers,
        }
    }

    fn write_header(path: &Path) -> csv::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(HEADERS)?;
        writer.flush()?;
        Ok(())
    }

    /// Exact-match lookup by question text.
    pub fn lookup(&self, question: &str) -> Option<&str> {
        self.answers.get(question).map(String::as_str)
    }

    /// Record a newly classified question. Writes through to disk immediately;
    /// an I/O failure is logged and swallowed. A question already present is
    /// left untouched — at most one stored answer per distinct question text.
    pub fn record(&mut self, question: &str, answer: &str) {
        if self.answers.contains_key(question) {
            return;
        }
        self.answers
            .insert(question.to_string(), answer.to_string());

        let appended = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(csv::Error::from)
            .and_then(|file| {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(file);
                writer.write_record([question, answer])?;
                writer.flush()?;
                Ok(())
            });
        if let Err(e) = appended {
            warn!("answer cache: failed to append to {}: {}", self.path.display(), e);
        }
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}
