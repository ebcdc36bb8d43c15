//! Side log for questions the filler could not answer on the page.
//!
//! CSV with `Question, Error` columns. Purely diagnostic: rows carry the
//! question text and the raw markup of the region that defeated the filler so
//! broken selectors can be fixed offline.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use tracing::warn;

const HEADERS: [&str; 2] = ["Question", "Error"];

pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Append one diagnostic row. Best-effort; never fails the caller.
    pub fn record(&self, question: &str, detail: &str) {
        let new_file = !self.path.exists();
        let appended = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(csv::Error::from)
            .and_then(|file| {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(file);
                if new_file {
                    writer.write_record(HEADERS)?;
                }
                writer.write_record([question, detail])?;
                writer.flush()?;
                Ok(())
            });
        if let Err(e) = appended {
            warn!("error log: failed to append to {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_record_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qa_errors.csv");
        let log = ErrorLog::new(&path);

        log.record("How many years of Go?", "<div class=\"grouping\">…</div>");
        log.record("Unfillable prompt", "no control matched");

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("Question,Error"));
        assert_eq!(content.lines().count(), 3);
    }
}
