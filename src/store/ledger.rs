//! Append-only ledger of every job processed.
//!
//! Headerless CSV, one row per job: `timestamp, job_id, title, company,
//! attempted, result`. The ledger is both the audit trail and the dedup
//! source: at startup the ids seen within the trailing window are excluded
//! from new runs. Rows are never deleted — only time-filtered on read.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{Duration, Local, NaiveDateTime};
use tracing::{info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One processed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub timestamp: NaiveDateTime,
    pub job_id: u64,
    pub title: String,
    pub company: String,
    /// An apply affordance existed for this job. `false` implies none was found.
    pub attempted: bool,
    /// The application wizard reached its terminal "submitted" state.
    pub result: bool,
}

impl LedgerRecord {
    /// Record stamped with the current local time.
    pub fn now(job_id: u64, title: &str, company: &str, attempted: bool, result: bool) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            job_id,
            title: title.to_string(),
            company: company.to_string(),
            attempted,
            result,
        }
    }
}

/// Handle on the ledger file. Cheap to construct; all I/O is per-call.
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Ids of jobs processed within the trailing `window_days`.
    ///
    /// Tolerant by contract: a missing or unreadable file yields the empty
    /// set, malformed rows are skipped. Dedup must never block the run.
    pub fn recent_ids(&self, window_days: i64) -> HashSet<u64> {
        let mut ids = HashSet::new();
        if !self.path.exists() {
            info!("ledger: {} not found — no prior applications", self.path.display());
            return ids;
        }

        let mut reader = match csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
        {
            Ok(r) => r,
            Err(e) => {
                warn!("ledger: could not read {}: {}", self.path.display(), e);
                return ids;
            }
        };

        let cutoff = Local::now().naive_local() - Duration::days(window_days);
        let mut skipped = 0usize;
        for row in reader.records() {
            let rec = match row {
                Ok(r) => r,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            let parsed = rec.get(0).and_then(|ts| {
                NaiveDateTime::parse_from_str(ts.trim(), TIMESTAMP_FORMAT)
                    .ok()
                    .zip(rec.get(1).and_then(|id| id.trim().parse::<u64>().ok()))
            });
            match parsed {
                Some((ts, id)) if ts > cutoff => {
                    ids.insert(id);
                }
                Some(_) => {} // older than the window; eligible again
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!("ledger: skipped {} malformed rows in {}", skipped, self.path.display());
        }
        info!(
            "ledger: {} job ids within the last {} days",
            ids.len(),
            window_days
        );
        ids
    }

    /// Append one row. Best-effort: failure is logged, not retried, and must
    /// not block subsequent applications.
    pub fn append(&self, record: &LedgerRecord) {
        let appended = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(csv::Error::from)
            .and_then(|file| {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(false)
                    .from_writer(file);
                writer.write_record([
                    record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                    record.job_id.to_string(),
                    record.title.clone(),
                    record.company.clone(),
                    record.attempted.to_string(),
                    record.result.to_string(),
                ])?;
                writer.flush()?;
                Ok(())
            });
        if let Err(e) = appended {
            warn!(
                "ledger: failed to append job {} to {}: {}",
                record.job_id,
                self.path.display(),
                e
            );
        }
    }
}
