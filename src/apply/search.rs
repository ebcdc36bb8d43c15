//! The outer loop: (position, location) search combos, result pagination, and
//! dispatch of each fresh job into the application wizard.
//!
//! The runner owns every mutable dependency (stores, classifier, dedup set,
//! submission counter) and borrows the browser session. One job's failure is
//! contained to that job: it gets its ledger row and the loop moves on.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Instant;

use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use rand::seq::SliceRandom;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::apply::classifier::{AnswerContext, Classifier};
use crate::apply::wizard::{Wizard, WizardConfig};
use crate::apply::{AbandonReason, JobOutcome, WizardOutcome};
use crate::browser::{locators, BrowserSession, ElementRef, SessionError};
use crate::core::config::{BotConfig, DocumentKind};
use crate::core::wait::jitter_sleep;
use crate::store::{AnswerStore, ErrorLog, Ledger, LedgerRecord};

const SEARCH_BASE: &str = "https://www.linkedin.com/jobs/search/";
const JOB_BASE: &str = "https://www.linkedin.com/jobs/view/";
/// Results page size of the target site.
const PAGE_SIZE: usize = 25;
/// A page with more hits than this is "full": zero new ids there means the
/// next page may still hold fresh ones.
const FULL_PAGE_THRESHOLD: usize = 23;
/// Ledger lookback for the startup dedup set, in days.
const DEDUP_WINDOW_DAYS: i64 = 2;
/// Cap on shuffled (position, location) combos per run.
const MAX_COMBOS: usize = 500;
/// Cooldown pause bounds after a burst of submissions, in milliseconds.
const COOLDOWN_MS: (u64, u64) = (500_000, 900_000);

/// Everything known about one processed job, ready for the ledger.
#[derive(Debug)]
struct JobReport {
    title: String,
    company: String,
    outcome: JobOutcome,
}

pub struct SearchRunner<'a> {
    session: &'a dyn BrowserSession,
    config: BotConfig,
    classifier: Classifier,
    answers: AnswerStore,
    ledger: Ledger,
    error_log: ErrorLog,
    uploads: BTreeMap<DocumentKind, PathBuf>,
    title_blacklist: Option<AhoCorasick>,
    company_blacklist: Option<AhoCorasick>,
    /// Job ids already handled — seeded from the ledger, grown during the run.
    seen: HashSet<u64>,
    submissions: usize,
}

impl<'a> SearchRunner<'a> {
    pub fn new(session: &'a dyn BrowserSession, config: BotConfig) -> Result<Self> {
        let answers = AnswerStore::load(&config.answers_path);
        let ledger = Ledger::new(&config.ledger_path);
        let error_log = ErrorLog::new(&config.error_log_path);
        let seen = ledger.recent_ids(DEDUP_WINDOW_DAYS);

        let classifier = Classifier::new(AnswerContext {
            salary: config.salary.clone(),
            phone_number: config.phone_number.clone(),
        });
        let title_blacklist = build_matcher(&config.blacklist_titles)
            .context("invalid title blacklist")?;
        let company_blacklist = build_matcher(&config.blacklist_companies)
            .context("invalid company blacklist")?;
        let uploads = config.uploads.clone();

        Ok(Self {
            session,
            config,
            classifier,
            answers,
            ledger,
            error_log,
            uploads,
            title_blacklist,
            company_blacklist,
            seen,
            submissions: 0,
        })
    }

    /// Run every (position, location) combo, shuffled, each with its own
    /// wall-clock budget.
    pub async fn run(&mut self) -> Result<()> {
        let mut combos: Vec<(String, String)> = Vec::new();
        for p in &self.config.positions {
            for l in &self.config.locations {
                combos.push((p.clone(), l.clone()));
            }
        }
        combos.shuffle(&mut rand::rng());
        combos.truncate(MAX_COMBOS);
        info!("searching {} position/location combinations", combos.len());

        for (position, location) in combos {
            info!("searching {:?} in {:?}", position, location);
            if let Err(e) = self.run_pair(&position, &location).await {
                warn!("search for {:?} in {:?} failed: {}", position, location, e);
            }
        }

        info!(
            "run finished: {} submissions, {} jobs seen",
            self.submissions,
            self.seen.len()
        );
        Ok(())
    }

    /// Page through one combo's results until exhausted or out of budget.
    async fn run_pair(&mut self, position: &str, location: &str) -> Result<()> {
        let deadline = Instant::now() + self.config.max_search_time;
        let mut offset = 0usize;
        loop {
            if Instant::now() >= deadline {
                info!("budget for {:?} in {:?} exhausted", position, location);
                return Ok(());
            }

            let url = search_url(position, location, offset, &self.config.experience_levels);
            self.session
                .navigate(&url)
                .await
                .with_context(|| format!("opening results page at offset {offset}"))?;
            jitter_sleep(3500, 4900).await;
            self.lazy_scroll_results().await;

            let html = self.session.page_html().await.context("reading results page")?;
            let ids = extract_job_ids(&html);
            if ids.is_empty() {
                debug!("no job cards at offset {}, combo exhausted", offset);
                return Ok(());
            }

            let fresh: Vec<u64> = ids
                .iter()
                .copied()
                .filter(|id| !self.seen.contains(id))
                .collect();
            debug!("offset {}: {} cards, {} fresh", offset, ids.len(), fresh.len());

            if fresh.is_empty() {
                if ids.len() > FULL_PAGE_THRESHOLD {
                    offset += PAGE_SIZE;
                    continue;
                }
                return Ok(());
            }

            for job_id in fresh {
                if Instant::now() >= deadline {
                    info!("budget for {:?} in {:?} exhausted", position, location);
                    return Ok(());
                }
                self.handle_job(job_id).await;
            }

            offset += PAGE_SIZE;
        }
    }

    /// Process one job and write its ledger row, containing any failure.
    async fn handle_job(&mut self, job_id: u64) {
        self.seen.insert(job_id);

        let report = match self.process_job(job_id).await {
            Ok(r) => r,
            Err(e) => {
                warn!("job {}: {}", job_id, e);
                JobReport {
                    title: String::new(),
                    company: String::new(),
                    outcome: JobOutcome::Failed(e.to_string()),
                }
            }
        };

        info!(
            "job {} ({:?} at {:?}): {}",
            job_id, report.title, report.company, report.outcome
        );
        self.ledger.append(&LedgerRecord::now(
            job_id,
            &report.title,
            &report.company,
            report.outcome.attempted(),
            report.outcome.submitted(),
        ));

        if report.outcome.submitted() {
            self.submissions += 1;
            if self.submissions % self.config.cooldown_every as usize == 0 {
                info!("cooling down after {} submissions 🧊", self.submissions);
                jitter_sleep(COOLDOWN_MS.0, COOLDOWN_MS.1).await;
                // Nudge the page so the long pause does not read as idle.
                if let Err(e) = self.session.scroll_by(350).await {
                    debug!("post-cooldown scroll failed: {}", e);
                }
                let _ = self.session.scroll_by(-350).await;
            }
        }
    }

    /// Open a job page, run the blacklist and quick-apply checks, and drive
    /// the wizard. Errors after the apply button was confirmed are folded into
    /// `JobOutcome::Failed`; errors before it propagate.
    async fn process_job(&mut self, job_id: u64) -> Result<JobReport, SessionError> {
        self.session
            .navigate(&format!("{JOB_BASE}{job_id}/"))
            .await?;
        jitter_sleep(1700, 3200).await;
        self.session.scroll_to_top().await?;

        let (title, company) = split_page_title(&self.session.page_title().await?);
        let report = |outcome| JobReport {
            title: title.clone(),
            company: company.clone(),
            outcome,
        };

        if matches(&self.company_blacklist, &company) {
            return Ok(report(JobOutcome::CompanyBlacklisted));
        }

        let apply = ElementRef::first(locators::QUICK_APPLY);
        if self.session.count(&apply).await == 0 || !self.session.is_displayed(&apply).await {
            return Ok(report(JobOutcome::NoQuickApply));
        }

        if matches(&self.title_blacklist, &title) {
            return Ok(report(JobOutcome::TitleBlacklisted));
        }

        // Clear any overlay sitting on the apply button before clicking.
        self.session.press_escape().await?;
        self.session.click(&apply).await?;
        jitter_sleep(900, 1800).await;

        let mut wizard = Wizard::new(
            self.session,
            &self.classifier,
            &mut self.answers,
            &self.error_log,
            &self.uploads,
            &self.config.screenshot_dir,
            WizardConfig::default(),
        );
        let outcome = match wizard.run(job_id).await {
            Ok(WizardOutcome::Submitted) => JobOutcome::Submitted,
            Ok(WizardOutcome::Abandoned(reason)) => JobOutcome::Abandoned(reason),
            Err(e) => JobOutcome::Failed(e.to_string()),
        };
        if let JobOutcome::Abandoned(AbandonReason::ValidationError) = outcome {
            // Close the half-finished dialog so the next job starts clean.
            if let Err(e) = self.session.press_escape().await {
                warn!("job {}: could not dismiss wizard: {}", job_id, e);
            }
        }
        Ok(report(outcome))
    }

    /// Walk the results pane downward so the lazy list materializes every card.
    async fn lazy_scroll_results(&self) {
        let pane = ElementRef::first(locators::SEARCH_RESULTS);
        if self.session.count(&pane).await == 0 {
            return;
        }
        for y in (300..3000).step_by(100) {
            if let Err(e) = self.session.scroll_within(&pane, y).await {
                debug!("results scroll stopped at {}: {}", y, e);
                break;
            }
            jitter_sleep(20, 80).await;
        }
    }
}

fn build_matcher(patterns: &[String]) -> Result<Option<AhoCorasick>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    Ok(Some(AhoCorasick::new(patterns)?))
}

fn matches(matcher: &Option<AhoCorasick>, haystack: &str) -> bool {
    matcher.as_ref().is_some_and(|m| m.is_match(haystack))
}

/// Results URL for one combo at one offset, quick-apply filter always on.
fn search_url(position: &str, location: &str, offset: usize, experience: &[u8]) -> String {
    let mut url = format!(
        "{SEARCH_BASE}?f_AL=true&keywords={}&location={}&start={}",
        utf8_percent_encode(position, NON_ALPHANUMERIC),
        utf8_percent_encode(location, NON_ALPHANUMERIC),
        offset
    );
    if !experience.is_empty() {
        let codes: Vec<String> = experience.iter().map(u8::to_string).collect();
        url.push_str("&f_E=");
        url.push_str(&codes.join("%2C"));
    }
    url
}

/// All job ids on a results page, in document order, first occurrence wins.
fn extract_job_ids(html: &str) -> Vec<u64> {
    let Ok(selector) = Selector::parse(locators::JOB_CARDS) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for card in doc.select(&selector) {
        if let Some(id) = card
            .value()
            .attr(locators::JOB_ID_ATTR)
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Split the job page's document title into (job title, company). The site
/// renders it as `"<job> | <company> | <site>"`; missing segments degrade to
/// empty strings.
fn split_page_title(page_title: &str) -> (String, String) {
    let mut parts = page_title.split(" | ").map(str::trim);
    let title = parts.next().unwrap_or_default().to_string();
    let company = parts.next().unwrap_or_default().to_string();
    (title, company)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_encodes_and_paginates() {
        let url = search_url("Rust Engineer", "São Paulo, Brazil", 50, &[2, 3]);
        assert!(url.starts_with(SEARCH_BASE));
        assert!(url.contains("keywords=Rust%20Engineer"));
        assert!(url.contains("location=S%C3%A3o%20Paulo%2C%20Brazil"));
        assert!(url.contains("start=50"));
        assert!(url.ends_with("&f_E=2%2C3"));
        assert!(url.contains("f_AL=true"));
    }

    #[test]
    fn search_url_omits_empty_experience_filter() {
        let url = search_url("dev", "remote", 0, &[]);
        assert!(!url.contains("f_E="));
    }

    #[test]
    fn job_ids_extracted_in_order_without_duplicates() {
        let html = r#"
            <div class="results">
                <div data-job-id="111"></div>
                <div data-job-id="222"></div>
                <div data-job-id="111"></div>
                <div data-job-id="not-a-number"></div>
                <div data-job-id="333"></div>
            </div>"#;
        assert_eq!(extract_job_ids(html), vec![111, 222, 333]);
    }

    #[test]
    fn no_cards_yields_empty() {
        assert!(extract_job_ids("<html><body><p>No results</p></body></html>").is_empty());
    }

    #[test]
    fn page_title_splits_into_job_and_company() {
        let (title, company) = split_page_title("Senior Rust Engineer | Acme Corp | LinkedIn");
        assert_eq!(title, "Senior Rust Engineer");
        assert_eq!(company, "Acme Corp");

        let (title, company) = split_page_title("Untitled");
        assert_eq!(title, "Untitled");
        assert_eq!(company, "");
    }

    #[test]
    fn blacklist_matcher_is_substring_containment() {
        let m = build_matcher(&["Recruiting".into(), "Staffing".into()]).unwrap();
        assert!(matches(&m, "Acme Staffing Solutions"));
        assert!(!matches(&m, "Acme Software"));
        // Case-sensitive on purpose.
        assert!(!matches(&m, "acme staffing"));
        assert!(!matches(&build_matcher(&[]).unwrap(), "anything"));
    }
}
