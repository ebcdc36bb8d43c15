//! The application wizard state machine.
//!
//! The dialog is a short sequence of steps, each with question groups, maybe
//! a document upload, and one advancing button (continue / review / submit).
//! We never track which step we are on — every iteration re-reads the page:
//! answer what is visible, push files at any upload inputs, then scan for an
//! action in fixed priority order. Clicking "submit" is the only success exit;
//! everything else ends in an abandon with a diagnostic screenshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::apply::classifier::Classifier;
use crate::apply::filler;
use crate::apply::{AbandonReason, WizardOutcome};
use crate::browser::{locators, BrowserSession, ElementRef, SessionError};
use crate::core::config::DocumentKind;
use crate::core::wait::{jitter_sleep, wait_until};
use crate::store::{AnswerStore, ErrorLog};

/// Error strings that mean a required question is unanswered. Any other
/// validation text is treated as recoverable by refilling the step.
const MUST_ANSWER_MARKERS: &[&str] = &["please enter a valid answer", "must answer"];

/// Advancing controls, scanned in this order every iteration.
const ACTIONS: &[Action] = &[Action::Next, Action::Review, Action::Follow, Action::Submit];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Next,
    Review,
    /// "Follow company" toggle: clicked when present but never counted as
    /// progress — scanning continues within the same iteration.
    Follow,
    Submit,
}

impl Action {
    fn selector(self) -> &'static str {
        match self {
            Action::Next => locators::NEXT,
            Action::Review => locators::REVIEW,
            Action::Follow => locators::FOLLOW,
            Action::Submit => locators::SUBMIT,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Action::Next => "next",
            Action::Review => "review",
            Action::Follow => "follow",
            Action::Submit => "submit",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WizardConfig {
    /// Hard cap on wizard iterations; a dialog that never terminates is
    /// abandoned rather than looped on forever.
    pub max_steps: usize,
    /// How long to wait for the loader to clear and a button to be clickable.
    pub action_timeout: Duration,
    pub poll: Duration,
    /// Bounds for the humanizing pause after each click, in milliseconds.
    pub jitter_ms: (u64, u64),
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            max_steps: 30,
            action_timeout: Duration::from_secs(10),
            poll: Duration::from_millis(500),
            jitter_ms: (1100, 2600),
        }
    }
}

/// One wizard run over an already-opened application dialog.
pub struct Wizard<'a> {
    session: &'a dyn BrowserSession,
    classifier: &'a Classifier,
    answers: &'a mut AnswerStore,
    error_log: &'a ErrorLog,
    uploads: &'a BTreeMap<DocumentKind, PathBuf>,
    screenshot_dir: &'a Path,
    config: WizardConfig,
}

impl<'a> Wizard<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: &'a dyn BrowserSession,
        classifier: &'a Classifier,
        answers: &'a mut AnswerStore,
        error_log: &'a ErrorLog,
        uploads: &'a BTreeMap<DocumentKind, PathBuf>,
        screenshot_dir: &'a Path,
        config: WizardConfig,
    ) -> Self {
        Self {
            session,
            classifier,
            answers,
            error_log,
            uploads,
            screenshot_dir,
            config,
        }
    }

    /// Drive the dialog to a terminal state. Session errors capture a
    /// diagnostic screenshot before propagating.
    pub async fn run(&mut self, job_id: u64) -> Result<WizardOutcome, SessionError> {
        match self.drive(job_id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.capture(job_id, "session-error").await;
                Err(e)
            }
        }
    }

    async fn drive(&mut self, job_id: u64) -> Result<WizardOutcome, SessionError> {
        for step in 0..self.config.max_steps {
            debug!("wizard iteration {} for job {}", step, job_id);
            self.process_questions().await;
            self.attempt_uploads(job_id).await;

            let mut advanced = false;
            for &action in ACTIONS {
                let button = ElementRef::first(action.selector());
                if self.session.count(&button).await == 0 {
                    continue;
                }

                if action != Action::Follow {
                    match self.validation_state().await {
                        Validation::MustAnswer => {
                            warn!("job {}: unanswerable required question, abandoning", job_id);
                            self.capture(job_id, "validation-error").await;
                            return Ok(WizardOutcome::Abandoned(AbandonReason::ValidationError));
                        }
                        Validation::Recoverable => {
                            debug!("job {}: validation text present, refilling step", job_id);
                            self.process_questions().await;
                        }
                        Validation::Clean => {}
                    }
                }

                if !self.ready(&button).await {
                    debug!("job {}: {} button never became clickable", job_id, action.label());
                    continue;
                }

                if action == Action::Follow {
                    // Side action; a failure here must not cost the application.
                    if let Err(e) = self.session.click(&button).await {
                        warn!("job {}: could not toggle follow: {}", job_id, e);
                    }
                    continue;
                }

                self.session.click(&button).await?;
                info!("job {}: clicked {}", job_id, action.label());
                jitter_sleep(self.config.jitter_ms.0, self.config.jitter_ms.1).await;

                if action == Action::Submit {
                    return Ok(WizardOutcome::Submitted);
                }
                advanced = true;
                break;
            }

            if !advanced {
                warn!("job {}: no advancing control found, abandoning", job_id);
                self.capture(job_id, "no-action").await;
                return Ok(WizardOutcome::Abandoned(AbandonReason::NoActionAvailable));
            }
        }

        warn!(
            "job {}: still no submit after {} iterations, abandoning",
            job_id, self.config.max_steps
        );
        self.capture(job_id, "step-limit").await;
        Ok(WizardOutcome::Abandoned(AbandonReason::StepLimit))
    }

    /// Answer every visible question group. Failures are per-group: a group
    /// we cannot read or fill is logged and skipped.
    async fn process_questions(&mut self) {
        let groups = ElementRef::first(locators::FIELD_GROUPS);
        let n = self.session.count(&groups).await;
        for i in 0..n {
            let region = ElementRef::at(locators::FIELD_GROUPS, i);
            let question = match self.session.text(&region).await {
                Ok(t) => match first_line(&t) {
                    Some(q) => q.to_string(),
                    None => continue,
                },
                Err(e) => {
                    warn!("could not read question group {}: {}", region, e);
                    continue;
                }
            };

            let answer = self.classifier.classify(self.answers, &question).await;
            if !filler::fill_region(self.session, &region, &answer).await {
                let markup = self
                    .session
                    .outer_html(&region)
                    .await
                    .unwrap_or_else(|_| String::from("<unavailable>"));
                warn!("no control accepted an answer for {:?}", question);
                self.error_log.record(&question, &markup);
            }
        }
    }

    /// Push configured documents at whatever upload inputs the step shows:
    /// the kind-specific input when present, the generic file input otherwise.
    async fn attempt_uploads(&self, job_id: u64) {
        for (kind, path) in self.uploads {
            let specific = match kind {
                DocumentKind::Resume => Some(ElementRef::first(locators::RESUME_UPLOAD)),
                DocumentKind::CoverLetter => {
                    Some(ElementRef::first(locators::COVER_LETTER_UPLOAD))
                }
                DocumentKind::Other(_) => None,
            };

            let target = match specific {
                Some(t) if self.session.count(&t).await > 0 => t,
                _ => {
                    let generic = ElementRef::first(locators::UPLOAD);
                    if self.session.count(&generic).await == 0 {
                        continue;
                    }
                    generic
                }
            };

            match self.session.upload(&target, path).await {
                Ok(()) => info!("job {}: uploaded {} from {}", job_id, kind, path.display()),
                Err(e) => {
                    warn!("job {}: upload of {} failed: {}", job_id, kind, e);
                    self.capture(job_id, "upload-failed").await;
                }
            }
        }
    }

    /// Classify the step's inline validation messages.
    async fn validation_state(&self) -> Validation {
        let errors = ElementRef::first(locators::ERROR);
        let n = self.session.count(&errors).await;
        if n == 0 {
            return Validation::Clean;
        }
        for i in 0..n {
            let msg = self
                .session
                .text(&ElementRef::at(locators::ERROR, i))
                .await
                .unwrap_or_default()
                .to_lowercase();
            if MUST_ANSWER_MARKERS.iter().any(|m| msg.contains(m)) {
                return Validation::MustAnswer;
            }
        }
        Validation::Recoverable
    }

    /// Gate an action button: loader gone and the button itself clickable.
    async fn ready(&self, button: &ElementRef) -> bool {
        let loader = ElementRef::first(locators::LOADER);
        wait_until(self.config.poll, self.config.action_timeout, || {
            let loader = loader.clone();
            let button = button.clone();
            async move {
                !self.session.is_displayed(&loader).await
                    && self.session.is_clickable(&button).await
            }
        })
        .await
    }

    /// Best-effort diagnostic screenshot; never fails the caller.
    async fn capture(&self, job_id: u64, label: &str) {
        let name = format!(
            "{}_{}_{}.png",
            Local::now().format("%Y%m%d_%H%M%S"),
            job_id,
            label
        );
        let path = self.screenshot_dir.join(name);
        if let Err(e) = self.session.screenshot(&path).await {
            warn!("could not capture screenshot {}: {}", path.display(), e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Validation {
    Clean,
    /// Error text present, but refilling the step might clear it.
    Recoverable,
    /// A required question is flagged unanswered; clicking would be futile.
    MustAnswer,
}

/// First non-empty line of a question group's text — the prompt, without the
/// control labels that follow it.
fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|l| !l.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_skips_leading_blanks() {
        assert_eq!(
            first_line("\n  \nHow many years of Go?\nYes\nNo"),
            Some("How many years of Go?")
        );
        assert_eq!(first_line("   \n\t\n"), None);
    }

    #[test]
    fn action_scan_order_puts_submit_last() {
        assert_eq!(ACTIONS.first(), Some(&Action::Next));
        assert_eq!(ACTIONS.last(), Some(&Action::Submit));
        let follow = ACTIONS.iter().position(|a| *a == Action::Follow).unwrap();
        let submit = ACTIONS.iter().position(|a| *a == Action::Submit).unwrap();
        assert!(follow < submit, "follow must be toggled before submitting");
    }
}
