//! The application pipeline: sign-in, search, and the per-job apply flow.
//!
//! Submodules are layered by distance from the page. [`classifier`] is pure
//! text → answer logic, [`filler`] turns answers into control manipulations,
//! [`wizard`] drives the multi-step application dialog, and [`search`] owns
//! the outer search/pagination loop that feeds jobs into the wizard.

pub mod classifier;
pub mod filler;
pub mod login;
pub mod search;
pub mod wizard;

pub use classifier::{AnswerContext, AnswerRule, Classifier, UNANSWERED_SENTINEL};
pub use search::SearchRunner;
pub use wizard::{Wizard, WizardConfig};

/// Why an application wizard was abandoned before submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    /// A step showed a must-answer validation error the filler could not clear.
    ValidationError,
    /// No advancing control (next / review / submit) was found on a step.
    NoActionAvailable,
    /// The step cap was hit without reaching the submit button.
    StepLimit,
}

impl std::fmt::Display for AbandonReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AbandonReason::ValidationError => "unresolved validation error",
            AbandonReason::NoActionAvailable => "no advancing control found",
            AbandonReason::StepLimit => "step limit reached",
        };
        f.write_str(s)
    }
}

/// Terminal state of one wizard run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardOutcome {
    Submitted,
    Abandoned(AbandonReason),
}

/// Terminal state of processing one job posting end to end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The wizard reached the submit button and clicked it.
    Submitted,
    /// The wizard opened but was walked away from.
    Abandoned(AbandonReason),
    /// The posting has no quick-apply affordance (external or closed).
    NoQuickApply,
    TitleBlacklisted,
    CompanyBlacklisted,
    /// An unexpected session error ended the attempt.
    Failed(String),
}

impl JobOutcome {
    /// True when an apply affordance existed for the job. This is what lands
    /// in the ledger's `attempted` column. The title blacklist is only
    /// consulted after the quick-apply button was confirmed, so a
    /// title-blacklisted job still counts; the company blacklist fires before
    /// the probe and does not.
    pub fn attempted(&self) -> bool {
        matches!(
            self,
            JobOutcome::Submitted
                | JobOutcome::Abandoned(_)
                | JobOutcome::TitleBlacklisted
                | JobOutcome::Failed(_)
        )
    }

    pub fn submitted(&self) -> bool {
        matches!(self, JobOutcome::Submitted)
    }
}

impl std::fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobOutcome::Submitted => f.write_str("submitted"),
            JobOutcome::Abandoned(reason) => write!(f, "abandoned: {reason}"),
            JobOutcome::NoQuickApply => f.write_str("no quick-apply button"),
            JobOutcome::TitleBlacklisted => f.write_str("title blacklisted"),
            JobOutcome::CompanyBlacklisted => f.write_str("company blacklisted"),
            JobOutcome::Failed(msg) => write!(f, "failed: {msg}"),
        }
    }
}
