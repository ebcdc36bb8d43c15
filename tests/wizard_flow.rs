//! End-to-end wizard flows against a scripted session: advancing, follow
//! toggling, validation handling, uploads, and answer persistence.

mod common;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use applyscout::apply::classifier::{AnswerContext, Classifier};
use applyscout::apply::{AbandonReason, WizardOutcome};
use applyscout::browser::locators;
use applyscout::{AnswerStore, DocumentKind, ErrorLog, Wizard, WizardConfig};

use common::{scoped, FakePage, FakeSession};

struct Fixture {
    dir: tempfile::TempDir,
    answers: AnswerStore,
    error_log: ErrorLog,
    uploads: BTreeMap<DocumentKind, PathBuf>,
    classifier: Classifier,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let answers = AnswerStore::load(&dir.path().join("qa.csv"));
        let error_log = ErrorLog::new(&dir.path().join("qa_errors.csv"));
        let classifier = Classifier::new(AnswerContext {
            salary: "95000".into(),
            phone_number: Some("555-0123".into()),
        })
        .with_unanswered_pause(Duration::ZERO);
        Self {
            dir,
            answers,
            error_log,
            uploads: BTreeMap::new(),
            classifier,
        }
    }

    fn with_resume(mut self) -> Self {
        let path = self.dir.path().join("resume.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        self.uploads.insert(DocumentKind::Resume, path);
        self
    }

    async fn run(&mut self, session: &FakeSession) -> WizardOutcome {
        let config = WizardConfig {
            max_steps: 10,
            action_timeout: Duration::from_millis(100),
            poll: Duration::from_millis(10),
            jitter_ms: (0, 0),
        };
        let mut wizard = Wizard::new(
            session,
            &self.classifier,
            &mut self.answers,
            &self.error_log,
            &self.uploads,
            self.dir.path(),
            config,
        );
        wizard.run(42).await.expect("wizard run")
    }
}

#[tokio::test]
async fn single_step_dialog_submits() {
    let session = FakeSession::new(vec![FakePage::new().with_button(locators::SUBMIT)]);
    let mut fx = Fixture::new();
    assert_eq!(fx.run(&session).await, WizardOutcome::Submitted);
    assert_eq!(session.recorded().clicks, vec![(locators::SUBMIT.to_string(), 0)]);
}

#[tokio::test]
async fn follow_is_toggled_then_submit_clicked_in_same_iteration() {
    let session = FakeSession::new(vec![FakePage::new()
        .with_button(locators::FOLLOW)
        .with_button(locators::SUBMIT)]);
    let mut fx = Fixture::new();
    assert_eq!(fx.run(&session).await, WizardOutcome::Submitted);
    let clicks = session.recorded().clicks.clone();
    assert_eq!(
        clicks,
        vec![
            (locators::FOLLOW.to_string(), 0),
            (locators::SUBMIT.to_string(), 0),
        ],
        "follow must be a side action, not a step"
    );
}

#[tokio::test]
async fn three_step_dialog_walks_next_review_submit() {
    let session = FakeSession::new(vec![
        FakePage::new().with_button(locators::NEXT),
        FakePage::new().with_button(locators::REVIEW),
        FakePage::new().with_button(locators::SUBMIT),
    ]);
    let mut fx = Fixture::new();
    assert_eq!(fx.run(&session).await, WizardOutcome::Submitted);
    let recorded = session.recorded();
    let clicks: Vec<&str> = recorded.clicks.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(clicks, vec![locators::NEXT, locators::REVIEW, locators::SUBMIT]);
}

#[tokio::test]
async fn numeric_question_is_answered_and_cached() {
    let question = "How many years of experience do you have with Rust?";
    let numeric_key = scoped(locators::FIELD_GROUPS, 0, locators::NUMERIC);
    let session = FakeSession::new(vec![
        FakePage::new()
            .with_group(0, question)
            .with_count(&numeric_key, 1)
            .with_button(locators::NEXT),
        FakePage::new().with_button(locators::SUBMIT),
    ]);

    let mut fx = Fixture::new();
    assert_eq!(fx.run(&session).await, WizardOutcome::Submitted);
    assert!(session
        .recorded()
        .typed
        .contains(&(numeric_key, "1".to_string())));
    assert_eq!(fx.answers.lookup(question), Some("1"));
}

#[tokio::test]
async fn radio_option_matching_answer_value_is_clicked() {
    let question = "Are you legally authorized to work in the United States?";
    let radio_key = scoped(locators::FIELD_GROUPS, 0, locators::RADIO);
    let session = FakeSession::new(vec![FakePage::new()
        .with_group(0, question)
        .with_count(&radio_key, 2)
        .with_attr(&radio_key, 0, "value", "No")
        .with_attr(&radio_key, 1, "value", "Yes")
        .with_button(locators::SUBMIT)]);

    let mut fx = Fixture::new();
    assert_eq!(fx.run(&session).await, WizardOutcome::Submitted);
    assert!(
        session.recorded().clicks.contains(&(radio_key, 1)),
        "the 'Yes' radio should be clicked"
    );
}

#[tokio::test]
async fn dropdown_without_matching_option_falls_back_to_first_real_one() {
    let question = "What is your preferred working language?";
    let select_key = scoped(locators::FIELD_GROUPS, 0, locators::SELECT);
    let session = FakeSession::new(vec![FakePage::new()
        .with_group(0, question)
        .with_count(&select_key, 1)
        .with_options(&select_key, &["Select an option", "English", "French"])
        .with_button(locators::SUBMIT)]);

    let mut fx = Fixture::new();
    assert_eq!(fx.run(&session).await, WizardOutcome::Submitted);
    assert_eq!(
        session.recorded().selected,
        vec![(select_key, 1)],
        "fallback must land on the first non-placeholder option"
    );
}

#[tokio::test]
async fn must_answer_validation_aborts_without_clicking() {
    let session = FakeSession::new(vec![
        FakePage::new()
            .with_button(locators::NEXT)
            .with_count(locators::ERROR, 1)
            .with_text(locators::ERROR, 0, "Please enter a valid answer"),
        FakePage::new().with_button(locators::SUBMIT),
    ]);

    let mut fx = Fixture::new();
    assert_eq!(
        fx.run(&session).await,
        WizardOutcome::Abandoned(AbandonReason::ValidationError)
    );
    let recorded = session.recorded();
    assert!(recorded.clicks.is_empty(), "no button may be clicked past a hard error");
    assert_eq!(recorded.screenshots.len(), 1, "abort must leave a diagnostic screenshot");
}

#[tokio::test]
async fn recoverable_validation_refills_the_step_and_advances() {
    let question = "How many years of experience do you have with SQL?";
    let numeric_key = scoped(locators::FIELD_GROUPS, 0, locators::NUMERIC);
    let session = FakeSession::new(vec![
        FakePage::new()
            .with_group(0, question)
            .with_count(&numeric_key, 1)
            .with_button(locators::NEXT)
            .with_count(locators::ERROR, 1)
            .with_text(locators::ERROR, 0, "File upload failed, try again"),
        FakePage::new().with_button(locators::SUBMIT),
    ]);

    let mut fx = Fixture::new();
    assert_eq!(fx.run(&session).await, WizardOutcome::Submitted);
    let typed = session.recorded().typed.clone();
    assert_eq!(
        typed.iter().filter(|(k, _)| *k == numeric_key).count(),
        2,
        "soft validation should trigger one refill of the step"
    );
}

#[tokio::test]
async fn step_with_no_action_abandons_with_screenshot() {
    let session = FakeSession::new(vec![FakePage::new()]);
    let mut fx = Fixture::new();
    assert_eq!(
        fx.run(&session).await,
        WizardOutcome::Abandoned(AbandonReason::NoActionAvailable)
    );
    assert_eq!(session.recorded().screenshots.len(), 1);
}

#[tokio::test]
async fn persistent_loader_blocks_the_action() {
    let session = FakeSession::new(vec![
        FakePage::new()
            .with_button(locators::NEXT)
            .with_count(locators::LOADER, 1),
        FakePage::new().with_button(locators::SUBMIT),
    ]);

    let mut fx = Fixture::new();
    assert_eq!(
        fx.run(&session).await,
        WizardOutcome::Abandoned(AbandonReason::NoActionAvailable)
    );
    assert!(session.recorded().clicks.is_empty());
}

#[tokio::test]
async fn dialog_that_never_terminates_hits_the_step_limit() {
    // A single page whose continue button never leads anywhere.
    let session = FakeSession::new(vec![FakePage::new().with_button(locators::NEXT)]);
    let mut fx = Fixture::new();
    assert_eq!(
        fx.run(&session).await,
        WizardOutcome::Abandoned(AbandonReason::StepLimit)
    );
    assert_eq!(session.recorded().clicks.len(), 10);
}

#[tokio::test]
async fn resume_goes_to_the_dedicated_upload_input() {
    let session = FakeSession::new(vec![FakePage::new()
        .with_count(locators::RESUME_UPLOAD, 1)
        .with_button(locators::SUBMIT)]);

    let mut fx = Fixture::new().with_resume();
    assert_eq!(fx.run(&session).await, WizardOutcome::Submitted);
    let uploads = session.recorded().uploads.clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, locators::RESUME_UPLOAD);
    assert!(uploads[0].1.ends_with("resume.pdf"));
}

#[tokio::test]
async fn resume_falls_back_to_the_generic_file_input() {
    let session = FakeSession::new(vec![FakePage::new()
        .with_count(locators::UPLOAD, 1)
        .with_button(locators::SUBMIT)]);

    let mut fx = Fixture::new().with_resume();
    assert_eq!(fx.run(&session).await, WizardOutcome::Submitted);
    let uploads = session.recorded().uploads.clone();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].0, locators::UPLOAD);
}

#[tokio::test]
async fn unfillable_question_lands_in_the_error_log() {
    let question = "Describe a project you are proud of.";
    let session = FakeSession::new(vec![FakePage::new()
        .with_group(0, question)
        .with_button(locators::SUBMIT)]);

    let mut fx = Fixture::new();
    assert_eq!(fx.run(&session).await, WizardOutcome::Submitted);

    let log = std::fs::read_to_string(fx.dir.path().join("qa_errors.csv")).unwrap();
    assert!(log.contains(question), "unfillable question must be logged: {log}");
}
