//! Heuristic question → answer classification.
//!
//! The engine is an ordered rule table: each rule is a predicate over the
//! lower-cased question text plus an answer producer, first match wins. The
//! ordering is load-bearing (a salary question phrased "are you open to…"
//! must hit the yes/no family before the salary rule would be wrong, etc.) so
//! the table is data, not nested conditionals — rules can be unit-tested and
//! swapped in isolation.
//!
//! The persistent answer cache is consulted before any rule runs: an exact
//! previous answer for identical question text short-circuits everything, and
//! every fresh classification is written through so each distinct question is
//! answered (and, for the sentinel case, manually resolved) at most once.

use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::store::AnswerStore;

/// Answer given when no rule matches; paired with an enforced pause so a human
/// can intervene before the wizard moves on.
pub const UNANSWERED_SENTINEL: &str = "user provided";

/// How long to hold the run when a question could not be answered.
pub const DEFAULT_UNANSWERED_PAUSE: Duration = Duration::from_secs(15);

/// Values the classifier may substitute into answers.
#[derive(Debug, Clone, Default)]
pub struct AnswerContext {
    pub salary: String,
    pub phone_number: Option<String>,
}

/// One heuristic rule: a predicate over the lower-cased question and a
/// producer. A producer returning `None` declines the match (used by the
/// phone rule when no number is configured) and evaluation moves on.
pub struct AnswerRule {
    pub name: &'static str,
    applies: fn(&str) -> bool,
    produce: fn(&str, &AnswerContext) -> Option<String>,
}

impl AnswerRule {
    pub fn new(
        name: &'static str,
        applies: fn(&str) -> bool,
        produce: fn(&str, &AnswerContext) -> Option<String>,
    ) -> Self {
        Self {
            name,
            applies,
            produce,
        }
    }

    pub fn evaluate(&self, question_lower: &str, ctx: &AnswerContext) -> Option<String> {
        if (self.applies)(question_lower) {
            (self.produce)(question_lower, ctx)
        } else {
            None
        }
    }
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").expect("valid number pattern"))
}

/// First integer embedded in the question, if any.
fn extract_number(question: &str) -> Option<String> {
    number_re().find(question).map(|m| m.as_str().to_string())
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// The built-in rule table, in evaluation order.
///
/// Note on the yes/no family: every "do you / have you / are you / can you"
/// style question is answered affirmatively with no semantic negation
/// handling. A negatively phrased disqualifier gets "Yes" too. That is the
/// established policy for this table, kept deliberately — changing it needs a
/// product decision, not a code fix.
pub fn default_rules() -> Vec<AnswerRule> {
    vec![
        AnswerRule::new(
            "experience-count",
            |q| contains_any(q, &["how many", "experience"]),
            |q, _| Some(extract_number(q).unwrap_or_else(|| "1".to_string())),
        ),
        AnswerRule::new("sponsorship", |q| q.contains("sponsor"), |_, _| {
            Some("No".to_string())
        }),
        AnswerRule::new(
            "affirmative-family",
            |q| {
                contains_any(
                    q,
                    &["do you", "have you", "are you", "can you", "us citizen", "legally"],
                )
            },
            |_, _| Some("Yes".to_string()),
        ),
        AnswerRule::new("salary", |q| q.contains("salary"), |_, ctx| {
            Some(ctx.salary.clone())
        }),
        AnswerRule::new("gender", |q| q.contains("gender"), |_, _| {
            Some("Male".to_string())
        }),
        AnswerRule::new(
            "demographic-non-disclosure",
            |q| contains_any(q, &["race", "lgbtq", "ethnicity", "nationality"]),
            |_, _| Some("Wish not to answer".to_string()),
        ),
        AnswerRule::new(
            "government-status-non-disclosure",
            |q| contains_any(q, &["government", "veteran", "disability"]),
            |_, _| Some("I do not wish to self-identify".to_string()),
        ),
        AnswerRule::new("phone-number", |q| q.contains("phone"), |_, ctx| {
            ctx.phone_number.clone()
        }),
    ]
}

/// Cache-first heuristic classifier.
pub struct Classifier {
    rules: Vec<AnswerRule>,
    ctx: AnswerContext,
    unanswered_pause: Duration,
}

impl Classifier {
    pub fn new(ctx: AnswerContext) -> Self {
        Self {
            rules: default_rules(),
            ctx,
            unanswered_pause: DEFAULT_UNANSWERED_PAUSE,
        }
    }

    /// Replace the rule table (tests, site-specific overrides).
    pub fn with_rules(mut self, rules: Vec<AnswerRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Override the manual-intervention pause.
    pub fn with_unanswered_pause(mut self, pause: Duration) -> Self {
        self.unanswered_pause = pause;
        self
    }

    /// Classify one question, consulting and updating the answer store.
    ///
    /// Identical question text always yields the identical answer within a
    /// run: the first classification is persisted and every later call is a
    /// cache hit that skips rule evaluation entirely.
    pub async fn classify(&self, store: &mut AnswerStore, question: &str) -> String {
        if let Some(cached) = store.lookup(question) {
            debug!("answer cache hit: {:?}", question);
            return cached.to_string();
        }

        let lower = question.to_lowercase();
        let mut matched: Option<(&'static str, String)> = None;
        for rule in &self.rules {
            if let Some(answer) = rule.evaluate(&lower, &self.ctx) {
                matched = Some((rule.name, answer));
                break;
            }
        }

        let answer = match matched {
            Some((name, answer)) => {
                info!("answering {:?} with {:?} (rule: {})", question, answer, name);
                answer
            }
            None => {
                warn!(
                    "no rule matched {:?} — using sentinel and pausing {:?} for manual input",
                    question, self.unanswered_pause
                );
                tokio::time::sleep(self.unanswered_pause).await;
                UNANSWERED_SENTINEL.to_string()
            }
        };

        store.record(question, &answer);
        answer
    }
}
