pub mod apply;
pub mod browser;
pub mod core;
pub mod store;

// --- Primary exports ---
pub use apply::{Classifier, JobOutcome, SearchRunner, Wizard, WizardConfig};
pub use browser::{BrowserSession, ChromeSession, ElementRef, SessionError};
pub use core::{BotConfig, Credentials, DocumentKind};
pub use store::{AnswerStore, ErrorLog, Ledger, LedgerRecord};
