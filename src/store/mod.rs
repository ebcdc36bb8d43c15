//! Durable state: the answer cache, the applications ledger, and the side
//! error log. All three are plain CSV files with best-effort durability —
//! a store that cannot be read falls back to empty, a store that cannot be
//! written logs and moves on. Nothing in here is ever allowed to kill a run.

pub mod answers;
pub mod error_log;
pub mod ledger;

pub use answers::AnswerStore;
pub use error_log::ErrorLog;
pub use ledger::{Ledger, LedgerRecord};
