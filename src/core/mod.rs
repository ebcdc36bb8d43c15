pub mod config;
pub mod wait;

pub use config::{BotConfig, Credentials, DocumentKind};
pub use wait::wait_until;
