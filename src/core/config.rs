//! Configuration loading — `apply-scout.json` with env-var fallback.
//!
//! Every knob resolves in the same order: JSON field → environment variable →
//! built-in default. Credentials are env-only and are never written to the
//! config file or the logs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::warn;

/// Kind of document the bot can attach to an application.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DocumentKind {
    Resume,
    CoverLetter,
    /// Anything else; only ever offered to the generic upload fallback input.
    Other(String),
}

impl DocumentKind {
    /// Parse a config-file key ("resume", "cover_letter", "Cover Letter"…).
    pub fn from_key(key: &str) -> Self {
        let k = key.trim().to_lowercase().replace([' ', '-'], "_");
        match k.as_str() {
            "resume" | "cv" => DocumentKind::Resume,
            "cover_letter" => DocumentKind::CoverLetter,
            _ => DocumentKind::Other(key.trim().to_string()),
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Resume => write!(f, "resume"),
            DocumentKind::CoverLetter => write!(f, "cover letter"),
            DocumentKind::Other(k) => write!(f, "{}", k),
        }
    }
}

/// Raw shape of `apply-scout.json`. All fields optional; resolution and
/// validation happen in [`BotConfig::resolve`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub positions: Option<Vec<String>>,
    pub locations: Option<Vec<String>>,
    pub blacklist_companies: Option<Vec<String>>,
    pub blacklist_titles: Option<Vec<String>>,
    /// Site-specific experience level filter codes (1 = intern … 6 = executive).
    pub experience_levels: Option<Vec<u8>>,
    pub salary: Option<String>,
    pub phone_number: Option<String>,
    /// Document kind → file path, e.g. `{"resume": "/home/me/resume.pdf"}`.
    pub uploads: Option<BTreeMap<String, String>>,
    pub headless: Option<bool>,
    pub ledger_path: Option<String>,
    pub answers_path: Option<String>,
    pub error_log_path: Option<String>,
    pub screenshot_dir: Option<String>,
    /// Wall-clock budget per (position, location) pair, in seconds.
    pub max_search_secs: Option<u64>,
    /// Long cooldown pause after this many successful submissions.
    pub cooldown_every: Option<u32>,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub positions: Vec<String>,
    pub locations: Vec<String>,
    pub blacklist_companies: Vec<String>,
    pub blacklist_titles: Vec<String>,
    pub experience_levels: Vec<u8>,
    pub salary: String,
    pub phone_number: Option<String>,
    pub uploads: BTreeMap<DocumentKind, PathBuf>,
    pub headless: bool,
    pub ledger_path: PathBuf,
    pub answers_path: PathBuf,
    pub error_log_path: PathBuf,
    pub screenshot_dir: PathBuf,
    pub max_search_time: Duration,
    pub cooldown_every: u32,
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl BotConfig {
    /// Load and resolve configuration.
    ///
    /// `path` override → `APPLY_SCOUT_CONFIG` env var → `apply-scout.json` in
    /// the working directory. A missing file is fine (env/defaults only); a
    /// file that exists but does not parse is a hard error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file_path = path
            .map(PathBuf::from)
            .or_else(|| env_nonempty("APPLY_SCOUT_CONFIG").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("apply-scout.json"));

        let raw = if file_path.exists() {
            let content = std::fs::read_to_string(&file_path)
                .with_context(|| format!("failed to read config {}", file_path.display()))?;
            serde_json::from_str::<ConfigFile>(&content)
                .with_context(|| format!("invalid config {}", file_path.display()))?
        } else {
            warn!(
                "config file {} not found — using env vars and defaults",
                file_path.display()
            );
            ConfigFile::default()
        };

        Self::resolve(raw)
    }

    /// Apply env fallbacks and defaults, then validate.
    pub fn resolve(raw: ConfigFile) -> Result<Self> {
        let positions: Vec<String> = raw
            .positions
            .unwrap_or_default()
            .into_iter()
            .filter(|p| !p.trim().is_empty())
            .collect();
        let locations: Vec<String> = raw
            .locations
            .unwrap_or_default()
            .into_iter()
            .filter(|l| !l.trim().is_empty())
            .collect();

        if positions.is_empty() {
            bail!("config: at least one search position is required");
        }
        if locations.is_empty() {
            bail!("config: at least one search location is required");
        }

        let salary = raw
            .salary
            .filter(|s| !s.trim().is_empty())
            .or_else(|| env_nonempty("SALARY"))
            .unwrap_or_default();
        let phone_number = raw
            .phone_number
            .filter(|s| !s.trim().is_empty())
            .or_else(|| env_nonempty("PHONE_NUMBER"));

        let mut uploads = BTreeMap::new();
        for (key, value) in raw.uploads.unwrap_or_default() {
            if value.trim().is_empty() {
                bail!("config: upload entry '{}' has an empty path", key);
            }
            let path = PathBuf::from(expand_tilde(&value));
            if !path.exists() {
                bail!(
                    "config: upload file for '{}' not found: {}",
                    key,
                    path.display()
                );
            }
            uploads.insert(DocumentKind::from_key(&key), path);
        }

        let headless = raw.headless.or_else(|| {
            env_nonempty("APPLY_SCOUT_HEADLESS").map(|v| v != "0" && v.to_lowercase() != "false")
        });

        Ok(Self {
            positions,
            locations,
            blacklist_companies: raw.blacklist_companies.unwrap_or_default(),
            blacklist_titles: raw.blacklist_titles.unwrap_or_default(),
            experience_levels: raw.experience_levels.unwrap_or_default(),
            salary,
            phone_number,
            uploads,
            headless: headless.unwrap_or(false),
            ledger_path: raw
                .ledger_path
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output.csv")),
            answers_path: raw
                .answers_path
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("qa.csv")),
            error_log_path: raw
                .error_log_path
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("qa_errors.csv")),
            screenshot_dir: raw
                .screenshot_dir
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("screenshots")),
            max_search_time: Duration::from_secs(raw.max_search_secs.unwrap_or(10 * 60 * 60)),
            cooldown_every: raw.cooldown_every.unwrap_or(20).max(1),
        })
    }
}

/// Site credentials, env-only (`APPLY_SCOUT_USERNAME` / `APPLY_SCOUT_PASSWORD`).
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Returns `None` when either variable is unset — the caller may still run
    /// against an already-authenticated browser profile.
    pub fn from_env() -> Option<Self> {
        let username = env_nonempty("APPLY_SCOUT_USERNAME")?;
        let password = env_nonempty("APPLY_SCOUT_PASSWORD")?;
        Some(Self { username, password })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never leak the password through Debug formatting.
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

fn expand_tilde(raw: &str) -> String {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    raw.to_string()
}
