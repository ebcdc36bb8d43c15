//! The browser automation boundary.
//!
//! Everything the bot observes or does in the outside world goes through the
//! [`BrowserSession`] trait: find elements, read text/attributes, click, type,
//! scroll, upload, screenshot. The rest of the crate never touches
//! `chromiumoxide` directly — it receives a `&dyn BrowserSession` handle, which
//! keeps the form-filling logic testable against a scripted fake and keeps the
//! vendor-UI glue in one place.
//!
//! Element addressing is positional: an [`ElementRef`] names the `index`-th
//! match of a CSS selector, optionally scoped to the `index`-th match of a
//! containing selector. That is exactly the granularity the form filler needs
//! (the n-th radio input inside the n-th question group) without exposing live
//! element handles across the trait boundary.

pub mod chrome;
pub mod locators;

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub use chrome::ChromeSession;

/// Errors surfaced by a browser session implementation.
///
/// Read-only probes (`count`, `is_displayed`, `is_clickable`) intentionally do
/// not return this type — a probe that cannot be answered degrades to
/// "absent" / "not ready" rather than raising.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("element not found: {0}")]
    NotFound(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("browser call failed: {0}")]
    Browser(String),

    #[error("upload of {path} failed: {message}")]
    Upload { path: String, message: String },

    #[error("screenshot failed: {0}")]
    Screenshot(String),
}

/// Positional address of one element on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    /// Optional containing element: (selector, match index).
    pub scope: Option<(String, usize)>,
    /// CSS selector evaluated under the scope (or the document root).
    pub selector: String,
    /// Which match of `selector` this refers to.
    pub index: usize,
}

impl ElementRef {
    /// First match of `selector` at document level.
    pub fn first(selector: impl Into<String>) -> Self {
        Self {
            scope: None,
            selector: selector.into(),
            index: 0,
        }
    }

    /// `index`-th match of `selector` at document level.
    pub fn at(selector: impl Into<String>, index: usize) -> Self {
        Self {
            scope: None,
            selector: selector.into(),
            index,
        }
    }

    /// First match of `selector` inside this element.
    ///
    /// Only one level of scoping is supported; calling `child` on an already
    /// scoped ref re-roots at that ref's own selector, which is all the form
    /// filler ever needs (question group → control).
    pub fn child(&self, selector: impl Into<String>) -> Self {
        Self {
            scope: Some((self.selector.clone(), self.index)),
            selector: selector.into(),
            index: 0,
        }
    }

    /// Same address, different match index.
    pub fn nth(mut self, index: usize) -> Self {
        self.index = index;
        self
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.scope {
            Some((s, i)) => write!(f, "{}[{}] {}[{}]", s, i, self.selector, self.index),
            None => write!(f, "{}[{}]", self.selector, self.index),
        }
    }
}

/// Capability interface over one live browser page.
///
/// Implementations must be usable behind `&dyn BrowserSession` — all waiting
/// is done by the caller via [`crate::core::wait::wait_until`], so every method
/// here is a single observation or action, never a retry loop.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    // ── Navigation & page state ──────────────────────────────────────────────

    async fn navigate(&self, url: &str) -> Result<(), SessionError>;
    async fn current_url(&self) -> Result<String, SessionError>;
    async fn page_title(&self) -> Result<String, SessionError>;
    /// Full serialized DOM of the current page.
    async fn page_html(&self) -> Result<String, SessionError>;

    // ── Element probes (degrade, never fail) ─────────────────────────────────

    /// Number of matches for the target's selector within its scope.
    async fn count(&self, target: &ElementRef) -> usize;
    /// Visible in the layout (non-zero box, not `display:none`).
    async fn is_displayed(&self, target: &ElementRef) -> bool;
    /// Visible, enabled, and not geometrically obscured by an overlay.
    async fn is_clickable(&self, target: &ElementRef) -> bool;

    // ── Element reads ────────────────────────────────────────────────────────

    async fn text(&self, target: &ElementRef) -> Result<String, SessionError>;
    async fn attribute(
        &self,
        target: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError>;
    async fn outer_html(&self, target: &ElementRef) -> Result<String, SessionError>;
    /// Checked state of a checkbox/radio input.
    async fn is_checked(&self, target: &ElementRef) -> Result<bool, SessionError>;
    /// Visible text of each `<option>` in a select, in document order.
    async fn option_texts(&self, target: &ElementRef) -> Result<Vec<String>, SessionError>;

    // ── Element actions ──────────────────────────────────────────────────────

    async fn click(&self, target: &ElementRef) -> Result<(), SessionError>;
    async fn type_into(&self, target: &ElementRef, text: &str) -> Result<(), SessionError>;
    /// Clear the current value, then type `text`.
    async fn clear_and_type(&self, target: &ElementRef, text: &str) -> Result<(), SessionError>;
    /// Select the `index`-th `<option>` of a select and fire change events.
    async fn select_by_index(&self, target: &ElementRef, index: usize)
        -> Result<(), SessionError>;
    /// Attach a local file to a file input.
    async fn upload(&self, target: &ElementRef, path: &Path) -> Result<(), SessionError>;

    // ── Page-level actions ───────────────────────────────────────────────────

    async fn scroll_by(&self, delta_y: i64) -> Result<(), SessionError>;
    async fn scroll_to_top(&self) -> Result<(), SessionError>;
    /// Scroll inside a scrollable container (e.g. a results pane).
    async fn scroll_within(&self, target: &ElementRef, y: i64) -> Result<(), SessionError>;
    /// Send Escape to the page (dismisses transient overlays).
    async fn press_escape(&self) -> Result<(), SessionError>;
    /// Capture a PNG screenshot of the viewport to `path`.
    async fn screenshot(&self, path: &Path) -> Result<(), SessionError>;
}
