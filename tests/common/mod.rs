//! Scripted in-memory [`BrowserSession`] for driving the wizard and filler
//! without a browser.
//!
//! A fake run is a queue of [`FakePage`]s; clicking an advancing button pops
//! the queue. Everything the code under test does (clicks, typing, selects,
//! uploads, screenshots) is recorded for assertions.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use applyscout::browser::locators;
use applyscout::{BrowserSession, ElementRef, SessionError};

/// Flattened lookup key for an element address: `"scope[i] selector"` for
/// scoped refs, the bare selector otherwise.
pub fn key(target: &ElementRef) -> String {
    match &target.scope {
        Some((s, i)) => format!("{}[{}] {}", s, i, target.selector),
        None => target.selector.clone(),
    }
}

/// Scoped key helper for building pages in tests.
pub fn scoped(scope: &str, index: usize, selector: &str) -> String {
    format!("{}[{}] {}", scope, index, selector)
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub title: String,
    pub html: String,
    counts: HashMap<String, usize>,
    texts: HashMap<(String, usize), String>,
    attrs: HashMap<(String, usize, String), String>,
    options: HashMap<String, Vec<String>>,
    checked: HashMap<(String, usize), bool>,
    hidden: HashSet<String>,
    unclickable: HashSet<String>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn with_html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    /// Present element(s): `n` matches for `key`.
    pub fn with_count(mut self, key: &str, n: usize) -> Self {
        self.counts.insert(key.to_string(), n);
        self
    }

    /// Single button, visible and clickable.
    pub fn with_button(self, selector: &str) -> Self {
        self.with_count(selector, 1)
    }

    pub fn with_text(mut self, key: &str, index: usize, text: &str) -> Self {
        self.texts.insert((key.to_string(), index), text.to_string());
        self
    }

    pub fn with_attr(mut self, key: &str, index: usize, name: &str, value: &str) -> Self {
        self.attrs
            .insert((key.to_string(), index, name.to_string()), value.to_string());
        self
    }

    pub fn with_options(mut self, key: &str, options: &[&str]) -> Self {
        self.options
            .insert(key.to_string(), options.iter().map(|o| o.to_string()).collect());
        self
    }

    pub fn with_checked(mut self, key: &str, index: usize, checked: bool) -> Self {
        self.checked.insert((key.to_string(), index), checked);
        self
    }

    pub fn with_hidden(mut self, key: &str) -> Self {
        self.hidden.insert(key.to_string());
        self
    }

    pub fn with_unclickable(mut self, key: &str) -> Self {
        self.unclickable.insert(key.to_string());
        self
    }

    /// One question group at `index` with the given prompt text.
    pub fn with_group(self, index: usize, question: &str) -> Self {
        let groups = self.counts.get(locators::FIELD_GROUPS).copied().unwrap_or(0);
        self.with_count(locators::FIELD_GROUPS, groups.max(index + 1))
            .with_text(locators::FIELD_GROUPS, index, question)
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub clicks: Vec<(String, usize)>,
    pub typed: Vec<(String, String)>,
    pub selected: Vec<(String, usize)>,
    pub uploads: Vec<(String, PathBuf)>,
    pub screenshots: Vec<PathBuf>,
    pub navigations: Vec<String>,
}

pub struct FakeSession {
    pages: Mutex<VecDeque<FakePage>>,
    recorded: Mutex<Recorded>,
    advance_on: HashSet<String>,
}

impl FakeSession {
    /// Session over a queue of wizard steps. Clicking the continue or review
    /// button advances to the next page; submit is terminal.
    pub fn new(pages: Vec<FakePage>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            recorded: Mutex::new(Recorded::default()),
            advance_on: [locators::NEXT.to_string(), locators::REVIEW.to_string()].into(),
        }
    }

    pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }

    fn current<T>(&self, f: impl FnOnce(&FakePage) -> T) -> Option<T> {
        self.pages.lock().unwrap().front().map(f)
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.recorded.lock().unwrap().navigations.push(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        Ok("about:fake".to_string())
    }

    async fn page_title(&self) -> Result<String, SessionError> {
        Ok(self.current(|p| p.title.clone()).unwrap_or_default())
    }

    async fn page_html(&self) -> Result<String, SessionError> {
        Ok(self.current(|p| p.html.clone()).unwrap_or_default())
    }

    async fn count(&self, target: &ElementRef) -> usize {
        let k = key(target);
        self.current(|p| p.counts.get(&k).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    async fn is_displayed(&self, target: &ElementRef) -> bool {
        let k = key(target);
        self.current(|p| p.counts.get(&k).copied().unwrap_or(0) > 0 && !p.hidden.contains(&k))
            .unwrap_or(false)
    }

    async fn is_clickable(&self, target: &ElementRef) -> bool {
        let k = key(target);
        self.current(|p| {
            p.counts.get(&k).copied().unwrap_or(0) > 0
                && !p.hidden.contains(&k)
                && !p.unclickable.contains(&k)
        })
        .unwrap_or(false)
    }

    async fn text(&self, target: &ElementRef) -> Result<String, SessionError> {
        let k = key(target);
        self.current(|p| p.texts.get(&(k.clone(), target.index)).cloned())
            .flatten()
            .ok_or_else(|| SessionError::NotFound(k))
    }

    async fn attribute(
        &self,
        target: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let k = key(target);
        Ok(self
            .current(|p| p.attrs.get(&(k, target.index, name.to_string())).cloned())
            .flatten())
    }

    async fn outer_html(&self, target: &ElementRef) -> Result<String, SessionError> {
        let k = key(target);
        let text = self
            .current(|p| p.texts.get(&(k, target.index)).cloned())
            .flatten()
            .unwrap_or_default();
        Ok(format!("<div>{}</div>", text))
    }

    async fn is_checked(&self, target: &ElementRef) -> Result<bool, SessionError> {
        let k = key(target);
        self.current(|p| p.checked.get(&(k.clone(), target.index)).copied())
            .flatten()
            .ok_or_else(|| SessionError::NotFound(k))
    }

    async fn option_texts(&self, target: &ElementRef) -> Result<Vec<String>, SessionError> {
        let k = key(target);
        self.current(|p| p.options.get(&k).cloned())
            .flatten()
            .ok_or_else(|| SessionError::NotFound(k))
    }

    async fn click(&self, target: &ElementRef) -> Result<(), SessionError> {
        let k = key(target);
        self.recorded
            .lock()
            .unwrap()
            .clicks
            .push((k.clone(), target.index));

        let mut pages = self.pages.lock().unwrap();
        if let Some(page) = pages.front_mut() {
            // Checkbox/radio clicks flip tracked state.
            if let Some(state) = page.checked.get_mut(&(k.clone(), target.index)) {
                *state = !*state;
            }
        }
        if self.advance_on.contains(&k) && pages.len() > 1 {
            pages.pop_front();
        }
        Ok(())
    }

    async fn type_into(&self, target: &ElementRef, text: &str) -> Result<(), SessionError> {
        self.recorded
            .lock()
            .unwrap()
            .typed
            .push((key(target), text.to_string()));
        Ok(())
    }

    async fn clear_and_type(&self, target: &ElementRef, text: &str) -> Result<(), SessionError> {
        self.type_into(target, text).await
    }

    async fn select_by_index(
        &self,
        target: &ElementRef,
        index: usize,
    ) -> Result<(), SessionError> {
        self.recorded
            .lock()
            .unwrap()
            .selected
            .push((key(target), index));
        Ok(())
    }

    async fn upload(&self, target: &ElementRef, path: &Path) -> Result<(), SessionError> {
        self.recorded
            .lock()
            .unwrap()
            .uploads
            .push((key(target), path.to_path_buf()));
        Ok(())
    }

    async fn scroll_by(&self, _delta_y: i64) -> Result<(), SessionError> {
        Ok(())
    }

    async fn scroll_to_top(&self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn scroll_within(&self, _target: &ElementRef, _y: i64) -> Result<(), SessionError> {
        Ok(())
    }

    async fn press_escape(&self) -> Result<(), SessionError> {
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), SessionError> {
        self.recorded
            .lock()
            .unwrap()
            .screenshots
            .push(path.to_path_buf());
        Ok(())
    }
}
