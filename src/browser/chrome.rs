//! `chromiumoxide`-backed implementation of [`BrowserSession`].
//!
//! This module is the single source of truth for:
//! * Finding a usable browser executable (Brave → Chrome → Chromium, cross-platform).
//! * Launching the session with stealth defaults (rotating desktop user agent,
//!   `--disable-blink-features=AutomationControlled`, CI-friendly sandbox flags).
//! * Translating [`ElementRef`] addresses into CDP element lookups.
//!
//! Reads (text, attributes, checked state, geometry probes) are evaluated as
//! small JS snippets against the resolved element — the markup we automate is
//! framework-rendered and properties like `checked` or option lists are not
//! reliably visible as attributes. Clicks and typing go through native CDP
//! input first, with a script-injected fallback for elements that reject the
//! synthetic event.

use std::path::Path;

use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, Element, Page};
use futures::StreamExt;
use rand::seq::IndexedRandom;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{BrowserSession, ElementRef, SessionError};

const DESKTOP_USER_AGENTS: &[&str] = &[
    // Chrome 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 132 – macOS
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36",
    // Chrome 131 – Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Edge 132 – Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36 Edg/132.0.0.0",
];

/// Returns a randomly-chosen realistic desktop User-Agent string.
fn random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    DESKTOP_USER_AGENTS
        .choose(&mut rng)
        .copied()
        .unwrap_or(DESKTOP_USER_AGENTS[0])
}

/// Find a usable Chromium-family browser executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH scan — finds package-manager installs on all platforms.
/// 3. OS-specific well-known install paths.
pub fn find_chrome_executable() -> Option<String> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&p).exists() {
            return Some(p);
        }
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let candidates = [
            "brave-browser",
            "brave",
            "google-chrome",
            "chromium",
            "chromium-browser",
            "chrome",
        ];
        for dir in std::env::split_paths(&path_var) {
            for exe in candidates {
                let full = dir.join(exe);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/brave-browser",
            "/usr/bin/brave",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/bin/google-chrome",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\BraveSoftware\Brave-Browser\Application\brave.exe",
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

/// Build a `BrowserConfig` with stealth defaults.
fn build_config(exe: &str, headless: bool, width: u32, height: u32) -> anyhow::Result<BrowserConfig> {
    let ua = random_user_agent();

    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width,
            height,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(width, height)
        .arg("--disable-gpu")
        .arg("--no-sandbox") // often required in CI / restricted environments
        .arg("--disable-setuid-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-extensions")
        .arg("--disable-background-networking")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--ignore-certificate-errors")
        .arg("--mute-audio")
        // Stealth: suppress the navigator.webdriver automation fingerprint.
        .arg("--disable-blink-features=AutomationControlled")
        .arg(format!("--user-agent={}", ua));

    if !headless {
        builder = builder.with_head();
    }

    builder
        .build()
        .map_err(|e| anyhow::anyhow!("failed to build browser config: {}", e))
}

/// Escape a string into a single-quoted JS string literal.
fn js_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// JS expression resolving an [`ElementRef`] to an element or `null`.
fn js_resolve(target: &ElementRef) -> String {
    match &target.scope {
        Some((scope_sel, scope_idx)) => format!(
            "(() => {{ const s = document.querySelectorAll({})[{}]; \
             return s ? (s.querySelectorAll({})[{}] || null) : null; }})()",
            js_str(scope_sel),
            scope_idx,
            js_str(&target.selector),
            target.index
        ),
        None => format!(
            "(document.querySelectorAll({})[{}] || null)",
            js_str(&target.selector),
            target.index
        ),
    }
}

/// Wrap a JS body (using `el`) so it evaluates to `null` when the target is absent.
fn js_on_element(target: &ElementRef, body: &str) -> String {
    format!(
        "(() => {{ const el = {}; if (!el) return null; {} }})()",
        js_resolve(target),
        body
    )
}

/// A live browser session owning one page.
pub struct ChromeSession {
    browser: Mutex<Option<Browser>>,
    page: Page,
    handler_task: tokio::task::JoinHandle<()>,
}

impl ChromeSession {
    /// Launch a browser and open a blank page.
    pub async fn launch(headless: bool, screenshot_dir: &Path) -> anyhow::Result<Self> {
        let exe = find_chrome_executable().ok_or_else(|| {
            anyhow::anyhow!(
                "no browser found — install Brave, Chrome, or Chromium, \
                 or set CHROME_EXECUTABLE"
            )
        })?;
        info!("launching browser: {} (headless: {})", exe, headless);

        let config = build_config(&exe, headless, 1920, 1080)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| anyhow::anyhow!("browser launch failed ({}): {}", exe, e))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("CDP handler error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| anyhow::anyhow!("failed to open page: {}", e))?;

        std::fs::create_dir_all(screenshot_dir).map_err(|e| {
            anyhow::anyhow!(
                "failed to create screenshot dir {}: {}",
                screenshot_dir.display(),
                e
            )
        })?;

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page,
            handler_task,
        })
    }

    /// Gracefully close the browser process.
    pub async fn close(&self) {
        let mut guard = self.browser.lock().await;
        if let Some(mut b) = guard.take() {
            if let Err(e) = b.close().await {
                warn!("browser close error (non-fatal): {}", e);
            }
        }
        self.handler_task.abort();
        info!("browser session closed");
    }

    /// Evaluate a script and deserialize the result, treating any failure or
    /// `null`/`undefined` as `None`.
    async fn eval_opt<T: serde::de::DeserializeOwned>(&self, script: String) -> Option<T> {
        let value: serde_json::Value = self
            .page
            .evaluate(script)
            .await
            .ok()?
            .into_value()
            .ok()?;
        if value.is_null() {
            return None;
        }
        serde_json::from_value(value).ok()
    }

    /// Evaluate a script where failure should surface as a session error.
    async fn eval_required<T: serde::de::DeserializeOwned>(
        &self,
        target: &ElementRef,
        body: &str,
    ) -> Result<T, SessionError> {
        let script = js_on_element(target, body);
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| SessionError::Browser(e.to_string()))?;
        let value: serde_json::Value = result
            .into_value()
            .map_err(|e| SessionError::Browser(e.to_string()))?;
        if value.is_null() {
            return Err(SessionError::NotFound(target.to_string()));
        }
        serde_json::from_value(value).map_err(|e| SessionError::Browser(e.to_string()))
    }

    /// Resolve an [`ElementRef`] to a live CDP element handle.
    async fn resolve(&self, target: &ElementRef) -> Result<Element, SessionError> {
        let matches = match &target.scope {
            Some((scope_sel, scope_idx)) => {
                let scopes = self
                    .page
                    .find_elements(scope_sel.as_str())
                    .await
                    .map_err(|e| SessionError::Browser(e.to_string()))?;
                let scope = scopes
                    .into_iter()
                    .nth(*scope_idx)
                    .ok_or_else(|| SessionError::NotFound(target.to_string()))?;
                scope
                    .find_elements(target.selector.as_str())
                    .await
                    .map_err(|e| SessionError::Browser(e.to_string()))?
            }
            None => self
                .page
                .find_elements(target.selector.as_str())
                .await
                .map_err(|e| SessionError::Browser(e.to_string()))?,
        };
        matches
            .into_iter()
            .nth(target.index)
            .ok_or_else(|| SessionError::NotFound(target.to_string()))
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| SessionError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let _ = self.page.wait_for_navigation().await;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, SessionError> {
        self.eval_opt::<String>("location.href".to_string())
            .await
            .ok_or_else(|| SessionError::Browser("could not read location.href".into()))
    }

    async fn page_title(&self) -> Result<String, SessionError> {
        Ok(self
            .eval_opt::<String>("document.title".to_string())
            .await
            .unwrap_or_default())
    }

    async fn page_html(&self) -> Result<String, SessionError> {
        self.eval_opt::<String>("document.documentElement.outerHTML".to_string())
            .await
            .ok_or_else(|| SessionError::Browser("could not serialize page HTML".into()))
    }

    async fn count(&self, target: &ElementRef) -> usize {
        let script = match &target.scope {
            Some((scope_sel, scope_idx)) => format!(
                "(() => {{ const s = document.querySelectorAll({})[{}]; \
                 return s ? s.querySelectorAll({}).length : 0; }})()",
                js_str(scope_sel),
                scope_idx,
                js_str(&target.selector)
            ),
            None => format!(
                "document.querySelectorAll({}).length",
                js_str(&target.selector)
            ),
        };
        self.eval_opt::<u64>(script).await.unwrap_or(0) as usize
    }

    async fn is_displayed(&self, target: &ElementRef) -> bool {
        let body = "const st = getComputedStyle(el); \
                    if (st.display === 'none' || st.visibility === 'hidden') return false; \
                    return !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length);";
        self.eval_opt::<bool>(js_on_element(target, body))
            .await
            .unwrap_or(false)
    }

    async fn is_clickable(&self, target: &ElementRef) -> bool {
        // Visible, enabled, and actually hit-testable at its center point —
        // a spinner overlay or modal scrim makes elementFromPoint miss.
        let body = "const r = el.getBoundingClientRect(); \
                    if (r.width === 0 || r.height === 0) return false; \
                    if (el.disabled) return false; \
                    const cx = r.left + r.width / 2, cy = r.top + r.height / 2; \
                    const top = document.elementFromPoint(cx, cy); \
                    if (!top) return false; \
                    return top === el || el.contains(top) || top.contains(el);";
        self.eval_opt::<bool>(js_on_element(target, body))
            .await
            .unwrap_or(false)
    }

    async fn text(&self, target: &ElementRef) -> Result<String, SessionError> {
        self.eval_required(target, "return el.innerText || el.textContent || '';")
            .await
    }

    async fn attribute(
        &self,
        target: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let body = format!("return el.getAttribute({});", js_str(name));
        let script = js_on_element(target, &body);
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| SessionError::Browser(e.to_string()))?;
        let value: serde_json::Value = result
            .into_value()
            .map_err(|e| SessionError::Browser(e.to_string()))?;
        Ok(value.as_str().map(|s| s.to_string()))
    }

    async fn outer_html(&self, target: &ElementRef) -> Result<String, SessionError> {
        self.eval_required(target, "return el.outerHTML;").await
    }

    async fn is_checked(&self, target: &ElementRef) -> Result<bool, SessionError> {
        self.eval_required(target, "return !!el.checked;").await
    }

    async fn option_texts(&self, target: &ElementRef) -> Result<Vec<String>, SessionError> {
        self.eval_required(
            target,
            "return Array.from(el.options || []).map(o => (o.textContent || '').trim());",
        )
        .await
    }

    async fn click(&self, target: &ElementRef) -> Result<(), SessionError> {
        match self.resolve(target).await {
            Ok(el) => {
                let _ = el.scroll_into_view().await;
                if let Err(e) = el.click().await {
                    // Script-injected fallback for elements that swallow
                    // native CDP clicks (overlayed labels, custom widgets).
                    debug!("native click failed for {} ({}), using JS click", target, e);
                    self.eval_required::<bool>(target, "el.click(); return true;")
                        .await?;
                }
                Ok(())
            }
            Err(SessionError::NotFound(t)) => Err(SessionError::NotFound(t)),
            Err(_) => {
                self.eval_required::<bool>(target, "el.click(); return true;")
                    .await?;
                Ok(())
            }
        }
    }

    async fn type_into(&self, target: &ElementRef, text: &str) -> Result<(), SessionError> {
        let el = self.resolve(target).await?;
        let _ = el.scroll_into_view().await;
        el.click()
            .await
            .map_err(|e| SessionError::Browser(format!("focus failed: {}", e)))?;
        el.type_str(text)
            .await
            .map_err(|e| SessionError::Browser(format!("type failed: {}", e)))?;
        Ok(())
    }

    async fn clear_and_type(&self, target: &ElementRef, text: &str) -> Result<(), SessionError> {
        self.eval_required::<bool>(
            target,
            "el.value = ''; el.dispatchEvent(new Event('input', { bubbles: true })); return true;",
        )
        .await?;
        self.type_into(target, text).await
    }

    async fn select_by_index(
        &self,
        target: &ElementRef,
        index: usize,
    ) -> Result<(), SessionError> {
        let body = format!(
            "if (!el.options || el.options.length <= {idx}) return null; \
             el.selectedIndex = {idx}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true;",
            idx = index
        );
        self.eval_required::<bool>(target, &body).await?;
        Ok(())
    }

    async fn upload(&self, target: &ElementRef, path: &Path) -> Result<(), SessionError> {
        let el = self.resolve(target).await?;
        let file = path.to_string_lossy().to_string();
        let params = SetFileInputFilesParams::builder()
            .files(vec![file.clone()])
            .backend_node_id(el.backend_node_id)
            .build()
            .map_err(|e| SessionError::Upload {
                path: file.clone(),
                message: e,
            })?;
        self.page
            .execute(params)
            .await
            .map_err(|e| SessionError::Upload {
                path: file,
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn scroll_by(&self, delta_y: i64) -> Result<(), SessionError> {
        self.page
            .evaluate(format!("window.scrollBy(0, {});", delta_y))
            .await
            .map_err(|e| SessionError::Browser(e.to_string()))?;
        Ok(())
    }

    async fn scroll_to_top(&self) -> Result<(), SessionError> {
        self.page
            .evaluate("window.scrollTo(0, 0);")
            .await
            .map_err(|e| SessionError::Browser(e.to_string()))?;
        Ok(())
    }

    async fn scroll_within(&self, target: &ElementRef, y: i64) -> Result<(), SessionError> {
        let body = format!("el.scrollTo(0, {}); return true;", y);
        self.eval_required::<bool>(target, &body).await?;
        Ok(())
    }

    async fn press_escape(&self) -> Result<(), SessionError> {
        let body = ElementRef::first("body");
        let el = self.resolve(&body).await?;
        el.press_key("Escape")
            .await
            .map_err(|e| SessionError::Browser(format!("escape failed: {}", e)))?;
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<(), SessionError> {
        let bytes = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .build(),
            )
            .await
            .map_err(|e| SessionError::Screenshot(e.to_string()))?;
        std::fs::write(path, &bytes).map_err(|e| {
            SessionError::Screenshot(format!("write {} failed: {}", path.display(), e))
        })?;
        debug!("screenshot saved: {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
