//! Turns a classified answer into manipulations of the controls inside one
//! question group.
//!
//! The vendor markup gives no reliable way to know a group's control type up
//! front, so the filler probes every modality it knows (radio, checkbox,
//! numeric, dropdown, typeahead, free text) and applies the answer to each one
//! present. Per-control failures are logged and skipped — a half-filled group
//! is caught later by the wizard's validation scan, which has the context to
//! decide whether to abandon.

use tracing::{debug, warn};

use crate::browser::{locators, BrowserSession, ElementRef};

/// Answers that mean "tick the box" on a checkbox control.
fn is_affirmative(answer: &str) -> bool {
    answer.eq_ignore_ascii_case("yes")
}

/// Placeholder options a dropdown fallback must never land on.
fn is_placeholder(text: &str) -> bool {
    let t = text.trim();
    t.is_empty() || t.eq_ignore_ascii_case("select an option")
}

/// Pick the option index for `answer`: exact case-insensitive match, else the
/// first option containing the answer, else the first real (non-placeholder)
/// option. `None` only when every option is a placeholder.
pub fn choose_option_index(options: &[String], answer: &str) -> Option<usize> {
    let lower = answer.to_lowercase();
    if let Some(i) = options
        .iter()
        .position(|o| o.trim().eq_ignore_ascii_case(answer))
    {
        return Some(i);
    }
    if let Some(i) = options
        .iter()
        .position(|o| !is_placeholder(o) && o.to_lowercase().contains(&lower))
    {
        return Some(i);
    }
    options.iter().position(|o| !is_placeholder(o))
}

/// Apply `answer` to every control found inside `region`. Returns `true` when
/// at least one control was successfully set.
pub async fn fill_region(
    session: &dyn BrowserSession,
    region: &ElementRef,
    answer: &str,
) -> bool {
    let mut filled = false;

    filled |= fill_radios(session, region, answer).await;
    filled |= fill_checkboxes(session, region, answer).await;
    filled |= fill_numeric(session, region, answer).await;
    filled |= fill_select(session, region, answer).await;
    filled |= fill_text(session, region, answer).await;

    if !filled {
        debug!("no control in {} accepted answer {:?}", region, answer);
    }
    filled
}

/// Click the radio whose `value` attribute equals the answer,
/// case-insensitively. No match leaves the group untouched.
async fn fill_radios(session: &dyn BrowserSession, region: &ElementRef, answer: &str) -> bool {
    let radios = region.child(locators::RADIO);
    let n = session.count(&radios).await;
    for i in 0..n {
        let radio = radios.clone().nth(i);
        let value = match session.attribute(&radio, "value").await {
            Ok(v) => v.unwrap_or_default(),
            Err(e) => {
                warn!("could not read radio value at {}: {}", radio, e);
                continue;
            }
        };
        if !value.is_empty() && value.eq_ignore_ascii_case(answer) {
            match session.click(&radio).await {
                Ok(()) => return true,
                Err(e) => warn!("could not click radio {}: {}", radio, e),
            }
        }
    }
    false
}

/// Bring every checkbox in the group in line with a yes/no answer.
async fn fill_checkboxes(session: &dyn BrowserSession, region: &ElementRef, answer: &str) -> bool {
    let boxes = region.child(locators::CHECKBOX);
    let n = session.count(&boxes).await;
    let want = is_affirmative(answer);
    let mut changed = false;
    for i in 0..n {
        let b = boxes.clone().nth(i);
        let checked = match session.is_checked(&b).await {
            Ok(c) => c,
            Err(e) => {
                warn!("could not read checkbox state at {}: {}", b, e);
                continue;
            }
        };
        if checked != want {
            match session.click(&b).await {
                Ok(()) => changed = true,
                Err(e) => warn!("could not toggle checkbox {}: {}", b, e),
            }
        } else {
            // Already in the desired state counts as handled.
            changed = true;
        }
    }
    changed
}

async fn fill_numeric(session: &dyn BrowserSession, region: &ElementRef, answer: &str) -> bool {
    let field = region.child(locators::NUMERIC);
    if session.count(&field).await == 0 {
        return false;
    }
    match session.clear_and_type(&field, answer).await {
        Ok(()) => true,
        Err(e) => {
            warn!("could not fill numeric input {}: {}", field, e);
            false
        }
    }
}

async fn fill_select(session: &dyn BrowserSession, region: &ElementRef, answer: &str) -> bool {
    let select = region.child(locators::SELECT);
    if session.count(&select).await == 0 {
        return false;
    }
    let options = match session.option_texts(&select).await {
        Ok(o) => o,
        Err(e) => {
            warn!("could not read options of {}: {}", select, e);
            return false;
        }
    };
    let Some(index) = choose_option_index(&options, answer) else {
        warn!("dropdown {} has no selectable option for {:?}", select, answer);
        return false;
    };
    if !options[index].trim().eq_ignore_ascii_case(answer) {
        warn!(
            "dropdown {}: no option matches {:?}, selecting {:?}",
            select, answer, options[index]
        );
    }
    match session.select_by_index(&select, index).await {
        Ok(()) => true,
        Err(e) => {
            warn!("could not select option {} of {}: {}", index, select, e);
            false
        }
    }
}

/// Typeahead list inputs and plain text inputs.
async fn fill_text(session: &dyn BrowserSession, region: &ElementRef, answer: &str) -> bool {
    let mut filled = false;

    let multi = region.child(locators::MULTI_LIST);
    if session.count(&multi).await > 0 {
        match session.type_into(&multi, answer).await {
            Ok(()) => filled = true,
            Err(e) => warn!("could not fill list input {}: {}", multi, e),
        }
    }

    let text = region.child(locators::TEXT_INPUT);
    if session.count(&text).await > 0 {
        match session.clear_and_type(&text, answer).await {
            Ok(()) => filled = true,
            Err(e) => warn!("could not fill text input {}: {}", text, e),
        }
    }

    filled
}
