//! Named CSS selectors for the target site's UI.
//!
//! The vendor markup is out of our control and changes without notice; keeping
//! every selector in one table makes those breakages a one-file fix and keeps
//! raw CSS strings out of the wizard and filler logic.

/// "Continue to next step" button inside the application wizard.
pub const NEXT: &str = "button[aria-label='Continue to next step']";
/// "Review your application" button.
pub const REVIEW: &str = "button[aria-label='Review your application']";
/// Final "Submit application" button.
pub const SUBMIT: &str = "button[aria-label='Submit application']";
/// "Follow company" toggle shown on the review step.
pub const FOLLOW: &str = "label[for='follow-company-checkbox']";

/// Inline validation message under a form field.
pub const ERROR: &str = "p[data-test-form-element-error-message='true']";
/// Spinner overlay shown while a wizard step loads.
pub const LOADER: &str = ".artdeco-loader";

/// Generic file input accepted as a fallback for any document kind.
pub const UPLOAD: &str = "input[name='file']";
/// Dedicated resume upload input.
pub const RESUME_UPLOAD: &str = "input[id*='jobs-document-upload-file-input-upload-resume']";
/// Dedicated cover letter upload input.
pub const COVER_LETTER_UPLOAD: &str =
    "input[id*='jobs-document-upload-file-input-upload-cover-letter']";

/// Scrollable results pane on the jobs search page.
pub const SEARCH_RESULTS: &str = ".job-card-list";
/// One job card; carries the job id in `data-job-id`.
pub const JOB_CARDS: &str = "div[data-job-id]";
/// Attribute on [`JOB_CARDS`] holding the numeric job id.
pub const JOB_ID_ATTR: &str = "data-job-id";
/// Quick-apply button on a job detail page.
pub const QUICK_APPLY: &str = ".jobs-apply-button";

/// One question group (prompt + its controls) inside a wizard step.
pub const FIELD_GROUPS: &str = ".jobs-easy-apply-form-section__grouping";
/// Radio option inside a question group.
pub const RADIO: &str = "input[type='radio']";
/// Checkbox inside a question group.
pub const CHECKBOX: &str = "input[type='checkbox']";
/// Numeric input inside a question group.
pub const NUMERIC: &str = "input[type='number']";
/// Dropdown inside a question group.
pub const SELECT: &str = "select";
/// Multi-entry list input (typeahead) inside a question group.
pub const MULTI_LIST: &str = "input[id*='text-entity-list-form-component']";
/// Plain free-text input inside a question group.
pub const TEXT_INPUT: &str = ".artdeco-text-input--input";

/// Sign-in page fields.
pub const LOGIN_USERNAME: &str = "#username";
pub const LOGIN_PASSWORD: &str = "#password";
pub const LOGIN_BUTTON: &str = ".btn__primary--large";
