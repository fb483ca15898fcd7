//! The `Coder` trait (metadata describing one error class) and `ErrCode`,
//! the serde-friendly implementation most applications register.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Named values attached to a coder or an error, substituted into messages.
pub type Params = BTreeMap<String, Value>;

/// Metadata for one error class, keyed by its `code`.
///
/// Implementations must be immutable once registered; the registry hands out
/// shared references and never clones them.
pub trait Coder: Send + Sync + fmt::Debug {
    /// The unique, machine-readable code (e.g. `"100001"`).
    fn code(&self) -> &str;

    /// Transport status associated with this code (typically an HTTP status).
    fn status_code(&self) -> u16;

    /// External (user-facing) message.
    fn message(&self) -> &str;

    /// Parameters substituted into [`message`](Coder::message).
    fn params(&self) -> Option<&Params>;

    /// The message with params applied.
    fn full_message(&self) -> String {
        render_message(self.message(), self.params())
    }

    /// Pointer to remediation documents for the user.
    fn reference(&self) -> &str;
}

// ─── ErrCode ──────────────────────────────────────────────────────────────────

/// A plain coder definition, loadable from a JSON catalog.
///
/// ```json
/// { "code": "100001", "status": 400, "message": "invalid {field}",
///   "params": { "field": "email" }, "reference": "https://docs/100001" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrCode {
    /// Unique code string.
    pub code: String,
    /// Transport status, 500 when omitted.
    #[serde(default = "default_status")]
    pub status: u16,
    /// Default message for errors carrying this code.
    #[serde(default)]
    pub message: String,
    /// Message parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    /// Remediation pointer (URL or document id).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reference: String,
}

fn default_status() -> u16 {
    500
}

impl ErrCode {
    pub fn new(code: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            status,
            message: message.into(),
            params: None,
            reference: String::new(),
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = reference.into();
        self
    }
}

impl Coder for ErrCode {
    fn code(&self) -> &str {
        &self.code
    }

    fn status_code(&self) -> u16 {
        self.status
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    fn reference(&self) -> &str {
        &self.reference
    }
}

impl fmt::Display for ErrCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) - {}", self.code, self.status, self.full_message())
    }
}

// ─── Message rendering ────────────────────────────────────────────────────────

/// Substitute `{name}` placeholders in `template` with values from `params`.
///
/// String values are inserted without quotes, every other value in compact
/// JSON form. Placeholders without a matching param, and a `{` with no
/// closing brace, are kept verbatim.
pub fn render_message(template: &str, params: Option<&Params>) -> String {
    let params = match params {
        Some(p) if !p.is_empty() => p,
        _ => return template.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match tail.find('}') {
            Some(close) => {
                match params.get(&tail[1..close]) {
                    Some(value) => push_value(&mut out, value),
                    None => out.push_str(&tail[..=close]),
                }
                rest = &tail[close + 1..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        other => out.push_str(&other.to_string()),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
