//! Failure classification for retries.
//!
//! A failed stage is either [`Verdict::Transient`] (worth retrying) or
//! [`Verdict::Fatal`] (retrying will not help). Checks run in priority order:
//!
//! 1. Transport failures: timeouts, refused connections and truncated
//!    bodies are transient; HTTP 401/403 are fatal; 408, 429 and 5xx are
//!    transient; anything else is fatal.
//! 2. A result whose status is `timeout` is transient.
//! 3. The [`ErrorRule`] table, rule by rule over the whole error list. Each
//!    rule matches structured error codes exactly and falls back to a regex
//!    over the serialized descriptor. The first rule with any match decides.
//! 4. Everything else is fatal.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::{Result, StagehandError, TransportError};

use super::result::{StepResult, INVALID_RESPONSE_CODE};

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Transient,
    Fatal,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Transient => write!(f, "transient"),
            Verdict::Fatal => write!(f, "fatal"),
        }
    }
}

/// One entry of the classification table.
#[derive(Debug, Clone, Copy)]
pub struct ErrorRule {
    /// Rule name (for logs).
    pub name: &'static str,
    /// Structured `code` values matched exactly (case-insensitive).
    pub codes: &'static [&'static str],
    /// Regex over the lower-cased JSON of an error descriptor.
    pub pattern: &'static str,
    /// Verdict when the rule matches.
    pub verdict: Verdict,
}

/// Built-in rules. Authentication and validation come first so they
/// override any retryable marker in the same error list.
pub const DEFAULT_RULES: &[ErrorRule] = &[
    ErrorRule {
        name: "auth_or_validation",
        codes: &[
            "auth_error",
            "unauthorized",
            "forbidden",
            "invalid_input",
            "missing_required",
            "validation_error",
            INVALID_RESPONSE_CODE,
        ],
        pattern: r"(^|[^0-9])40[13]([^0-9]|$)|invalid|validation|unauthori[sz]ed|forbidden",
        verdict: Verdict::Fatal,
    },
    ErrorRule {
        name: "rate_limit_or_unavailable",
        codes: &["rate_limited", "timeout", "unavailable", "server_error"],
        pattern: r"(^|[^0-9])(429|5[0-9][0-9])([^0-9]|$)|5xx|timeout|timed out|tempor|rate.?limit|throttl|too many requests|connection|unavailable",
        verdict: Verdict::Transient,
    },
];

static DEFAULT_CLASSIFIER: LazyLock<RetryClassifier> = LazyLock::new(|| {
    RetryClassifier::with_rules(DEFAULT_RULES).expect("DEFAULT_RULES must compile")
});

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: ErrorRule,
    regex: Regex,
}

impl CompiledRule {
    fn matches(&self, descriptor: &Value) -> bool {
        let code_match = descriptor
            .get("code")
            .and_then(Value::as_str)
            .is_some_and(|code| {
                self.rule
                    .codes
                    .iter()
                    .any(|c| c.eq_ignore_ascii_case(code))
            });
        code_match || self.regex.is_match(&descriptor.to_string().to_lowercase())
    }
}

/// Decides whether failures are transient or fatal.
#[derive(Debug, Clone)]
pub struct RetryClassifier {
    rules: Vec<CompiledRule>,
}

impl RetryClassifier {
    /// Build a classifier from a rule table.
    pub fn with_rules(rules: &[ErrorRule]) -> Result<Self> {
        let rules = rules
            .iter()
            .map(|rule| {
                Regex::new(rule.pattern)
                    .map(|regex| CompiledRule { rule: *rule, regex })
                    .map_err(|e| StagehandError::ConfigValidationError {
                        message: format!("classifier rule '{}': {}", rule.name, e),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Classify a failed network call.
    pub fn classify_transport(&self, err: &TransportError) -> Verdict {
        match err {
            TransportError::Timeout { .. }
            | TransportError::Connect { .. }
            | TransportError::Truncated { .. } => Verdict::Transient,
            TransportError::Status { status, .. } => match status {
                401 | 403 => Verdict::Fatal,
                408 | 429 | 500..=599 => Verdict::Transient,
                _ => Verdict::Fatal,
            },
            TransportError::Decode { .. } | TransportError::Other { .. } => Verdict::Fatal,
        }
    }

    /// Classify a step result that did not succeed.
    pub fn classify_result(&self, result: &StepResult) -> Verdict {
        if result.status.eq_ignore_ascii_case("timeout") {
            return Verdict::Transient;
        }
        match self.match_errors(&result.errors) {
            Some((rule, verdict)) => {
                debug!(stage = %result.stage, rule, %verdict, "classified step failure");
                verdict
            }
            None => Verdict::Fatal,
        }
    }

    /// First rule matching any descriptor in `errors`.
    pub fn match_errors(&self, errors: &[Value]) -> Option<(&'static str, Verdict)> {
        self.rules
            .iter()
            .find(|compiled| errors.iter().any(|e| compiled.matches(e)))
            .map(|compiled| (compiled.rule.name, compiled.rule.verdict))
    }
}

impl Default for RetryClassifier {
    fn default() -> Self {
        DEFAULT_CLASSIFIER.clone()
    }
}
