//! Static denylist check run before any interpreter is created
//!
//! This is a textual pre-filter. It does not catch names assembled at runtime;
//! containment comes from the isolate and its resource limits.

use crate::error::SandboxError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Family of constructs a denylist pattern belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    /// `eval`, `new Function`
    DynamicCode,
    /// Process, module loading and host globals
    HostAccess,
    /// Network primitives
    Network,
}

impl PatternCategory {
    pub fn description(self) -> &'static str {
        match self {
            PatternCategory::DynamicCode => "dynamic code evaluation",
            PatternCategory::HostAccess => "host runtime access",
            PatternCategory::Network => "network access",
        }
    }
}

struct DangerousPattern {
    token: &'static str,
    category: PatternCategory,
    regex: Regex,
}

fn pattern(token: &'static str, category: PatternCategory, regex: &str) -> DangerousPattern {
    DangerousPattern {
        token,
        category,
        regex: Regex::new(regex).expect("denylist pattern must compile"),
    }
}

static DENYLIST: LazyLock<Vec<DangerousPattern>> = LazyLock::new(|| {
    use PatternCategory::*;
    vec![
        pattern("eval(", DynamicCode, r"(?i)\beval\s*\("),
        pattern("new Function(", DynamicCode, r"(?i)\bnew\s+Function\s*\("),
        pattern("process", HostAccess, r"\bprocess\b"),
        pattern("require(", HostAccess, r"(?i)\brequire\s*\("),
        pattern("import", HostAccess, r"(?i)\bimport\s+"),
        pattern("global", HostAccess, r"\bglobal\b"),
        pattern("window", HostAccess, r"\bwindow\b"),
        pattern("document", HostAccess, r"\bdocument\b"),
        pattern("fetch(", Network, r"(?i)\bfetch\s*\("),
        pattern("XMLHttpRequest", Network, r"\bXMLHttpRequest\b"),
        pattern("WebSocket", Network, r"\bWebSocket\b"),
    ]
});

/// Outcome of [`validate`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn into_result(self) -> Result<(), SandboxError> {
        if self.valid {
            Ok(())
        } else {
            Err(SandboxError::Validation(self.errors))
        }
    }
}

/// Check a snippet against the denylist, collecting every violation.
pub fn validate(code: &str) -> ValidationReport {
    if code.trim().is_empty() {
        return ValidationReport {
            valid: false,
            errors: vec!["Code cannot be empty".to_string()],
        };
    }

    let errors: Vec<String> = DENYLIST
        .iter()
        .filter(|p| p.regex.is_match(code))
        .map(|p| {
            format!(
                "Dangerous pattern detected: {} ({})",
                p.token,
                p.category.description()
            )
        })
        .collect();

    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}
