//! Extraction of a candidate query from raw model output
//!
//! Models wrap SQL in code fences or preface it with prose despite being
//! told not to. Extraction strips the fences and takes everything from the
//! first `SELECT`/`WITH` keyword onward. When neither keyword appears the
//! whole stripped text is kept, so policy violations (`DROP TABLE data`)
//! reach the validator and are rejected there rather than silently dropped.

use std::fmt;

/// Unvalidated SQL text produced by the translator. Not trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSql(String);

impl CandidateSql {
    /// Wrap already-extracted SQL, e.g. from the direct `/query` endpoint.
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// Extract a candidate from raw model output. Returns `None` when the
    /// stripped text is empty (a blank completion).
    pub fn from_model_text(raw: &str) -> Option<Self> {
        let stripped = strip_code_fences(raw);
        let body = find_query_start(&stripped).unwrap_or(&stripped).trim();
        let body = body
            .strip_suffix(';')
            .map(str::trim_end)
            .unwrap_or(body);
        if body.is_empty() {
            None
        } else {
            Some(Self(body.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CandidateSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remove markdown code fences, including an optional `sql` language tag.
fn strip_code_fences(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(at) = rest.find("```") {
        out.push_str(&rest[..at]);
        rest = &rest[at + 3..];
        if rest.len() >= 3 && rest[..3].eq_ignore_ascii_case("sql") {
            rest = &rest[3..];
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

/// Locate the first word-boundary `SELECT` or `WITH` followed by whitespace.
fn find_query_start(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    for idx in 0..text.len() {
        if !text.is_char_boundary(idx) {
            continue;
        }
        let boundary_before = idx == 0 || {
            let prev = bytes[idx - 1];
            !prev.is_ascii_alphanumeric() && prev != b'_'
        };
        if !boundary_before {
            continue;
        }
        for keyword in ["SELECT", "WITH"] {
            let end = idx + keyword.len();
            if end < bytes.len()
                && bytes[idx..end].eq_ignore_ascii_case(keyword.as_bytes())
                && bytes[end].is_ascii_whitespace()
            {
                return Some(&text[idx..]);
            }
        }
    }
    None
}
