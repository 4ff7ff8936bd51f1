// SQL `LIKE` semantics for the in-memory store

use regex::{Regex, RegexBuilder};

use super::StoreError;

/// Case-insensitive `LIKE` pattern: `%` matches any run, `_` any one character.
#[derive(Debug, Clone)]
pub struct LikePattern {
    regex: Regex,
}

impl LikePattern {
    pub fn new(pattern: &str) -> Result<Self, StoreError> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        let mut literal = String::new();
        for ch in pattern.chars() {
            match ch {
                '%' | '_' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    expr.push_str(if ch == '%' { ".*" } else { "." });
                }
                other => literal.push(other),
            }
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        let regex = RegexBuilder::new(&expr)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| StoreError::InvalidQuery(e.to_string()))?;
        Ok(Self { regex })
    }

    /// `%term%`
    pub fn containing(term: &str) -> Result<Self, StoreError> {
        Self::new(&format!("%{term}%"))
    }

    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}
