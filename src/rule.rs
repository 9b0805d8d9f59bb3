//! Rewrite rules: a compiled pattern plus a replacement template.
//!
//! Templates use the `regex` crate's expansion syntax: `$1`, `${1}`,
//! `$name`, `${name}`, and `$$` for a literal dollar sign. Every group a
//! template references is checked against the pattern when the rule is
//! built, so a typo like `$4` in a three-group pattern fails up front instead
//! of silently expanding to nothing.

use regex::Regex;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("rule '{id}' has an empty pattern")]
    EmptyPattern { id: String },

    #[error("rule '{id}' has an invalid pattern: {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{id}' replacement references unknown group '{group}'")]
    UnknownGroup { id: String, group: String },
}

/// A single (pattern, replacement template) pair.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    id: String,
    description: Option<String>,
    pattern: Regex,
    replacement: String,
}

impl RewriteRule {
    /// Compile a rule, validating the template against the pattern's groups.
    pub fn new(
        id: impl Into<String>,
        pattern: &str,
        replacement: impl Into<String>,
    ) -> Result<Self, RuleError> {
        let id = id.into();
        if pattern.is_empty() {
            return Err(RuleError::EmptyPattern { id });
        }

        let compiled = match Regex::new(pattern) {
            Ok(re) => re,
            Err(source) => return Err(RuleError::InvalidPattern { id, source }),
        };

        let replacement = replacement.into();
        for group in template_groups(&replacement) {
            if !has_group(&compiled, &group) {
                return Err(RuleError::UnknownGroup { id, group });
            }
        }

        Ok(Self {
            id,
            description: None,
            pattern: compiled,
            replacement,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub(crate) fn regex(&self) -> &Regex {
        &self.pattern
    }
}

/// An ordered list of rules, applied first to last.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub name: String,
    pub description: Option<String>,
    /// File the rules are written for, relative to the workspace root
    pub target: Option<PathBuf>,
    pub rules: Vec<RewriteRule>,
}

impl RuleSet {
    pub fn new(name: impl Into<String>, rules: Vec<RewriteRule>) -> Self {
        Self {
            name: name.into(),
            rules,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn has_group(re: &Regex, group: &str) -> bool {
    match group.parse::<usize>() {
        Ok(index) => index < re.captures_len(),
        Err(_) => re.capture_names().flatten().any(|name| name == group),
    }
}

/// Group references in a replacement template, in order of appearance.
///
/// Mirrors the `regex` crate's parsing: `$$` is an escape, `${...}` is a
/// braced reference, and a bare `$` takes the longest run of `[_0-9A-Za-z]`.
/// A `$` not followed by a reference is literal.
fn template_groups(template: &str) -> Vec<String> {
    let bytes = template.as_bytes();
    let mut groups = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'$' {
            i += 1;
            continue;
        }
        match bytes.get(i + 1) {
            Some(b'$') => i += 2,
            Some(b'{') => match template[i + 2..].find('}') {
                Some(close) if close > 0 => {
                    groups.push(template[i + 2..i + 2 + close].to_string());
                    i += close + 3;
                }
                _ => i += 1,
            },
            Some(_) => {
                let name_len = template[i + 1..]
                    .bytes()
                    .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
                    .count();
                if name_len > 0 {
                    groups.push(template[i + 1..i + 1 + name_len].to_string());
                }
                i += name_len + 1;
            }
            None => i += 1,
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_groups() {
        assert_eq!(template_groups("${1}\n${2}x$3"), vec!["1", "2", "3"]);
        assert_eq!(template_groups("$name-${other}"), vec!["name", "other"]);
        assert_eq!(template_groups("cost: $$5"), Vec::<String>::new());
        assert_eq!(template_groups("trailing $"), Vec::<String>::new());
        assert_eq!(template_groups("${}"), Vec::<String>::new());
    }

    #[test]
    fn test_new_rejects_empty_pattern() {
        let result = RewriteRule::new("empty", "", "x");
        assert!(matches!(result, Err(RuleError::EmptyPattern { .. })));
    }

    #[test]
    fn test_new_rejects_invalid_pattern() {
        let result = RewriteRule::new("bad", "(unclosed", "x");
        assert!(matches!(result, Err(RuleError::InvalidPattern { .. })));
    }

    #[test]
    fn test_new_rejects_unknown_numbered_group() {
        let err = RewriteRule::new("r", r"(a)(b)", "${1}${3}").unwrap_err();
        match err {
            RuleError::UnknownGroup { id, group } => {
                assert_eq!(id, "r");
                assert_eq!(group, "3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_new_rejects_unknown_named_group() {
        let result = RewriteRule::new("r", r"(?P<arg>\w+)", "$args");
        assert!(matches!(result, Err(RuleError::UnknownGroup { .. })));
    }

    #[test]
    fn test_new_accepts_named_and_whole_match() {
        let rule = RewriteRule::new("r", r"(?P<arg>\w+)", "[$0|${arg}]").unwrap();
        assert_eq!(rule.pattern(), r"(?P<arg>\w+)");
        assert_eq!(rule.replacement(), "[$0|${arg}]");
    }

    #[test]
    fn test_description() {
        let rule = RewriteRule::new("r", "a", "b")
            .unwrap()
            .with_description("swap a for b");
        assert_eq!(rule.description(), Some("swap a for b"));
    }
}
