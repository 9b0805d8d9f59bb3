use crate::rule::{RewriteRule, RuleError, RuleSet};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct RuleSetConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<RuleDefinition>,
}

impl RuleSetConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        let mut seen = HashSet::new();
        for rule in &self.rules {
            let id = rule.id.trim();
            if id.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: None,
                    field: "id",
                });
            } else if !seen.insert(id) {
                issues.push(ValidationIssue::DuplicateId {
                    rule_id: id.to_string(),
                });
            }

            if rule.pattern.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: (!id.is_empty()).then(|| id.to_string()),
                    field: "pattern",
                });
            }

            if rule.replacement.is_none() {
                issues.push(ValidationIssue::MissingField {
                    rule_id: (!id.is_empty()).then(|| id.to_string()),
                    field: "replacement",
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Compile every rule, preserving file order.
    pub fn compile(&self) -> Result<RuleSet, RuleError> {
        let rules = self
            .rules
            .iter()
            .map(RuleDefinition::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RuleSet {
            name: self.meta.name.clone(),
            description: self.meta.description.clone(),
            target: self.meta.target.as_ref().map(PathBuf::from),
            rules,
        })
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Default file to patch, relative to the workspace root
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pattern: String,
    /// Must be spelled out; `''` deletes the match
    #[serde(default)]
    pub replacement: Option<String>,
}

impl RuleDefinition {
    pub fn compile(&self) -> Result<RewriteRule, RuleError> {
        let replacement = self.replacement.clone().unwrap_or_default();
        let rule = RewriteRule::new(self.id.trim(), &self.pattern, replacement)?;
        Ok(match &self.description {
            Some(description) => rule.with_description(description.clone()),
            None => rule,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField {
        rule_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        rule_id: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule set contains no rules"),
            ValidationIssue::MissingField { rule_id, field } => match rule_id {
                Some(id) => write!(f, "rule '{id}' missing required field '{field}'"),
                None => write!(f, "rule missing required field '{field}'"),
            },
            ValidationIssue::DuplicateId { rule_id } => {
                write!(f, "rule id '{rule_id}' is used more than once")
            }
        }
    }
}
