//! Patch applier - runs an ordered rule list over one file.
//!
//! This module provides:
//! - Pure string transforms ([`apply_rule`], [`apply_all`])
//! - In-memory planning against a file ([`plan_file`])
//! - Persisting the plan only when something changed ([`PatchPlan::commit`])

use crate::artifact::{Artifact, ArtifactError};
use crate::rule::RewriteRule;
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output of a single rule over some text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOutcome<'t> {
    /// Borrowed when the rule matched nothing
    pub content: Cow<'t, str>,
    pub matches: usize,
}

/// How many times one rule fired during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleApplication {
    pub rule_id: String,
    pub matches: usize,
}

/// Result of patching a single file
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for applied/already-applied"]
pub enum PatchResult {
    /// At least one rule matched and the file was rewritten
    Applied {
        file: PathBuf,
        applications: Vec<RuleApplication>,
    },
    /// No rule matched; the file was left alone
    AlreadyApplied { file: PathBuf },
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied { file, applications } => {
                let total: usize = applications.iter().map(|a| a.matches).sum();
                write!(f, "Applied {} replacement(s) to {}", total, file.display())
            }
            PatchResult::AlreadyApplied { file } => {
                write!(f, "Already applied to {}", file.display())
            }
        }
    }
}

/// Replace every non-overlapping match of `rule` in `text`.
///
/// Captured groups are expanded into the template. When nothing matches the
/// input is returned borrowed and unchanged.
pub fn apply_rule<'t>(text: &'t str, rule: &RewriteRule) -> RuleOutcome<'t> {
    let mut out = String::new();
    let mut last_end = 0;
    let mut matches = 0;

    for caps in rule.regex().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        out.push_str(&text[last_end..whole.start()]);
        caps.expand(rule.replacement(), &mut out);
        last_end = whole.end();
        matches += 1;
    }

    debug!(rule = rule.id(), matches, "applied rewrite rule");

    if matches == 0 {
        return RuleOutcome {
            content: Cow::Borrowed(text),
            matches,
        };
    }

    out.push_str(&text[last_end..]);
    RuleOutcome {
        content: Cow::Owned(out),
        matches,
    }
}

/// Fold [`apply_rule`] over `rules` in order.
///
/// Each rule sees the output of the one before it; the list is never
/// reordered.
pub fn apply_all(text: &str, rules: &[RewriteRule]) -> (String, Vec<RuleApplication>) {
    let mut artifact = Artifact::new(PathBuf::new(), text);
    let applications = artifact.apply_all(rules);
    (artifact.into_content(), applications)
}

/// A file with every rule applied in memory, not yet written.
#[derive(Debug, Clone)]
#[must_use = "PatchPlan does nothing until commit() is called"]
pub struct PatchPlan {
    original: String,
    artifact: Artifact,
    applications: Vec<RuleApplication>,
}

impl PatchPlan {
    pub fn file(&self) -> &Path {
        self.artifact.path()
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn patched(&self) -> &str {
        self.artifact.content()
    }

    pub fn applications(&self) -> &[RuleApplication] {
        &self.applications
    }

    pub fn total_matches(&self) -> usize {
        self.applications.iter().map(|a| a.matches).sum()
    }

    pub fn has_changes(&self) -> bool {
        self.original != self.artifact.content()
    }

    /// Write the patched text back if it differs from what was loaded.
    pub fn commit(self) -> Result<PatchResult, ArtifactError> {
        let file = self.artifact.path().to_path_buf();
        if !self.has_changes() {
            return Ok(PatchResult::AlreadyApplied { file });
        }

        self.artifact.save()?;
        Ok(PatchResult::Applied {
            file,
            applications: self.applications,
        })
    }
}

/// Load `path` and run `rules` over it without touching the file.
pub fn plan_file(
    path: impl AsRef<Path>,
    rules: &[RewriteRule],
) -> Result<PatchPlan, ArtifactError> {
    let mut artifact = Artifact::load(path)?;
    let original = artifact.content().to_string();
    let applications = artifact.apply_all(rules);

    Ok(PatchPlan {
        original,
        artifact,
        applications,
    })
}

/// Load, transform and persist `path` in one go.
pub fn patch_file(
    path: impl AsRef<Path>,
    rules: &[RewriteRule],
) -> Result<PatchResult, ArtifactError> {
    plan_file(path, rules)?.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn rule(id: &str, pattern: &str, replacement: &str) -> RewriteRule {
        RewriteRule::new(id, pattern, replacement).unwrap()
    }

    #[test]
    fn test_apply_rule_expands_groups() {
        let r = rule("swap", r"(\w+)=(\w+)", "${2}=${1}");
        let outcome = apply_rule("a=b; c=d", &r);
        assert_eq!(outcome.content, "b=a; d=c");
        assert_eq!(outcome.matches, 2);
    }

    #[test]
    fn test_apply_rule_no_match_borrows() {
        let r = rule("none", "zzz", "y");
        let outcome = apply_rule("abc", &r);
        assert!(matches!(outcome.content, Cow::Borrowed("abc")));
        assert_eq!(outcome.matches, 0);
    }

    #[test]
    fn test_apply_all_is_order_sensitive() {
        let a_to_b = rule("a-to-b", "a", "b");
        let b_to_c = rule("b-to-c", "b", "c");

        let (forward, _) = apply_all("a", &[a_to_b.clone(), b_to_c.clone()]);
        let (reverse, _) = apply_all("a", &[b_to_c, a_to_b]);

        assert_eq!(forward, "c");
        assert_eq!(reverse, "b");
    }

    #[test]
    fn test_apply_all_empty_rule_list() {
        let (content, applications) = apply_all("unchanged", &[]);
        assert_eq!(content, "unchanged");
        assert!(applications.is_empty());
    }

    #[test]
    fn test_plan_does_not_write() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("a.ts");
        fs::write(&file_path, "foo()").unwrap();

        let plan = plan_file(&file_path, &[rule("r", "foo", "bar")]).unwrap();
        assert!(plan.has_changes());
        assert_eq!(plan.original(), "foo()");
        assert_eq!(plan.patched(), "bar()");
        assert_eq!(plan.total_matches(), 1);
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "foo()");
    }

    #[test]
    fn test_patch_file_applied_then_already_applied() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("a.ts");
        fs::write(&file_path, "foo(1)").unwrap();
        let rules = [rule("r", r"foo\((\d)\)", "foo($1, 2)")];

        let first = patch_file(&file_path, &rules).unwrap();
        assert!(matches!(first, PatchResult::Applied { .. }));
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "foo(1, 2)");

        let second = patch_file(&file_path, &rules).unwrap();
        assert!(matches!(second, PatchResult::AlreadyApplied { .. }));
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "foo(1, 2)");
    }

    #[test]
    fn test_matches_that_cancel_out_are_not_written() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("a.ts");
        fs::write(&file_path, "x").unwrap();

        let rules = [rule("x-to-y", "x", "y"), rule("y-to-x", "y", "x")];
        let plan = plan_file(&file_path, &rules).unwrap();
        assert_eq!(plan.total_matches(), 2);
        assert!(!plan.has_changes());
        assert!(matches!(
            plan.commit().unwrap(),
            PatchResult::AlreadyApplied { .. }
        ));
    }

    #[test]
    fn test_identity_rewrite_is_not_a_change() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("a.ts");
        fs::write(&file_path, "foo(); foo();").unwrap();

        let same = plan_file(&file_path, &[rule("same", "(foo)", "${1}")]).unwrap();
        assert_eq!(same.total_matches(), 2);
        assert!(!same.has_changes());

        // One byte of difference is enough to write
        let tweaked = plan_file(&file_path, &[rule("tweak", r"foo\(\);$", "foo();\n")]).unwrap();
        assert_eq!(tweaked.original(), "foo(); foo();");
        assert!(tweaked.has_changes());
        assert!(matches!(tweaked.commit().unwrap(), PatchResult::Applied { .. }));
        assert_eq!(fs::read_to_string(&file_path).unwrap(), "foo(); foo();\n");
    }

    #[test]
    fn test_patch_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = patch_file(temp_dir.path().join("missing.ts"), &[]);
        assert!(matches!(result, Err(ArtifactError::Read { .. })));
    }

    #[test]
    fn test_patch_result_display() {
        let applied = PatchResult::Applied {
            file: PathBuf::from("/tmp/a.ts"),
            applications: vec![RuleApplication {
                rule_id: "r".to_string(),
                matches: 3,
            }],
        };
        assert!(applied.to_string().contains("Applied 3"));

        let already = PatchResult::AlreadyApplied {
            file: PathBuf::from("/tmp/a.ts"),
        };
        assert!(already.to_string().contains("Already applied"));
    }
}
