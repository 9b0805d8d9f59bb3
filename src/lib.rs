//! Text Patcher: declarative regex rewrites for source files
//!
//! A small patching tool that loads a text file, runs an ordered list of
//! [`RewriteRule`]s over it in memory, and writes the result back once.
//!
//! # Architecture
//!
//! - [`Artifact`] owns the file buffer for one run.
//! - [`RewriteRule`] is plain data: a compiled pattern and a template.
//! - [`patcher`] folds the rules over the buffer in the order given and
//!   persists only when the text changed.
//! - [`config`] loads rule sets from TOML and ships the built-in set.
//!
//! Matching is purely textual. Nothing here understands the grammar of the
//! file being patched; a pattern that over- or under-matches on nested
//! braces does exactly that.
//!
//! # Safety
//!
//! - Nothing is written until every rule has run
//! - Atomic file writes (tempfile + fsync + rename)
//! - Workspace boundary enforcement
//! - UTF-8 validation
//! - Idempotent rule sets leave already-patched files untouched
//!
//! # Example
//!
//! ```
//! use text_patcher::{apply_all, RewriteRule};
//!
//! let rule = RewriteRule::new(
//!     "add-company",
//!     r"getEmailsForUser\(([^,]+),\s*\{",
//!     "getEmailsForUser(${1}, account.companyId, {",
//! )
//! .unwrap();
//!
//! let (patched, applications) = apply_all("getEmailsForUser(userId, {", &[rule]);
//! assert_eq!(patched, "getEmailsForUser(userId, account.companyId, {");
//! assert_eq!(applications[0].matches, 1);
//! ```

pub mod artifact;
pub mod config;
pub mod patcher;
pub mod rule;
pub mod safety;

// Re-exports
pub use artifact::{Artifact, ArtifactError};
pub use config::{
    company_id_rules, load_from_path, load_from_str, load_rule_set, ConfigError, RuleSetConfig,
};
pub use patcher::{
    apply_all, apply_rule, patch_file, plan_file, PatchPlan, PatchResult, RuleApplication,
    RuleOutcome,
};
pub use rule::{RewriteRule, RuleError, RuleSet};
pub use safety::{SafetyError, WorkspaceGuard};
