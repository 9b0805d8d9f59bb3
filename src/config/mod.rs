pub mod builtin;
pub mod loader;
pub mod schema;

pub use builtin::company_id_rules;
pub use loader::{
    compile_str, discover_rule_files, load_from_path, load_from_str, load_rule_set, ConfigError,
};
pub use schema::{Metadata, RuleDefinition, RuleSetConfig, ValidationError, ValidationIssue};
