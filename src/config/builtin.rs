//! Rule sets compiled into the binary.

use crate::config::loader::{compile_str, ConfigError};
use crate::rule::RuleSet;

const COMPANY_ID_TOML: &str = include_str!("../../patches/company-id.toml");

/// The rules run when the binary is invoked without arguments.
pub fn company_id_rules() -> Result<RuleSet, ConfigError> {
    compile_str(COMPANY_ID_TOML)
}
