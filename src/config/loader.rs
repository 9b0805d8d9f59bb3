use crate::config::schema::{RuleSetConfig, ValidationError};
use crate::rule::{RuleError, RuleSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
    Rule {
        path: Option<PathBuf>,
        source: RuleError,
    },
    Discovery {
        path: PathBuf,
        source: walkdir::Error,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            ConfigError::Rule { path: None, source } => ConfigError::Rule {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read rule file {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(
                    f,
                    "failed to parse rule file TOML ({}): {}",
                    path.display(),
                    source
                ),
                None => write!(f, "failed to parse rule file TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid rule file ({}): {}", path.display(), source),
                None => write!(f, "invalid rule file: {}", source),
            },
            ConfigError::Rule { path, source } => match path {
                Some(path) => write!(f, "{} ({})", source, path.display()),
                None => write!(f, "{}", source),
            },
            ConfigError::Discovery { path, source } => {
                write!(f, "failed to scan {} for rule files: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
            ConfigError::Rule { source, .. } => Some(source),
            ConfigError::Discovery { source, .. } => Some(source),
        }
    }
}

pub fn load_from_str(input: &str) -> Result<RuleSetConfig, ConfigError> {
    let config: RuleSetConfig = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    config
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RuleSetConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// Parse, validate and compile a rule set from TOML text.
pub fn compile_str(input: &str) -> Result<RuleSet, ConfigError> {
    load_from_str(input)?
        .compile()
        .map_err(|source| ConfigError::Rule { path: None, source })
}

/// Load and compile the rule set in `path`.
pub fn load_rule_set(path: impl AsRef<Path>) -> Result<RuleSet, ConfigError> {
    let path = path.as_ref();
    load_from_path(path)?
        .compile()
        .map_err(|source| ConfigError::Rule {
            path: Some(path.to_path_buf()),
            source,
        })
}

/// `*.toml` files directly inside `dir`, sorted by path.
pub fn discover_rule_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, ConfigError> {
    let dir = dir.as_ref();
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|source| ConfigError::Discovery {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_str_minimal() {
        let config = load_from_str(
            r#"
[[rules]]
id = "r"
pattern = 'a'
replacement = ''
"#,
        )
        .unwrap();
        assert_eq!(config.rules.len(), 1);
        assert_eq!(config.rules[0].replacement.as_deref(), Some(""));
        assert!(config.meta.target.is_none());
    }

    #[test]
    fn test_load_from_str_bad_toml() {
        let result = load_from_str("[[rules]\nid = ");
        assert!(matches!(result, Err(ConfigError::Toml { path: None, .. })));
    }

    #[test]
    fn test_load_from_str_unknown_top_level_table() {
        let result = load_from_str("[metadata]\nname = \"x\"\n");
        assert!(matches!(result, Err(ConfigError::Toml { path: None, .. })));
    }

    #[test]
    fn test_compile_str_unknown_group() {
        let result = compile_str(
            r#"
[[rules]]
id = "r"
pattern = '(a)'
replacement = '$2'
"#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::Rule {
                source: RuleError::UnknownGroup { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_load_from_path_attaches_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("empty.toml");
        fs::write(&file, "[meta]\nname = \"nothing\"\n").unwrap();

        let err = load_from_path(&file).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { path: Some(_), .. }));
        assert!(err.to_string().contains("empty.toml"));
    }

    #[test]
    fn test_discover_rule_files_sorted_and_filtered() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("b.toml"), "").unwrap();
        fs::write(temp_dir.path().join("a.toml"), "").unwrap();
        fs::write(temp_dir.path().join("notes.md"), "").unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("nested/c.toml"), "").unwrap();

        let files = discover_rule_files(temp_dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.toml", "b.toml"]);
    }
}
