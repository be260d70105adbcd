//! Configuration read from `lily.toml`.
//!
//! Every field has a default so an empty file (or no file) is a valid
//! configuration. Unknown keys are an error that lists the valid names.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Default hard limit of the VM operand stack, in value slots.
pub const DEFAULT_MAX_STACK_CAPACITY: usize = 1024 * 1024;

/// Default VM heap budget, in bytes.
pub const DEFAULT_HEAP_CAPACITY: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct Conf {
    /// Hard limit of the VM operand stack, in value slots.
    pub stack_capacity: usize,
    /// VM heap budget, in bytes.
    pub heap_capacity: usize,
    /// Overflow-checked integer arithmetic in the VM.
    pub check_overflow: bool,
    /// What kind of package is being built.
    pub status: Status,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Main,
    Library,
    SubPackage,
}

impl Default for Conf {
    fn default() -> Self {
        Conf {
            stack_capacity: DEFAULT_MAX_STACK_CAPACITY,
            heap_capacity: DEFAULT_HEAP_CAPACITY,
            check_overflow: true,
            status: Status::Main,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfError {
    #[error("failed to read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl Conf {
    pub fn from_toml(text: &str) -> Result<Self, ConfError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfError> {
        let text = fs::read_to_string(path).map_err(|source| ConfError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Conf::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_input_is_all_defaults() {
        let conf = Conf::from_toml("").unwrap();
        assert_eq!(conf, Conf::default());
        assert!(conf.check_overflow);
        assert_eq!(conf.stack_capacity, DEFAULT_MAX_STACK_CAPACITY);
    }

    #[test]
    fn fields_override_individually() {
        let conf = Conf::from_toml(
            r#"
            check_overflow = false
            stack_capacity = 4096
            status = "library"
            "#,
        )
        .unwrap();
        assert!(!conf.check_overflow);
        assert_eq!(conf.stack_capacity, 4096);
        assert_eq!(conf.status, Status::Library);
        assert_eq!(conf.heap_capacity, DEFAULT_HEAP_CAPACITY);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Conf::from_toml("stak_capacity = 1").unwrap_err();
        assert!(matches!(err, ConfError::Parse(_)));
        assert!(err.to_string().contains("stak_capacity"));
    }
}
