//! Environment access and override capture.
//!
//! The renderer never reads the process environment itself. The binary
//! captures the variables once through an [`EnvReader`], keeps those that
//! start with the configured prefix, and hands the stripped pairs to the
//! context builder.

use std::collections::BTreeMap;

use crate::cli::{ENV_PREFIX_VAR, MAX_DEPTH_VAR};

/// Abstraction over environment variables.
pub trait EnvReader: Send + Sync {
    /// All variables with valid UTF-8 names and values.
    fn vars(&self) -> Vec<(String, String)>;
}

/// Real environment variable reader.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealEnv;

impl EnvReader for RealEnv {
    fn vars(&self) -> Vec<(String, String)> {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }
}

/// Mock environment variable reader for testing.
#[derive(Debug, Clone, Default)]
pub struct MockEnv {
    vars: BTreeMap<String, String>,
}

impl MockEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an environment variable.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl EnvReader for MockEnv {
    fn vars(&self) -> Vec<(String, String)> {
        self.vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Collects override pairs: prefixed variables with the prefix removed.
///
/// The binary's own settings (`YAMJA_ENV_PREFIX`, `YAMJA_MAX_DEPTH`) and a
/// variable named exactly like the prefix are never overrides.
pub fn overrides(env: &dyn EnvReader, prefix: &str) -> BTreeMap<String, String> {
    env.vars()
        .into_iter()
        .filter(|(name, _)| name != ENV_PREFIX_VAR && name != MAX_DEPTH_VAR)
        .filter_map(|(name, value)| {
            let key = name.strip_prefix(prefix)?;
            (!key.is_empty()).then(|| (key.to_string(), value))
        })
        .collect()
}
