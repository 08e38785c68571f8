//! Gate configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::ffi::OsString;
use std::path::PathBuf;

use crate::navigator::DEFAULT_MAX_REDIRECTS;
use crate::routes::{RouteError, RouteTable};

pub const ROUTES_FILE_VAR: &str = "VIGILERT_ROUTES_FILE";
pub const MAX_REDIRECTS_VAR: &str = "VIGILERT_MAX_REDIRECTS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// YAML route table; the built-in VigiLERT table when `None`.
    pub routes_file: Option<PathBuf>,
    pub max_redirects: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { routes_file: None, max_redirects: DEFAULT_MAX_REDIRECTS }
    }
}

impl GateConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `VIGILERT_ROUTES_FILE`: path to a YAML route table
    /// - `VIGILERT_MAX_REDIRECTS`: redirect hop limit, default 8
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparsable or non-UTF-8
    /// numbers.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key: &str| std::env::var_os(key))
    }

    /// Build config from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for unparsable or non-UTF-8
    /// numbers. A non-UTF-8 routes file is kept as an untrimmed path.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let routes_file = lookup(ROUTES_FILE_VAR).and_then(|raw| match raw.into_string() {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() { None } else { Some(PathBuf::from(text)) }
            }
            Err(raw) => Some(PathBuf::from(raw)),
        });
        let max_redirects = parse_usize(MAX_REDIRECTS_VAR, lookup(MAX_REDIRECTS_VAR), DEFAULT_MAX_REDIRECTS)?;
        Ok(Self { routes_file, max_redirects })
    }

    /// Load the configured route table.
    ///
    /// # Errors
    ///
    /// Returns the file's read or validation error.
    pub fn load_routes(&self) -> Result<RouteTable, RouteError> {
        match &self.routes_file {
            Some(path) => RouteTable::from_yaml_file(path),
            None => Ok(RouteTable::vigilert()),
        }
    }
}

fn parse_usize(var: &str, raw: Option<OsString>, default: usize) -> Result<usize, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    let invalid = |value: String| ConfigError::InvalidValue { var: var.to_owned(), value };
    let value = raw.into_string().map_err(|raw| invalid(raw.to_string_lossy().into_owned()))?;
    value.trim().parse::<usize>().map_err(|_| invalid(value.clone()))
}
