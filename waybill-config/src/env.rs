// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Environment variable loader.
///
/// Keys are looked up as `<PREFIX>_<KEY>` in upper case. A loader can also be
/// backed by a fixed map instead of the process environment, which is how the
/// tests exercise it without calling `std::env::set_var`.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
    vars: Option<HashMap<String, String>>,
}

impl EnvLoader {
    /// Create a loader over the process environment.
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix, vars: None }
    }

    /// Create a loader over a fixed set of variables (full names, prefix included).
    pub fn from_vars<I, K, V>(prefix: Option<String>, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            prefix,
            vars: Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    /// Load a `.env` file into the process environment, then read from it.
    ///
    /// A missing default `.env` is not an error; an explicit path that cannot
    /// be read is.
    pub fn with_dotenv(prefix: Option<String>, path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                if dotenvy::dotenv().is_err() {
                    tracing::debug!("No .env file found, using process environment only");
                }
            }
        }
        Ok(Self::new(prefix))
    }

    fn full_key(&self, key: &str) -> String {
        match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        }
    }

    /// Load a specific variable, treating empty values as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        let full_key = self.full_key(key);
        let value = match self.vars {
            Some(ref vars) => vars.get(&full_key).cloned(),
            None => env::var(&full_key).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Load a required variable.
    pub fn load_var(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(self.full_key(key)))
    }

    /// Load with default value
    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parse a variable, falling back to `default` when unset.
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                key: self.full_key(key),
                value: raw,
            }),
            None => Ok(default),
        }
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::new(None)
    }
}
