// Single-entry commands: get, set, delete, has

use std::io::Write;

use serde_json::Value;
use strata_cache::CacheContext;
use tracing::debug;

use super::Command;
use crate::error::{CliError, CliResult};

/// Interpret a command-line value as JSON, falling back to a plain string
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Print the payload stored under a key
pub struct GetCommand {
    pub key: String,
    pub pretty: bool,
}

impl GetCommand {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            pretty: false,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Command for GetCommand {
    fn execute(&self, context: &CacheContext, out: &mut dyn Write) -> CliResult<()> {
        let payload = context
            .cache()
            .fetch(&self.key)?
            .ok_or_else(|| CliError::NotFound {
                key: self.key.clone(),
            })?;

        let rendered = if self.pretty {
            serde_json::to_string_pretty(&payload)?
        } else {
            serde_json::to_string(&payload)?
        };
        writeln!(out, "{rendered}")?;
        Ok(())
    }
}

/// Store a payload under a key
pub struct SetCommand {
    pub key: String,
    pub value: String,
    pub ttl: Option<u64>,
}

impl SetCommand {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<u64>) -> Self {
        self.ttl = ttl;
        self
    }
}

impl Command for SetCommand {
    fn execute(&self, context: &CacheContext, _out: &mut dyn Write) -> CliResult<()> {
        let cache = context.cache();
        let ttl = self.ttl.unwrap_or_else(|| cache.default_ttl());
        let payload = parse_value(&self.value);
        debug!(key = %self.key, ttl, "Storing value from command line");

        if cache.save_with_ttl(&self.key, &payload, ttl)? {
            Ok(())
        } else {
            Err(CliError::Failed(format!(
                "backend '{}' did not store '{}'",
                cache.backend().kind(),
                self.key
            )))
        }
    }
}

/// Remove a key
pub struct DeleteCommand {
    pub key: String,
}

impl DeleteCommand {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for DeleteCommand {
    fn execute(&self, context: &CacheContext, _out: &mut dyn Write) -> CliResult<()> {
        if context.cache().delete(&self.key)? {
            Ok(())
        } else {
            Err(CliError::NotFound {
                key: self.key.clone(),
            })
        }
    }
}

/// Print whether a key is cached
pub struct HasCommand {
    pub key: String,
}

impl HasCommand {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl Command for HasCommand {
    fn execute(&self, context: &CacheContext, out: &mut dyn Write) -> CliResult<()> {
        let present = context.cache().has(&self.key)?;
        writeln!(out, "{present}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value_prefers_json() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value(r#"{"a":[1,2]}"#), json!({"a": [1, 2]}));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("\"quoted\""), json!("quoted"));
    }

    #[test]
    fn test_parse_value_falls_back_to_string() {
        assert_eq!(parse_value("hello world"), json!("hello world"));
        assert_eq!(parse_value("{broken"), json!("{broken"));
        assert_eq!(parse_value(""), json!(""));
    }
}
