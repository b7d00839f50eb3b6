use std::env;
use std::path::PathBuf;

use chrono_tz::Tz;
use qfilter_core::{CompilerOptions, FieldNaming};
use qfilter_lang::ParseLimits;

#[derive(Debug, thiserror::Error)]
#[error("{name} must be {expected}, got '{value}'")]
pub struct ConfigError {
    name: &'static str,
    value: String,
    expected: &'static str,
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Log level (e.g., "info", "debug", "trace").
    pub log_level: String,
    /// JSON schema document describing the queryable entities.
    pub schema_path: PathBuf,
    /// How filter field names map onto attribute names.
    pub field_naming: FieldNaming,
    /// Zone used when binding instants to local or zoned attributes.
    pub time_zone: Tz,
    pub parse_limits: ParseLimits,
    pub max_having_depth: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from any variable source. Unset variables take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ParseLimits::default();
        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT", 3030, "a valid port")?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            schema_path: lookup("SCHEMA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("schema/company.json")),
            field_naming: parse_var(
                &lookup,
                "FIELD_NAMING",
                FieldNaming::SnakeToCamel,
                "'identity' or 'snake_to_camel'",
            )?,
            time_zone: parse_var(&lookup, "DB_TIME_ZONE", chrono_tz::UTC, "an IANA time zone")?,
            parse_limits: ParseLimits {
                max_length: parse_var(
                    &lookup,
                    "MAX_FILTER_LENGTH",
                    defaults.max_length,
                    "a byte count",
                )?,
                max_depth: parse_var(&lookup, "MAX_FILTER_DEPTH", defaults.max_depth, "a depth")?,
            },
            max_having_depth: parse_var(
                &lookup,
                "MAX_HAVING_DEPTH",
                CompilerOptions::default().max_having_depth,
                "a depth",
            )?,
        })
    }

    pub fn compiler_options(&self) -> CompilerOptions {
        CompilerOptions {
            time_zone: self.time_zone,
            max_having_depth: self.max_having_depth,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
    expected: &'static str,
) -> Result<T, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError {
            name,
            value,
            expected,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:3030");
        assert_eq!(config.field_naming, FieldNaming::SnakeToCamel);
        assert_eq!(config.time_zone, chrono_tz::UTC);
        assert_eq!(config.parse_limits, ParseLimits::default());
        assert_eq!(config.max_having_depth, 2);
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("PORT", "8080"),
            ("FIELD_NAMING", "identity"),
            ("DB_TIME_ZONE", "Europe/Oslo"),
            ("MAX_FILTER_LENGTH", "512"),
            ("MAX_HAVING_DEPTH", "1"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.field_naming, FieldNaming::Identity);
        assert_eq!(config.compiler_options().time_zone, chrono_tz::Europe::Oslo);
        assert_eq!(config.parse_limits.max_length, 512);
        assert_eq!(config.compiler_options().max_having_depth, 1);
    }

    #[test]
    fn invalid_values_are_errors() {
        let err = config(&[("PORT", "http")]).unwrap_err();
        assert_eq!(err.to_string(), "PORT must be a valid port, got 'http'");
        assert!(config(&[("DB_TIME_ZONE", "Mars/Olympus")]).is_err());
    }
}
