//! Field name transforms applied before paths are resolved.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

pub type FieldTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

pub fn identity() -> FieldTransform {
    Arc::new(|field: &str| field.to_string())
}

pub fn snake_to_camel() -> FieldTransform {
    Arc::new(snake_to_camel_case)
}

/// `year_of_birth` -> `yearOfBirth`, per dotted segment. Letters not after an
/// underscore keep their case, so camelCase input passes through.
pub fn snake_to_camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        match c {
            '_' => upper_next = !out.is_empty() && !out.ends_with('.'),
            '.' => {
                upper_next = false;
                out.push(c);
            }
            _ if upper_next => {
                out.extend(c.to_uppercase());
                upper_next = false;
            }
            _ => out.push(c),
        }
    }
    out
}

/// Named transforms for configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldNaming {
    #[default]
    Identity,
    SnakeToCamel,
}

impl FieldNaming {
    pub fn transform(self) -> FieldTransform {
        match self {
            FieldNaming::Identity => identity(),
            FieldNaming::SnakeToCamel => snake_to_camel(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field naming '{0}', expected 'identity' or 'snake_to_camel'")]
pub struct UnknownFieldNaming(pub String);

impl FromStr for FieldNaming {
    type Err = UnknownFieldNaming;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" => Ok(FieldNaming::Identity),
            "snake_to_camel" => Ok(FieldNaming::SnakeToCamel),
            other => Err(UnknownFieldNaming(other.to_string())),
        }
    }
}

impl fmt::Display for FieldNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldNaming::Identity => f.write_str("identity"),
            FieldNaming::SnakeToCamel => f.write_str("snake_to_camel"),
        }
    }
}
