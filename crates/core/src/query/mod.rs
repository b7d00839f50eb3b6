//! Filter and sorting compilation into JPQL-style query text.

mod compiler;
mod context;
mod sorting;
mod value;

pub use compiler::QueryCompiler;
pub use context::CompilationContext;
pub use value::BoundValue;

use std::collections::BTreeMap;

use chrono_tz::Tz;
use qfilter_lang::Operator;
use serde::Serialize;

use crate::schema::PathError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    #[error("invalid field '{field}' for entity '{entity}': {source}")]
    InvalidField {
        entity: String,
        field: String,
        #[source]
        source: PathError,
    },

    #[error("field '{0}' does not navigate a collection")]
    NotACollection(String),

    #[error("no target type for '{0}'")]
    NoTargetType(String),

    #[error("no inverse attribute for '{field}' on '{target}'")]
    NoInverseAttribute { field: String, target: String },

    #[error("no identifier attribute for entity '{0}'")]
    NoIdentifier(String),

    #[error("function path '{0}' may have at most one segment after the collection")]
    MultiHopFunctionPath(String),

    #[error("{function} on '{field}' needs an attribute of the collection")]
    MissingAggregateField { function: String, field: String },

    #[error("illegal operator {operator} for {value_type} value")]
    IllegalOperator {
        operator: Operator,
        value_type: &'static str,
    },

    #[error("illegal list value of type {0}")]
    IllegalListValue(&'static str),

    #[error("operator {operator} on '{field}' requires a value")]
    MissingValue { field: String, operator: Operator },

    #[error("having conditions nest deeper than {max} levels")]
    NestingNotAllowed { max: usize },

    #[error("cannot bind an instant to '{field}' of type {target}")]
    UnsupportedTemporalTarget { field: String, target: String },

    #[error("cannot sort on '{0}'")]
    IllegalSortField(String),

    #[error("having path '{0}' must end at the collection")]
    InvalidHavingPath(String),
}

/// Knobs for a single compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerOptions {
    /// Zone used when an instant is bound to a local or zoned attribute.
    pub time_zone: Tz,
    /// Levels of `$having:` nesting allowed; 1 forbids a having inside a
    /// having sub-filter.
    pub max_having_depth: usize,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            time_zone: chrono_tz::UTC,
            max_having_depth: 2,
        }
    }
}

/// Everything a caller needs to run a compiled filter elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledQuery {
    pub query: String,
    pub count_query: String,
    pub where_clause: String,
    pub parameters: BTreeMap<String, BoundValue>,
    pub offset: u64,
    pub limit: u64,
}
