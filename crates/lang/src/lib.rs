//! The filter language: a URL-safe predicate syntax such as
//! `name$like:Jo*$and:$having:COUNT(employees)$gt:10`, parsed into an immutable
//! [`Filter`] tree that visitors print, validate or compile.

pub mod ast;
pub mod escape;
pub mod instant;
pub mod lexer;
mod literal;
pub mod pagination;
pub mod parser;
pub mod print;
pub mod sorting;
pub mod validate;
pub mod visitor;

pub use ast::{
    AggregateFunction, Condition, ConditionGroup, Filter, HavingCondition,
    HavingFunctionCondition, InListCondition, LogicalOperator, MonthDay, NotCondition,
    NotInListCondition, Operator, SimpleCondition, Value,
};
pub use instant::{parse_instant, parse_instant_in, DateTimeError};
pub use lexer::LexError;
pub use pagination::{Pagination, PaginationError};
pub use parser::{parse, parse_with_limits, ParseError, ParseLimits};
pub use print::{PrintFormat, PrintVisitor};
pub use sorting::{Direction, SortCriterion, Sorting, SortingError};
pub use validate::{ValidationError, ValidationVisitor};
pub use visitor::FilterVisitor;
