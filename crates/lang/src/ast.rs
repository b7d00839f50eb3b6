use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::Serialize;

/// Filter operators and their textual tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    And,
    Or,
    Not,
    In,
    Nin,
    Null,
    NNull,
}

impl Operator {
    pub const ALL: [Operator; 14] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Like,
        Operator::And,
        Operator::Or,
        Operator::Not,
        Operator::In,
        Operator::Nin,
        Operator::Null,
        Operator::NNull,
    ];

    /// The canonical token, e.g. `$eq:`.
    pub fn token(self) -> &'static str {
        match self {
            Operator::Eq => "$eq:",
            Operator::Ne => "$ne:",
            Operator::Gt => "$gt:",
            Operator::Gte => "$gte:",
            Operator::Lt => "$lt:",
            Operator::Lte => "$lte:",
            Operator::Like => "$like:",
            Operator::And => "$and:",
            Operator::Or => "$or:",
            Operator::Not => "$not:",
            Operator::In => "$in:",
            Operator::Nin => "$nin:",
            Operator::Null => "$null:",
            Operator::NNull => "$nnull:",
        }
    }

    /// Exact token match.
    pub fn from_token(token: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.token() == token)
    }

    /// EQ, NE, GT, GTE, LT or LTE.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::Ne
                | Operator::Gt
                | Operator::Gte
                | Operator::Lt
                | Operator::Lte
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// The two operators a [`ConditionGroup`] can combine its children with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

impl From<LogicalOperator> for Operator {
    fn from(op: LogicalOperator) -> Self {
        match op {
            LogicalOperator::And => Operator::And,
            LogicalOperator::Or => Operator::Or,
        }
    }
}

impl LogicalOperator {
    pub fn token(self) -> &'static str {
        Operator::from(self).token()
    }
}

/// Month and day of month without a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    /// February 29th is accepted.
    pub fn new(month: u32, day: u32) -> Option<Self> {
        let max_day = match month {
            1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
            4 | 6 | 9 | 11 => 30,
            2 => 29,
            _ => return None,
        };
        (1..=max_day).contains(&day).then_some(Self { month, day })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}

impl fmt::Display for MonthDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "--{:02}-{:02}", self.month, self.day)
    }
}

/// A typed literal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum Value {
    String(String),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    MonthDay(MonthDay),
    Year(i32),
    UtcInstant(DateTime<Utc>),
}

impl Value {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Long(_) => "Long",
            Value::Double(_) => "Double",
            Value::Boolean(_) => "Boolean",
            Value::Date(_) => "Date",
            Value::Time(_) => "Time",
            Value::DateTime(_) => "DateTime",
            Value::MonthDay(_) => "MonthDay",
            Value::Year(_) => "Year",
            Value::UtcInstant(_) => "UtcInstant",
        }
    }
}

/// Renders the value in a form the parser reads back as the same variant.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Long(n) => write!(f, "{n}"),
            Value::Double(n) => {
                // Positional, never exponent form, and always with a fraction.
                let text = n.to_string();
                if n.is_finite() && !text.contains('.') {
                    write!(f, "{text}.0")
                } else {
                    f.write_str(&text)
                }
            }
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::MonthDay(md) => write!(f, "{md}"),
            Value::Year(y) => write!(f, "{y:04}--"),
            Value::UtcInstant(i) => f.write_str(&i.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

/// Aggregates usable in a having-function condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn name(self) -> &'static str {
        match self {
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }

    /// Case-insensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        [
            AggregateFunction::Count,
            AggregateFunction::Sum,
            AggregateFunction::Avg,
            AggregateFunction::Min,
            AggregateFunction::Max,
        ]
        .into_iter()
        .find(|f| f.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `field operator value`, or `field $null:` / `field $nnull:` without a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleCondition {
    pub field: String,
    pub operator: Operator,
    pub value: Option<Value>,
}

/// `field $in: [values]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InListCondition {
    pub field: String,
    pub values: Vec<Value>,
}

impl InListCondition {
    pub fn operator(&self) -> Operator {
        Operator::In
    }
}

/// `field $nin: [values]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotInListCondition {
    pub field: String,
    pub values: Vec<Value>,
}

impl NotInListCondition {
    pub fn operator(&self) -> Operator {
        Operator::Nin
    }
}

/// `$not: condition`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotCondition {
    pub condition: Box<Condition>,
}

/// Two or more conditions joined by AND or OR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionGroup {
    operator: LogicalOperator,
    conditions: Vec<Condition>,
}

impl ConditionGroup {
    pub fn new(operator: LogicalOperator, left: Condition, right: Condition) -> Self {
        Self {
            operator,
            conditions: vec![left, right],
        }
    }

    /// Returns `None` for fewer than two conditions.
    pub fn from_conditions(operator: LogicalOperator, conditions: Vec<Condition>) -> Option<Self> {
        (conditions.len() >= 2).then_some(Self {
            operator,
            conditions,
        })
    }

    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

/// `$having: field(sub-filter)` over a to-many relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HavingCondition {
    pub field: String,
    pub sub_filter: Box<Filter>,
}

/// `$having: FUNCTION(field) operator number` over a to-many relationship.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HavingFunctionCondition {
    pub field: String,
    pub function: AggregateFunction,
    pub operator: Operator,
    pub value: Value,
}

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Simple(SimpleCondition),
    InList(InListCondition),
    NotInList(NotInListCondition),
    Not(NotCondition),
    Group(ConditionGroup),
    Having(HavingCondition),
    HavingFunction(HavingFunctionCondition),
}

impl Condition {
    pub fn simple(field: impl Into<String>, operator: Operator, value: Option<Value>) -> Self {
        Condition::Simple(SimpleCondition {
            field: field.into(),
            operator,
            value,
        })
    }

    pub fn in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::InList(InListCondition {
            field: field.into(),
            values,
        })
    }

    pub fn not_in_list(field: impl Into<String>, values: Vec<Value>) -> Self {
        Condition::NotInList(NotInListCondition {
            field: field.into(),
            values,
        })
    }

    pub fn negate(condition: Condition) -> Self {
        Condition::Not(NotCondition {
            condition: Box::new(condition),
        })
    }

    pub fn and(left: Condition, right: Condition) -> Self {
        Condition::Group(ConditionGroup::new(LogicalOperator::And, left, right))
    }

    pub fn or(left: Condition, right: Condition) -> Self {
        Condition::Group(ConditionGroup::new(LogicalOperator::Or, left, right))
    }
}

/// A parsed filter. Only [`crate::parse`] creates one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Filter {
    root: Condition,
}

impl Filter {
    pub(crate) fn new(root: Condition) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Condition {
        &self.root
    }
}
