use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Timelike, Utc};
use chrono_tz::Tz;
use qfilter_lang::{MonthDay, Operator};
use serde::Serialize;

use crate::schema::ScalarType;

/// A value bound to a named query parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum BoundValue {
    Boolean(bool),
    Instant(DateTime<Utc>),
    OffsetDateTime(DateTime<FixedOffset>),
    #[serde(rename_all = "camelCase")]
    ZonedDateTime {
        value: DateTime<FixedOffset>,
        zone: String,
    },
    LocalDateTime(NaiveDateTime),
    LocalDate(NaiveDate),
    LocalTime(NaiveTime),
    #[serde(rename_all = "camelCase")]
    OffsetTime {
        time: NaiveTime,
        offset_seconds: i32,
    },
    Timestamp(DateTime<Utc>),
}

impl BoundValue {
    /// Convert an instant to the representation `target` stores. `None` when
    /// the attribute type holds no point in time.
    pub fn from_instant(instant: DateTime<Utc>, target: ScalarType, zone: Tz) -> Option<Self> {
        let local = instant.with_timezone(&zone);
        let bound = match target {
            ScalarType::Instant => BoundValue::Instant(instant),
            ScalarType::Timestamp => BoundValue::Timestamp(instant),
            ScalarType::OffsetDateTime => BoundValue::OffsetDateTime(instant.fixed_offset()),
            ScalarType::ZonedDateTime => BoundValue::ZonedDateTime {
                value: local.fixed_offset(),
                zone: zone.name().to_string(),
            },
            ScalarType::LocalDateTime => BoundValue::LocalDateTime(local.naive_local()),
            ScalarType::Date => BoundValue::LocalDate(local.date_naive()),
            ScalarType::Time => BoundValue::LocalTime(local.time()),
            ScalarType::OffsetTime => BoundValue::OffsetTime {
                time: local.time(),
                offset_seconds: local.offset().fix().local_minus_utc(),
            },
            ScalarType::String
            | ScalarType::Integer
            | ScalarType::Float
            | ScalarType::Boolean => return None,
        };
        Some(bound)
    }
}

/// Comparison symbol, or `None` for operators that are not a plain comparison.
pub(crate) fn comparison_symbol(operator: Operator) -> Option<&'static str> {
    match operator {
        Operator::Eq => Some("="),
        Operator::Ne => Some("<>"),
        Operator::Gt => Some(">"),
        Operator::Gte => Some(">="),
        Operator::Lt => Some("<"),
        Operator::Lte => Some("<="),
        _ => None,
    }
}

pub(crate) fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Turn a resolved filter pattern into a LIKE pattern. Reserved `\ % _` are
/// escaped, a lone `*` or `?` becomes `%` or `_`, and each doubled wildcard
/// collapses back to one literal character.
pub(crate) fn like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            '*' | '?' => {
                let mut run = 1;
                while chars.next_if_eq(&c).is_some() {
                    run += 1;
                }
                if run == 1 {
                    out.push(if c == '*' { '%' } else { '_' });
                } else {
                    out.extend(std::iter::repeat(c).take(run / 2 + run % 2));
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Month and day comparison. Days only matter when months are equal.
pub(crate) fn month_day_expression(field: &str, operator: Operator, value: MonthDay) -> Option<String> {
    let (m, d) = (value.month(), value.day());
    let month = format!("MONTH({field})");
    let day = format!("DAY({field})");
    let expression = match operator {
        Operator::Eq => format!("({month} = {m} AND {day} = {d})"),
        Operator::Ne => format!("({month} <> {m} OR {day} <> {d})"),
        op => {
            let (strict, inclusive) = ordering_symbols(op)?;
            format!("({month} {strict} {m} OR ({month} = {m} AND {day} {inclusive} {d}))")
        }
    };
    Some(expression)
}

/// Hour, minute and second comparison, nested the same way as month-day.
pub(crate) fn time_expression(field: &str, operator: Operator, value: NaiveTime) -> Option<String> {
    let (h, m, s) = (value.hour(), value.minute(), value.second());
    let hour = format!("HOUR({field})");
    let minute = format!("MINUTE({field})");
    let second = format!("SECOND({field})");
    let expression = match operator {
        Operator::Eq => format!("({hour} = {h} AND {minute} = {m} AND {second} = {s})"),
        Operator::Ne => format!("({hour} <> {h} OR {minute} <> {m} OR {second} <> {s})"),
        op => {
            let (strict, inclusive) = ordering_symbols(op)?;
            format!(
                "({hour} {strict} {h} OR ({hour} = {h} AND \
                 ({minute} {strict} {m} OR ({minute} = {m} AND {second} {inclusive} {s}))))"
            )
        }
    };
    Some(expression)
}

/// (strict symbol for leading components, symbol for the last component)
fn ordering_symbols(operator: Operator) -> Option<(&'static str, &'static str)> {
    match operator {
        Operator::Gt => Some((">", ">")),
        Operator::Gte => Some((">", ">=")),
        Operator::Lt => Some(("<", "<")),
        Operator::Lte => Some(("<", "<=")),
        _ => None,
    }
}
