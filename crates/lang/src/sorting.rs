use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SortingError {
    #[error("empty sort field at position {0}")]
    EmptyField(usize),
}

/// Sort direction, written as a prefix on the field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// No prefix.
    Asc,
    /// `-`
    Desc,
    /// `~`, compares the textual form.
    AscAlpha,
    /// `~-`
    DescAlpha,
}

impl Direction {
    pub fn prefix(self) -> &'static str {
        match self {
            Direction::Asc => "",
            Direction::Desc => "-",
            Direction::AscAlpha => "~",
            Direction::DescAlpha => "~-",
        }
    }

    pub fn is_descending(self) -> bool {
        matches!(self, Direction::Desc | Direction::DescAlpha)
    }

    pub fn is_alphabetic(self) -> bool {
        matches!(self, Direction::AscAlpha | Direction::DescAlpha)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortCriterion {
    pub field: String,
    pub direction: Direction,
}

/// An ordered list of sort criteria, e.g. `-createdAt,~name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sorting {
    criteria: Vec<SortCriterion>,
}

impl Sorting {
    pub const QUERY_PARAM: &'static str = "sort";

    pub fn new(criteria: Vec<SortCriterion>) -> Self {
        Self { criteria }
    }

    pub fn parse(input: &str) -> Result<Self, SortingError> {
        let mut criteria = Vec::new();
        for (index, component) in input.split(',').enumerate() {
            let component = component.trim();
            let (direction, field) = if let Some(field) = component.strip_prefix("~-") {
                (Direction::DescAlpha, field)
            } else if let Some(field) = component.strip_prefix('~') {
                (Direction::AscAlpha, field)
            } else if let Some(field) = component.strip_prefix('-') {
                (Direction::Desc, field)
            } else {
                (Direction::Asc, component)
            };
            if field.is_empty() {
                return Err(SortingError::EmptyField(index));
            }
            criteria.push(SortCriterion {
                field: field.to_string(),
                direction,
            });
        }
        tracing::trace!(input, count = criteria.len(), "parsed sorting");
        Ok(Self { criteria })
    }

    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Sorting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, c) in self.criteria.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}{}", c.direction.prefix(), c.field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_directions() {
        let sorting = Sorting::parse("-createdAt,~name,~-lastName,id").unwrap();
        let directions: Vec<_> = sorting.criteria().iter().map(|c| c.direction).collect();
        assert_eq!(
            directions,
            [Direction::Desc, Direction::AscAlpha, Direction::DescAlpha, Direction::Asc]
        );
        assert_eq!(sorting.criteria()[2].field, "lastName");
    }

    #[test]
    fn as_string_round_trips() {
        let input = "-createdAt,~name,~-lastName,id";
        assert_eq!(Sorting::parse(input).unwrap().as_string(), input);
    }

    #[test]
    fn empty_field_is_rejected() {
        assert_eq!(Sorting::parse("name,-"), Err(SortingError::EmptyField(1)));
        assert_eq!(Sorting::parse(""), Err(SortingError::EmptyField(0)));
    }
}
