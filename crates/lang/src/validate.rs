use crate::ast::{Filter, InListCondition, NotCondition, NotInListCondition, SimpleCondition};
use crate::visitor::FilterVisitor;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} condition not allowed")]
    NotAllowed(&'static str),
}

/// Accepts only groups of having conditions.
#[derive(Debug, Default)]
pub struct ValidationVisitor;

impl FilterVisitor for ValidationVisitor {
    type Error = ValidationError;

    fn visit_simple(&mut self, _condition: &SimpleCondition) -> Result<(), ValidationError> {
        Err(ValidationError::NotAllowed("Simple"))
    }

    fn visit_in_list(&mut self, _condition: &InListCondition) -> Result<(), ValidationError> {
        Err(ValidationError::NotAllowed("InList"))
    }

    fn visit_not_in_list(&mut self, _condition: &NotInListCondition) -> Result<(), ValidationError> {
        Err(ValidationError::NotAllowed("NotInList"))
    }

    fn visit_not(&mut self, _condition: &NotCondition) -> Result<(), ValidationError> {
        Err(ValidationError::NotAllowed("Not"))
    }
}

impl Filter {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.accept(&mut ValidationVisitor)
    }
}
