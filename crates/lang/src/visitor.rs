//! Visitor framework over the filter tree.
//!
//! Implementors override the handlers they care about. The default handler for
//! a [`ConditionGroup`] visits each child in order; every other default does
//! nothing.

use crate::ast::{
    Condition, ConditionGroup, Filter, HavingCondition, HavingFunctionCondition,
    InListCondition, NotCondition, NotInListCondition, SimpleCondition,
};

pub trait FilterVisitor {
    type Error;

    fn visit(&mut self, condition: &Condition) -> Result<(), Self::Error> {
        dispatch(self, condition)
    }

    fn visit_simple(&mut self, _condition: &SimpleCondition) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_in_list(&mut self, _condition: &InListCondition) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_not_in_list(&mut self, _condition: &NotInListCondition) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_not(&mut self, _condition: &NotCondition) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_group(&mut self, group: &ConditionGroup) -> Result<(), Self::Error> {
        for condition in group.conditions() {
            self.visit(condition)?;
        }
        Ok(())
    }

    fn visit_having(&mut self, _condition: &HavingCondition) -> Result<(), Self::Error> {
        Ok(())
    }

    fn visit_having_function(
        &mut self,
        _condition: &HavingFunctionCondition,
    ) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Route `condition` to the handler for its variant.
pub fn dispatch<V: FilterVisitor + ?Sized>(
    visitor: &mut V,
    condition: &Condition,
) -> Result<(), V::Error> {
    match condition {
        Condition::Simple(c) => visitor.visit_simple(c),
        Condition::InList(c) => visitor.visit_in_list(c),
        Condition::NotInList(c) => visitor.visit_not_in_list(c),
        Condition::Not(c) => visitor.visit_not(c),
        Condition::Group(c) => visitor.visit_group(c),
        Condition::Having(c) => visitor.visit_having(c),
        Condition::HavingFunction(c) => visitor.visit_having_function(c),
    }
}

impl Filter {
    /// Walk the tree from the root condition.
    pub fn accept<V: FilterVisitor + ?Sized>(&self, visitor: &mut V) -> Result<(), V::Error> {
        visitor.visit(self.root())
    }
}
