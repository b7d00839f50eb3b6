use qfilter_lang::Sorting;

use super::CompileError;
use crate::schema::SchemaCatalog;
use crate::transform::FieldTransform;

/// `ORDER BY` body for `sorting`, or `None` when there are no criteria.
pub(crate) fn order_by_clause(
    catalog: &dyn SchemaCatalog,
    transform: &FieldTransform,
    entity: &str,
    alias: &str,
    sorting: &Sorting,
) -> Result<Option<String>, CompileError> {
    if sorting.is_empty() {
        return Ok(None);
    }

    let mut terms = Vec::with_capacity(sorting.criteria().len());
    for criterion in sorting.criteria() {
        let field = transform(&criterion.field);
        match catalog.resolve_path(entity, &field) {
            Ok(attribute) if !attribute.is_association() => {}
            _ => return Err(CompileError::IllegalSortField(criterion.field.clone())),
        }

        let qualified = format!("{alias}.{field}");
        let expression = if criterion.direction.is_alphabetic() {
            format!("STR({qualified})")
        } else {
            qualified
        };
        let direction = if criterion.direction.is_descending() {
            "DESC"
        } else {
            "ASC"
        };
        terms.push(format!("{expression} {direction}"));
    }

    let clause = terms.join(", ");
    tracing::debug!(%clause, "translated sorting");
    Ok(Some(clause))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::company;
    use crate::transform::{identity, snake_to_camel};

    #[test]
    fn translates_directions() {
        let catalog = company();
        let sorting = Sorting::parse("-salary,~lastName,~-email,id").unwrap();
        let clause = order_by_clause(&catalog, &identity(), "Employee", "em_0", &sorting)
            .unwrap()
            .unwrap();
        assert_eq!(
            clause,
            "em_0.salary DESC, STR(em_0.lastName) ASC, STR(em_0.email) DESC, em_0.id ASC"
        );
    }

    #[test]
    fn applies_field_transform() {
        let catalog = company();
        let sorting = Sorting::parse("department.name,-year_of_birth").unwrap();
        let clause = order_by_clause(&catalog, &snake_to_camel(), "Employee", "e", &sorting)
            .unwrap()
            .unwrap();
        assert_eq!(clause, "e.department.name ASC, e.yearOfBirth DESC");
    }

    #[test]
    fn rejects_unknown_and_association_fields() {
        let catalog = company();
        for input in ["nope", "department"] {
            let sorting = Sorting::parse(input).unwrap();
            assert_eq!(
                order_by_clause(&catalog, &identity(), "Employee", "e", &sorting),
                Err(CompileError::IllegalSortField(input.to_string()))
            );
        }
    }

    #[test]
    fn empty_sorting_has_no_clause() {
        let catalog = company();
        assert_eq!(
            order_by_clause(&catalog, &identity(), "Employee", "e", &Sorting::default()),
            Ok(None)
        );
    }
}
