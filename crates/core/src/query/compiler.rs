use qfilter_lang::{
    ConditionGroup, Filter, FilterVisitor, HavingCondition, HavingFunctionCondition,
    InListCondition, LogicalOperator, NotCondition, NotInListCondition, Operator, Pagination,
    SimpleCondition, Sorting, Value,
};

use super::context::CompilationContext;
use super::sorting::order_by_clause;
use super::value::{comparison_symbol, like_pattern, month_day_expression, quote, time_expression};
use super::{BoundValue, CompileError, CompiledQuery, CompilerOptions};
use crate::schema::{Attribute, SchemaCatalog};
use crate::transform::{self, FieldTransform};

/// Compiles filters rooted at one entity into a `WHERE` clause, plus select
/// and count queries around it.
///
/// Accepting several filters joins them with `AND`. A failed `accept` leaves
/// the compiler as it was.
pub struct QueryCompiler<'a> {
    entity: String,
    alias: String,
    catalog: &'a dyn SchemaCatalog,
    transform: FieldTransform,
    options: CompilerOptions,
    context: CompilationContext,
    where_clause: String,
    order_by: Option<String>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(
        entity: impl Into<String>,
        catalog: &'a dyn SchemaCatalog,
    ) -> Result<Self, CompileError> {
        let entity = entity.into();
        if !catalog.has_type(&entity) {
            return Err(CompileError::UnknownEntity(entity));
        }
        let mut context = CompilationContext::new();
        let alias = context.next_alias(&entity);
        Ok(Self {
            entity,
            alias,
            catalog,
            transform: transform::identity(),
            options: CompilerOptions::default(),
            context,
            where_clause: String::new(),
            order_by: None,
        })
    }

    /// Use `alias` for the root entity instead of the generated one.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.context.release_alias(&self.alias);
        self.alias = alias.into();
        self.context.register_alias(&self.alias);
        self
    }

    pub fn with_field_transform(mut self, transform: FieldTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_options(mut self, options: CompilerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn accept(&mut self, filter: &Filter) -> Result<(), CompileError> {
        let mut context = self.context.clone();
        let mut translator = Translator {
            catalog: self.catalog,
            transform: &self.transform,
            options: &self.options,
            entity: self.entity.clone(),
            alias: self.alias.clone(),
            context: &mut context,
            out: String::new(),
        };
        filter.accept(&mut translator)?;
        let clause = translator.out;

        self.context = context;
        if self.where_clause.is_empty() {
            self.where_clause = clause;
        } else {
            self.where_clause = format!("{} AND {clause}", self.where_clause);
        }
        tracing::debug!(entity = %self.entity, where_clause = %self.where_clause, "compiled filter");
        Ok(())
    }

    /// Replace the ordering appended by [`to_query`](Self::to_query).
    pub fn order_by(&mut self, sorting: &Sorting) -> Result<(), CompileError> {
        self.order_by = order_by_clause(
            self.catalog,
            &self.transform,
            &self.entity,
            &self.alias,
            sorting,
        )?;
        Ok(())
    }

    pub fn where_clause(&self) -> &str {
        &self.where_clause
    }

    pub fn to_query(&self) -> String {
        let mut query = self.select(&self.alias);
        if let Some(order_by) = &self.order_by {
            query.push_str(" ORDER BY ");
            query.push_str(order_by);
        }
        query
    }

    pub fn to_count_query(&self) -> String {
        self.select(&format!("COUNT({})", self.alias))
    }

    pub fn parameters(&self) -> &std::collections::BTreeMap<String, BoundValue> {
        self.context.parameters()
    }

    /// One-shot compilation of an optional filter, optional sorting and a page.
    pub fn compile(
        mut self,
        filter: Option<&Filter>,
        sorting: Option<&Sorting>,
        pagination: &Pagination,
    ) -> Result<CompiledQuery, CompileError> {
        if let Some(filter) = filter {
            self.accept(filter)?;
        }
        if let Some(sorting) = sorting {
            self.order_by(sorting)?;
        }
        let compiled = CompiledQuery {
            query: self.to_query(),
            count_query: self.to_count_query(),
            where_clause: self.where_clause.clone(),
            parameters: self.context.parameters().clone(),
            offset: pagination.offset(),
            limit: pagination.size(),
        };
        tracing::debug!(query = %compiled.query, parameters = compiled.parameters.len(), "compiled query");
        Ok(compiled)
    }

    fn select(&self, projection: &str) -> String {
        let mut query = format!("SELECT {projection} FROM {} {}", self.entity, self.alias);
        if !self.where_clause.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&self.where_clause);
        }
        query
    }
}

/// The collection hop of a having path.
struct CollectionHop<'c> {
    /// Alias-qualified expression for the entity owning the collection.
    owner: String,
    owner_type: &'c str,
    target: &'c str,
    inverse: &'c Attribute,
    /// Path segments after the collection.
    rest: Vec<&'c str>,
}

/// Visitor that writes one filter, rooted at `entity`/`alias`, into `out`.
struct Translator<'c> {
    catalog: &'c dyn SchemaCatalog,
    transform: &'c FieldTransform,
    options: &'c CompilerOptions,
    entity: String,
    alias: String,
    context: &'c mut CompilationContext,
    out: String,
}

impl<'c> Translator<'c> {
    fn resolve(&self, field: &str) -> Result<(String, &'c Attribute), CompileError> {
        let transformed = (self.transform)(field);
        if transformed != field {
            tracing::trace!(field, %transformed, "transformed field");
        }
        let attribute = self
            .catalog
            .resolve_path(&self.entity, &transformed)
            .map_err(|source| CompileError::InvalidField {
                entity: self.entity.clone(),
                field: field.to_string(),
                source,
            })?;
        Ok((transformed, attribute))
    }

    fn qualify(&self, field: &str) -> String {
        format!("{}.{field}", self.alias)
    }

    /// Walk `field` from the root to its first collection-valued segment.
    fn collection_hop(&self, field: &str) -> Result<CollectionHop<'c>, CompileError> {
        let (transformed, _) = self.resolve(field)?;
        let catalog = self.catalog;
        let segments: Vec<&str> = transformed.split('.').collect();

        let mut found = None;
        for end in 1..=segments.len() {
            let prefix = segments[..end].join(".");
            let attribute = catalog.resolve_path(&self.entity, &prefix).map_err(|source| {
                CompileError::InvalidField {
                    entity: self.entity.clone(),
                    field: field.to_string(),
                    source,
                }
            })?;
            if catalog.is_collection(attribute) {
                found = Some((end, attribute));
                break;
            }
        }
        let Some((end, collection)) = found else {
            return Err(CompileError::NotACollection(field.to_string()));
        };

        let target = catalog
            .target_type(collection)
            .ok_or_else(|| CompileError::NoTargetType(field.to_string()))?;
        let inverse = catalog
            .inverse_attribute(&collection.declaring_type, collection, target)
            .ok_or_else(|| CompileError::NoInverseAttribute {
                field: field.to_string(),
                target: target.to_string(),
            })?;

        let owner = match end {
            1 => self.alias.clone(),
            _ => self.qualify(&segments[..end - 1].join(".")),
        };
        // Names borrowed from the catalog; `transformed` is local.
        let mut rest = Vec::new();
        let mut current = target;
        for segment in &segments[end..] {
            let attribute = catalog.attribute(current, segment).ok_or_else(|| {
                CompileError::InvalidHavingPath(field.to_string())
            })?;
            rest.push(attribute.name.as_str());
            current = attribute.target().unwrap_or(current);
        }

        Ok(CollectionHop {
            owner,
            owner_type: &collection.declaring_type,
            target,
            inverse,
            rest,
        })
    }

    fn check_depth(&self) -> Result<(), CompileError> {
        let max = self.options.max_having_depth;
        if self.context.depth() + 1 > max {
            return Err(CompileError::NestingNotAllowed { max });
        }
        Ok(())
    }

    fn translate_comparison(
        &mut self,
        field: &str,
        qualified: &str,
        attribute: &Attribute,
        operator: Operator,
        value: &Value,
    ) -> Result<String, CompileError> {
        let illegal = || CompileError::IllegalOperator {
            operator,
            value_type: value.type_name(),
        };
        if operator == Operator::Like && !matches!(value, Value::String(_)) {
            return Err(illegal());
        }

        let translated = match value {
            Value::String(s) => {
                let symbol = match operator {
                    Operator::Like => "LIKE",
                    op => comparison_symbol(op).ok_or_else(illegal)?,
                };
                let literal = match operator {
                    Operator::Like => like_pattern(s),
                    _ => s.clone(),
                };
                format!("LOWER({qualified}) {symbol} LOWER({})", quote(&literal))
            }
            Value::Long(_) | Value::Double(_) => {
                let symbol = comparison_symbol(operator).ok_or_else(illegal)?;
                let number = value.to_string();
                if self.catalog.is_numeric(attribute) {
                    format!("{qualified} {symbol} {number}")
                } else {
                    format!("{qualified} {symbol} {}", quote(&number))
                }
            }
            Value::Boolean(b) => {
                let symbol = match operator {
                    Operator::Eq | Operator::Ne => comparison_symbol(operator).ok_or_else(illegal)?,
                    _ => return Err(illegal()),
                };
                if self.catalog.is_boolean(attribute) {
                    let name = self
                        .context
                        .next_parameter(&attribute.name, BoundValue::Boolean(*b));
                    format!("{qualified} {symbol} :{name}")
                } else {
                    format!("{qualified} {symbol} {}", quote(&b.to_string()))
                }
            }
            Value::Date(d) => {
                let symbol = comparison_symbol(operator).ok_or_else(illegal)?;
                format!("{qualified} {symbol} CAST('{}' AS DATE)", d.format("%Y-%m-%d"))
            }
            Value::DateTime(dt) => {
                let symbol = comparison_symbol(operator).ok_or_else(illegal)?;
                format!(
                    "{qualified} {symbol} CAST('{}' AS TIMESTAMP)",
                    dt.format("%Y-%m-%dT%H:%M:%S%.f")
                )
            }
            Value::MonthDay(md) => month_day_expression(qualified, operator, *md).ok_or_else(illegal)?,
            Value::Time(t) => time_expression(qualified, operator, *t).ok_or_else(illegal)?,
            Value::Year(y) => {
                let symbol = comparison_symbol(operator).ok_or_else(illegal)?;
                format!("YEAR({qualified}) {symbol} {y}")
            }
            Value::UtcInstant(instant) => {
                let symbol = comparison_symbol(operator).ok_or_else(illegal)?;
                let unsupported = || CompileError::UnsupportedTemporalTarget {
                    field: field.to_string(),
                    target: attribute
                        .scalar_type()
                        .map(|t| format!("{t:?}"))
                        .unwrap_or_else(|| "association".to_string()),
                };
                let scalar = attribute.scalar_type().ok_or_else(unsupported)?;
                let bound = BoundValue::from_instant(*instant, scalar, self.options.time_zone)
                    .ok_or_else(unsupported)?;
                let name = self.context.next_parameter(&attribute.name, bound);
                format!("{qualified} {symbol} :{name}")
            }
        };
        tracing::trace!(field, ?operator, value = %value, %translated, "translated condition");
        Ok(translated)
    }

    fn translate_list(&self, field: &str, values: &[Value], keyword: &str) -> Result<String, CompileError> {
        let (transformed, _) = self.resolve(field)?;
        let items = values
            .iter()
            .map(|value| match value {
                Value::String(s) => Ok(quote(s)),
                Value::Long(_) | Value::Double(_) => Ok(value.to_string()),
                other => Err(CompileError::IllegalListValue(other.type_name())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("{} {keyword} ({})", self.qualify(&transformed), items.join(", ")))
    }
}

impl FilterVisitor for Translator<'_> {
    type Error = CompileError;

    fn visit_group(&mut self, group: &ConditionGroup) -> Result<(), CompileError> {
        let joiner = match group.operator() {
            LogicalOperator::And => " AND ",
            LogicalOperator::Or => " OR ",
        };
        self.out.push('(');
        for (i, condition) in group.conditions().iter().enumerate() {
            if i > 0 {
                self.out.push_str(joiner);
            }
            self.visit(condition)?;
        }
        self.out.push(')');
        Ok(())
    }

    fn visit_not(&mut self, condition: &NotCondition) -> Result<(), CompileError> {
        self.out.push_str("NOT ");
        self.visit(&condition.condition)
    }

    fn visit_simple(&mut self, condition: &SimpleCondition) -> Result<(), CompileError> {
        let (transformed, attribute) = self.resolve(&condition.field)?;
        let qualified = self.qualify(&transformed);
        let operator = condition.operator;

        let translated = match (operator, &condition.value) {
            (Operator::Null, _) => format!("{qualified} IS NULL"),
            (Operator::NNull, _) => format!("{qualified} IS NOT NULL"),
            (_, None) => {
                return Err(CompileError::MissingValue {
                    field: condition.field.clone(),
                    operator,
                })
            }
            (_, Some(value)) => {
                self.translate_comparison(&condition.field, &qualified, attribute, operator, value)?
            }
        };
        self.out.push_str(&translated);
        Ok(())
    }

    fn visit_in_list(&mut self, condition: &InListCondition) -> Result<(), CompileError> {
        let translated = self.translate_list(&condition.field, &condition.values, "IN")?;
        self.out.push_str(&translated);
        Ok(())
    }

    fn visit_not_in_list(&mut self, condition: &NotInListCondition) -> Result<(), CompileError> {
        let translated = self.translate_list(&condition.field, &condition.values, "NOT IN")?;
        self.out.push_str(&translated);
        Ok(())
    }

    fn visit_having(&mut self, condition: &HavingCondition) -> Result<(), CompileError> {
        self.check_depth()?;
        let hop = self.collection_hop(&condition.field)?;
        if !hop.rest.is_empty() {
            return Err(CompileError::InvalidHavingPath(condition.field.clone()));
        }

        let inner_alias = self.context.next_alias(hop.target);
        self.context.enter();
        let mut inner = Translator {
            catalog: self.catalog,
            transform: self.transform,
            options: self.options,
            entity: hop.target.to_string(),
            alias: inner_alias.clone(),
            context: &mut *self.context,
            out: String::new(),
        };
        let result = condition.sub_filter.accept(&mut inner);
        let sub_clause = inner.out;
        self.context.leave();
        result?;

        self.out.push_str(&format!(
            "{} IN (SELECT {inner_alias}.{} FROM {} {inner_alias}",
            hop.owner, hop.inverse.name, hop.target
        ));
        if !sub_clause.is_empty() {
            self.out.push_str(" WHERE ");
            self.out.push_str(&sub_clause);
        }
        self.out.push(')');
        Ok(())
    }

    fn visit_having_function(&mut self, condition: &HavingFunctionCondition) -> Result<(), CompileError> {
        self.check_depth()?;
        let hop = self.collection_hop(&condition.field)?;
        if hop.rest.len() > 1 {
            return Err(CompileError::MultiHopFunctionPath(condition.field.clone()));
        }

        let owner_id = self
            .catalog
            .identifier_attribute_name(hop.owner_type)
            .ok_or_else(|| CompileError::NoIdentifier(hop.owner_type.to_string()))?;
        let aggregated = match hop.rest.first() {
            Some(field) => *field,
            None if condition.function == qfilter_lang::AggregateFunction::Count => self
                .catalog
                .identifier_attribute_name(hop.target)
                .ok_or_else(|| CompileError::NoIdentifier(hop.target.to_string()))?,
            None => {
                return Err(CompileError::MissingAggregateField {
                    function: condition.function.name().to_string(),
                    field: condition.field.clone(),
                })
            }
        };
        let symbol = comparison_symbol(condition.operator).ok_or(CompileError::IllegalOperator {
            operator: condition.operator,
            value_type: condition.value.type_name(),
        })?;
        if !condition.value.is_numeric() {
            return Err(CompileError::IllegalOperator {
                operator: condition.operator,
                value_type: condition.value.type_name(),
            });
        }

        let inner_alias = self.context.next_alias(hop.target);
        let correlation = format!("{inner_alias}.{}.{owner_id}", hop.inverse.name);
        self.out.push_str(&format!(
            "{}.{owner_id} IN (SELECT {correlation} FROM {} {inner_alias} GROUP BY {correlation} \
             HAVING {}({inner_alias}.{aggregated}) {symbol} {})",
            hop.owner,
            hop.target,
            condition.function.name(),
            condition.value
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{company, PathError, StaticCatalog};
    use crate::transform::snake_to_camel;
    use chrono::{TimeZone, Utc};
    use qfilter_lang::parse;

    fn where_clause(catalog: &StaticCatalog, entity: &str, filter: &str) -> Result<String, CompileError> {
        let mut compiler = QueryCompiler::new(entity, catalog)?;
        compiler.accept(&parse(filter).unwrap())?;
        Ok(compiler.where_clause().to_string())
    }

    #[test]
    fn simple_string_and_numbers() {
        let catalog = company();
        assert_eq!(
            where_clause(&catalog, "Employee", "firstName$eq:Joe$and:salary$gte:1000.5").unwrap(),
            "(LOWER(em_0.firstName) = LOWER('Joe') AND em_0.salary >= 1000.5)"
        );
        assert_eq!(
            where_clause(&catalog, "Employee", "lastName$ne:10").unwrap(),
            "em_0.lastName <> '10'"
        );
        assert_eq!(
            where_clause(&catalog, "Employee", "yearOfBirth$lt:1990").unwrap(),
            "em_0.yearOfBirth < 1990"
        );
    }

    #[test]
    fn like_uses_backend_wildcards() {
        let catalog = company();
        assert_eq!(
            where_clause(&catalog, "Employee", "lastName$like:O'B*").unwrap(),
            "LOWER(em_0.lastName) LIKE LOWER('O''B%')"
        );
        assert_eq!(
            where_clause(&catalog, "Employee", "email$like:john").unwrap(),
            "LOWER(em_0.email) LIKE LOWER('%john%')"
        );
        assert!(matches!(
            where_clause(&catalog, "Employee", "salary$like:10"),
            Err(CompileError::IllegalOperator { operator: Operator::Like, value_type: "Long" })
        ));
    }

    #[test]
    fn null_not_and_lists() {
        let catalog = company();
        assert_eq!(
            where_clause(&catalog, "Employee", "$not:email$null:$or:manager$nnull:").unwrap(),
            "(NOT em_0.email IS NULL OR em_0.manager IS NOT NULL)"
        );
        assert_eq!(
            where_clause(&catalog, "Employee", "lastName$in:[Smith,O'Neil]").unwrap(),
            "em_0.lastName IN ('Smith', 'O''Neil')"
        );
        assert_eq!(
            where_clause(&catalog, "Employee", "yearOfBirth$nin:[1990,1991]").unwrap(),
            "em_0.yearOfBirth NOT IN (1990, 1991)"
        );
        assert_eq!(
            where_clause(&catalog, "Employee", "birthDate$in:[2020-01-01]"),
            Err(CompileError::IllegalListValue("Date"))
        );
    }

    #[test]
    fn booleans_bind_parameters() {
        let catalog = company();
        let mut compiler = QueryCompiler::new("Employee", &catalog).unwrap();
        compiler
            .accept(&parse("isPartTime$eq:true$or:isPartTime$ne:false").unwrap())
            .unwrap();
        assert_eq!(
            compiler.where_clause(),
            "(em_0.isPartTime = :isPartTime_0 OR em_0.isPartTime <> :isPartTime_1)"
        );
        assert_eq!(compiler.parameters()["isPartTime_0"], BoundValue::Boolean(true));
        assert_eq!(compiler.parameters()["isPartTime_1"], BoundValue::Boolean(false));

        assert_eq!(
            where_clause(&catalog, "Employee", "firstName$eq:true").unwrap(),
            "em_0.firstName = 'true'"
        );
        assert!(matches!(
            where_clause(&catalog, "Employee", "isPartTime$gt:true"),
            Err(CompileError::IllegalOperator { value_type: "Boolean", .. })
        ));
    }

    #[test]
    fn temporal_literals() {
        let catalog = company();
        assert_eq!(
            where_clause(&catalog, "Employee", "birthDate$gte:2023-12-01").unwrap(),
            "em_0.birthDate >= CAST('2023-12-01' AS DATE)"
        );
        assert_eq!(
            where_clause(&catalog, "Employee", "hiredAt$lt:2023-11-02T15:22:45").unwrap(),
            "em_0.hiredAt < CAST('2023-11-02T15:22:45' AS TIMESTAMP)"
        );
        assert_eq!(
            where_clause(&catalog, "Employee", "birthDate$eq:12-01").unwrap(),
            "(MONTH(em_0.birthDate) = 12 AND DAY(em_0.birthDate) = 1)"
        );
        assert_eq!(
            where_clause(&catalog, "Employee", "birthDate$gt:1995--").unwrap(),
            "YEAR(em_0.birthDate) > 1995"
        );
        assert_eq!(
            where_clause(&catalog, "Employee", "startTime$eq:08:30:00").unwrap(),
            "(HOUR(em_0.startTime) = 8 AND MINUTE(em_0.startTime) = 30 AND SECOND(em_0.startTime) = 0)"
        );
        assert!(matches!(
            where_clause(&catalog, "Employee", "birthDate$like:2023-12-01"),
            Err(CompileError::IllegalOperator { value_type: "Date", .. })
        ));
    }

    #[test]
    fn instants_bind_by_attribute_type() {
        let catalog = company();
        let mut compiler = QueryCompiler::new("Employee", &catalog)
            .unwrap()
            .with_options(CompilerOptions {
                time_zone: chrono_tz::Europe::Oslo,
                ..CompilerOptions::default()
            });
        compiler
            .accept(&parse("lastLogin$gt:2023-11-02T15:22:45Z$and:lastLoginLocal$lt:2023-11-02T15:22:45Z").unwrap())
            .unwrap();
        assert_eq!(
            compiler.where_clause(),
            "(em_0.lastLogin > :lastLogin_0 AND em_0.lastLoginLocal < :lastLoginLocal_0)"
        );
        let instant = Utc.with_ymd_and_hms(2023, 11, 2, 15, 22, 45).unwrap();
        assert_eq!(compiler.parameters()["lastLogin_0"], BoundValue::Instant(instant));
        assert_eq!(
            compiler.parameters()["lastLoginLocal_0"],
            BoundValue::LocalDateTime(instant.with_timezone(&chrono_tz::Europe::Oslo).naive_local())
        );

        assert!(matches!(
            where_clause(&catalog, "Employee", "firstName$eq:2023-11-02T15:22:45Z"),
            Err(CompileError::UnsupportedTemporalTarget { .. })
        ));
    }

    #[test]
    fn unresolved_fields_fail() {
        let catalog = company();
        assert_eq!(
            where_clause(&catalog, "Employee", "nickname$eq:Bob"),
            Err(CompileError::InvalidField {
                entity: "Employee".into(),
                field: "nickname".into(),
                source: PathError::UnknownAttribute {
                    type_name: "Employee".into(),
                    attribute: "nickname".into(),
                },
            })
        );
        assert!(matches!(
            QueryCompiler::new("Nope", &catalog),
            Err(CompileError::UnknownEntity(_))
        ));
    }

    #[test]
    fn field_transform_applies_to_paths() {
        let catalog = company();
        let mut compiler = QueryCompiler::new("Department", &catalog)
            .unwrap()
            .with_field_transform(snake_to_camel());
        compiler.accept(&parse("created_at$null:").unwrap()).unwrap();
        assert_eq!(compiler.where_clause(), "de_0.createdAt IS NULL");
    }

    #[test]
    fn having_count_correlates_by_id() {
        let catalog = company();
        let compiler = {
            let mut c = QueryCompiler::new("Department", &catalog).unwrap();
            c.accept(&parse("$having:COUNT(employees)$gt:10").unwrap()).unwrap();
            c
        };
        assert_eq!(
            compiler.to_query(),
            "SELECT de_0 FROM Department de_0 WHERE de_0.id IN (SELECT em_0.department.id \
             FROM Employee em_0 GROUP BY em_0.department.id HAVING COUNT(em_0.id) > 10)"
        );
        assert!(compiler.to_count_query().starts_with("SELECT COUNT(de_0) FROM Department de_0 WHERE "));
    }

    #[test]
    fn having_function_over_subfield() {
        let catalog = company();
        assert_eq!(
            where_clause(&catalog, "Department", "$having:AVG(employees.salary)$gte:5000.0").unwrap(),
            "de_0.id IN (SELECT em_0.department.id FROM Employee em_0 GROUP BY em_0.department.id \
             HAVING AVG(em_0.salary) >= 5000.0)"
        );
        assert_eq!(
            where_clause(&catalog, "Department", "$having:SUM(employees)$gt:1"),
            Err(CompileError::MissingAggregateField {
                function: "SUM".into(),
                field: "employees".into(),
            })
        );
        assert_eq!(
            where_clause(&catalog, "Department", "$having:MAX(employees.department.budget)$gt:1"),
            Err(CompileError::MultiHopFunctionPath("employees.department.budget".into()))
        );
    }

    #[test]
    fn having_below_root_uses_owner_path() {
        let catalog = company();
        assert_eq!(
            where_clause(&catalog, "Employee", "$having:COUNT(manager.reports)$gt:2").unwrap(),
            "em_0.manager.id IN (SELECT em_1.manager.id FROM Employee em_1 GROUP BY em_1.manager.id \
             HAVING COUNT(em_1.id) > 2)"
        );
    }

    #[test]
    fn nested_having_shares_aliases() {
        let catalog = company();
        assert_eq!(
            where_clause(&catalog, "Department", "$having:employees($having:projects(name$eq:Apollo))")
                .unwrap(),
            "de_0 IN (SELECT em_0.department FROM Employee em_0 WHERE em_0 IN \
             (SELECT pr_0.members FROM Project pr_0 WHERE LOWER(pr_0.name) = LOWER('Apollo')))"
        );
    }

    #[test]
    fn having_nesting_is_bounded() {
        let catalog = company();
        let mut compiler = QueryCompiler::new("Department", &catalog)
            .unwrap()
            .with_options(CompilerOptions {
                max_having_depth: 1,
                ..CompilerOptions::default()
            });
        let filter = parse("$having:employees($having:projects(name$eq:Apollo))").unwrap();
        assert_eq!(
            compiler.accept(&filter),
            Err(CompileError::NestingNotAllowed { max: 1 })
        );
        assert_eq!(compiler.where_clause(), "");
        assert!(compiler.parameters().is_empty());
    }

    #[test]
    fn having_requires_a_collection() {
        let catalog = company();
        assert_eq!(
            where_clause(&catalog, "Employee", "$having:department(name$eq:IT)"),
            Err(CompileError::NotACollection("department".into()))
        );
        assert_eq!(
            where_clause(&catalog, "Department", "$having:employees.firstName(x$eq:1)"),
            Err(CompileError::InvalidHavingPath("employees.firstName".into()))
        );
    }

    #[test]
    fn repeated_accepts_join_with_and() {
        let catalog = company();
        let mut compiler = QueryCompiler::new("Project", &catalog).unwrap().with_alias("p");
        compiler.accept(&parse("name$eq:Apollo").unwrap()).unwrap();
        compiler.accept(&parse("startDate$null:").unwrap()).unwrap();
        assert_eq!(
            compiler.to_query(),
            "SELECT p FROM Project p WHERE LOWER(p.name) = LOWER('Apollo') AND p.startDate IS NULL"
        );
    }

    #[test]
    fn failed_accept_keeps_previous_state() {
        let catalog = company();
        let mut compiler = QueryCompiler::new("Employee", &catalog).unwrap();
        compiler.accept(&parse("isPartTime$eq:true").unwrap()).unwrap();
        assert!(compiler
            .accept(&parse("isPartTime$eq:false$and:nope$eq:1").unwrap())
            .is_err());
        assert_eq!(compiler.where_clause(), "em_0.isPartTime = :isPartTime_0");
        assert_eq!(compiler.parameters().len(), 1);
    }

    #[test]
    fn compile_bundles_query_sorting_and_page() {
        let catalog = company();
        let filter = parse("lastName$like:S*").unwrap();
        let sorting = Sorting::parse("-salary").unwrap();
        let pagination = Pagination::parse("$page:3$size:10").unwrap();
        let compiled = QueryCompiler::new("Employee", &catalog)
            .unwrap()
            .compile(Some(&filter), Some(&sorting), &pagination)
            .unwrap();

        assert_eq!(
            compiled.query,
            "SELECT em_0 FROM Employee em_0 WHERE LOWER(em_0.lastName) LIKE LOWER('S%') \
             ORDER BY em_0.salary DESC"
        );
        assert_eq!(
            compiled.count_query,
            "SELECT COUNT(em_0) FROM Employee em_0 WHERE LOWER(em_0.lastName) LIKE LOWER('S%')"
        );
        assert_eq!(compiled.offset, 20);
        assert_eq!(compiled.limit, 10);

        let empty = QueryCompiler::new("Employee", &catalog)
            .unwrap()
            .compile(None, None, &Pagination::default())
            .unwrap();
        assert_eq!(empty.query, "SELECT em_0 FROM Employee em_0");
        assert_eq!(empty.where_clause, "");
    }
}
