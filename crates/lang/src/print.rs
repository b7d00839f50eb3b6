use std::convert::Infallible;

use crate::ast::{
    ConditionGroup, Filter, HavingCondition, HavingFunctionCondition, InListCondition,
    NotCondition, NotInListCondition, Operator, SimpleCondition, Value,
};
use crate::escape::escape_text;
use crate::literal::reads_as_string;
use crate::visitor::FilterVisitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrintFormat {
    /// Multi-line, one condition per line, children indented.
    Pretty,
    /// Single line in filter syntax.
    Compact,
}

/// Renders a filter back to text.
pub struct PrintVisitor {
    format: PrintFormat,
    indent_size: usize,
    level: usize,
    out: String,
}

impl PrintVisitor {
    pub fn new(format: PrintFormat) -> Self {
        Self::with_indent(format, 4)
    }

    pub fn with_indent(format: PrintFormat, indent_size: usize) -> Self {
        Self {
            format,
            indent_size,
            level: 0,
            out: String::new(),
        }
    }

    pub fn print(self) -> String {
        self.out
    }

    fn pretty(&self) -> bool {
        self.format == PrintFormat::Pretty
    }

    fn new_line(&mut self) {
        if self.pretty() {
            self.out.push('\n');
            self.out.push_str(&" ".repeat(self.level * self.indent_size));
        }
    }

    fn operator(&mut self, token: &str) {
        if self.pretty() {
            if !self.out.is_empty() && !self.out.ends_with([' ', '\n']) {
                self.out.push(' ');
            }
            self.out.push_str(token);
            self.out.push(' ');
        } else {
            self.out.push_str(token);
        }
    }

    fn value(&mut self, value: &Value) {
        self.out.push_str(&value_text(value));
    }

    fn list(&mut self, field: &str, operator: Operator, values: &[Value]) {
        self.out.push_str(field);
        self.operator(operator.token());
        let separator = if self.pretty() { ", " } else { "," };
        let items: Vec<String> = values.iter().map(value_text).collect();
        self.out.push('[');
        self.out.push_str(&items.join(separator));
        self.out.push(']');
    }
}

/// Text of a value that the parser reads back as the same value.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => {
            let escaped = escape_text(s);
            if reads_as_string(&escaped) {
                escaped
            } else {
                format!("\"{escaped}\"")
            }
        }
        other => other.to_string(),
    }
}

impl FilterVisitor for PrintVisitor {
    type Error = Infallible;

    fn visit_simple(&mut self, condition: &SimpleCondition) -> Result<(), Infallible> {
        self.out.push_str(&condition.field);
        self.operator(condition.operator.token());
        if let Some(value) = &condition.value {
            self.value(value);
        } else if self.pretty() {
            self.out.pop();
        }
        Ok(())
    }

    fn visit_in_list(&mut self, condition: &InListCondition) -> Result<(), Infallible> {
        self.list(&condition.field, condition.operator(), &condition.values);
        Ok(())
    }

    fn visit_not_in_list(&mut self, condition: &NotInListCondition) -> Result<(), Infallible> {
        self.list(&condition.field, condition.operator(), &condition.values);
        Ok(())
    }

    fn visit_not(&mut self, condition: &NotCondition) -> Result<(), Infallible> {
        self.operator(Operator::Not.token());
        self.visit(&condition.condition)
    }

    fn visit_group(&mut self, group: &ConditionGroup) -> Result<(), Infallible> {
        self.out.push('(');
        self.level += 1;
        for (index, condition) in group.conditions().iter().enumerate() {
            self.new_line();
            if index > 0 {
                self.operator(group.operator().token());
            }
            self.visit(condition)?;
        }
        self.level -= 1;
        self.new_line();
        self.out.push(')');
        Ok(())
    }

    fn visit_having(&mut self, condition: &HavingCondition) -> Result<(), Infallible> {
        self.operator("$having:");
        self.out.push_str(&condition.field);
        self.out.push('(');
        self.level += 1;
        self.new_line();
        self.visit(condition.sub_filter.root())?;
        self.level -= 1;
        self.new_line();
        self.out.push(')');
        Ok(())
    }

    fn visit_having_function(&mut self, condition: &HavingFunctionCondition) -> Result<(), Infallible> {
        self.operator("$having:");
        self.out.push_str(condition.function.name());
        self.out.push('(');
        self.out.push_str(&condition.field);
        self.out.push(')');
        self.operator(condition.operator.token());
        self.value(&condition.value);
        Ok(())
    }
}

impl Filter {
    pub fn print(&self, format: PrintFormat) -> String {
        let mut visitor = PrintVisitor::new(format);
        match self.accept(&mut visitor) {
            Ok(()) => visitor.print(),
            Err(never) => match never {},
        }
    }

    /// Multi-line rendering for humans.
    pub fn pretty_print(&self) -> String {
        self.print(PrintFormat::Pretty)
    }

    /// Single-line rendering in filter syntax.
    pub fn compact_print(&self) -> String {
        self.print(PrintFormat::Compact)
    }
}
