use std::collections::{BTreeMap, HashSet};

use super::BoundValue;

/// Alias and parameter registries shared by a compiler and every nested
/// having sub-compilation, so generated names never collide.
#[derive(Debug, Clone, Default)]
pub struct CompilationContext {
    aliases: HashSet<String>,
    parameters: BTreeMap<String, BoundValue>,
    depth: usize,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Department` -> `de_0`, then `de_1`, ...
    pub fn next_alias(&mut self, type_name: &str) -> String {
        let prefix: String = type_name.chars().take(2).flat_map(char::to_lowercase).collect();
        let alias = (0..)
            .map(|n| format!("{prefix}_{n}"))
            .find(|candidate| !self.aliases.contains(candidate))
            .unwrap_or_default();
        self.aliases.insert(alias.clone());
        alias
    }

    pub fn register_alias(&mut self, alias: &str) {
        self.aliases.insert(alias.to_string());
    }

    pub fn release_alias(&mut self, alias: &str) {
        self.aliases.remove(alias);
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.aliases.contains(alias)
    }

    /// Bind `value` under `<attribute>_<n>` and return the name.
    pub fn next_parameter(&mut self, attribute: &str, value: BoundValue) -> String {
        let name = (0..)
            .map(|n| format!("{attribute}_{n}"))
            .find(|candidate| !self.parameters.contains_key(candidate))
            .unwrap_or_default();
        tracing::trace!(parameter = %name, ?value, "bound parameter");
        self.parameters.insert(name.clone(), value);
        name
    }

    pub fn parameters(&self) -> &BTreeMap<String, BoundValue> {
        &self.parameters
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn enter(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_unique_per_prefix() {
        let mut context = CompilationContext::new();
        assert_eq!(context.next_alias("Department"), "de_0");
        assert_eq!(context.next_alias("Employee"), "em_0");
        assert_eq!(context.next_alias("Employee"), "em_1");
        assert_eq!(context.next_alias("Dept"), "de_1");
        assert_eq!(context.next_alias("X"), "x_0");
    }

    #[test]
    fn released_alias_is_reused() {
        let mut context = CompilationContext::new();
        let alias = context.next_alias("Project");
        context.release_alias(&alias);
        assert!(!context.has_alias("pr_0"));
        assert_eq!(context.next_alias("Project"), "pr_0");
    }

    #[test]
    fn parameters_are_numbered_per_attribute() {
        let mut context = CompilationContext::new();
        assert_eq!(context.next_parameter("isPartTime", BoundValue::Boolean(true)), "isPartTime_0");
        assert_eq!(context.next_parameter("isPartTime", BoundValue::Boolean(false)), "isPartTime_1");
        assert_eq!(context.parameters().len(), 2);
        assert_eq!(context.parameters()["isPartTime_1"], BoundValue::Boolean(false));
    }
}
