//! Dependency graph builder.
//!
//! Edges run from a dependent property to each of its `dependsOn` sources.
//! The builder validates every edge, maintains the alias ↔ virtual tables,
//! rejects cycles with a depth-first walk that tracks the active path, and
//! produces the evaluation order in which dependents are resolved.

use crate::compiler::{CompiledProperty, DefinitionErrors};
use crate::rules::Category;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    /// dependent → its immediate sources, in declared order.
    sources: BTreeMap<String, Vec<String>>,
    /// source → the dependents reading it, in declaration order.
    dependents: BTreeMap<String, Vec<String>>,
    alias_to_virtual: HashMap<String, String>,
    virtual_to_alias: HashMap<String, String>,
    /// Dependents such that every dependent follows all of its transitive sources.
    order: Vec<String>,
}

impl DependencyGraph {
    pub(crate) fn sources_of(&self, name: &str) -> &[String] {
        self.sources.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn dependents_of(&self, name: &str) -> &[String] {
        self.dependents.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub(crate) fn virtual_for_alias(&self, alias: &str) -> Option<&str> {
        self.alias_to_virtual.get(alias).map(String::as_str)
    }

    pub(crate) fn alias_of(&self, virtual_name: &str) -> Option<&str> {
        self.virtual_to_alias.get(virtual_name).map(String::as_str)
    }

    pub(crate) fn evaluation_order(&self) -> &[String] {
        &self.order
    }

    pub(crate) fn build(properties: &[CompiledProperty], errors: &mut DefinitionErrors) -> Self {
        let categories: HashMap<&str, Category> = properties
            .iter()
            .map(|p| (p.name.as_str(), p.category))
            .collect();

        let mut graph = Self::default();
        graph.link_dependencies(properties, &categories, errors);
        graph.register_aliases(properties, &categories, errors);

        for property in properties {
            if property.category == Category::Virtual && graph.dependents_of(&property.name).is_empty() {
                errors.add(
                    &property.name,
                    "A virtual property must have at least one dependent property",
                );
            }
        }

        if graph.detect_cycles(properties, errors) {
            graph.order = graph.topological_order(properties);
        }
        graph
    }

    fn link_dependencies(
        &mut self,
        properties: &[CompiledProperty],
        categories: &HashMap<&str, Category>,
        errors: &mut DefinitionErrors,
    ) {
        let aliases: HashMap<&str, &str> = properties
            .iter()
            .filter(|p| p.category == Category::Virtual)
            .filter_map(|p| Some((p.definition.alias.as_deref()?, p.name.as_str())))
            .collect();

        for property in properties.iter().filter(|p| p.category == Category::Dependent) {
            let name = property.name.as_str();
            let mut linked: Vec<String> = Vec::new();

            for source in property.definition.depends_on.iter().flatten() {
                if source == name {
                    errors.add(name, "A property cannot depend on itself");
                    continue;
                }
                match categories.get(source.as_str()) {
                    Some(Category::Constant) => errors.add(
                        name,
                        format!("Cannot establish dependency with '{source}' as it is a constant property"),
                    ),
                    Some(_) => {
                        if !linked.contains(source) {
                            linked.push(source.clone());
                        }
                    }
                    None => match aliases.get(source.as_str()) {
                        Some(virtual_name) => errors.add(
                            name,
                            format!("'{source}' is an alias; depend on '{virtual_name}' instead"),
                        ),
                        None => errors.add(
                            name,
                            format!("Cannot establish dependency with '{source}' as it is not a property of the schema"),
                        ),
                    },
                }
            }

            for source in &linked {
                self.dependents
                    .entry(source.clone())
                    .or_default()
                    .push(name.to_string());
            }
            if !linked.is_empty() {
                self.sources.insert(name.to_string(), linked);
            }
        }
    }

    fn register_aliases(
        &mut self,
        properties: &[CompiledProperty],
        categories: &HashMap<&str, Category>,
        errors: &mut DefinitionErrors,
    ) {
        for property in properties.iter().filter(|p| p.category == Category::Virtual) {
            let name = property.name.as_str();
            let Some(alias) = property.definition.alias.as_deref() else {
                continue;
            };

            if alias.trim().is_empty() {
                errors.add(name, "An alias cannot be empty");
                continue;
            }
            if alias == name {
                errors.add(name, "An alias cannot be the same as the virtual property");
                continue;
            }
            if let Some(owner) = self.alias_to_virtual.get(alias) {
                errors.add(name, format!("'{alias}' is already used as the alias of '{owner}'"));
                continue;
            }
            match categories.get(alias) {
                Some(Category::Dependent) if self.sources_of(alias).iter().any(|s| s == name) => {}
                Some(_) => {
                    errors.add(
                        name,
                        format!("'{alias}' cannot be used as the alias of '{name}' because it is the name of an existing property. Only a dependent of '{name}' may share its name"),
                    );
                    continue;
                }
                None => {}
            }

            self.alias_to_virtual.insert(alias.to_string(), name.to_string());
            self.virtual_to_alias.insert(name.to_string(), alias.to_string());
        }
    }

    /// Returns true if the graph is acyclic. Each cycle is reported once,
    /// against the property where the walk entered it.
    fn detect_cycles(&self, properties: &[CompiledProperty], errors: &mut DefinitionErrors) -> bool {
        let mut done: HashSet<&str> = HashSet::new();
        let mut acyclic = true;

        for property in properties {
            let mut path: Vec<&str> = Vec::new();
            if let Some(cycle) = self.walk(&property.name, &mut path, &mut done) {
                acyclic = false;
                errors.add(
                    cycle[0],
                    format!("Circular dependency detected: {}", cycle.join(" -> ")),
                );
                done.extend(cycle);
            }
        }
        acyclic
    }

    fn walk<'a>(
        &'a self,
        node: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Option<Vec<&'a str>> {
        if let Some(position) = path.iter().position(|&n| n == node) {
            let mut cycle = path[position..].to_vec();
            cycle.push(node);
            return Some(cycle);
        }
        if done.contains(node) {
            return None;
        }

        path.push(node);
        for source in self.sources_of(node) {
            if let Some(cycle) = self.walk(source, path, done) {
                return Some(cycle);
            }
        }
        path.pop();
        done.insert(node);
        None
    }

    fn topological_order(&self, properties: &[CompiledProperty]) -> Vec<String> {
        let mut order = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for property in properties.iter().filter(|p| p.category == Category::Dependent) {
            self.visit(&property.name, &mut seen, &mut order);
        }
        order
    }

    fn visit<'a>(&'a self, node: &'a str, seen: &mut HashSet<&'a str>, order: &mut Vec<String>) {
        if !seen.insert(node) {
            return;
        }
        for source in self.sources_of(node) {
            if self.sources.contains_key(source) {
                self.visit(source, seen, order);
            }
        }
        order.push(node.to_string());
    }
}
