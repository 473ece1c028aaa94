use super::includes::DependencyEdge;
use crate::core::Coupling;
use std::collections::{BTreeMap, BTreeSet};

/// Include graph over corpus files. Only edges whose target resolved to an
/// analysed file take part.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    adjacency: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: &str) {
        self.adjacency.entry(file.to_string()).or_default();
    }

    pub fn add_dependency(&mut self, from: &str, to: &str) {
        self.add_file(to);
        self.adjacency
            .entry(from.to_string())
            .or_default()
            .insert(to.to_string());
    }

    pub fn file_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn dependency_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum()
    }

    pub fn dependencies_of(&self, file: &str) -> impl Iterator<Item = &str> {
        self.adjacency
            .get(file)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    pub fn dependents_of<'g>(&'g self, file: &'g str) -> impl Iterator<Item = &'g str> {
        self.adjacency
            .iter()
            .filter(move |(other, deps)| other.as_str() != file && deps.contains(file))
            .map(|(other, _)| other.as_str())
    }

    /// Include cycles found by depth-first search, each rotated to start at
    /// its smallest path and listed once.
    pub fn detect_cycles(&self) -> Vec<Vec<String>> {
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut on_stack: BTreeSet<&str> = BTreeSet::new();
        let mut path: Vec<&str> = Vec::new();
        let mut cycles: BTreeSet<Vec<String>> = BTreeSet::new();

        for file in self.adjacency.keys() {
            if !visited.contains(file.as_str()) {
                self.dfs(file, &mut visited, &mut on_stack, &mut path, &mut cycles);
            }
        }

        cycles.into_iter().collect()
    }

    fn dfs<'g>(
        &'g self,
        file: &'g str,
        visited: &mut BTreeSet<&'g str>,
        on_stack: &mut BTreeSet<&'g str>,
        path: &mut Vec<&'g str>,
        cycles: &mut BTreeSet<Vec<String>>,
    ) {
        visited.insert(file);
        on_stack.insert(file);
        path.push(file);

        for dep in self.dependencies_of(file) {
            if !visited.contains(dep) {
                self.dfs(dep, visited, on_stack, path, cycles);
            } else if on_stack.contains(dep) {
                if let Some(start) = path.iter().position(|f| *f == dep) {
                    cycles.insert(canonical_cycle(&path[start..]));
                }
            }
        }

        path.pop();
        on_stack.remove(file);
    }

    /// Fan-in and fan-out per file.
    pub fn coupling(&self) -> BTreeMap<String, Coupling> {
        let mut coupling: BTreeMap<String, Coupling> = self
            .adjacency
            .keys()
            .map(|file| (file.clone(), Coupling::default()))
            .collect();
        for (from, deps) in &self.adjacency {
            for to in deps.iter().filter(|to| *to != from) {
                if let Some(entry) = coupling.get_mut(from) {
                    entry.fan_out += 1;
                }
                if let Some(entry) = coupling.get_mut(to) {
                    entry.fan_in += 1;
                }
            }
        }
        coupling
    }
}

fn canonical_cycle(cycle: &[&str]) -> Vec<String> {
    let pivot = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, f)| **f)
        .map(|(i, _)| i)
        .unwrap_or(0);
    cycle[pivot..]
        .iter()
        .chain(&cycle[..pivot])
        .map(|f| f.to_string())
        .collect()
}

/// Graph of every file in `files` plus the in-corpus edges among them.
pub fn build_dependency_graph<'e>(
    files: impl IntoIterator<Item = &'e str>,
    edges: impl IntoIterator<Item = &'e DependencyEdge>,
) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for file in files {
        graph.add_file(file);
    }
    for edge in edges.into_iter().filter(|e| e.in_corpus) {
        if let Some(target) = edge.target.resolved() {
            graph.add_dependency(&edge.source_file, target);
        }
    }
    graph
}
