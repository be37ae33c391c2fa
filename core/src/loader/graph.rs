use std::collections::{HashMap, HashSet};

/// Requirement edges of modules whose requirements are currently resolving
///
/// An edge `name -> requires` lives only while `name` waits on its
/// requirements, so the graph never accumulates state from finished requests.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Dependency edges: module -> requirements in declaration order
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit `name -> requires` unless it would close a cycle.
    ///
    /// On a cycle the edge is not committed and the offending path is
    /// returned, starting and ending with the repeated module.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) over the live edges
    pub fn add_dependency(&mut self, name: &str, requires: &[String]) -> Result<(), Vec<String>> {
        if requires.is_empty() {
            return Ok(());
        }

        let mut visited = HashSet::new();
        for req in requires {
            let mut stack = Vec::new();
            if self.dfs_cycle(name, requires, req, &mut visited, &mut stack) {
                return Err(stack);
            }
        }

        self.edges.insert(name.to_string(), requires.to_vec());
        Ok(())
    }

    pub fn remove_dependency(&mut self, name: &str) -> Option<Vec<String>> {
        self.edges.remove(name)
    }

    pub fn requires_of(&self, name: &str) -> Option<&[String]> {
        self.edges.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// DFS over the live edges with the candidate edge overlaid.
    fn dfs_cycle(
        &self,
        candidate: &str,
        candidate_requires: &[String],
        node: &str,
        visited: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> bool {
        // Check if node is in current path (cycle detected)
        if let Some(pos) = stack.iter().position(|x| x == node) {
            stack.push(node.to_string());
            stack.drain(..pos);
            return true;
        }

        if visited.contains(node) {
            return false;
        }

        stack.push(node.to_string());

        let dependencies = if node == candidate {
            Some(candidate_requires)
        } else {
            self.requires_of(node)
        };

        if let Some(dependencies) = dependencies {
            for dep in dependencies {
                if self.dfs_cycle(candidate, candidate_requires, dep, visited, stack) {
                    return true;
                }
            }
        }

        stack.pop();
        visited.insert(node.to_string());
        false
    }
}
