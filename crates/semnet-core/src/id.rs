//! Explicit concept id generator
//!
//! Callers own a generator and pass it to the calls that mint ids, so fixtures
//! stay deterministic and independent graphs never share counter state.

use crate::graph::ConceptGraph;

/// Counter-based id generator (`c1`, `c2`, ...)
#[derive(Debug, Clone)]
pub struct IdGenerator {
    prefix: String,
    next: u64,
}

impl IdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }

    /// Next id in sequence, whether or not it is in use anywhere
    pub fn next_id(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }

    /// Next id not already present in `graph`
    pub fn next_free(&mut self, graph: &ConceptGraph) -> String {
        loop {
            let id = self.next_id();
            if !graph.contains_concept(&id) {
                return id;
            }
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new("c")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concept::Concept;

    #[test]
    fn test_sequence() {
        let mut ids = IdGenerator::new("rule_");
        assert_eq!(ids.next_id(), "rule_1");
        assert_eq!(ids.next_id(), "rule_2");
    }

    #[test]
    fn test_next_free_skips_existing() {
        let mut graph = ConceptGraph::new();
        graph.add_concept(Concept::new("c1"));
        graph.add_concept(Concept::new("c2"));

        let mut ids = IdGenerator::default();
        assert_eq!(ids.next_free(&graph), "c3");
    }
}
