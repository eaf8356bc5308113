//! Exhaustive graph pattern matching
//!
//! A query graph whose unknown concepts act as variables is embedded into a
//! data graph in every structurally consistent way. Known query concepts match
//! data concepts by id; each unknown binds a distinct remaining data concept
//! (injective), and every query relation must be present in the data between
//! the resolved endpoints.
//!
//! Unknowns are bound in id order and candidates tried in data id order, so
//! results come out lexicographic on the bound ids. Callers that need an order
//! independent of this should sort.

use crate::error::{Error, Result};
use crate::graph::ConceptGraph;
use crate::limits::{validate_limits, validate_unknown_count, MatchLimits};
use crate::relation::{Direction, Relation};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Relation linking a query concept to the data concept it resolved to
pub const MATCHES_RELATION: &str = "matches";

/// Assignment of unknown query ids to data ids
pub type Binding = BTreeMap<String, String>;

/// Matcher options
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    /// Also copy the query into each result, with `matches` relations
    pub include_query: bool,

    pub limits: MatchLimits,
}

impl MatchOptions {
    pub fn including_query(mut self) -> Self {
        self.include_query = true;
        self
    }

    pub fn with_limits(mut self, limits: MatchLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// One embedding of a query into a data graph
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub binding: Binding,
    pub graph: ConceptGraph,
}

impl Match {
    /// Data concept id a query concept resolved to
    pub fn resolve<'a>(&'a self, query_id: &'a str) -> &'a str {
        self.binding
            .get(query_id)
            .map(String::as_str)
            .unwrap_or(query_id)
    }
}

/// Graph pattern matcher
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    options: MatchOptions,
}

impl Matcher {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    /// Every consistent binding of the query's unknowns into `data`
    pub fn find_bindings(&self, query: &ConceptGraph, data: &ConceptGraph) -> Result<Vec<Binding>> {
        let known: Vec<&str> = query.known_concepts().map(|c| c.id.as_str()).collect();
        let unknowns: Vec<&str> = query.unknown_concepts().map(|c| c.id.as_str()).collect();

        tracing::debug!(
            "Matching query ({} known, {} unknown, {} relations) against {} concepts",
            known.len(),
            unknowns.len(),
            query.relation_count(),
            data.concept_count()
        );

        validate_limits(&self.options.limits)?;
        validate_unknown_count(unknowns.len(), &self.options.limits)?;

        let exact_matches: BTreeSet<&str> = known
            .iter()
            .copied()
            .filter(|id| data.contains_concept(id))
            .collect();
        if exact_matches.len() != known.len() {
            tracing::debug!(
                "No match: {} of {} known concepts missing from data",
                known.len() - exact_matches.len(),
                known.len()
            );
            return Ok(Vec::new());
        }

        let is_known: HashSet<&str> = known.iter().copied().collect();
        for relation in query.relations() {
            if is_known.contains(relation.source.as_str())
                && is_known.contains(relation.target.as_str())
                && !data.has_relation(&relation.relation_type, &relation.source, &relation.target)
            {
                tracing::debug!("No match: data lacks known relation {}", relation.id);
                return Ok(Vec::new());
            }
        }

        let candidate_pool: Vec<&str> = data
            .known_concepts()
            .map(|c| c.id.as_str())
            .filter(|id| !exact_matches.contains(id))
            .collect();
        if candidate_pool.len() < unknowns.len() {
            tracing::debug!(
                "No match: {} unknowns but only {} candidates",
                unknowns.len(),
                candidate_pool.len()
            );
            return Ok(Vec::new());
        }

        if unknowns.is_empty() {
            return Ok(vec![Binding::new()]);
        }

        let constraints: Vec<Vec<&Relation>> = unknowns
            .iter()
            .map(|id| query.relations_of(id, Direction::Both).collect())
            .collect();

        let mut search = Search {
            unknowns: &unknowns,
            constraints: &constraints,
            is_known: &is_known,
            candidate_pool: &candidate_pool,
            index: DataIndex::new(data),
            limits: &self.options.limits,
            steps: 0,
            truncated: false,
            results: Vec::new(),
        };
        let mut binding = BTreeMap::new();
        let mut used = HashSet::new();
        search.extend(0, &mut binding, &mut used)?;

        if search.truncated {
            tracing::warn!(
                "Match enumeration stopped at {} results",
                self.options.limits.max_results
            );
        }
        tracing::debug!(
            "Found {} bindings in {} candidate checks",
            search.results.len(),
            search.steps
        );

        Ok(search
            .results
            .into_iter()
            .map(|binding| {
                binding
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .collect())
    }

    /// Every embedding, each paired with its materialized result graph
    pub fn find_matches(&self, query: &ConceptGraph, data: &ConceptGraph) -> Result<Vec<Match>> {
        self.find_bindings(query, data)?
            .into_iter()
            .map(|binding| {
                let graph = self.materialize(query, data, &binding)?;
                Ok(Match { binding, graph })
            })
            .collect()
    }

    /// Every embedding as a result graph
    pub fn match_graphs(
        &self,
        query: &ConceptGraph,
        data: &ConceptGraph,
    ) -> Result<Vec<ConceptGraph>> {
        Ok(self
            .find_matches(query, data)?
            .into_iter()
            .map(|m| m.graph)
            .collect())
    }

    /// Build the result graph for one binding.
    ///
    /// Contains the resolved data concepts with their data attributes and
    /// every data relation corresponding to a query relation.
    pub fn materialize(
        &self,
        query: &ConceptGraph,
        data: &ConceptGraph,
        binding: &Binding,
    ) -> Result<ConceptGraph> {
        let resolve = |id: &str| -> String {
            binding.get(id).cloned().unwrap_or_else(|| id.to_string())
        };

        let mut result = ConceptGraph::new();
        for concept in query.concepts() {
            let resolved = resolve(&concept.id);
            result.add_concept(data.require_concept(&resolved)?.clone());
        }
        for relation in query.relations() {
            let source = resolve(&relation.source);
            let target = resolve(&relation.target);
            for found in data.relations_of(&source, Direction::Outgoing) {
                if found.is_triple(&relation.relation_type, &source, &target) {
                    result.add_relation(found.clone())?;
                }
            }
        }

        if self.options.include_query {
            for concept in query.concepts() {
                result.add_concept_if_not_exists(&concept.id, concept.clone());
            }
            for relation in query.relations() {
                if !result.has_relation(&relation.relation_type, &relation.source, &relation.target)
                {
                    result.add_relation(relation.clone())?;
                }
            }
            for concept in query.concepts() {
                let resolved = resolve(&concept.id);
                result.add_relation_if_not_exists(MATCHES_RELATION, &concept.id, &resolved)?;
            }
        }
        Ok(result)
    }
}

/// Relation lookups over the data graph
struct DataIndex<'a> {
    triples: HashSet<(&'a str, &'a str, &'a str)>,
    outgoing: HashSet<(&'a str, &'a str)>,
    incoming: HashSet<(&'a str, &'a str)>,
}

impl<'a> DataIndex<'a> {
    fn new(data: &'a ConceptGraph) -> Self {
        let mut index = Self {
            triples: HashSet::new(),
            outgoing: HashSet::new(),
            incoming: HashSet::new(),
        };
        for r in data.relations() {
            let (source, kind, target) = (r.source.as_str(), r.relation_type.as_str(), r.target.as_str());
            index.triples.insert((source, kind, target));
            index.outgoing.insert((source, kind));
            index.incoming.insert((kind, target));
        }
        index
    }
}

struct Search<'q, 'd> {
    unknowns: &'q [&'q str],
    constraints: &'q [Vec<&'q Relation>],
    is_known: &'q HashSet<&'q str>,
    candidate_pool: &'q [&'d str],
    index: DataIndex<'d>,
    limits: &'q MatchLimits,
    steps: usize,
    truncated: bool,
    results: Vec<BTreeMap<&'q str, &'d str>>,
}

impl<'q, 'd> Search<'q, 'd> {
    fn extend(
        &mut self,
        depth: usize,
        binding: &mut BTreeMap<&'q str, &'d str>,
        used: &mut HashSet<&'d str>,
    ) -> Result<()> {
        if depth == self.unknowns.len() {
            self.results.push(binding.clone());
            if self.results.len() >= self.limits.max_results {
                self.truncated = true;
            }
            return Ok(());
        }

        let variable = self.unknowns[depth];
        for &candidate in self.candidate_pool {
            if self.truncated {
                break;
            }
            if used.contains(candidate) {
                continue;
            }

            self.steps += 1;
            if self.steps > self.limits.max_steps {
                return Err(Error::SearchBudgetExceeded { steps: self.limits.max_steps });
            }

            if !self.consistent(depth, candidate, binding) {
                tracing::trace!("Rejected {} = {}", variable, candidate);
                continue;
            }

            binding.insert(variable, candidate);
            used.insert(candidate);
            self.extend(depth + 1, binding, used)?;
            binding.remove(variable);
            used.remove(candidate);
        }
        Ok(())
    }

    /// Check every query relation touching the unknown at `depth` against the
    /// data, with that unknown bound to `candidate`
    fn consistent(&self, depth: usize, candidate: &str, binding: &BTreeMap<&'q str, &'d str>) -> bool {
        let variable = self.unknowns[depth];

        self.constraints[depth].iter().all(|relation| {
            let kind = relation.relation_type.as_str();
            let source = endpoint(&relation.source, variable, candidate, self.is_known, binding);
            let target = endpoint(&relation.target, variable, candidate, self.is_known, binding);
            match (source, target) {
                (Some(source), Some(target)) => self.index.triples.contains(&(source, kind, target)),
                (Some(source), None) => self.index.outgoing.contains(&(source, kind)),
                (None, Some(target)) => self.index.incoming.contains(&(kind, target)),
                (None, None) => true,
            }
        })
    }
}

/// Data id a query endpoint currently resolves to, `None` while still free
fn endpoint<'a>(
    id: &'a str,
    variable: &str,
    candidate: &'a str,
    is_known: &HashSet<&str>,
    binding: &BTreeMap<&'a str, &'a str>,
) -> Option<&'a str> {
    if id == variable {
        Some(candidate)
    } else if is_known.contains(id) {
        Some(id)
    } else {
        binding.get(id).copied()
    }
}
