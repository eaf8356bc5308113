//! Rules stored as graphs, and their application to working memory
//!
//! A rule graph has a root concept with `has_hypothesis` relations to the
//! pattern concepts, optional `has_mapping` relations to placeholder concepts,
//! and `has_conclusion` relations to the template concepts. A `becomes`
//! relation `H -becomes-> M` says that whatever `H` matched replaces `M` in the
//! conclusion. Unknowns shared by hypothesis and conclusion are replaced by
//! their bindings as well.
//!
//! A conclusion may contain a whole rule (its root among the conclusion
//! concepts), so applying one rule can construct another.

use crate::concept::Concept;
use crate::error::{Error, Result};
use crate::graph::ConceptGraph;
use crate::id::IdGenerator;
use crate::limits::{validate_rounds, MatchLimits};
use crate::matcher::{Binding, MatchOptions, Matcher, MATCHES_RELATION};
use crate::relation::Direction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const HAS_HYPOTHESIS: &str = "has_hypothesis";
pub const HAS_MAPPING: &str = "has_mapping";
pub const HAS_CONCLUSION: &str = "has_conclusion";
pub const BECOMES: &str = "becomes";

/// A validated view of a rule graph
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    root: String,
    hypothesis: ConceptGraph,
    mapping: ConceptGraph,
    conclusion: ConceptGraph,
    becomes: Vec<(String, String)>,
}

impl Rule {
    /// Split a rule graph into hypothesis, mapping and conclusion.
    ///
    /// The root is the one concept with `has_hypothesis` relations that is not
    /// itself part of a conclusion.
    pub fn from_graph(graph: &ConceptGraph) -> Result<Self> {
        let nested: BTreeSet<&str> = graph
            .relations_of_type(HAS_CONCLUSION)
            .map(|r| r.target.as_str())
            .collect();
        let roots: BTreeSet<&str> = graph
            .relations_of_type(HAS_HYPOTHESIS)
            .map(|r| r.source.as_str())
            .filter(|source| !nested.contains(source))
            .collect();

        let root = match roots.iter().collect::<Vec<_>>().as_slice() {
            [root] => root.to_string(),
            [] => {
                return Err(Error::MalformedRule(format!(
                    "no root concept with a {} relation",
                    HAS_HYPOTHESIS
                )))
            }
            several => {
                return Err(Error::MalformedRule(format!(
                    "several rule roots: {}",
                    several.iter().map(|r| r.to_string()).collect::<Vec<_>>().join(", ")
                )))
            }
        };

        if !graph
            .relations_of(&root, Direction::Outgoing)
            .any(|r| r.relation_type == HAS_CONCLUSION)
        {
            return Err(Error::MalformedRule(format!(
                "rule {} has no {} relation",
                root, HAS_CONCLUSION
            )));
        }

        let mut hypothesis = graph.concept_definition_of(&root, HAS_HYPOTHESIS);
        let becomes_ids: Vec<_> = hypothesis
            .relations_of_type(BECOMES)
            .map(|r| r.id.clone())
            .collect();
        for id in &becomes_ids {
            hypothesis.remove_relation(id);
        }

        let mapping = graph.concept_definition_of(&root, HAS_MAPPING);
        let conclusion = graph.concept_definition_of(&root, HAS_CONCLUSION);

        let mut becomes = Vec::new();
        for relation in graph.relations_of_type(BECOMES) {
            let inside_conclusion = conclusion.contains_concept(&relation.source)
                && conclusion.contains_concept(&relation.target);
            if inside_conclusion {
                continue;
            }
            if !hypothesis.contains_concept(&relation.source) {
                return Err(Error::MalformedRule(format!(
                    "{} source {} is not part of the hypothesis of {}",
                    BECOMES, relation.source, root
                )));
            }
            becomes.push((relation.source.clone(), relation.target.clone()));
        }

        Ok(Self {
            root,
            hypothesis,
            mapping,
            conclusion,
            becomes,
        })
    }

    pub fn name(&self) -> &str {
        &self.root
    }

    pub fn hypothesis(&self) -> &ConceptGraph {
        &self.hypothesis
    }

    pub fn mapping(&self) -> &ConceptGraph {
        &self.mapping
    }

    pub fn conclusion(&self) -> &ConceptGraph {
        &self.conclusion
    }

    /// `(hypothesis concept, placeholder)` pairs
    pub fn becomes(&self) -> &[(String, String)] {
        &self.becomes
    }

    /// Substitute the bindings recorded in a match graph into the conclusion.
    ///
    /// `matched` must carry `matches` relations from hypothesis concepts to
    /// the data concepts they resolved to.
    pub fn ground(&self, matched: &ConceptGraph) -> Result<ConceptGraph> {
        let mut result = self.conclusion.clone();

        for (source, placeholder) in &self.becomes {
            let grounded = resolved_concept(matched, source)?;
            if result.contains_concept(placeholder) {
                result.substitute(placeholder, &grounded)?;
            } else {
                tracing::debug!(
                    "Placeholder {} of rule {} does not occur in the conclusion",
                    placeholder,
                    self.root
                );
            }
        }

        let shared: Vec<String> = self
            .hypothesis
            .unknown_concepts()
            .filter(|c| result.contains_concept(&c.id))
            .map(|c| c.id.clone())
            .collect();
        for id in shared {
            let grounded = resolved_concept(matched, &id)?;
            result.substitute(&id, &grounded)?;
        }

        Ok(result)
    }
}

fn resolved_concept(matched: &ConceptGraph, query_id: &str) -> Result<Concept> {
    let target = matched
        .relations_of(query_id, Direction::Outgoing)
        .find(|r| r.relation_type == MATCHES_RELATION)
        .map(|r| r.target.clone())
        .ok_or_else(|| {
            Error::MalformedRule(format!("no binding recorded for {}", query_id))
        })?;
    Ok(matched.require_concept(&target)?.clone())
}

/// Summary of a forward-chaining run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub rounds: usize,
    pub firings: usize,
    pub added_concepts: usize,
    pub added_relations: usize,
    pub reached_fixpoint: bool,
}

/// Applies rules to working memory
#[derive(Debug, Clone)]
pub struct RuleEngine {
    matcher: Matcher,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(MatchLimits::default())
    }
}

impl RuleEngine {
    pub fn new(limits: MatchLimits) -> Self {
        Self {
            matcher: Matcher::new(MatchOptions::default().including_query().with_limits(limits)),
        }
    }

    /// Ground the conclusion of `rule_graph` with its first match.
    ///
    /// Matches are ordered by their bindings before the first is taken.
    /// Returns an empty graph when the hypothesis does not match.
    pub fn apply_rule(
        &self,
        rule_graph: &ConceptGraph,
        working_memory: &ConceptGraph,
    ) -> Result<ConceptGraph> {
        let rule = Rule::from_graph(rule_graph)?;
        self.apply(&rule, working_memory)
    }

    pub fn apply(&self, rule: &Rule, working_memory: &ConceptGraph) -> Result<ConceptGraph> {
        let bindings = self.sorted_bindings(rule, working_memory)?;
        let Some(first) = bindings.first() else {
            tracing::debug!("Rule {} did not fire", rule.name());
            return Ok(ConceptGraph::new());
        };

        let matched = self
            .matcher
            .materialize(rule.hypothesis(), working_memory, first)?;
        let result = rule.ground(&matched)?;
        tracing::info!(
            "Rule {} fired ({} candidate matches)",
            rule.name(),
            bindings.len()
        );
        Ok(result)
    }

    /// Ground the conclusion once per match
    pub fn apply_rule_all(
        &self,
        rule_graph: &ConceptGraph,
        working_memory: &ConceptGraph,
    ) -> Result<Vec<ConceptGraph>> {
        let rule = Rule::from_graph(rule_graph)?;
        self.apply_all(&rule, working_memory)
    }

    pub fn apply_all(&self, rule: &Rule, working_memory: &ConceptGraph) -> Result<Vec<ConceptGraph>> {
        self.sorted_bindings(rule, working_memory)?
            .iter()
            .map(|binding| {
                let matched = self
                    .matcher
                    .materialize(rule.hypothesis(), working_memory, binding)?;
                rule.ground(&matched)
            })
            .collect()
    }

    /// Apply every rule to every match and merge the conclusions into
    /// working memory until nothing new is added or `max_rounds` is reached
    pub fn forward_chain(
        &self,
        rule_graphs: &[ConceptGraph],
        working_memory: &mut ConceptGraph,
        max_rounds: usize,
    ) -> Result<ChainReport> {
        validate_rounds(max_rounds)?;
        let rules = rule_graphs
            .iter()
            .map(Rule::from_graph)
            .collect::<Result<Vec<_>>>()?;

        let mut report = ChainReport::default();
        for round in 1..=max_rounds {
            let before = (working_memory.concept_count(), working_memory.relation_count());

            let mut derived = ConceptGraph::new();
            for rule in &rules {
                for conclusion in self.apply_all(rule, working_memory)? {
                    report.firings += 1;
                    derived.merge_from(&conclusion)?;
                }
            }
            working_memory.merge_from(&derived)?;

            let after = (working_memory.concept_count(), working_memory.relation_count());
            report.rounds = round;
            report.added_concepts += after.0 - before.0;
            report.added_relations += after.1 - before.1;
            tracing::debug!(
                "Chaining round {}: +{} concepts, +{} relations",
                round,
                after.0 - before.0,
                after.1 - before.1
            );

            if after == before {
                report.reached_fixpoint = true;
                break;
            }
        }
        Ok(report)
    }

    fn sorted_bindings(&self, rule: &Rule, working_memory: &ConceptGraph) -> Result<Vec<Binding>> {
        let mut bindings = self
            .matcher
            .find_bindings(rule.hypothesis(), working_memory)?;
        bindings.sort();
        Ok(bindings)
    }
}

/// Assembles a rule graph from its parts
#[derive(Debug, Clone, Default)]
pub struct RuleBuilder {
    name: Option<String>,
    hypothesis: ConceptGraph,
    mapping: ConceptGraph,
    conclusion: ConceptGraph,
    becomes: Vec<(String, String)>,
}

impl RuleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn hypothesis(mut self, hypothesis: ConceptGraph) -> Self {
        self.hypothesis = hypothesis;
        self
    }

    pub fn mapping(mut self, mapping: ConceptGraph) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn conclusion(mut self, conclusion: ConceptGraph) -> Self {
        self.conclusion = conclusion;
        self
    }

    pub fn becomes(mut self, source: impl Into<String>, placeholder: impl Into<String>) -> Self {
        self.becomes.push((source.into(), placeholder.into()));
        self
    }

    /// Build and validate the rule graph; unnamed rules get an id from `ids`
    pub fn build(self, ids: &mut IdGenerator) -> Result<ConceptGraph> {
        let mut graph = ConceptGraph::new();
        graph.merge_from(&self.hypothesis)?;
        graph.merge_from(&self.mapping)?;
        graph.merge_from(&self.conclusion)?;

        let root = match self.name {
            Some(name) => name,
            None => ids.next_free(&graph),
        };
        graph.add_concept(Concept::new(root.clone()));

        for (part, relation_type) in [
            (&self.hypothesis, HAS_HYPOTHESIS),
            (&self.mapping, HAS_MAPPING),
            (&self.conclusion, HAS_CONCLUSION),
        ] {
            for id in part.concept_ids() {
                graph.add_relation_if_not_exists(relation_type, &root, id)?;
            }
        }
        for (source, placeholder) in &self.becomes {
            graph.add_relation_if_not_exists(BECOMES, source, placeholder)?;
        }

        Rule::from_graph(&graph)?;
        Ok(graph)
    }
}
