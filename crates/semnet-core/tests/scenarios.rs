//! End-to-end behaviour of notation, matching and rule application

use semnet_core::{
    ConceptGraph, ConceptGraphModel, IdGenerator, MatchOptions, Matcher, RuleBuilder, RuleEngine,
    MATCHES_RELATION,
};
use serde_json::json;

fn graph(value: serde_json::Value) -> ConceptGraph {
    let model: ConceptGraphModel = serde_json::from_value(value).unwrap();
    ConceptGraph::from_model(&model).unwrap()
}

fn matches(query: &ConceptGraph, data: &ConceptGraph) -> Vec<ConceptGraph> {
    Matcher::default().match_graphs(query, data).unwrap()
}

#[test]
fn exact_concept_matches_itself() {
    let data = graph(json!({ "sky": {} }));
    let query = graph(json!({ "sky": {} }));

    assert_eq!(matches(&query, &data), vec![graph(json!({ "sky": {} }))]);
}

#[test]
fn lone_unknown_binds_every_concept() {
    let data = graph(json!({ "sky": {}, "blue": {} }));
    let query = graph(json!({ "?u": {} }));

    let results = matches(&query, &data);
    assert_eq!(
        results,
        vec![graph(json!({ "blue": {} })), graph(json!({ "sky": {} }))]
    );
}

#[test]
fn unknown_constrained_by_relation() {
    let data = graph(json!({ "sky": { "-is->": "blue" } }));
    let query = graph(json!({ "?u": { "-is->": "blue" } }));

    assert_eq!(matches(&query, &data), vec![data.clone()]);
}

#[test]
fn too_few_candidates_for_unknowns() {
    let data = graph(json!({ "sky": {} }));
    let query = graph(json!({ "?a": {}, "?b": {} }));

    assert!(matches(&query, &data).is_empty());
}

#[test]
fn absent_known_concept_prevents_any_match() {
    let data = graph(json!({ "sky": {} }));
    let query = graph(json!({ "sky": {}, "blue": {} }));

    assert!(matches(&query, &data).is_empty());
}

#[test]
fn included_query_links_each_unknown_to_its_binding() {
    let data = graph(json!({
        "sky": { "-is->": "blue" },
        "blue": { "-is->": "colour" }
    }));
    let query = graph(json!({ "?a": { "-is->": "?b" } }));

    let matcher = Matcher::new(MatchOptions::default().including_query());
    let results = matcher.match_graphs(&query, &data).unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].has_relation(MATCHES_RELATION, "?a", "blue"));
    assert!(results[0].has_relation(MATCHES_RELATION, "?b", "colour"));
    assert!(results[0].has_relation("is", "blue", "colour"));
    assert!(results[1].has_relation(MATCHES_RELATION, "?a", "sky"));
    assert!(results[1].has_relation(MATCHES_RELATION, "?b", "blue"));
    assert!(results[1].has_relation("is", "sky", "blue"));
}

#[test]
fn rule_rewrites_matched_concept() {
    let rule = graph(json!({
        "lighten": {
            "-has_hypothesis->": {
                "?x": { "-attr->": "light_blue", "-becomes->": "?y" },
                "light_blue": {}
            },
            "-has_mapping->": "?y",
            "-has_conclusion->": { "?y": { "-attr->": "blue" }, "blue": {} }
        }
    }));
    let memory = graph(json!({ "sky": { "-attr->": "light_blue" } }));

    let result = RuleEngine::default().apply_rule(&rule, &memory).unwrap();
    assert_eq!(result, graph(json!({ "sky": { "-attr->": "blue" } })));
}

#[test]
fn notation_round_trip_preserves_graph() {
    let original = graph(json!({
        "sky": { "-is->": { "blue": { "-is->": "colour" } }, "-has->": ["clouds", "sun"] },
        "?who": { "-sees->": "sky" },
        "sun": { "-is->": "yellow" }
    }));

    let model = original.to_model(None).unwrap();
    let decoded = ConceptGraph::from_model(&model).unwrap();

    assert_eq!(decoded, original);
    let text = original.to_notation_string().unwrap();
    assert_eq!(ConceptGraph::from_notation_str(&text).unwrap(), original);
}

#[test]
fn query_without_unknowns_matches_at_most_once() {
    let data = graph(json!({
        "sky": { "-is->": "blue" },
        "sea": { "-is->": "blue" }
    }));
    let query = graph(json!({ "sky": { "-is->": "blue" } }));

    assert_eq!(matches(&query, &data).len(), 1);
}

#[test]
fn bindings_are_distinct() {
    let data = graph(json!({
        "sky": { "-is->": "blue" },
        "sea": { "-is->": "blue" },
        "grass": { "-is->": "green" }
    }));
    let query = graph(json!({ "?x": { "-is->": "blue" } }));

    let bindings = Matcher::default().find_bindings(&query, &data).unwrap();
    assert_eq!(bindings.len(), 2);
    assert_ne!(bindings[0], bindings[1]);
}

#[test]
fn transitive_rule_reaches_fixpoint() {
    let rule = RuleBuilder::new()
        .named("ancestry")
        .hypothesis(graph(json!({ "?a": { "-ancestor->": { "?b": { "-ancestor->": "?c" } } } })))
        .mapping(graph(json!({ "?p": {}, "?q": {} })))
        .conclusion(graph(json!({ "?p": { "-ancestor->": "?q" } })))
        .becomes("?a", "?p")
        .becomes("?c", "?q")
        .build(&mut IdGenerator::default())
        .unwrap();
    let mut memory = graph(json!({
        "x": { "-ancestor->": { "y": { "-ancestor->": { "z": { "-ancestor->": "w" } } } } }
    }));

    let report = RuleEngine::default()
        .forward_chain(&[rule], &mut memory, 10)
        .unwrap();

    assert!(report.reached_fixpoint);
    assert_eq!(report.rounds, 3);
    assert_eq!(report.added_relations, 3);
    assert_eq!(report.added_concepts, 0);
    assert!(memory.has_relation("ancestor", "x", "z"));
    assert!(memory.has_relation("ancestor", "y", "w"));
    assert!(memory.has_relation("ancestor", "x", "w"));
}

#[test]
fn template_rule_builds_an_applicable_rule() {
    let generator = graph(json!({
        "generate": {
            "-has_hypothesis->": {
                "?n": { "-is_a->": "start", "-becomes->": "?p" },
                "start": {}
            },
            "-has_mapping->": "?p",
            "-has_conclusion->": {
                "next_rule": {
                    "-has_hypothesis->": {
                        "?i": { "-after->": "?p", "-becomes->": "?j" },
                        "?p": {}
                    },
                    "-has_conclusion->": { "?j": { "-is->": "found" }, "found": {} }
                },
                "?i": {},
                "?p": {},
                "?j": {},
                "found": {}
            }
        }
    }));
    let memory = graph(json!({
        "one": { "-is_a->": "start" },
        "two": { "-after->": "one" }
    }));
    let engine = RuleEngine::default();

    let generated = engine.apply_rule(&generator, &memory).unwrap();
    assert!(generated.contains_concept("next_rule"));
    assert!(generated.has_relation("after", "?i", "one"));
    assert!(!generated.contains_concept("?p"));

    let result = engine.apply_rule(&generated, &memory).unwrap();
    assert_eq!(result, graph(json!({ "two": { "-is->": "found" } })));
}
