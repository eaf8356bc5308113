//! Control programs: a sequence of store operations read from TOML
//!
//! ```toml
//! [[operation]]
//! op = "assert"
//! notation = '{"sky": {"-attr->": "light_blue"}}'
//!
//! [[operation]]
//! op = "apply_rule"
//! rule = "lighten"
//! commit = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use semnet_core::limits::MAX_ROUNDS;
use semnet_core::{ChainReport, ConceptGraph, RuleEngine};
use semnet_storage::KnowledgeStore;
use serde::{Deserialize, Serialize};

/// One step of a control program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Merge a notation file into the store
    Load { file: PathBuf },
    /// Merge inline notation into the store
    Assert { notation: String },
    /// Apply a stored rule to the stored graph
    ApplyRule {
        rule: String,
        #[serde(default)]
        commit: bool,
    },
    /// Match inline notation against the store
    Query { notation: String },
    /// Forward-chain stored rules over the store and keep the result
    Chain {
        rules: Vec<String>,
        #[serde(default)]
        max_rounds: Option<usize>,
    },
    /// Remove everything from the store
    Clear,
}

/// What one operation produced
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationOutcome {
    Merged { concepts: usize, relations: usize },
    Answer { graph: ConceptGraph },
    NoAnswer,
    Chained { report: ChainReport },
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default, rename = "operation")]
    pub operations: Vec<Operation>,

    /// Relative `load` paths resolve against this directory
    #[serde(skip)]
    pub base_dir: PathBuf,

    /// Round limit for `chain` operations that do not set their own
    #[serde(skip, default = "default_max_rounds")]
    pub max_rounds: usize,
}

fn default_max_rounds() -> usize {
    MAX_ROUNDS
}

impl Default for Program {
    fn default() -> Self {
        Self {
            operations: Vec::new(),
            base_dir: PathBuf::new(),
            max_rounds: default_max_rounds(),
        }
    }
}

impl Program {
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read program {}", path.display()))?;
        let mut program = Self::from_toml_str(&text)
            .with_context(|| format!("Invalid program {}", path.display()))?;
        program.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(program)
    }

    /// Run every operation in order, stopping at the first failure
    pub async fn run(
        &self,
        store: &dyn KnowledgeStore,
        engine: &RuleEngine,
    ) -> anyhow::Result<Vec<OperationOutcome>> {
        let mut outcomes = Vec::with_capacity(self.operations.len());
        for (step, operation) in self.operations.iter().enumerate() {
            tracing::debug!("Step {}: {:?}", step + 1, operation);
            let outcome = self
                .execute(operation, store, engine)
                .await
                .with_context(|| format!("Step {} failed", step + 1))?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn execute(
        &self,
        operation: &Operation,
        store: &dyn KnowledgeStore,
        engine: &RuleEngine,
    ) -> anyhow::Result<OperationOutcome> {
        match operation {
            Operation::Load { file } => {
                let graph = read_graph(&self.base_dir.join(file))?;
                merged(store, &graph).await
            }
            Operation::Assert { notation } => {
                let graph = ConceptGraph::from_notation_str(notation)?;
                merged(store, &graph).await
            }
            Operation::ApplyRule { rule, commit } => {
                let rule_graph = store.get_rule_by_name(rule).await?;
                let memory = store.load_graph().await?;
                let result = engine.apply_rule(&rule_graph, &memory)?;
                if result.is_empty() {
                    return Ok(OperationOutcome::NoAnswer);
                }
                if *commit {
                    store.save_graph(&result).await?;
                }
                Ok(OperationOutcome::Answer { graph: result })
            }
            Operation::Query { notation } => {
                let query = ConceptGraph::from_notation_str(notation)?;
                let result = store.find_and_merge_matches(&query).await?;
                if result.is_empty() {
                    Ok(OperationOutcome::NoAnswer)
                } else {
                    Ok(OperationOutcome::Answer { graph: result })
                }
            }
            Operation::Chain { rules, max_rounds } => {
                let mut rule_graphs = Vec::with_capacity(rules.len());
                for name in rules {
                    rule_graphs.push(store.get_rule_by_name(name).await?);
                }
                let mut memory = store.load_graph().await?;
                let report = engine.forward_chain(
                    &rule_graphs,
                    &mut memory,
                    max_rounds.unwrap_or(self.max_rounds),
                )?;
                store.save_graph(&memory).await?;
                Ok(OperationOutcome::Chained { report })
            }
            Operation::Clear => {
                store.delete_all_data().await?;
                Ok(OperationOutcome::Cleared)
            }
        }
    }
}

async fn merged(store: &dyn KnowledgeStore, graph: &ConceptGraph) -> anyhow::Result<OperationOutcome> {
    store.save_graph(graph).await?;
    Ok(OperationOutcome::Merged {
        concepts: graph.concept_count(),
        relations: graph.relation_count(),
    })
}

/// Read a notation file into a graph
pub fn read_graph(path: &Path) -> anyhow::Result<ConceptGraph> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    ConceptGraph::from_notation_str(&text)
        .with_context(|| format!("Invalid notation in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use semnet_storage::MemoryStore;

    const LIGHTEN: &str = r#"{
        "lighten": {
            "-has_hypothesis->": {
                "?x": { "-attr->": "light_blue", "-becomes->": "?y" },
                "light_blue": {}
            },
            "-has_mapping->": "?y",
            "-has_conclusion->": { "?y": { "-attr->": "blue" }, "blue": {} }
        }
    }"#;

    #[test]
    fn test_parse_program() {
        let program = Program::from_toml_str(
            r#"
[[operation]]
op = "load"
file = "facts.json"

[[operation]]
op = "apply_rule"
rule = "lighten"

[[operation]]
op = "chain"
rules = ["lighten"]
max_rounds = 4

[[operation]]
op = "clear"
"#,
        )
        .unwrap();

        assert_eq!(
            program.operations,
            vec![
                Operation::Load {
                    file: PathBuf::from("facts.json")
                },
                Operation::ApplyRule {
                    rule: "lighten".to_string(),
                    commit: false
                },
                Operation::Chain {
                    rules: vec!["lighten".to_string()],
                    max_rounds: Some(4)
                },
                Operation::Clear,
            ]
        );
    }

    #[test]
    fn test_unknown_operation_rejected() {
        assert!(Program::from_toml_str("[[operation]]\nop = \"explode\"\n").is_err());
    }

    #[tokio::test]
    async fn test_run_rule_against_store() {
        let store = MemoryStore::new();
        let program = Program {
            operations: vec![
                Operation::Assert {
                    notation: LIGHTEN.to_string(),
                },
                Operation::Assert {
                    notation: r#"{"sky": {"-attr->": "light_blue"}}"#.to_string(),
                },
                Operation::ApplyRule {
                    rule: "lighten".to_string(),
                    commit: true,
                },
                Operation::Query {
                    notation: r#"{"sky": {"-attr->": "blue"}}"#.to_string(),
                },
                Operation::Query {
                    notation: r#"{"grass": {}}"#.to_string(),
                },
                Operation::Clear,
            ],
            ..Program::default()
        };

        let outcomes = program.run(&store, &RuleEngine::default()).await.unwrap();

        assert_eq!(outcomes.len(), 6);
        let expected = ConceptGraph::from_notation_str(r#"{"sky": {"-attr->": "blue"}}"#).unwrap();
        assert_eq!(
            outcomes[2],
            OperationOutcome::Answer {
                graph: expected.clone()
            }
        );
        assert_eq!(outcomes[3], OperationOutcome::Answer { graph: expected });
        assert_eq!(outcomes[4], OperationOutcome::NoAnswer);
        assert_eq!(outcomes[5], OperationOutcome::Cleared);
        assert!(store.load_graph().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_rule_fails_step() {
        let store = MemoryStore::new();
        let program = Program {
            operations: vec![Operation::ApplyRule {
                rule: "lighten".to_string(),
                commit: false,
            }],
            ..Program::default()
        };

        let err = program
            .run(&store, &RuleEngine::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Step 1"));
    }

    #[tokio::test]
    async fn test_chain_defaults_to_program_round_limit() {
        let ancestor = r#"{
            "ancestor": {
                "-has_hypothesis->": {
                    "?a": { "-parent->": "?b", "-becomes->": "?p" },
                    "?b": { "-parent->": "?c" },
                    "?c": { "-becomes->": "?q" }
                },
                "-has_mapping->": ["?p", "?q"],
                "-has_conclusion->": { "?p": { "-parent->": "?q" }, "?q": {} }
            }
        }"#;
        let facts = r#"{"x": {"-parent->": {"y": {"-parent->": {"z": {"-parent->": "w"}}}}}}"#;
        let operations = vec![
            Operation::Assert {
                notation: ancestor.to_string(),
            },
            Operation::Assert {
                notation: facts.to_string(),
            },
            Operation::Chain {
                rules: vec!["ancestor".to_string()],
                max_rounds: None,
            },
        ];

        let store = MemoryStore::new();
        let program = Program {
            operations,
            ..Program::default()
        }
        .with_max_rounds(1);
        let outcomes = program.run(&store, &RuleEngine::default()).await.unwrap();

        let OperationOutcome::Chained { report } = &outcomes[2] else {
            panic!("expected a chain report, got {:?}", outcomes[2]);
        };
        assert_eq!(report.rounds, 1);
        assert!(!report.reached_fixpoint);
    }

    #[tokio::test]
    async fn test_load_resolves_against_program_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("facts.json"), r#"{"sky": {"-is->": "blue"}}"#).unwrap();
        let program_path = dir.path().join("program.toml");
        std::fs::write(&program_path, "[[operation]]\nop = \"load\"\nfile = \"facts.json\"\n")
            .unwrap();

        let store = MemoryStore::new();
        let outcomes = Program::from_file(&program_path)
            .unwrap()
            .run(&store, &RuleEngine::default())
            .await
            .unwrap();

        assert_eq!(
            outcomes,
            vec![OperationOutcome::Merged {
                concepts: 2,
                relations: 1
            }]
        );
    }
}
