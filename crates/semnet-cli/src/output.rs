//! Output formatting utilities

use clap::ValueEnum;
use semnet_core::ConceptGraph;
use serde::Serialize;

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Compact nested notation
    #[default]
    Notation,
    /// Pretty JSON with explicit concept and relation lists
    Json,
}

/// Printed in place of an empty result
pub const NO_MATCH: &str = "no match";

/// Format one graph
pub fn format_graph(graph: &ConceptGraph, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Notation => Ok(serde_json::to_string(&graph.to_model(None)?)?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(graph)?),
    }
}

/// Format a list of graphs, one per line in notation
pub fn format_graphs(graphs: &[ConceptGraph], format: OutputFormat) -> anyhow::Result<String> {
    if graphs.is_empty() {
        return Ok(NO_MATCH.to_string());
    }
    match format {
        OutputFormat::Notation => Ok(graphs
            .iter()
            .map(|g| format_graph(g, format))
            .collect::<anyhow::Result<Vec<_>>>()?
            .join("\n")),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(graphs)?),
    }
}

/// Format any serializable value
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Notation => Ok(serde_json::to_string(data)?),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notation_is_compact() {
        let graph = ConceptGraph::from_notation_str(r#"{"sky": {"-is->": "blue"}}"#).unwrap();

        assert_eq!(
            format_graph(&graph, OutputFormat::Notation).unwrap(),
            r#"{"sky":{"-is->":"blue"}}"#
        );
        assert!(format_graph(&graph, OutputFormat::Json)
            .unwrap()
            .contains("\"relations\""));
    }

    #[test]
    fn test_empty_list_prints_no_match() {
        assert_eq!(format_graphs(&[], OutputFormat::Json).unwrap(), NO_MATCH);
    }
}
