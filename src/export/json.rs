//! JSON export implementation.
//!
//! Exports the schema graph in JSON format for machine-readable output.

use super::{ExportData, Exporter};
use indexmap::IndexMap;
use serde::Serialize;
use std::io::{self, Write};

/// JSON exporter implementation.
pub struct JsonExporter;

/// Serializable field for JSON output.
#[derive(Serialize)]
struct JsonField<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    display: &'a str,
    references: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<String>,
}

/// Serializable class for JSON output.
#[derive(Serialize)]
struct JsonClass<'a> {
    name: &'a str,
    id: &'a str,
    module: Option<&'a str>,
    local: bool,
    kind: Option<String>,
    color: &'a str,
    fields: Vec<JsonField<'a>>,
}

/// Serializable edge for JSON output.
#[derive(Serialize)]
struct JsonEdge<'a> {
    from: &'a str,
    to: &'a str,
    field: &'a str,
}

/// Serializable cycle info for JSON output.
#[derive(Serialize)]
struct JsonCycle<'a> {
    classes: &'a [String],
    path: String,
}

/// Summary statistics for JSON output.
#[derive(Serialize)]
struct JsonSummary {
    classes: usize,
    local: usize,
    placeholders: usize,
    edges: usize,
    reference_cycles: usize,
}

/// Root JSON export structure.
#[derive(Serialize)]
struct JsonExport<'a> {
    title: &'a str,
    summary: JsonSummary,
    classes: Vec<JsonClass<'a>>,
    edges: Vec<JsonEdge<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cycles: Vec<JsonCycle<'a>>,
    legend: &'a IndexMap<String, String>,
}

impl Exporter for JsonExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let classes: Vec<JsonClass> = data
            .graph
            .nodes()
            .into_iter()
            .map(|node| JsonClass {
                name: &node.name,
                id: &node.id,
                module: node.module.as_deref(),
                local: node.local,
                kind: node.kind.map(|k| k.to_string()),
                color: data.color_for(node),
                fields: node
                    .fields
                    .iter()
                    .map(|(name, field)| JsonField {
                        name,
                        display: &field.type_info.display,
                        references: field.type_info.types.iter().map(String::as_str).collect(),
                        default: field.default.as_ref().map(|d| d.to_string()),
                    })
                    .collect(),
            })
            .collect();

        let edges: Vec<JsonEdge> = data
            .graph
            .edges()
            .into_iter()
            .map(|e| JsonEdge {
                from: &e.source.name,
                to: &e.target.name,
                field: e.field,
            })
            .collect();

        let cycles: Vec<JsonCycle> = data
            .cycles
            .iter()
            .map(|c| JsonCycle {
                classes: &c.nodes,
                path: c.cycle_path(),
            })
            .collect();

        let export = JsonExport {
            title: &data.style.title,
            summary: JsonSummary {
                classes: data.graph.node_count(),
                local: data.local_count(),
                placeholders: data.placeholder_count(),
                edges: data.graph.edge_count(),
                reference_cycles: data.cycles.len(),
            },
            classes,
            edges,
            cycles,
            legend: &data.legend,
        };

        let json = serde_json::to_string_pretty(&export)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        writeln!(writer, "{}", json)
    }
}
