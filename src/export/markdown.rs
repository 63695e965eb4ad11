//! Markdown export implementation.
//!
//! Exports the schema graph in Markdown format for documentation and reporting.

use super::{ExportData, Exporter};
use std::io::{self, Write};

/// Markdown exporter implementation.
pub struct MarkdownExporter;

/// Escape pipes so type displays don't break table cells.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

impl Exporter for MarkdownExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        // Title
        writeln!(writer, "# {}", data.style.title)?;
        writeln!(writer)?;

        // Summary section
        writeln!(writer, "## Summary")?;
        writeln!(writer)?;
        writeln!(writer, "| Metric | Count |")?;
        writeln!(writer, "|--------|-------|")?;
        writeln!(writer, "| Classes | {} |", data.graph.node_count())?;
        writeln!(writer, "| Local | {} |", data.local_count())?;
        writeln!(writer, "| Placeholders | {} |", data.placeholder_count())?;
        writeln!(writer, "| References | {} |", data.graph.edge_count())?;
        writeln!(writer, "| Reference Cycles | {} |", data.cycles.len())?;
        writeln!(writer)?;

        writeln!(writer, "## Classes")?;
        writeln!(writer)?;

        for node in data.graph.nodes() {
            let kind = node
                .kind
                .map(|k| k.to_string())
                .unwrap_or_else(|| "unresolved".to_string());
            let module = node.module.as_deref().unwrap_or("unknown module");
            writeln!(writer, "### {}", node.name)?;
            writeln!(writer)?;
            writeln!(writer, "*{}* in `{}`", kind, module)?;
            writeln!(writer)?;

            if !node.has_fields() {
                continue;
            }

            if node.is_enum() {
                writeln!(writer, "| Member |")?;
                writeln!(writer, "|--------|")?;
                for name in node.fields.keys() {
                    writeln!(writer, "| {} |", name)?;
                }
            } else {
                writeln!(writer, "| Field | Type | Default |")?;
                writeln!(writer, "|-------|------|---------|")?;
                for (name, field) in &node.fields {
                    let default = field
                        .default
                        .as_ref()
                        .map(|d| format!("`{}`", cell(&d.to_string())))
                        .unwrap_or_default();
                    writeln!(
                        writer,
                        "| {} | `{}` | {} |",
                        name,
                        cell(&field.type_info.display),
                        default
                    )?;
                }
            }
            writeln!(writer)?;

            let references = data.graph.references(&node.name);
            if !references.is_empty() {
                let names: Vec<&str> = references.iter().map(|n| n.name.as_str()).collect();
                writeln!(writer, "References: {}", names.join(", "))?;
                writeln!(writer)?;
            }
        }

        // Reference cycles
        if !data.cycles.is_empty() {
            writeln!(writer, "## Reference Cycles")?;
            writeln!(writer)?;
            for (i, cycle) in data.cycles.iter().enumerate() {
                writeln!(writer, "{}. `{}`", i + 1, cycle.cycle_path())?;
            }
            writeln!(writer)?;
        }

        // Footer
        writeln!(writer, "---")?;
        writeln!(writer, "*Generated by schemaviz*")?;

        Ok(())
    }
}
