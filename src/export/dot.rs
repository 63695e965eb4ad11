//! Graphviz DOT export implementation.
//!
//! Classes with fields become HTML-like tables with one port per field, so
//! edges leave from the row of the field that holds the reference and
//! arrive at the header of the referenced class.

use super::{escape_html, ExportData, Exporter};
use crate::graph::{sanitize_name, SchemaNode};
use std::io::{self, Write};

/// Port name of the header cell of every class table.
pub const HEADER_PORT: &str = "class_header";

/// Node identifier of the legend.
const LEGEND_ID: &str = "__schemaviz_legend__";

/// DOT exporter implementation.
pub struct DotExporter;

impl DotExporter {
    /// Render the data to a DOT string.
    pub fn to_dot(&self, data: &ExportData) -> io::Result<String> {
        let mut buffer = Vec::new();
        self.export(data, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

impl Exporter for DotExporter {
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()> {
        let style = &data.style;
        let font = style
            .font
            .as_deref()
            .map(|f| format!(", fontname=\"{}\"", escape_attr(f)))
            .unwrap_or_default();

        writeln!(writer, "digraph schemas {{")?;
        writeln!(
            writer,
            "  graph [label=\"{}\", labelloc=\"t\", rankdir=\"{}\"{}];",
            escape_attr(&style.title),
            escape_attr(&style.rankdir),
            font
        )?;
        writeln!(writer, "  node [shape=plaintext{}];", font)?;
        writeln!(writer, "  edge [arrowhead=normal{}];", font)?;
        writeln!(writer)?;

        for node in data.graph.nodes() {
            write_node(writer, node, data.color_for(node))?;
        }
        writeln!(writer)?;

        for edge in data.graph.edges() {
            let tail_port = format!("{}_type", sanitize_name(edge.field));
            if edge.target.has_fields() {
                writeln!(
                    writer,
                    "  \"{}\" -> \"{}\" [tailport=\"{}\", headport=\"{}\"];",
                    edge.source.id, edge.target.id, tail_port, HEADER_PORT
                )?;
            } else {
                writeln!(
                    writer,
                    "  \"{}\" -> \"{}\" [tailport=\"{}\"];",
                    edge.source.id, edge.target.id, tail_port
                )?;
            }
        }

        if !data.legend.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "  \"{}\" [label=<", LEGEND_ID)?;
            writeln!(
                writer,
                "    <TABLE BORDER=\"0\" CELLBORDER=\"1\" CELLSPACING=\"0\">"
            )?;
            writeln!(writer, "      <TR><TD COLSPAN=\"2\"><B>Legend</B></TD></TR>")?;
            for (module, color) in &data.legend {
                writeln!(
                    writer,
                    "      <TR><TD BGCOLOR=\"{}\">&nbsp;&nbsp;&nbsp;&nbsp;</TD><TD>{}</TD></TR>",
                    escape_html(color),
                    escape_html(module)
                )?;
            }
            writeln!(writer, "    </TABLE>")?;
            writeln!(writer, "  >];")?;
        }

        writeln!(writer, "}}")?;
        Ok(())
    }
}

fn write_node<W: Write>(writer: &mut W, node: &SchemaNode, color: &str) -> io::Result<()> {
    if !node.has_fields() {
        return writeln!(
            writer,
            "  \"{}\" [label=\"{}\", shape=box, style=dashed];",
            node.id,
            escape_attr(&node.name)
        );
    }

    // Local classes stand out with a thick solid border
    let border = if node.local {
        "BORDER=\"2\""
    } else {
        "BORDER=\"1\" STYLE=\"dashed\""
    };
    let columns = if node.is_enum() { 1 } else { 2 };
    let title = if node.is_enum() {
        format!("{} (Enum)", node.name)
    } else {
        node.name.clone()
    };

    writeln!(writer, "  \"{}\" [label=<", node.id)?;
    writeln!(
        writer,
        "    <TABLE {} CELLBORDER=\"1\" CELLSPACING=\"0\">",
        border
    )?;
    writeln!(
        writer,
        "      <TR><TD PORT=\"{}\" BGCOLOR=\"{}\" COLSPAN=\"{}\"><B>{}</B></TD></TR>",
        HEADER_PORT,
        escape_html(color),
        columns,
        escape_html(&title)
    )?;

    for (name, field) in &node.fields {
        if node.is_enum() {
            writeln!(writer, "      <TR><TD>{}</TD></TR>", escape_html(name))?;
        } else {
            writeln!(
                writer,
                "      <TR><TD>{}</TD><TD PORT=\"{}_type\">{}</TD></TR>",
                escape_html(name),
                sanitize_name(name),
                escape_html(&field.display())
            )?;
        }
    }

    writeln!(writer, "    </TABLE>")?;
    writeln!(writer, "  >];")
}

/// Escape text for a double-quoted DOT attribute.
fn escape_attr(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
