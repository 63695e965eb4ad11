//! Export functionality for schema diagrams.
//!
//! This module provides exporters for writing a [`SchemaGraph`] in various
//! formats: Graphviz DOT, JSON and Markdown as text, and PNG, SVG or PDF
//! images rendered through the `dot` layout engine.

pub mod dot;
pub mod json;
pub mod markdown;
pub mod render;

use crate::graph::{CycleInfo, SchemaGraph, SchemaNode};
use indexmap::IndexMap;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

pub use dot::DotExporter;
pub use json::JsonExporter;
pub use markdown::MarkdownExporter;
pub use render::render_image;

/// Default module color palette.
pub const DEFAULT_PALETTE: &[&str] = &[
    "#FF9999", "#99FF99", "#9999FF", "#FFCC99", "#CC99FF", "#FF99CC", "#99CCFF", "#CCCCCC",
];

/// Color for classes without a module.
pub const DEFAULT_COLOR: &str = "#CCCCCC";

/// Errors that can occur while exporting.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("Graphviz failed to render {format}: {message}")]
    Render {
        format: ExportFormat,
        message: String,
    },
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Graphviz DOT source
    Dot,
    /// JSON format - machine-readable, full data
    Json,
    /// Markdown format - documentation/reporting
    Markdown,
    /// PNG image
    Png,
    /// SVG image
    Svg,
    /// PDF document
    Pdf,
}

impl ExportFormat {
    /// Infers the format from a file extension.
    ///
    /// ```rust
    /// use schemaviz::export::ExportFormat;
    ///
    /// assert_eq!(ExportFormat::from_path("out/schemas.svg"), Some(ExportFormat::Svg));
    /// assert_eq!(ExportFormat::from_path("schemas"), None);
    /// ```
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    /// Returns true for formats produced by Graphviz.
    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Svg | Self::Pdf)
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dot" | "gv" => Ok(ExportFormat::Dot),
            "json" => Ok(ExportFormat::Json),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "png" => Ok(ExportFormat::Png),
            "svg" => Ok(ExportFormat::Svg),
            "pdf" => Ok(ExportFormat::Pdf),
            _ => Err(format!(
                "Unknown export format: '{}'. Valid formats: dot, json, markdown, png, svg, pdf",
                s
            )),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Dot => write!(f, "dot"),
            ExportFormat::Json => write!(f, "json"),
            ExportFormat::Markdown => write!(f, "markdown"),
            ExportFormat::Png => write!(f, "png"),
            ExportFormat::Svg => write!(f, "svg"),
            ExportFormat::Pdf => write!(f, "pdf"),
        }
    }
}

/// Visual settings for the diagram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagramStyle {
    /// Graph label drawn at the top
    pub title: String,
    /// Graphviz rank direction (`LR`, `TB`, ...)
    pub rankdir: String,
    /// Colors assigned to modules in sorted order, cycling
    pub palette: Vec<String>,
    /// Color for classes without a module
    pub default_color: String,
    /// Font for all text, Graphviz default if unset
    pub font: Option<String>,
}

impl Default for DiagramStyle {
    fn default() -> Self {
        Self {
            title: "Schemas Diagram".to_string(),
            rankdir: "LR".to_string(),
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            default_color: DEFAULT_COLOR.to_string(),
            font: None,
        }
    }
}

impl DiagramStyle {
    /// Maps each module to its color.
    ///
    /// Modules are colored in sorted order, wrapping around the palette.
    pub fn module_colors<'a, I>(&self, modules: I) -> IndexMap<String, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut sorted: Vec<&str> = modules.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();

        sorted
            .into_iter()
            .enumerate()
            .map(|(i, module)| {
                let color = if self.palette.is_empty() {
                    self.default_color.clone()
                } else {
                    self.palette[i % self.palette.len()].clone()
                };
                (module.to_string(), color)
            })
            .collect()
    }
}

/// Data container for export operations.
///
/// Holds the graph together with everything derived from it that the
/// exporters share.
#[derive(Debug, Clone)]
pub struct ExportData<'a> {
    /// The graph to export
    pub graph: &'a SchemaGraph,
    /// Visual settings
    pub style: DiagramStyle,
    /// Module to color, in sorted module order
    pub legend: IndexMap<String, String>,
    /// Detected reference cycles
    pub cycles: Vec<CycleInfo>,
}

impl<'a> ExportData<'a> {
    /// Create new export data for a graph.
    pub fn new(graph: &'a SchemaGraph, style: DiagramStyle) -> Self {
        let legend = style.module_colors(graph.modules());
        Self {
            graph,
            style,
            legend,
            cycles: graph.get_cycle_details(),
        }
    }

    /// The color a node is drawn with.
    pub fn color_for(&self, node: &SchemaNode) -> &str {
        node.module
            .as_deref()
            .and_then(|m| self.legend.get(m))
            .map(String::as_str)
            .unwrap_or(self.style.default_color.as_str())
    }

    /// Get count of classes defined in the target modules
    pub fn local_count(&self) -> usize {
        self.graph.nodes().iter().filter(|n| n.local).count()
    }

    /// Get count of classes whose definition was not found
    pub fn placeholder_count(&self) -> usize {
        self.graph.nodes().iter().filter(|n| n.kind.is_none()).count()
    }
}

/// Trait for text exporters.
pub trait Exporter {
    /// Export the data to the given writer.
    fn export<W: Write>(&self, data: &ExportData, writer: &mut W) -> io::Result<()>;
}

/// Export data in the specified format.
///
/// Image formats are laid out by Graphviz and the resulting bytes written
/// to `writer`.
pub fn export<W: Write>(format: ExportFormat, data: &ExportData, writer: &mut W) -> ExportResult<()> {
    match format {
        ExportFormat::Dot => DotExporter.export(data, writer)?,
        ExportFormat::Json => JsonExporter.export(data, writer)?,
        ExportFormat::Markdown => MarkdownExporter.export(data, writer)?,
        ExportFormat::Png | ExportFormat::Svg | ExportFormat::Pdf => {
            let bytes = render_image(format, data)?;
            writer.write_all(&bytes)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Export data to a string.
pub fn export_to_string(format: ExportFormat, data: &ExportData) -> ExportResult<String> {
    let mut buffer = Vec::new();
    export(format, data, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| ExportError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Escape text for use inside a Graphviz HTML-like label.
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_from_str() {
        assert_eq!("dot".parse::<ExportFormat>().unwrap(), ExportFormat::Dot);
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!(
            "md".parse::<ExportFormat>().unwrap(),
            ExportFormat::Markdown
        );
        assert_eq!("Png".parse::<ExportFormat>().unwrap(), ExportFormat::Png);
        assert!("csv".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_export_format_display() {
        assert_eq!(format!("{}", ExportFormat::Dot), "dot");
        assert_eq!(format!("{}", ExportFormat::Markdown), "markdown");
        assert_eq!(format!("{}", ExportFormat::Pdf), "pdf");
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path("schemas.png"), Some(ExportFormat::Png));
        assert_eq!(ExportFormat::from_path("a/b.PDF"), Some(ExportFormat::Pdf));
        assert_eq!(ExportFormat::from_path("graph.gv"), Some(ExportFormat::Dot));
        assert_eq!(ExportFormat::from_path("notes.txt"), None);
        assert!(ExportFormat::Svg.is_image());
        assert!(!ExportFormat::Json.is_image());
    }

    #[test]
    fn test_module_colors_sorted_and_cycling() {
        let style = DiagramStyle {
            palette: vec!["#111111".to_string(), "#222222".to_string()],
            ..DiagramStyle::default()
        };
        let colors = style.module_colors(["zeta", "alpha", "mid", "alpha"]);

        let pairs: Vec<_> = colors.iter().map(|(m, c)| (m.as_str(), c.as_str())).collect();
        assert_eq!(
            pairs,
            vec![("alpha", "#111111"), ("mid", "#222222"), ("zeta", "#111111")]
        );
    }

    #[test]
    fn test_empty_palette_uses_default_color() {
        let style = DiagramStyle {
            palette: Vec::new(),
            ..DiagramStyle::default()
        };
        let colors = style.module_colors(["a"]);
        assert_eq!(colors["a"], DEFAULT_COLOR);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("List[str]"), "List[str]");
        assert_eq!(
            escape_html("Literal['a', \"b\"] & <x>"),
            "Literal[&#39;a&#39;, &quot;b&quot;] &amp; &lt;x&gt;"
        );
    }
}
