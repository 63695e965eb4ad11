//! Image rendering through the Graphviz `dot` executable.

use super::{DotExporter, ExportData, ExportError, ExportFormat, ExportResult};
use graphviz_rust::cmd::{CommandArg, Format, Layout};
use log::{debug, info};

fn graphviz_format(format: ExportFormat) -> Option<Format> {
    match format {
        ExportFormat::Png => Some(Format::Png),
        ExportFormat::Svg => Some(Format::Svg),
        ExportFormat::Pdf => Some(Format::Pdf),
        ExportFormat::Dot | ExportFormat::Json | ExportFormat::Markdown => None,
    }
}

/// Lay out the diagram with `dot` and return the rendered image bytes.
///
/// Fails with [`ExportError::Render`] when `format` is not an image format
/// or when Graphviz is missing or rejects the input.
pub fn render_image(format: ExportFormat, data: &ExportData) -> ExportResult<Vec<u8>> {
    let Some(gv_format) = graphviz_format(format) else {
        return Err(ExportError::Render {
            format,
            message: "not an image format".to_string(),
        });
    };

    let dot = DotExporter.to_dot(data)?;
    debug!(format = format.to_string(), bytes = dot.len(); "Invoking graphviz");

    let bytes = graphviz_rust::exec_dot(
        dot,
        vec![CommandArg::Layout(Layout::Dot), CommandArg::Format(gv_format)],
    )
    .map_err(|e| ExportError::Render {
        format,
        message: e.to_string(),
    })?;

    info!(format = format.to_string(), bytes = bytes.len(); "Rendered diagram");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::DiagramStyle;
    use crate::graph::SchemaGraph;

    #[test]
    fn test_text_formats_have_no_graphviz_format() {
        assert!(graphviz_format(ExportFormat::Dot).is_none());
        assert!(graphviz_format(ExportFormat::Json).is_none());
        assert!(graphviz_format(ExportFormat::Png).is_some());
    }

    #[test]
    fn test_render_rejects_text_format() {
        let graph = SchemaGraph::new();
        let data = ExportData::new(&graph, DiagramStyle::default());
        let err = render_image(ExportFormat::Json, &data).unwrap_err();
        assert!(matches!(
            err,
            ExportError::Render {
                format: ExportFormat::Json,
                ..
            }
        ));
    }
}
