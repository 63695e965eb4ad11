//! Command-line interface for schemaviz.
//!
//! This module defines the [`Cli`] structure parsed from the command line
//! using [`clap`] and the [`run`] function that drives the
//! parse, analyze and export pipeline for each subcommand.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexSet;
use log::{debug, info, warn};

use crate::analysis::build_class_map;
use crate::config::{self, AnalysisConfig};
use crate::export::{self, ExportData, ExportFormat};
use crate::graph::SchemaGraph;
use crate::parser::SourceTree;

/// Draw class diagrams of Python schema modules
#[derive(Parser, Debug)]
#[command(name = "schemaviz")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render a diagram of the classes in the given modules
    Render {
        /// Dotted module names, Python files or directories
        #[arg(required = true)]
        targets: Vec<String>,

        /// Directory module names are resolved against
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Output file
        #[arg(short, long, default_value = "schemas.png")]
        output: PathBuf,

        /// Output format (dot, json, markdown, png, svg, pdf); inferred from
        /// the output extension when omitted
        #[arg(short, long)]
        format: Option<ExportFormat>,

        /// Diagram title
        #[arg(long)]
        title: Option<String>,

        /// Only parse the target modules; imported classes become placeholders
        #[arg(long)]
        no_follow: bool,
    },
    /// Print the analysis of the given modules to stdout
    Inspect {
        /// Dotted module names, Python files or directories
        #[arg(required = true)]
        targets: Vec<String>,

        /// Directory module names are resolved against
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Output format (markdown, json, dot)
        #[arg(short, long, default_value = "markdown")]
        format: ExportFormat,
    },
    /// Show version information
    Version,
}

/// Parse the targets under `root` and build the schema graph.
///
/// Targets may be dotted module names, `.py` files or directories; each
/// expands to one or more modules, processed in order without duplicates.
pub fn build_graph(root: &Path, targets: &[String], analysis: &AnalysisConfig) -> Result<SchemaGraph> {
    let mut tree = SourceTree::new(root)
        .with_context(|| format!("Failed to initialize parser for {}", root.display()))?;

    let mut modules = IndexSet::new();
    for target in targets {
        let expanded = tree
            .expand_target(target)
            .with_context(|| format!("Invalid target '{}'", target))?;
        debug!(input = target.as_str(), modules = expanded.len(); "Expanded target");
        modules.extend(expanded);
    }
    let modules: Vec<String> = modules.into_iter().collect();

    let builtins = analysis.builtins();
    let class_map = build_class_map(&mut tree, &modules, &builtins, analysis.follow_imports)
        .context("Failed to analyze modules")?;

    let graph = SchemaGraph::from_class_map(&class_map, &builtins);
    info!(
        modules = modules.len(),
        nodes = graph.node_count(),
        edges = graph.edge_count();
        "Built schema graph"
    );

    for cycle in graph.get_cycle_details() {
        debug!(cycle = cycle.cycle_path(); "Reference cycle");
    }

    Ok(graph)
}

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns an error for configuration problems, unknown targets, unreadable
/// sources, Graphviz failures and output I/O errors.
pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Render {
            targets,
            root,
            output,
            format,
            title,
            no_follow,
        } => {
            let config = config::load_config(cli.config.as_ref()).context("Failed to load configuration")?;

            let mut analysis = config.analysis.clone();
            if *no_follow {
                analysis.follow_imports = false;
            }
            let graph = build_graph(root, targets, &analysis)?;
            if graph.is_empty() {
                warn!("No classes found in the given targets");
            }

            let mut style = config.diagram.style();
            if let Some(title) = title {
                style.title = title.clone();
            }

            let format = format
                .or_else(|| ExportFormat::from_path(output))
                .unwrap_or(ExportFormat::Png);

            // Output is only written once rendering succeeded
            let data = ExportData::new(&graph, style);
            let mut buffer = Vec::new();
            export::export(format, &data, &mut buffer)
                .with_context(|| format!("Failed to export {} diagram", format))?;
            fs::write(output, &buffer)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            info!(output = output.display().to_string(), format = format.to_string(); "Diagram written");
            println!(
                "Wrote {} ({} classes, {} references)",
                output.display(),
                graph.node_count(),
                graph.edge_count()
            );
        }
        Commands::Inspect {
            targets,
            root,
            format,
        } => {
            if format.is_image() {
                bail!("Cannot print {} to the terminal, use `render` instead", format);
            }

            let config = config::load_config(cli.config.as_ref()).context("Failed to load configuration")?;
            let graph = build_graph(root, targets, &config.analysis)?;

            let data = ExportData::new(&graph, config.diagram.style());
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            export::export(*format, &data, &mut handle)?;
            handle.flush()?;
        }
        Commands::Version => {
            println!("schemaviz v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
