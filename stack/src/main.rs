//! wp-stack
//!
//! Builds the WordPress deployment graph from the environment (plus an
//! optional `.env`) and a lookup context file, then prints it.
//!
//! - `wp-stack synth` - the provisioning template as JSON
//! - `wp-stack plan` - resources in creation order
//! - `wp-stack validate` - the validation report and fingerprint
//!
//! Logs go to stderr so stdout can be piped straight into a deploy step.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wp_topology::prelude::*;

/// WordPress stack synthesizer
#[derive(Parser)]
#[command(name = "wp-stack")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Name recorded in the template description
    #[arg(long, global = true, default_value = "WordpressStack")]
    stack_name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the synthesized template
    Synth {
        /// Lookup context (hosted zones, machine images, availability zones)
        #[arg(short, long, env = "WP_STACK_CONTEXT", value_name = "FILE")]
        context: Option<PathBuf>,

        /// Indent the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Print resources in creation order
    Plan {
        #[arg(short, long, env = "WP_STACK_CONTEXT", value_name = "FILE")]
        context: Option<PathBuf>,
    },

    /// Build, validate and print the report
    Validate {
        #[arg(short, long, env = "WP_STACK_CONTEXT", value_name = "FILE")]
        context: Option<PathBuf>,
    },
}

fn main() {
    dotenvy::dotenv().ok();
    init_logging();

    if let Err(err) = run(Cli::parse()) {
        tracing::error!("{err:#}");
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Synth { context, pretty } => {
            let graph = build(context.as_deref())?;
            let mut template = synthesize(&graph);
            if let Some(fields) = template.as_object_mut() {
                fields.insert(
                    "Description".to_string(),
                    serde_json::Value::String(cli.stack_name.clone()),
                );
            }
            let rendered = if pretty {
                serde_json::to_string_pretty(&template)
            } else {
                serde_json::to_string(&template)
            }
            .context("Failed to serialize template")?;
            println!("{rendered}");
            tracing::info!(stack = %cli.stack_name, resources = graph.len(), "template synthesized");
        }
        Commands::Plan { context } => {
            let graph = build(context.as_deref())?;
            let order = graph
                .topological_order()
                .context("Failed to order resources")?;
            println!("{} ({} resources)", cli.stack_name, order.len());
            for (step, id) in order.iter().enumerate() {
                let kind = graph
                    .resource(id)
                    .map_or("?", |resource| resource.kind().type_name());
                println!("{:>3}  {:<56} {}", step + 1, id.as_str(), kind);
            }
            println!("{} access grants", graph.grants().count());
        }
        Commands::Validate { context } => {
            let graph = build(context.as_deref())?;
            let report = validate(&graph).context("Topology failed validation")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("Failed to serialize report")?
            );
            tracing::info!(fingerprint = %report.fingerprint, "topology valid");
        }
    }
    Ok(())
}

fn build(context_path: Option<&Path>) -> Result<ResourceGraph> {
    let config = DeploymentConfig::from_env();
    let context = match context_path {
        Some(path) => StaticContext::from_file(path)
            .with_context(|| format!("Failed to load lookup context from {}", path.display()))?,
        None => {
            tracing::warn!("no lookup context given; hosted zone and image lookups will fail");
            StaticContext::new()
        }
    };
    build_topology(&config, &context).context("Failed to build topology")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_synth_flags() {
        let cli = Cli::try_parse_from(["wp-stack", "synth", "--context", "ctx.json", "--pretty"]).unwrap();
        assert_eq!(cli.stack_name, "WordpressStack");
        match cli.command {
            Commands::Synth { context, pretty } => {
                assert_eq!(context, Some(PathBuf::from("ctx.json")));
                assert!(pretty);
            }
            _ => panic!("expected synth"),
        }
    }

    #[test]
    fn test_stack_name_is_global() {
        let cli = Cli::try_parse_from(["wp-stack", "plan", "--stack-name", "Blog"]).unwrap();
        assert_eq!(cli.stack_name, "Blog");
        assert!(matches!(cli.command, Commands::Plan { .. }));
    }
}
