use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use rowscope_catalog::SchemaCatalog;
use rowscope_core::Config;
use rowscope_sql::{ColumnTypeResolver, Inference, SqlParser};

/// rowscope - infer SELECT output column types against a static schema catalog
#[derive(Parser)]
#[command(name = "rowscope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: rowscope.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the schema catalog description (JSON); overrides the config
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Infer the output columns of one SELECT statement
    Infer {
        /// The query to analyze
        query: String,

        /// Print the mapping as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Run inference over several statements and summarize
    Check {
        /// Queries to analyze
        queries: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("rowscope.toml").exists() {
        Config::from_file(Path::new("rowscope.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    if cli.verbose {
        eprintln!("{} dialect: {:?}", "Using".cyan(), config.dialect);
    }

    let catalog_path = cli
        .catalog
        .clone()
        .or_else(|| config.catalog_path())
        .ok_or_else(|| anyhow!("no catalog given; pass --catalog or set `catalog` in rowscope.toml"))?;

    let catalog = SchemaCatalog::from_json_file(&catalog_path)
        .with_context(|| format!("failed to load catalog from {}", catalog_path.display()))?;

    let parser = SqlParser::from_dialect(config.dialect);
    let resolver = ColumnTypeResolver::with_parser(&catalog, parser);

    match cli.command {
        Commands::Infer { query, json } => infer_command(&resolver, &query, json),
        Commands::Check { queries } => check_command(&resolver, &queries),
    }
}

fn infer_command(resolver: &ColumnTypeResolver, query: &str, json: bool) -> Result<()> {
    match resolver.infer_columns(query)? {
        Inference::Resolved(columns) => {
            if json {
                let object: serde_json::Map<String, serde_json::Value> = columns
                    .iter()
                    .map(|(name, column_type)| {
                        (name.to_string(), serde_json::Value::from(column_type.to_string()))
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&object)?);
            } else {
                for (name, column_type) in columns.iter() {
                    let rendered = column_type.to_string();
                    println!("{}  {}", name.green(), rendered.as_str().cyan());
                }
            }
        }
        Inference::Unresolvable => {
            eprintln!(
                "{}",
                "statement does not match any catalog database; nothing inferred".yellow()
            );
        }
    }

    Ok(())
}

fn check_command(resolver: &ColumnTypeResolver, queries: &[String]) -> Result<()> {
    let mut resolved = 0usize;
    let mut unresolvable = 0usize;
    let mut failed = 0usize;

    for query in queries {
        match resolver.infer_columns(query) {
            Ok(Inference::Resolved(columns)) => {
                resolved += 1;
                println!(
                    "{} {} ({} columns)",
                    "ok".green(),
                    query,
                    columns.len()
                );
            }
            Ok(Inference::Unresolvable) => {
                unresolvable += 1;
                println!("{} {}", "skipped".yellow(), query);
            }
            Err(error) => {
                failed += 1;
                println!("{} {}: {}", "error".red(), query, error);
            }
        }
    }

    println!(
        "\n{} resolved, {} skipped, {} failed",
        resolved, unresolvable, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
