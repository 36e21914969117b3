// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{Parser, Subcommand};
use cmd::commands::{self, SaveMode};
use cmd::common::HdxContext;
use hdx::{ListOptions, SearchOptions};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(name = "hdx")]
struct Cli {
    #[command(flatten)]
    context: HdxContext,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a dataset and its resources
    Show {
        /// Dataset id or name
        dataset: String,
    },
    /// List the resources of a dataset
    Resources {
        /// Dataset id or name
        dataset: String,
    },
    /// Search datasets
    Search {
        /// Query, all datasets when omitted
        query: Option<String>,
        /// Filter query
        #[arg(long)]
        fq: Option<String>,
        #[arg(long)]
        sort: Option<String>,
        /// Maximum number of results
        #[arg(long)]
        rows: Option<usize>,
        #[arg(long)]
        start: Option<usize>,
        /// Print whole datasets instead of names
        #[arg(long)]
        full: bool,
    },
    /// List dataset names
    Names {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        offset: Option<usize>,
    },
    /// Create a dataset from a YAML or JSON file, updating it if it exists
    Create {
        file: PathBuf,
        #[arg(long)]
        allow_no_resources: bool,
    },
    /// Update an existing dataset from a YAML or JSON file
    Update {
        file: PathBuf,
        /// Leave resources as they are in the catalog
        #[arg(long)]
        skip_resources: bool,
    },
    /// Delete a dataset
    Delete {
        /// Dataset id or name
        dataset: String,
    },
}

fn main() -> Result<()> {
    diagnostics::init();

    let cli = Cli::parse();
    let configuration = cli.context.configuration()?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut failed = None;
    let handler = |text: &str| {
        if let Err(e) = writeln!(out, "{text}") {
            failed = Some(e);
        }
    };

    match cli.command {
        Commands::Show { dataset } => commands::show_command(&configuration, &dataset, handler),
        Commands::Resources { dataset } => {
            commands::resources_command(&configuration, &dataset, handler)
        }
        Commands::Search {
            query,
            fq,
            sort,
            rows,
            start,
            full,
        } => {
            let options = SearchOptions {
                fq,
                sort,
                rows,
                start,
                ..Default::default()
            };
            commands::search_command(&configuration, query.as_deref(), &options, full, handler)
        }
        Commands::Names { limit, offset } => {
            commands::names_command(&configuration, ListOptions { limit, offset }, handler)
        }
        Commands::Create {
            file,
            allow_no_resources,
        } => commands::save_command(
            &configuration,
            &file,
            SaveMode::Create { allow_no_resources },
            handler,
        ),
        Commands::Update {
            file,
            skip_resources,
        } => commands::save_command(
            &configuration,
            &file,
            SaveMode::Update {
                update_resources: !skip_resources,
            },
            handler,
        ),
        Commands::Delete { dataset } => {
            commands::delete_command(&configuration, &dataset, handler)
        }
    }?;

    match failed {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
