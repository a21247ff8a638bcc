//! recode-merge: build the SQL that merges survey recode tables
//!
//! # Usage
//!
//! ```bash
//! # Print the script for a config file
//! recode-merge plan --config births.toml
//!
//! # Tables on the command line, master first
//! recode-merge plan -t 'REC21(CASEID, BIDX): B4, B5' -t 'RECH0(HHID): HV001' -o BIRTHS
//!
//! # Run the merge against loaded tables
//! recode-merge run --config births.toml --database-url sqlite://dhs.sqlite
//! ```

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use recode_merge::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recode-merge")]
#[command(version)]
#[command(about = "Merge survey recode tables into one output table", long_about = None)]
#[command(after_help = "EXAMPLES:
    recode-merge plan --config births.toml
    recode-merge plan -t 'REC21(CASEID, BIDX): B4' -t 'RECH0(HHID): HV001' -o BIRTHS
    recode-merge run --config births.toml --database-url sqlite://dhs.sqlite")]
struct Cli {
    /// Config file (default: ./recode-merge.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL script for a merge
    Plan {
        #[command(flatten)]
        merge: MergeArgs,

        /// Leave out CREATE TABLE / CREATE INDEX for the input tables
        #[arg(long)]
        no_schema: bool,
    },
    /// Execute the merge against a database
    Run {
        #[command(flatten)]
        merge: MergeArgs,

        /// Database connection URL
        #[arg(long, env = "RECODE_MERGE_DATABASE_URL")]
        database_url: Option<String>,

        /// Also create and index the input tables first
        #[arg(long)]
        with_schema: bool,
    },
    /// Show the column layout of each table
    Describe {
        #[command(flatten)]
        merge: MergeArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Print CREATE TABLE, CREATE INDEX and INSERT templates per table
    Templates {
        #[command(flatten)]
        merge: MergeArgs,
    },
}

#[derive(Args)]
struct MergeArgs {
    /// Table in compact notation, master first (repeatable)
    #[arg(short, long = "table", value_name = "NOTATION")]
    tables: Vec<TableDescriptor>,

    /// Output table name
    #[arg(short, long)]
    output: Option<String>,

    /// SQL dialect: sqlite, mysql or postgres
    #[arg(long)]
    dialect: Option<Dialect>,

    /// Merge mode: create-as or seed-and-update
    #[arg(long)]
    mode: Option<MergeMode>,

    /// Update strategy: subquery, inner-join or replace
    #[arg(long)]
    strategy: Option<UpdateStrategy>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// Settings after merging command-line arguments over the config file.
struct Resolved {
    plan: MergePlan,
    database_url: Option<String>,
}

fn resolve(cli_config: Option<&PathBuf>, args: &MergeArgs) -> anyhow::Result<Resolved> {
    let config = if args.tables.is_empty() || cli_config.is_some() {
        Some(MergeConfig::locate(cli_config.map(PathBuf::as_path))?)
    } else {
        None
    };

    let tables = if !args.tables.is_empty() {
        args.tables.clone()
    } else if let Some(config) = &config {
        config.descriptors()?
    } else {
        Vec::new()
    };

    let output = args
        .output
        .clone()
        .or_else(|| config.as_ref().map(|c| c.output.clone()))
        .unwrap_or_else(|| "MERGED".to_string());

    let mut plan = MergePlan::new(output, tables)
        .context("give at least one table with --table or in the config file")?
        .with_mode(
            args.mode
                .or_else(|| config.as_ref().map(|c| c.mode))
                .unwrap_or_default(),
        )
        .with_dialect(
            args.dialect
                .or_else(|| config.as_ref().map(|c| c.dialect))
                .unwrap_or_default(),
        );
    if let Some(strategy) = args
        .strategy
        .or_else(|| config.as_ref().and_then(|c| c.strategy))
    {
        plan = plan.with_strategy(strategy);
    }

    Ok(Resolved {
        plan,
        database_url: config.and_then(|c| c.database_url),
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Plan { merge, no_schema } => show_plan(&cli, merge, *no_schema),
        Commands::Run {
            merge,
            database_url,
            with_schema,
        } => run_merge(&cli, merge, database_url.as_deref(), *with_schema).await,
        Commands::Describe { merge, format } => describe(&cli, merge, format),
        Commands::Templates { merge } => show_templates(&cli, merge),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "recode_merge=debug"
    } else {
        "recode_merge=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn show_plan(cli: &Cli, args: &MergeArgs, no_schema: bool) -> anyhow::Result<()> {
    let plan = resolve(cli.config.as_ref(), args)?.plan;

    let statements = if no_schema {
        plan.merge_statements()?
    } else {
        plan.statements()?
    };

    println!(
        "{} {} ({}, {})",
        "-- Merge plan for".dimmed(),
        plan.output_name().cyan().bold(),
        plan.dialect(),
        plan.mode()
    );
    for stmt in &statements {
        if cli.verbose {
            println!("{}", format!("-- {} {}", stmt.kind, stmt.table).dimmed());
        }
        println!("{}", stmt.terminated());
    }
    Ok(())
}

async fn run_merge(
    cli: &Cli,
    args: &MergeArgs,
    database_url: Option<&str>,
    with_schema: bool,
) -> anyhow::Result<()> {
    let resolved = resolve(cli.config.as_ref(), args)?;
    let Some(url) = database_url
        .map(str::to_string)
        .or(resolved.database_url)
    else {
        bail!(
            "No database URL. Use --database-url, set RECODE_MERGE_DATABASE_URL \
             or add database_url to the config"
        );
    };

    if cli.verbose {
        println!("{} {}", "Connecting to:".dimmed(), url);
    }
    let db = MergeDB::connect(&url).await?;

    let plan = &resolved.plan;
    let affected = if with_schema {
        db.run_plan(plan).await?
    } else {
        db.run_merge(plan).await?
    };

    println!(
        "{} Built {} with {} statement(s)",
        "✓".green(),
        plan.output_name().cyan(),
        affected.len()
    );
    Ok(())
}

fn describe(cli: &Cli, args: &MergeArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let plan = resolve(cli.config.as_ref(), args)?.plan;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(plan.tables())?);
        }
        OutputFormat::Table => {
            for (i, table) in plan.tables().iter().enumerate() {
                let role = if i == 0 { "master" } else { "peer" };
                println!("{} {}", table.name().cyan().bold(), format!("({role})").dimmed());
                println!("  {} {}", "Join:".dimmed(), table.join_columns().join(", ").yellow());
                println!("  {} {}", "Output:".dimmed(), table.output_columns(false));
                println!("  {} {}", "All:".dimmed(), table.all_columns().join(", "));
                if i > 0 {
                    let predicate = JoinPredicate::between(plan.master(), table);
                    println!("  {} {}", "On:".dimmed(), predicate.to_string().white());
                }
                println!();
            }
        }
    }
    Ok(())
}

fn show_templates(cli: &Cli, args: &MergeArgs) -> anyhow::Result<()> {
    let plan = resolve(cli.config.as_ref(), args)?.plan;

    for table in plan.tables() {
        println!("{}", format!("-- {}", table.name()).green().bold());
        println!("{}", table.create_table_sql());
        let indexes = table.create_index_sql();
        if !indexes.is_empty() {
            println!("{indexes}");
        }
        println!("{};", table.insert_template_sql_for(plan.dialect()));
        println!();
    }
    Ok(())
}
