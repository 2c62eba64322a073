//! lipgrate: declarative schema migrations for PostgreSQL, MySQL and SQLite.
//!
//! # Usage
//!
//! ```bash
//! lipgrate init
//! lipgrate create create_users
//! lipgrate migrate --dry-run
//! lipgrate migrate
//! lipgrate status
//! lipgrate rollback
//! ```

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use lipgrate::prelude::*;
use lipgrate::{logger, scaffold};

#[derive(Parser)]
#[command(name = "lipgrate")]
#[command(version)]
#[command(about = "Declarative database migrations for PostgreSQL, MySQL and SQLite", long_about = None)]
#[command(after_help = "EXAMPLES:
    lipgrate init
    lipgrate create add_users_table
    lipgrate migrate --dry-run
    lipgrate rollback")]
struct Cli {
    /// Path to lipgrate.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL, overrides the config file
    #[arg(long, global = true, env = "LIPGRATE_DATABASE_URL")]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create lipgrate.toml, the migrations directory and example files
    Init,
    /// Create a new migration file
    Create {
        /// Migration name, e.g. create_users
        name: String,

        /// Database client, overrides the config file
        #[arg(long)]
        client: Option<String>,
    },
    /// Apply all pending migrations
    Migrate {
        /// Print the SQL instead of executing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Revert the last applied migration
    Rollback {
        /// Print the SQL instead of executing it
        #[arg(long)]
        dry_run: bool,
    },
    /// Show applied and pending migrations
    Status,
    /// Drop every table and re-run all migrations (PostgreSQL only)
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logger::init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        logger::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Init => {
            let cwd = std::env::current_dir().context("Cannot read the current directory")?;
            let report = scaffold::init(&cwd)?;
            if !report.created.is_empty() {
                print_next_steps();
            }
        }
        Commands::Create { name, client } => {
            let (dialect, root) = match (client, Config::load(cli.config.as_deref())) {
                (Some(client), Ok(config)) => (client.parse::<Dialect>()?, config.migrations.directory),
                (Some(client), Err(_)) => (client.parse::<Dialect>()?, MigrationsConfig::default().directory),
                (None, Ok(config)) => (config.dialect()?, config.migrations.directory),
                (None, Err(e)) => return Err(e.into()),
            };
            scaffold::create(name, dialect, &root)?;
        }
        Commands::Migrate { dry_run } => {
            let (mut adapter, catalog) = open(cli).await?;
            Runner::new(adapter.as_mut(), catalog)
                .dry_run(*dry_run)
                .migrate()
                .await?;
        }
        Commands::Rollback { dry_run } => {
            let (mut adapter, catalog) = open(cli).await?;
            Runner::new(adapter.as_mut(), catalog)
                .dry_run(*dry_run)
                .rollback()
                .await?;
        }
        Commands::Status => {
            let (mut adapter, catalog) = open(cli).await?;
            let report = Runner::new(adapter.as_mut(), catalog).status().await?;
            print_status(&report);
        }
        Commands::Reset { yes } => {
            let (mut adapter, catalog) = open(cli).await?;
            if !*yes && !confirm("Type 'yes' to drop every table and re-run all migrations: ")? {
                logger::info("Reset cancelled.");
                adapter.disconnect().await?;
                return Ok(());
            }
            Runner::new(adapter.as_mut(), catalog).reset().await?;
        }
    }
    Ok(())
}

/// Load the config and connect the adapter it names.
async fn open(cli: &Cli) -> Result<(Box<dyn Adapter>, Catalog)> {
    let config = Config::load(cli.config.as_deref())?;
    let dialect = config.dialect()?;
    let url = match &cli.database_url {
        Some(url) => url.clone(),
        None => config.connection_url()?,
    };

    let adapter = lipgrate::adapter::connect(dialect, &url)
        .await
        .with_context(|| format!("Cannot connect to the {} database", dialect.display_name()))?;
    let catalog = Catalog::new(config.migrations_dir(), dialect);
    Ok((adapter, catalog))
}

fn print_status(report: &StatusReport) {
    println!("{}", "Migration status".cyan().bold());
    println!();

    if report.entries.is_empty() {
        println!("  {}", "No migrations found.".dimmed());
    }
    for entry in &report.entries {
        match entry.status {
            MigrationStatus::Applied => println!("  {} {}", "✔ [Applied]".green(), entry.id),
            MigrationStatus::Pending => println!("  {} {}", "● [Pending]".yellow(), entry.id),
        }
    }

    if !report.orphaned.is_empty() {
        println!();
        println!("{}", "Applied but missing from the migrations directory:".red());
        for id in &report.orphaned {
            println!("  {} {}", "✗".red(), id);
        }
    }

    println!();
    println!(
        "{} applied, {} pending",
        report.applied_count().to_string().green(),
        report.pending_count().to_string().yellow()
    );
}

fn print_next_steps() {
    println!();
    println!("{}", "Next steps:".blue());
    println!("1. Update lipgrate.toml with your database credentials.");
    println!("2. Review the example files in the migrations/ directory.");
    println!(
        "3. Create your first migration with: {}",
        "lipgrate create <migration_name>".cyan()
    );
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt.red().bold());
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim().eq_ignore_ascii_case("yes"))
}

