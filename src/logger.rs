//! Console output.
//!
//! Operator-facing progress lines are printed with `colored`; diagnostic
//! events (statements, connection lifecycle, run states) go through `tracing`
//! and are shown with `RUST_LOG` or `--verbose`.

use colored::*;
use tracing_subscriber::EnvFilter;

pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue(), message.blue());
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message.green());
}

pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message.yellow());
}

pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.red());
}

/// A migration being run.
pub fn running(message: &str) {
    println!("{} {}", "›".yellow(), message);
}

/// One operation inside a migration.
pub fn step(message: &str) {
    println!("  {} {}", "->".dimmed(), message);
}

pub fn dry_run(sql: &str) {
    println!("{} {} {}", "[DRY RUN]".yellow(), "EXECUTE:".dimmed(), sql);
}

/// Install the tracing subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "lipgrate=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
