use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lb_cli::commands::{day, list, load_book, range};
use lb_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so JSON output stays clean
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let entries_path = cli.entries.as_ref().unwrap_or(&config.entries_path);
    let book = load_book(entries_path, config.zone())?;

    let mut stdout = std::io::stdout().lock();
    match command {
        Commands::Day(args) => day::run(&mut stdout, args, &book)?,
        Commands::Range(args) => range::run(&mut stdout, args, &book)?,
        Commands::List(args) => list::run(&mut stdout, args, &book)?,
    }

    Ok(())
}
