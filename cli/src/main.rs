mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{check, run};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn dispatch() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    match &cli.command {
        Commands::Run(args) => run::run(&cli, args),
        Commands::Check(args) => check::run(&cli, args),
    }
}

/// Logs go to stderr: warnings by default, `-v` for info, `-vv` for debug.
fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> anyhow::Result<()> { dispatch() }
