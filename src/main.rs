//! fxrack CLI
//!
//! Command-line front end for the fxrack effects host.

use clap::Parser;
use env_logger::Env;
use log::info;

use fxrack::cli::commands;
use fxrack::cli::{Cli, Commands};
use fxrack::Result;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("fxrack v{}", env!("CARGO_PKG_VERSION"));

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Some(cmd) => handle_command(cmd, &config),
        None => {
            println!("fxrack v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &fxrack::config::HostConfig) -> Result<()> {
    match cmd {
        Commands::ListKernels => commands::show_kernels(config),
        Commands::Combine {
            kernel_1,
            kernel_2,
            output,
        } => commands::combine(config, &kernel_1, &kernel_2, &output),
        Commands::Process {
            input,
            output,
            preset,
            effects,
        } => commands::process(config, &input, &output, preset.as_deref(), &effects),
        Commands::Preset { effects, section } => commands::print_preset(&effects, &section),
    }
}
