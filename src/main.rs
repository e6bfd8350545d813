mod agents;
mod cli;
mod config;
mod error;
mod firmware;
mod utils;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        unsafe {
            std::env::set_var(utils::VERBOSE_ENV, "1");
        }
    }

    let config = cli.config.as_deref();
    let result = match &cli.command {
        Commands::Update {
            device,
            dry_run,
            timeout,
        } => workflow::execute_update(&cli.root, config, device, *dry_run, *timeout),
        Commands::Check { device, json } => {
            workflow::execute_check(&cli.root, config, device, *json)
        }
        Commands::Locate { name } => workflow::execute_locate(&cli.root, name),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if utils::verbose_enabled() {
            eprintln!("[VERBOSE] Failure category: {}", e.kind());
        }
        process::exit(e.exit_code());
    }
}
