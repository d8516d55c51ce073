mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use xbe_harness::util::ui;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            ui::error(&format!("{:#}", e));
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run {
            suites,
            bin,
            verbose,
        }) => cli::run::run(&suites, bin, verbose),
        Some(Commands::Check { suites }) => cli::check::run(&suites).map(|()| 0),
        Some(Commands::Env { json }) => cli::env::run(json).map(|()| 0),
        None => {
            // No command provided, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(0)
        }
    }
}
