//! Admin tool: merge an incoming JSON document into the info store.
//!
//! Usage: cargo run --bin admin_update -- updates.json --token <ADMIN_TOKEN>
//!
//! Lists are merged by `id` (matching items replaced in place, new items
//! appended), objects are shallow-merged, everything else is replaced.
//! The store file is rewritten atomically, so an aborted run never leaves
//! a half-written file behind.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use campusbot::config::Config;
use campusbot::merge;

#[derive(Parser)]
#[command(
    name = "admin_update",
    about = "Merge an incoming JSON document into the campus info store"
)]
struct Cli {
    /// Path to the JSON file to import (merged key by key)
    source: PathBuf,

    /// Admin token (must match admin_token in the config file)
    #[arg(long)]
    token: String,

    /// Path to the bot config file
    #[arg(long, default_value = "campusbot.json")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            println!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let Some(admin_token) = config.admin_token else {
        println!(
            "admin_token not set in '{}'. Add it to the config file before importing data.",
            cli.config.display()
        );
        return ExitCode::FAILURE;
    };

    if !merge::token_matches(&cli.token, &admin_token) {
        println!("Invalid admin token. Aborting.");
        return ExitCode::FAILURE;
    }

    match merge::apply_update(&config.data_path, &cli.source) {
        Ok(()) => {
            println!("Data updated successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{e}");
            ExitCode::FAILURE
        }
    }
}
