// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Strata data build tool.
//! Run with: strata <command>

mod commands;
mod config;
mod helpers;

use clap::{Parser, Subcommand};
use commands::compile::CompileArgs;
use commands::inspect::InspectArgs;
use helpers::print_error;

/// Compiles RON game data into relocatable binary images.
#[derive(Parser)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log per-block events
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile documents into data and relocation files
    Compile(CompileArgs),

    /// Check a compiled data file and list its strings
    Inspect(InspectArgs),
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match &cli.command {
        Commands::Compile(args) => commands::compile::run(args),
        Commands::Inspect(args) => commands::inspect::run(args),
    };

    if let Err(err) = result {
        log::error!("{err:#}");
        print_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}
