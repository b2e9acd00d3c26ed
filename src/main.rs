mod cli;
mod commands;
mod config;
mod engine;
mod mapper;
mod model;
mod progress;
mod reconcile;
mod schema;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, ConnectionArgs, ImportCommand};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub manifest: Option<String>,
    pub state: Option<String>,
    pub connection: ConnectionArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        manifest: cli.manifest,
        state: cli.state,
        connection: cli.connection,
    };

    match cli.command {
        Command::Plan(args) => commands::apply::plan(&ctx, args.target.as_deref()),
        Command::Apply(args) => {
            commands::apply::apply(&ctx, args.target.as_deref(), args.dry_run, args.yes)
        }
        Command::Status(args) => commands::status::run(&ctx, args.target.as_deref()),
        Command::Import(cmd) => match cmd {
            ImportCommand::Plan { key, api_id, id } => {
                commands::import::plan(&ctx, &key, &api_id, &id)
            }
            ImportCommand::Subscription { key, api_id, id } => {
                commands::import::subscription(&ctx, &key, &api_id, &id)
            }
        },
        Command::Api { api_id } => commands::api::show(&ctx, &api_id),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "graviteectl", &mut io::stdout());
            Ok(())
        }
    }
}
