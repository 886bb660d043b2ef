pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::commands::shorten::ShortenArgs;

#[derive(Debug, Parser)]
#[command(
    name = "linkbot",
    about = "Linkbot operator CLI",
    long_about = "Inspect configuration, list REDR domains and shorten links without the chat bot.",
    after_help = concat!(
        "Examples:\n",
        "  linkbot config\n",
        "  linkbot domains\n",
        "  linkbot shorten https://example.com --masked --expires 2026-12-31",
    )
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "List the sending domains available to the configured REDR account")]
    Domains,
    #[command(about = "Shorten one URL through the same pipeline the chat bot uses")]
    Shorten(ShortenArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Domains => commands::domains::run(),
        Command::Shorten(args) => commands::shorten::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
