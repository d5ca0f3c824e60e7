mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    chart, describe, diff, follow, init, show, tag, tier, ChartArgs, DescribeArgs, DiffArgs,
    FollowArgs, InitArgs, ShowArgs, TagArgs, TierArgs,
};

/// Dashsync CLI - edit dashboards against a JSON store
#[derive(Parser, Debug)]
#[command(name = "dashsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a config file (and optionally a sample store)
    Init(InitArgs),

    /// Print the JSON patch between two records
    Diff(DiffArgs),

    /// Load a dashboard and print it
    Show(ShowArgs),

    /// Replace a dashboard's description
    Describe(DescribeArgs),

    /// Set a dashboard's tags
    Tag(TagArgs),

    /// Set a dashboard's tier and/or owner
    Tier(TierArgs),

    /// Follow or unfollow a dashboard
    Follow(FollowArgs),

    /// Replace the description of one chart
    Chart(ChartArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let cwd = match std::env::current_dir() {
        Ok(cwd) => cwd,
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Diff(args) => diff(args, &cwd),
        Command::Show(args) => show(args, &cwd).await,
        Command::Describe(args) => describe(args, &cwd).await,
        Command::Tag(args) => tag(args, &cwd).await,
        Command::Tier(args) => tier(args, &cwd).await,
        Command::Follow(args) => follow(args, &cwd).await,
        Command::Chart(args) => chart(args, &cwd).await,
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
