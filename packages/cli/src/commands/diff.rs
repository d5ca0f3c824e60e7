use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use dashsync_patch::Operation;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// Record before the change (JSON file)
    pub before: PathBuf,

    /// Record after the change (JSON file)
    pub after: PathBuf,

    /// Print the raw patch as one JSON line
    #[arg(long)]
    pub compact: bool,
}

pub fn diff(args: DiffArgs, cwd: &Path) -> Result<()> {
    let before = read_json(&cwd.join(&args.before))?;
    let after = read_json(&cwd.join(&args.after))?;
    let ops = dashsync_patch::diff(&before, &after);

    if args.compact {
        println!("{}", serde_json::to_string(&ops)?);
        return Ok(());
    }

    if ops.is_empty() {
        println!("{}", "No differences".green());
        return Ok(());
    }
    for op in &ops {
        println!("  {}", describe_op(op)?);
    }
    Ok(())
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn describe_op(op: &Operation) -> Result<String> {
    let line = match op {
        Operation::Add { path, value } => format!("{} {} {}", "+".green(), path, serde_json::to_string(value)?),
        Operation::Remove { path } => format!("{} {}", "-".red(), path),
        Operation::Replace { path, value } => {
            format!("{} {} {}", "~".yellow(), path, serde_json::to_string(value)?)
        }
        Operation::Move { from, path } => format!("{} {} -> {}", ">".cyan(), from, path),
        Operation::Copy { from, path } => format!("{} {} -> {}", "=".cyan(), from, path),
        Operation::Test { path, value } => format!("{} {} {}", "?".dimmed(), path, serde_json::to_string(value)?),
    };
    Ok(line)
}
