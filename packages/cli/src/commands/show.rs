use super::{LocalStore, StoreArgs};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use dashsync_editor::DashboardView;
use dashsync_workspace::PartialFailure;
use std::path::Path;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Dashboard id
    pub id: String,

    /// Also list the selectable tags
    #[arg(long)]
    pub vocabulary: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

pub async fn show(args: ShowArgs, cwd: &Path) -> Result<()> {
    let mut store = LocalStore::open(&args.store, cwd)?;
    store.manager.open(&args.id).await?;
    store.manager.resolve_trail().await?;
    let view = store
        .manager
        .session()
        .ok_or_else(|| anyhow!("{} did not open", args.id))?
        .view();

    print_view(&view);
    print_failures(store.manager.load_failures());

    if args.vocabulary {
        store.manager.tag_vocabulary().await?;
        println!();
        println!("{}", "Vocabulary".bold());
        for name in store.manager.tag_names() {
            println!("  {}", name);
        }
    }
    Ok(())
}

pub(crate) fn print_view(view: &DashboardView) {
    let trail: Vec<&str> = view.trail.crumbs.iter().map(|c| c.name.as_str()).collect();
    println!("{}", trail.join(" / ").bright_blue().bold());
    println!();

    if view.description.is_empty() {
        println!("  {}", "No description".dimmed());
    } else {
        println!("  {}", view.description);
    }
    println!();

    let owner = view
        .owner
        .as_ref()
        .map(|o| o.display_name.clone().or_else(|| o.name.clone()).unwrap_or_else(|| o.id.clone()))
        .unwrap_or_else(|| "--".to_string());
    println!("  {:<10} {}", "Owner".bold(), owner);
    println!("  {:<10} {}", "Tier".bold(), view.tier_label.as_deref().unwrap_or("--"));
    println!("  {:<10} {} / {}", "Usage".bold(), view.usage.percentile_rank, view.usage.weekly_count);

    let following = if view.is_following { "following".green() } else { "not following".normal() };
    println!("  {:<10} {} ({})", "Followers".bold(), view.follower_count, following);

    let tags: Vec<&str> = view.tags.iter().map(|t| t.tag_fqn.as_str()).collect();
    println!("  {:<10} {}", "Tags".bold(), if tags.is_empty() { "--".to_string() } else { tags.join(", ") });
    println!();

    for row in &view.items {
        match &row.failure {
            Some(reason) => println!("  {} [{}] {} - {}", "✗".red(), row.index, row.name, reason),
            None => println!(
                "  {} [{}] {} {}",
                "•".cyan(),
                row.index,
                row.name,
                row.description.as_deref().unwrap_or("").dimmed()
            ),
        }
    }

    if !view.can_edit {
        println!();
        println!("{}", "  Read only: owned by someone else".yellow());
    }
}

pub(crate) fn print_failures(failures: &[PartialFailure]) {
    if failures.is_empty() {
        return;
    }
    println!();
    for failure in failures {
        eprintln!("  {} {}", "⚠️".yellow(), failure);
    }
}
