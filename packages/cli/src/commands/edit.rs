use super::show::{print_failures, print_view};
use super::{LocalStore, StoreArgs};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use dashsync_common::EntityRef;
use dashsync_editor::Resolution;
use std::path::Path;

#[derive(Debug, Args)]
pub struct DescribeArgs {
    /// Dashboard id
    pub id: String,

    /// New description
    pub description: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Args)]
pub struct TagArgs {
    /// Dashboard id
    pub id: String,

    /// Full set of tags to keep (tier excluded)
    pub tags: Vec<String>,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Args)]
pub struct TierArgs {
    /// Dashboard id
    pub id: String,

    /// New tier tag, e.g. Tier.Tier1
    #[arg(short, long)]
    pub tier: Option<String>,

    /// New owner id
    #[arg(short, long)]
    pub owner: Option<String>,

    /// Owner kind (user or team)
    #[arg(long, default_value = "user")]
    pub owner_type: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Args)]
pub struct FollowArgs {
    /// Dashboard id
    pub id: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    /// Dashboard id
    pub id: String,

    /// Position of the chart on the dashboard
    pub index: usize,

    /// New chart description
    pub description: String,

    #[command(flatten)]
    pub store: StoreArgs,
}

pub async fn describe(args: DescribeArgs, cwd: &Path) -> Result<()> {
    let mut store = open(&args.store, &args.id, cwd).await?;
    let resolution = store.manager.edit_description(args.description).await?;
    finish(&store, resolution)
}

pub async fn tag(args: TagArgs, cwd: &Path) -> Result<()> {
    let mut store = open(&args.store, &args.id, cwd).await?;
    let resolution = store.manager.set_tags(args.tags).await?;
    finish(&store, resolution)
}

pub async fn tier(args: TierArgs, cwd: &Path) -> Result<()> {
    let mut store = open(&args.store, &args.id, cwd).await?;
    let owner = args.owner.map(|id| EntityRef::new(id, args.owner_type));
    let resolution = store.manager.set_owner_and_tier(owner, args.tier).await?;
    finish(&store, resolution)
}

pub async fn follow(args: FollowArgs, cwd: &Path) -> Result<()> {
    let mut store = open(&args.store, &args.id, cwd).await?;
    let resolution = store.manager.toggle_follow().await?;
    finish(&store, resolution)
}

pub async fn chart(args: ChartArgs, cwd: &Path) -> Result<()> {
    let mut store = open(&args.store, &args.id, cwd).await?;
    let resolution = store.manager.edit_item(args.index, args.description).await?;
    finish(&store, resolution)
}

async fn open(args: &StoreArgs, id: &str, cwd: &Path) -> Result<LocalStore> {
    let mut store = LocalStore::open(args, cwd)?;
    if !store.manager.open(id).await?.can_edit() {
        return Err(anyhow!("{} is owned by someone else", id));
    }
    store.manager.resolve_trail().await?;
    print_failures(store.manager.load_failures());
    Ok(store)
}

fn finish(store: &LocalStore, resolution: Resolution) -> Result<()> {
    match resolution {
        Resolution::Applied => {
            store.save()?;
            println!("{} Saved", "✓".green());
        }
        Resolution::NoChange => println!("{}", "Nothing to change".yellow()),
        Resolution::Deferred => println!("{}", "Queued behind an edit in flight".yellow()),
        Resolution::Stale => println!("{}", "Superseded by a newer load".yellow()),
    }
    println!();
    if let Some(session) = store.manager.session() {
        print_view(&session.view());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init::write_sample_store;
    use dashsync_common::Fixture;
    use tempfile::TempDir;

    fn store_args() -> StoreArgs {
        StoreArgs {
            store: "store.json".into(),
            user: Some("alice".into()),
        }
    }

    fn sample_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_sample_store(&dir.path().join("store.json")).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_describe_is_saved_to_store() {
        let dir = sample_dir();
        let args = DescribeArgs {
            id: "sales".into(),
            description: "Weekly numbers".into(),
            store: store_args(),
        };
        describe(args, dir.path()).await.unwrap();

        let fixture = Fixture::load(&dir.path().join("store.json")).unwrap();
        assert_eq!(fixture.dashboards[0].description.as_deref(), Some("Weekly numbers"));
    }

    #[tokio::test]
    async fn test_tier_without_arguments_fails() {
        let dir = sample_dir();
        let args = TierArgs {
            id: "sales".into(),
            tier: None,
            owner: None,
            owner_type: "user".into(),
            store: store_args(),
        };
        assert!(tier(args, dir.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_chart_edit_touches_one_chart() {
        let dir = sample_dir();
        let args = ChartArgs {
            id: "sales".into(),
            index: 1,
            description: "Churn by cohort".into(),
            store: store_args(),
        };
        chart(args, dir.path()).await.unwrap();

        let fixture = Fixture::load(&dir.path().join("store.json")).unwrap();
        let described: Vec<_> = fixture
            .charts
            .iter()
            .filter(|c| c.description.as_deref() == Some("Churn by cohort"))
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(described, vec!["churn"]);
    }
}
