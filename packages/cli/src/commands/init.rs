use super::DEFAULT_STORE_NAME;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use dashsync_common::{
    Aggregate, EntityRef, Fixture, Item, ServiceFixture, SyncConfig, TagCategory, TagLabel, TagTerm,
    DEFAULT_CONFIG_NAME,
};
use dashsync_workspace::DASHBOARD_SERVICE_KIND;
use std::fs;
use std::path::Path;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// User the CLI acts as
    #[arg(short, long, default_value = "alice")]
    pub user: String,

    /// Also write a sample store
    #[arg(long)]
    pub sample: bool,

    /// Force overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = SyncConfig::path_in(cwd);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    let config = SyncConfig::for_user(args.user);
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    if args.sample {
        write_sample_store(&cwd.join(DEFAULT_STORE_NAME))?;
        println!("  {} Created {}", "✓".green(), DEFAULT_STORE_NAME);
    }

    println!();
    println!("Next steps:");
    println!("  dashsync show sales");
    println!("  dashsync describe sales \"Weekly revenue\"");
    Ok(())
}

/// One dashboard with three charts, owned by alice
pub fn write_sample_store(path: &Path) -> Result<()> {
    let mut dashboard = Aggregate::new("sales", "sales");
    dashboard.display_name = Some("Sales Overview".into());
    dashboard.owner = Some(EntityRef::new("alice", "user").with_name("alice"));
    dashboard.service = Some(EntityRef::new("superset", "dashboardService"));
    dashboard.tags = Some(vec![TagLabel::manual("Tier.Tier2")]);
    dashboard.followers = Some(vec![EntityRef::new("bob", "user")]);
    dashboard.version = Some(0.1);

    let charts: Vec<Item> = [("revenue", "Revenue"), ("churn", "Churn"), ("signups", "Signups")]
        .into_iter()
        .map(|(id, title)| {
            let mut item = Item::new(id, id);
            item.display_name = Some(title.to_string());
            item.chart_type = Some("Line".to_string());
            item.version = Some(0.1);
            item
        })
        .collect();
    dashboard.charts = Some(
        charts
            .iter()
            .map(|c| EntityRef::new(c.id.as_str(), "chart").with_name(c.name.as_str()))
            .collect(),
    );

    let fixture = Fixture {
        dashboards: vec![dashboard],
        charts,
        services: vec![ServiceFixture {
            kind: DASHBOARD_SERVICE_KIND.to_string(),
            id: "superset".into(),
            name: "superset_prod".into(),
            service_type: Some("Superset".into()),
        }],
        tag_categories: vec![TagCategory {
            name: "Marketing".into(),
            description: None,
            children: vec![TagTerm {
                name: "Campaign".into(),
                fully_qualified_name: None,
            }],
        }],
    };
    fixture.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_config_and_store() {
        let dir = TempDir::new().unwrap();
        let args = InitArgs {
            user: "bob".into(),
            sample: true,
            force: false,
        };
        init(args, dir.path()).unwrap();

        let config = SyncConfig::load(dir.path()).unwrap();
        assert_eq!(config.viewer.user_id, "bob");

        let fixture = Fixture::load(&dir.path().join(DEFAULT_STORE_NAME)).unwrap();
        assert_eq!(fixture.dashboards.len(), 1);
        assert_eq!(fixture.charts.len(), 3);
    }
}
