pub mod diff;
pub mod edit;
pub mod init;
pub mod show;

pub use diff::{diff, DiffArgs};
pub use edit::{chart, describe, follow, tag, tier, ChartArgs, DescribeArgs, FollowArgs, TagArgs, TierArgs};
pub use init::{init, InitArgs};
pub use show::{show, ShowArgs};

use anyhow::{Context, Result};
use clap::Args;
use dashsync_common::{Fixture, InMemoryGateway, SyncConfig};
use dashsync_workspace::SessionManager;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_STORE_NAME: &str = "dashsync.store.json";

#[derive(Debug, Args)]
pub struct StoreArgs {
    /// JSON store standing in for the remote catalog
    #[arg(long, default_value = DEFAULT_STORE_NAME)]
    pub store: PathBuf,

    /// Act as this user instead of the configured viewer
    #[arg(long)]
    pub user: Option<String>,
}

/// A fixture store opened for one command
pub struct LocalStore {
    path: PathBuf,
    pub manager: SessionManager<InMemoryGateway>,
}

impl LocalStore {
    pub fn open(args: &StoreArgs, cwd: &Path) -> Result<Self> {
        let mut config = SyncConfig::load(cwd)?;
        if let Some(user) = &args.user {
            config.viewer.user_id = user.clone();
        }

        let path = cwd.join(&args.store);
        let fixture = Fixture::load(&path)
            .with_context(|| format!("Cannot read store {}", path.display()))?;
        let gateway = Arc::new(InMemoryGateway::from_fixture(fixture));

        Ok(Self {
            path,
            manager: SessionManager::new(gateway, config),
        })
    }

    /// Write accepted changes back to the store file
    pub fn save(&self) -> Result<()> {
        self.manager.gateway().snapshot().save(&self.path)?;
        Ok(())
    }
}
