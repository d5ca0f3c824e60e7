//! # Aggregate Loader
//!
//! Assembles a dashboard from its root record and its charts.
//!
//! ```text
//! fetch_aggregate ──▶ join_all(fetch_item …)      (collection order kept)
//!
//! lookup_service                                 (separate, bounded by timeout)
//! ```
//!
//! Chart failures degrade the result instead of failing it. The owning
//! service only feeds the breadcrumb trail, so it is looked up on its own
//! and never holds the load back.

use crate::error::{LoadError, PartialFailure, SyncError};
use dashsync_common::{
    Aggregate, EntityRef, Expand, GatewayError, GatewayResult, ServiceRef, SyncConfig, SyncGateway,
};
use dashsync_editor::{EditSession, Epoch, ItemSlot, NavigationTrail};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Service kind used for the owning-service lookup
pub const DASHBOARD_SERVICE_KIND: &str = "dashboardServices";

/// A fully assembled, possibly degraded, aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedAggregate {
    pub aggregate: Aggregate,

    /// One slot per embedded reference, in collection order
    pub items: Vec<ItemSlot>,

    /// Aggregate-only until the owning service is resolved
    pub trail: NavigationTrail,
    pub failures: Vec<PartialFailure>,
}

impl LoadedAggregate {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Turn a degraded load into an error
    pub fn require_complete(self) -> Result<Self, SyncError> {
        if self.is_degraded() {
            Err(SyncError::PartialLoad {
                failures: self.failures,
            })
        } else {
            Ok(self)
        }
    }

    pub fn into_session(self, epoch: Epoch, config: &SyncConfig) -> EditSession {
        EditSession::new(epoch, self.aggregate, self.items, self.trail, config)
    }
}

pub struct AggregateLoader<G: SyncGateway + ?Sized> {
    gateway: Arc<G>,
    expand: Expand,
    service_timeout: Duration,
}

impl<G: SyncGateway + ?Sized> AggregateLoader<G> {
    pub fn new(gateway: Arc<G>, config: &SyncConfig) -> Self {
        Self {
            gateway,
            expand: config.expand,
            service_timeout: Duration::from_millis(config.service_lookup_timeout_ms),
        }
    }

    #[instrument(skip(self))]
    pub async fn load(&self, id: &str) -> Result<LoadedAggregate, LoadError> {
        let aggregate = self
            .gateway
            .fetch_aggregate(id, &self.expand)
            .await
            .map_err(|source| LoadError::Fetch {
                id: id.to_string(),
                source,
            })?;

        if aggregate.id != id {
            return Err(LoadError::IdentifierMismatch {
                requested: id.to_string(),
                returned: aggregate.id,
            });
        }

        let items = self.fetch_items(aggregate.chart_refs()).await;

        let mut failures = Vec::new();
        for (index, slot) in items.iter().enumerate() {
            if let ItemSlot::Failed { reference, reason } = slot {
                failures.push(PartialFailure::Item {
                    index,
                    id: reference.id.clone(),
                    reason: reason.clone(),
                });
            }
        }
        let trail = NavigationTrail::build(None, &aggregate);

        if failures.is_empty() {
            info!(items = items.len(), "Aggregate loaded");
        } else {
            warn!(items = items.len(), failures = failures.len(), "Aggregate loaded with failures");
        }

        Ok(LoadedAggregate {
            aggregate,
            items,
            trail,
            failures,
        })
    }

    async fn fetch_items(&self, references: &[EntityRef]) -> Vec<ItemSlot> {
        if references.is_empty() {
            return Vec::new();
        }

        let expand = Expand::item_row();
        let results = join_all(
            references
                .iter()
                .map(|reference| self.gateway.fetch_item(&reference.id, &expand)),
        )
        .await;

        references
            .iter()
            .zip(results)
            .map(|(reference, result)| match result {
                Ok(item) if item.id == reference.id => ItemSlot::Loaded(item),
                Ok(item) => failed_slot(reference, format!("store returned chart {}", item.id)),
                Err(e) => failed_slot(reference, e.to_string()),
            })
            .collect()
    }

    /// Owning service of `service_id`, bounded by the configured timeout
    #[instrument(skip(self))]
    pub async fn lookup_service(&self, service_id: &str) -> GatewayResult<ServiceRef> {
        let lookup = self
            .gateway
            .fetch_owning_service(DASHBOARD_SERVICE_KIND, service_id);

        let result = match tokio::time::timeout(self.service_timeout, lookup).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Transport(format!(
                "timed out after {}ms",
                self.service_timeout.as_millis()
            ))),
        };
        match &result {
            Ok(found) => debug!(service = %found.name, "Owning service resolved"),
            Err(e) => warn!(error = %e, "Owning service lookup failed"),
        }
        result
    }
}

fn failed_slot(reference: &EntityRef, reason: String) -> ItemSlot {
    warn!(chart_id = %reference.id, %reason, "Chart fetch failed");
    ItemSlot::Failed {
        reference: reference.clone(),
        reason,
    }
}
