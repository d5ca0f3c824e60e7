//! # Sync Gateway
//!
//! Boundary to the remote store. The core only ever talks to the store
//! through [`SyncGateway`]; transport is somebody else's problem.
//!
//! [`InMemoryGateway`] is a complete store held in memory. It applies
//! submitted patches for real (including `test` preconditions), records every
//! call, and can be told to fail specific requests. The CLI runs it over a
//! JSON fixture file.

use crate::error::GatewayError;
use crate::expand::Expand;
use crate::model::{Aggregate, EntityRef, Item, ServiceRef, TagCategory};
use crate::result::{CommonResult, GatewayResult};
use async_trait::async_trait;
use dashsync_patch::Operation;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Remote store contract
#[async_trait]
pub trait SyncGateway: Send + Sync {
    /// Fetch an aggregate with the relationship fields `expand` asks for
    async fn fetch_aggregate(&self, id: &str, expand: &Expand) -> GatewayResult<Aggregate>;

    async fn fetch_item(&self, id: &str, expand: &Expand) -> GatewayResult<Item>;

    /// Apply `ops` and return the canonical record
    async fn submit_aggregate_patch(&self, id: &str, ops: &[Operation]) -> GatewayResult<Aggregate>;

    async fn submit_item_patch(&self, id: &str, ops: &[Operation]) -> GatewayResult<Item>;

    async fn add_follower(&self, aggregate_id: &str, user_id: &str) -> GatewayResult<()>;

    async fn remove_follower(&self, aggregate_id: &str, user_id: &str) -> GatewayResult<()>;

    async fn fetch_owning_service(&self, kind: &str, id: &str) -> GatewayResult<ServiceRef>;

    async fn fetch_tag_vocabulary(&self) -> GatewayResult<Vec<TagCategory>>;
}

/// One recorded gateway request
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    FetchAggregate { id: String, expand: Expand },
    FetchItem { id: String },
    SubmitAggregatePatch { id: String, ops: Vec<Operation> },
    SubmitItemPatch { id: String, ops: Vec<Operation> },
    AddFollower { aggregate_id: String, user_id: String },
    RemoveFollower { aggregate_id: String, user_id: String },
    FetchOwningService { kind: String, id: String },
    FetchTagVocabulary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceFixture {
    pub kind: String,
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
}

/// On-disk contents of an in-memory store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fixture {
    pub dashboards: Vec<Aggregate>,
    pub charts: Vec<Item>,
    pub services: Vec<ServiceFixture>,
    pub tag_categories: Vec<TagCategory>,
}

impl Fixture {
    pub fn load(path: &Path) -> CommonResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self, path: &Path) -> CommonResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Store {
    aggregates: BTreeMap<String, Aggregate>,
    items: BTreeMap<String, Item>,
    services: BTreeMap<(String, String), ServiceRef>,
    vocabulary: Vec<TagCategory>,
    calls: Vec<GatewayCall>,
    failing_items: BTreeSet<String>,
    fail_services: bool,
    fail_follows: bool,
    rejected_patches: Option<String>,
}

/// Remote store held in memory
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    store: Mutex<Store>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: Fixture) -> Self {
        let gateway = Self::new();
        {
            let mut store = gateway.lock();
            for aggregate in fixture.dashboards {
                store.aggregates.insert(aggregate.id.clone(), aggregate);
            }
            for item in fixture.charts {
                store.items.insert(item.id.clone(), item);
            }
            for service in fixture.services {
                store.services.insert(
                    (service.kind, service.id),
                    ServiceRef {
                        name: service.name,
                        service_type: service.service_type,
                    },
                );
            }
            store.vocabulary = fixture.tag_categories;
        }
        gateway
    }

    /// Current store contents as a fixture
    pub fn snapshot(&self) -> Fixture {
        let store = self.lock();
        Fixture {
            dashboards: store.aggregates.values().cloned().collect(),
            charts: store.items.values().cloned().collect(),
            services: store
                .services
                .iter()
                .map(|((kind, id), service)| ServiceFixture {
                    kind: kind.clone(),
                    id: id.clone(),
                    name: service.name.clone(),
                    service_type: service.service_type.clone(),
                })
                .collect(),
            tag_categories: store.vocabulary.clone(),
        }
    }

    pub fn insert_aggregate(&self, aggregate: Aggregate) {
        self.lock().aggregates.insert(aggregate.id.clone(), aggregate);
    }

    pub fn insert_item(&self, item: Item) {
        self.lock().items.insert(item.id.clone(), item);
    }

    pub fn insert_service(&self, kind: &str, id: &str, service: ServiceRef) {
        self.lock()
            .services
            .insert((kind.to_string(), id.to_string()), service);
    }

    pub fn set_vocabulary(&self, vocabulary: Vec<TagCategory>) {
        self.lock().vocabulary = vocabulary;
    }

    /// Simulate another actor changing the stored aggregate
    pub fn update_aggregate(&self, id: &str, update: impl FnOnce(&mut Aggregate)) {
        if let Some(aggregate) = self.lock().aggregates.get_mut(id) {
            update(aggregate);
        }
    }

    pub fn aggregate(&self, id: &str) -> Option<Aggregate> {
        self.lock().aggregates.get(id).cloned()
    }

    pub fn item(&self, id: &str) -> Option<Item> {
        self.lock().items.get(id).cloned()
    }

    pub fn fail_item(&self, id: &str) {
        self.lock().failing_items.insert(id.to_string());
    }

    pub fn fail_services(&self, fail: bool) {
        self.lock().fail_services = fail;
    }

    pub fn fail_follows(&self, fail: bool) {
        self.lock().fail_follows = fail;
    }

    /// Reject every patch submission with `reason` until cleared
    pub fn reject_patches(&self, reason: Option<&str>) {
        self.lock().rejected_patches = reason.map(str::to_string);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Apply `ops` to a typed record through its JSON form
fn patch_record<T: Serialize + DeserializeOwned>(record: &T, ops: &[Operation]) -> GatewayResult<T> {
    let mut doc = serde_json::to_value(record).map_err(|e| GatewayError::Transport(e.to_string()))?;
    dashsync_patch::apply(&mut doc, ops).map_err(|e| GatewayError::Rejected(e.to_string()))?;
    serde_json::from_value(doc).map_err(|e| GatewayError::Rejected(e.to_string()))
}

/// Versions advance by 0.1 per accepted change
fn next_version(current: Option<f64>) -> Option<f64> {
    current.map(|v| ((v * 10.0).round() + 1.0) / 10.0)
}

#[async_trait]
impl SyncGateway for InMemoryGateway {
    async fn fetch_aggregate(&self, id: &str, expand: &Expand) -> GatewayResult<Aggregate> {
        debug!(aggregate_id = %id, fields = %expand.field_names().join(","), "Fetching aggregate");
        let mut store = self.lock();
        store.calls.push(GatewayCall::FetchAggregate {
            id: id.to_string(),
            expand: *expand,
        });
        let aggregate = store
            .aggregates
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        Ok(expand.project(aggregate))
    }

    async fn fetch_item(&self, id: &str, expand: &Expand) -> GatewayResult<Item> {
        let mut store = self.lock();
        store.calls.push(GatewayCall::FetchItem { id: id.to_string() });
        if store.failing_items.contains(id) {
            return Err(GatewayError::Transport(format!("chart {} unavailable", id)));
        }
        let item = store
            .items
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        Ok(expand.project_item(item))
    }

    async fn submit_aggregate_patch(&self, id: &str, ops: &[Operation]) -> GatewayResult<Aggregate> {
        let mut store = self.lock();
        store.calls.push(GatewayCall::SubmitAggregatePatch {
            id: id.to_string(),
            ops: ops.to_vec(),
        });
        if let Some(reason) = &store.rejected_patches {
            return Err(GatewayError::Rejected(reason.clone()));
        }
        let current = store
            .aggregates
            .get(id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        let mut patched = patch_record(current, ops)?;
        if patched.id != id {
            return Err(GatewayError::Rejected("identifier is immutable".to_string()));
        }
        patched.version = next_version(current.version);
        debug!(aggregate_id = %id, ops = ops.len(), "Applied aggregate patch");
        store.aggregates.insert(id.to_string(), patched.clone());
        Ok(patched)
    }

    async fn submit_item_patch(&self, id: &str, ops: &[Operation]) -> GatewayResult<Item> {
        let mut store = self.lock();
        store.calls.push(GatewayCall::SubmitItemPatch {
            id: id.to_string(),
            ops: ops.to_vec(),
        });
        if let Some(reason) = &store.rejected_patches {
            return Err(GatewayError::Rejected(reason.clone()));
        }
        let current = store
            .items
            .get(id)
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))?;
        let mut patched = patch_record(current, ops)?;
        if patched.id != id {
            return Err(GatewayError::Rejected("identifier is immutable".to_string()));
        }
        patched.version = next_version(current.version);
        debug!(item_id = %id, ops = ops.len(), "Applied chart patch");
        store.items.insert(id.to_string(), patched.clone());
        Ok(patched)
    }

    async fn add_follower(&self, aggregate_id: &str, user_id: &str) -> GatewayResult<()> {
        let mut store = self.lock();
        store.calls.push(GatewayCall::AddFollower {
            aggregate_id: aggregate_id.to_string(),
            user_id: user_id.to_string(),
        });
        if store.fail_follows {
            return Err(GatewayError::Transport("follower service unavailable".to_string()));
        }
        let aggregate = store
            .aggregates
            .get_mut(aggregate_id)
            .ok_or_else(|| GatewayError::NotFound(aggregate_id.to_string()))?;
        let followers = aggregate.followers.get_or_insert_with(Vec::new);
        if !followers.iter().any(|f| f.id == user_id) {
            followers.push(EntityRef::new(user_id, "user"));
        }
        Ok(())
    }

    async fn remove_follower(&self, aggregate_id: &str, user_id: &str) -> GatewayResult<()> {
        let mut store = self.lock();
        store.calls.push(GatewayCall::RemoveFollower {
            aggregate_id: aggregate_id.to_string(),
            user_id: user_id.to_string(),
        });
        if store.fail_follows {
            return Err(GatewayError::Transport("follower service unavailable".to_string()));
        }
        let aggregate = store
            .aggregates
            .get_mut(aggregate_id)
            .ok_or_else(|| GatewayError::NotFound(aggregate_id.to_string()))?;
        if let Some(followers) = aggregate.followers.as_mut() {
            followers.retain(|f| f.id != user_id);
        }
        Ok(())
    }

    async fn fetch_owning_service(&self, kind: &str, id: &str) -> GatewayResult<ServiceRef> {
        let mut store = self.lock();
        store.calls.push(GatewayCall::FetchOwningService {
            kind: kind.to_string(),
            id: id.to_string(),
        });
        if store.fail_services {
            return Err(GatewayError::Transport("service lookup unavailable".to_string()));
        }
        store
            .services
            .get(&(kind.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(format!("{}/{}", kind, id)))
    }

    async fn fetch_tag_vocabulary(&self) -> GatewayResult<Vec<TagCategory>> {
        let mut store = self.lock();
        store.calls.push(GatewayCall::FetchTagVocabulary);
        Ok(store.vocabulary.clone())
    }
}
