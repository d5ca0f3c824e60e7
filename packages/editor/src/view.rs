//! # Presentation Projection
//!
//! Read-only snapshot handed to the presentation layer. It is rebuilt from
//! the session after every state replacement and never written back.

use crate::items::ItemSlot;
use dashsync_common::{Aggregate, EntityRef, ServiceRef, TagLabel, UsageDisplay};

/// One breadcrumb
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub name: String,
    pub url: Option<String>,
    pub active: bool,
}

/// Service → aggregate breadcrumb trail
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationTrail {
    pub crumbs: Vec<Crumb>,
}

impl NavigationTrail {
    /// Trail with the owning service first, when it could be resolved
    pub fn build(service: Option<(&str, &ServiceRef)>, aggregate: &Aggregate) -> Self {
        let mut crumbs = Vec::with_capacity(2);
        if let Some((kind, service)) = service {
            crumbs.push(Crumb {
                name: service.name.clone(),
                url: (!service.name.is_empty()).then(|| service_path(kind, service)),
                active: false,
            });
        }
        crumbs.push(Crumb {
            name: aggregate.display_label().to_string(),
            url: None,
            active: true,
        });
        Self { crumbs }
    }
}

fn service_path(kind: &str, service: &ServiceRef) -> String {
    match &service.service_type {
        Some(service_type) => format!("/service/{}/{}/{}", kind, service_type, service.name),
        None => format!("/service/{}/{}", kind, service.name),
    }
}

/// One chart row
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub chart_type: Option<String>,
    pub url: Option<String>,

    /// Set when the chart could not be fetched
    pub failure: Option<String>,

    /// A draft is open on this row
    pub editing: bool,

    /// A patch for this row is in flight
    pub saving: bool,
}

impl ItemRow {
    pub(crate) fn from_slot(index: usize, slot: &ItemSlot) -> Self {
        match slot {
            ItemSlot::Loaded(item) => Self {
                index,
                id: item.id.clone(),
                name: item.display_label().to_string(),
                description: item.description.clone(),
                chart_type: item.chart_type.clone(),
                url: item.chart_url.clone(),
                failure: None,
                editing: false,
                saving: false,
            },
            ItemSlot::Failed { reference, reason } => Self {
                index,
                id: reference.id.clone(),
                name: reference
                    .display_name
                    .clone()
                    .or_else(|| reference.name.clone())
                    .unwrap_or_else(|| reference.id.clone()),
                description: None,
                chart_type: None,
                url: None,
                failure: Some(reason.clone()),
                editing: false,
                saving: false,
            },
        }
    }
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub owner: Option<EntityRef>,
    pub tier: Option<String>,

    /// Tier without its namespace, e.g. "Tier1"
    pub tier_label: Option<String>,

    /// Tags outside the tier namespace
    pub tags: Vec<TagLabel>,
    pub follower_count: usize,
    pub is_following: bool,
    pub trail: NavigationTrail,
    pub items: Vec<ItemRow>,
    pub usage: UsageDisplay,
    pub can_edit: bool,
    pub pending_mutations: usize,
}
