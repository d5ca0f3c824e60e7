//! # Data Model
//!
//! Wire shapes of the dashboard aggregate and its embedded charts.
//!
//! Relationship fields are `Option` and skipped when absent, so a record
//! fetched without a relationship serializes without that key (absent, not
//! `null`). Patches are computed over this serialized form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to another entity (owner, follower, service, chart)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRef {
    pub id: String,

    /// Entity kind, e.g. "user", "team", "chart", "dashboardService"
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            name: None,
            display_name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Field-by-field merge: fields present on `update` win, absent ones
    /// keep their current value.
    pub fn merged_with(&self, update: &EntityRef) -> EntityRef {
        EntityRef {
            id: update.id.clone(),
            kind: update.kind.clone(),
            name: update.name.clone().or_else(|| self.name.clone()),
            display_name: update
                .display_name
                .clone()
                .or_else(|| self.display_name.clone()),
        }
    }
}

/// How a tag was attached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelType {
    #[default]
    Manual,
    Propagated,
    Automated,
    Derived,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagState {
    Suggested,
    #[default]
    Confirmed,
}

/// A tag attached to an aggregate or chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagLabel {
    #[serde(rename = "tagFQN")]
    pub tag_fqn: String,

    #[serde(default)]
    pub label_type: LabelType,

    #[serde(default)]
    pub state: TagState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TagLabel {
    /// A tag chosen by the user: manual and confirmed
    pub fn manual(fqn: impl Into<String>) -> Self {
        Self {
            tag_fqn: fqn.into(),
            label_type: LabelType::Manual,
            state: TagState::Confirmed,
            description: None,
        }
    }
}

/// Drop repeated FQNs, keeping the first occurrence
pub fn dedup_tags(tags: Vec<TagLabel>) -> Vec<TagLabel> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(tag.tag_fqn.clone()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile_rank: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_stats: Option<UsageStats>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly_stats: Option<UsageStats>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_stats: Option<UsageStats>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// The root record being viewed and edited
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<EntityRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<EntityRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagLabel>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<Vec<EntityRef>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_summary: Option<UsageSummary>,

    /// Embedded collection, as references in collection order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charts: Option<Vec<EntityRef>>,

    /// Server version token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<f64>,
}

impl Aggregate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: None,
            fully_qualified_name: None,
            description: None,
            owner: None,
            service: None,
            tags: None,
            followers: None,
            usage_summary: None,
            charts: None,
            version: None,
        }
    }

    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn tags(&self) -> &[TagLabel] {
        self.tags.as_deref().unwrap_or_default()
    }

    pub fn chart_refs(&self) -> &[EntityRef] {
        self.charts.as_deref().unwrap_or_default()
    }

    pub fn follower_ids(&self) -> impl Iterator<Item = &str> {
        self.followers
            .iter()
            .flatten()
            .map(|follower| follower.id.as_str())
    }
}

/// An embedded chart: owned by the aggregate but patched on its own id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Type discriminator, e.g. "Line", "Table"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagLabel>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<EntityRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<f64>,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            display_name: None,
            description: None,
            chart_type: None,
            chart_url: None,
            tags: None,
            service: None,
            version: None,
        }
    }

    pub fn display_label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Owning service, as returned by the service lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagTerm {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fully_qualified_name: Option<String>,
}

/// One category of the tag vocabulary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCategory {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub children: Vec<TagTerm>,
}

/// Flatten a vocabulary into selectable tag FQNs ("Category.Term")
pub fn vocabulary_names(categories: &[TagCategory]) -> Vec<String> {
    categories
        .iter()
        .flat_map(|category| {
            category.children.iter().map(move |term| {
                term.fully_qualified_name
                    .clone()
                    .unwrap_or_else(|| format!("{}.{}", category.name, term.name))
            })
        })
        .collect()
}

/// A value that may be missing upstream. Missing renders as `--`, never 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Metric<T> {
    Known(T),
    Unknown,
}

impl<T> Metric<T> {
    pub fn known(&self) -> Option<&T> {
        match self {
            Metric::Known(value) => Some(value),
            Metric::Unknown => None,
        }
    }
}

impl<T> From<Option<T>> for Metric<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Metric::Unknown, Metric::Known)
    }
}

impl<T: fmt::Display> fmt::Display for Metric<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Known(value) => write!(f, "{}", value),
            Metric::Unknown => f.write_str("--"),
        }
    }
}

/// Weekly usage as shown next to the aggregate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageDisplay {
    pub percentile_rank: Metric<f64>,
    pub weekly_count: Metric<u64>,
}

impl UsageDisplay {
    pub fn from_summary(summary: Option<&UsageSummary>) -> Self {
        let weekly = summary.and_then(|s| s.weekly_stats.as_ref());
        Self {
            percentile_rank: weekly.and_then(|w| w.percentile_rank).into(),
            weekly_count: weekly.and_then(|w| w.count).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_relationships_are_omitted() {
        let aggregate = Aggregate::new("d1", "sales");
        let value = serde_json::to_value(&aggregate).unwrap();
        assert_eq!(value, json!({"id": "d1", "name": "sales"}));
    }

    #[test]
    fn test_parse_wire_aggregate() {
        let aggregate: Aggregate = serde_json::from_value(json!({
            "id": "d1",
            "name": "sales",
            "owner": {"id": "t1", "type": "team", "name": "analytics"},
            "tags": [{"tagFQN": "Tier.Tier2", "labelType": "Manual", "state": "Confirmed"}],
            "followers": [{"id": "u1", "type": "user"}],
            "charts": [{"id": "c1", "type": "chart"}],
            "usageSummary": {"weeklyStats": {"count": 12, "percentileRank": 80.0}},
            "version": 0.3
        }))
        .unwrap();

        assert_eq!(aggregate.owner.as_ref().unwrap().kind, "team");
        assert_eq!(aggregate.tags()[0].tag_fqn, "Tier.Tier2");
        assert_eq!(aggregate.follower_ids().collect::<Vec<_>>(), vec!["u1"]);
        assert_eq!(aggregate.chart_refs().len(), 1);
        assert_eq!(aggregate.version, Some(0.3));
    }

    #[test]
    fn test_owner_merge_keeps_unsupplied_fields() {
        let current = EntityRef::new("u1", "user").with_name("alice");
        let update = EntityRef::new("t1", "team");

        let merged = current.merged_with(&update);
        assert_eq!(merged.id, "t1");
        assert_eq!(merged.kind, "team");
        assert_eq!(merged.name.as_deref(), Some("alice"));
    }

    #[test]
    fn test_dedup_tags_keeps_first() {
        let mut suggested = TagLabel::manual("PII.Sensitive");
        suggested.state = TagState::Suggested;
        let tags = dedup_tags(vec![suggested.clone(), TagLabel::manual("PII.Sensitive")]);
        assert_eq!(tags, vec![suggested]);
    }

    #[test]
    fn test_usage_unknown_sentinel() {
        let usage = UsageDisplay::from_summary(None);
        assert_eq!(usage.percentile_rank, Metric::Unknown);
        assert_eq!(usage.weekly_count.to_string(), "--");

        let summary = UsageSummary {
            weekly_stats: Some(UsageStats { count: Some(0), percentile_rank: None }),
            ..Default::default()
        };
        let usage = UsageDisplay::from_summary(Some(&summary));
        assert_eq!(usage.weekly_count, Metric::Known(0));
        assert_eq!(usage.percentile_rank.to_string(), "--");
    }

    #[test]
    fn test_vocabulary_names() {
        let categories = vec![TagCategory {
            name: "PII".into(),
            description: None,
            children: vec![
                TagTerm { name: "Sensitive".into(), fully_qualified_name: None },
                TagTerm { name: "None".into(), fully_qualified_name: Some("PII.None".into()) },
            ],
        }];
        assert_eq!(vocabulary_names(&categories), vec!["PII.Sensitive", "PII.None"]);
    }
}
