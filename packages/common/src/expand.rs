//! # Expand Projection
//!
//! Typed replacement for the string `fields=` list sent with a fetch. Each
//! flag maps to exactly one relationship field; a field whose flag is off is
//! absent from the result.

use crate::model::{Aggregate, Item};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Expand {
    pub owner: bool,
    pub followers: bool,
    pub tags: bool,
    pub usage: bool,
    pub items: bool,
    pub service: bool,
}

impl Expand {
    /// Every relationship inlined
    pub const fn full() -> Self {
        Self {
            owner: true,
            followers: true,
            tags: true,
            usage: true,
            items: true,
            service: true,
        }
    }

    /// Scalar fields only
    pub const fn none() -> Self {
        Self {
            owner: false,
            followers: false,
            tags: false,
            usage: false,
            items: false,
            service: false,
        }
    }

    /// What a chart row needs: its owning service only
    pub const fn item_row() -> Self {
        Self {
            service: true,
            ..Self::none()
        }
    }

    /// Wire field names, in a fixed order
    pub fn field_names(&self) -> Vec<&'static str> {
        [
            (self.owner, "owner"),
            (self.service, "service"),
            (self.followers, "followers"),
            (self.tags, "tags"),
            (self.usage, "usageSummary"),
            (self.items, "charts"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }

    /// Clear every relationship field not covered by this projection
    pub fn project(&self, mut aggregate: Aggregate) -> Aggregate {
        if !self.owner {
            aggregate.owner = None;
        }
        if !self.service {
            aggregate.service = None;
        }
        if !self.followers {
            aggregate.followers = None;
        }
        if !self.tags {
            aggregate.tags = None;
        }
        if !self.usage {
            aggregate.usage_summary = None;
        }
        if !self.items {
            aggregate.charts = None;
        }
        aggregate
    }

    pub fn project_item(&self, mut item: Item) -> Item {
        if !self.service {
            item.service = None;
        }
        if !self.tags {
            item.tags = None;
        }
        item
    }
}

impl Default for Expand {
    fn default() -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityRef, TagLabel};

    #[test]
    fn test_field_names_are_ordered() {
        assert_eq!(
            Expand::full().field_names(),
            vec!["owner", "service", "followers", "tags", "usageSummary", "charts"]
        );
        assert_eq!(Expand::item_row().field_names(), vec!["service"]);
        assert!(Expand::none().field_names().is_empty());
    }

    #[test]
    fn test_project_clears_unrequested_fields() {
        let mut aggregate = Aggregate::new("d1", "sales");
        aggregate.owner = Some(EntityRef::new("u1", "user"));
        aggregate.tags = Some(vec![TagLabel::manual("Tier.Tier1")]);
        aggregate.followers = Some(vec![]);

        let expand = Expand {
            tags: true,
            ..Expand::none()
        };
        let projected = expand.project(aggregate);

        assert!(projected.owner.is_none());
        assert!(projected.followers.is_none());
        assert_eq!(projected.tags().len(), 1);
    }

    #[test]
    fn test_omitted_flags_default_to_expanded() {
        let expand: Expand = serde_json::from_str(r#"{"usage": false}"#).unwrap();
        assert!(!expand.usage);
        assert!(expand.owner);
        assert!(expand.items);
    }
}
