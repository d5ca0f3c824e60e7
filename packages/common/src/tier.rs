//! Tier tags: the reserved tag namespace with at most one tag per aggregate.

use crate::model::TagLabel;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIER_NAMESPACE: &str = "Tier";

/// Decides which tags belong to the tier class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierPolicy {
    namespace: String,
}

impl TierPolicy {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn is_tier(&self, fqn: &str) -> bool {
        fqn.strip_prefix(self.namespace.as_str())
            .is_some_and(|rest| rest.starts_with('.') && rest.len() > 1)
    }

    /// The tier tag among `tags`, if any
    pub fn tier_of<'a>(&self, tags: &'a [TagLabel]) -> Option<&'a TagLabel> {
        tags.iter().find(|tag| self.is_tier(&tag.tag_fqn))
    }

    /// Every tag outside the tier namespace, in order
    pub fn without_tier(&self, tags: &[TagLabel]) -> Vec<TagLabel> {
        tags.iter()
            .filter(|tag| !self.is_tier(&tag.tag_fqn))
            .cloned()
            .collect()
    }

    /// Short label of a tier FQN: `Tier.Tier1` → `Tier1`
    pub fn label<'a>(&self, fqn: &'a str) -> &'a str {
        fqn.strip_prefix(self.namespace.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(fqn)
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_TIER_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespace() {
        let policy = TierPolicy::default();
        assert!(policy.is_tier("Tier.Tier1"));
        assert!(!policy.is_tier("Tier"));
        assert!(!policy.is_tier("Tier."));
        assert!(!policy.is_tier("Tiers.Gold"));
        assert!(!policy.is_tier("PII.Sensitive"));
    }

    #[test]
    fn test_split_tags() {
        let policy = TierPolicy::new("PII");
        let tags = vec![
            TagLabel::manual("Marketing.Campaign"),
            TagLabel::manual("PII.Sensitive"),
        ];

        assert_eq!(policy.tier_of(&tags).unwrap().tag_fqn, "PII.Sensitive");
        assert_eq!(policy.without_tier(&tags), vec![TagLabel::manual("Marketing.Campaign")]);
        assert_eq!(policy.label("PII.Sensitive"), "Sensitive");
    }

    #[test]
    fn test_label_with_dotted_namespace() {
        let policy = TierPolicy::new("Org.Tier");
        assert!(policy.is_tier("Org.Tier.Gold"));
        assert_eq!(policy.label("Org.Tier.Gold"), "Gold");
        assert_eq!(policy.label("Other.Gold"), "Other.Gold");
    }
}
