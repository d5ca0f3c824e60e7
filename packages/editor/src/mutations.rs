//! # Aggregate Mutations
//!
//! Mutation intents on the root aggregate.
//!
//! ## Design Principles
//!
//! 1. **Baseline-relative**: A proposal is always built from the
//!    last-synchronized baseline, never from another optimistic state
//! 2. **Validated**: Preconditions fail before anything touches the network
//! 3. **Scoped**: Each intent owns one field group; the optimistic effect and
//!    any rollback only touch that group
//!
//! ## Mutation Semantics
//!
//! ### EditDescription
//! - Replaces the description only
//!
//! ### SetOwnerAndTier
//! - At least one of owner/tier is required
//! - Tier: all non-tier tags followed by the new tier tag (replaces, never merges)
//! - Owner: supplied fields merged onto the current owner
//!
//! ### SetTags
//! - Desired set of non-tier tag names
//! - Kept tags retain label type and state; new ones are manual/confirmed
//! - The tier tag stays where it is

use dashsync_common::{dedup_tags, Aggregate, EntityRef, TagLabel, TierPolicy};
use thiserror::Error;

/// Intent-preserving mutations on the root aggregate
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    EditDescription {
        description: String,
    },

    SetOwnerAndTier {
        owner: Option<EntityRef>,
        tier: Option<String>,
    },

    /// Full desired set of non-tier tag names
    SetTags {
        names: Vec<String>,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("Owner or tier must be supplied")]
    OwnerOrTierRequired,

    #[error("Not a tier tag: {0}")]
    NotATier(String),

    #[error("Chart index {index} out of range ({len} charts)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Chart at index {0} failed to load")]
    ItemUnavailable(usize),

    /// The slot at the draft's index now holds a different chart
    #[error("Chart at index {index} is no longer {item_id}")]
    DraftOutOfDate { index: usize, item_id: String },

    #[error("No chart edit is open")]
    NoItemDraft,

    #[error("A follow toggle is already in flight")]
    FollowInFlight,
}

/// Fields an intent is allowed to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGroup {
    Description,
    OwnerAndTags,
    Tags,
}

impl FieldGroup {
    /// Copy this group's fields from `source` onto `target`
    pub fn copy(&self, source: &Aggregate, target: &mut Aggregate) {
        match self {
            FieldGroup::Description => {
                target.description = source.description.clone();
            }
            FieldGroup::OwnerAndTags => {
                target.owner = source.owner.clone();
                target.tags = source.tags.clone();
            }
            FieldGroup::Tags => {
                target.tags = source.tags.clone();
            }
        }
    }
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::EditDescription { .. } => "edit_description",
            Mutation::SetOwnerAndTier { .. } => "set_owner_and_tier",
            Mutation::SetTags { .. } => "set_tags",
        }
    }

    pub fn field_group(&self) -> FieldGroup {
        match self {
            Mutation::EditDescription { .. } => FieldGroup::Description,
            Mutation::SetOwnerAndTier { .. } => FieldGroup::OwnerAndTags,
            Mutation::SetTags { .. } => FieldGroup::Tags,
        }
    }

    pub fn validate(&self, tier_policy: &TierPolicy) -> Result<(), MutationError> {
        match self {
            Mutation::SetOwnerAndTier { owner: None, tier: None } => {
                Err(MutationError::OwnerOrTierRequired)
            }
            Mutation::SetOwnerAndTier { tier: Some(tier), .. } if !tier_policy.is_tier(tier) => {
                Err(MutationError::NotATier(tier.clone()))
            }
            _ => Ok(()),
        }
    }

    /// Build the proposed record from `baseline`
    pub fn propose(&self, baseline: &Aggregate, tier_policy: &TierPolicy) -> Result<Aggregate, MutationError> {
        self.validate(tier_policy)?;

        let mut proposal = baseline.clone();
        match self {
            Mutation::EditDescription { description } => {
                proposal.description = Some(description.clone());
            }

            Mutation::SetOwnerAndTier { owner, tier } => {
                if let Some(tier) = tier {
                    let mut tags = tier_policy.without_tier(baseline.tags());
                    tags.push(TagLabel::manual(tier.as_str()));
                    proposal.tags = Some(dedup_tags(tags));
                }
                if let Some(owner) = owner {
                    proposal.owner = Some(match &baseline.owner {
                        Some(current) => current.merged_with(owner),
                        None => owner.clone(),
                    });
                }
            }

            Mutation::SetTags { names } => {
                proposal.tags = Some(Self::select_tags(baseline.tags(), names, tier_policy));
            }
        }
        Ok(proposal)
    }

    fn select_tags(current: &[TagLabel], names: &[String], tier_policy: &TierPolicy) -> Vec<TagLabel> {
        // Tier names are never selectable here
        let wanted: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|name| !tier_policy.is_tier(name))
            .collect();

        let mut tags: Vec<TagLabel> = current
            .iter()
            .filter(|tag| tier_policy.is_tier(&tag.tag_fqn) || wanted.contains(&tag.tag_fqn.as_str()))
            .cloned()
            .collect();

        for name in wanted {
            if !tags.iter().any(|tag| tag.tag_fqn == name) {
                tags.push(TagLabel::manual(name));
            }
        }

        dedup_tags(tags)
    }
}
