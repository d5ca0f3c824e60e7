//! # Reconciliation
//!
//! Decides what every mutation diffs against, what the optimistic local
//! effect is, and how the store's answer is merged back.
//!
//! ## Rules
//!
//! 1. The diff is always `baseline → proposal`, never between two
//!    optimistic states
//! 2. On success the returned record replaces baseline and working at once;
//!    concurrent server-side changes are adopted as-is
//! 3. On failure the touched field group falls back to the baseline
//! 4. Two submissions built on the same baseline are not serialized: the
//!    last response to arrive becomes the baseline. `guard_version` turns
//!    that into a rejection by prefixing a `test /version` operation.
//!
//! [`Reconciler`] drives prepare → gateway → resolve for callers that do not
//! need to interleave requests themselves.

use crate::items::ItemSubmission;
use crate::mutations::{FieldGroup, Mutation};
use crate::session::{EditSession, PatchSubmission, Resolution};
use crate::EditorError;
use dashsync_common::{Aggregate, EntityRef, Item, SyncConfig, SyncGateway, TierPolicy};
use dashsync_patch::{diff_records, JsonPointer, Operation};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// A proposed record and the operations that reach it from the baseline
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub proposal: Aggregate,
    pub ops: Vec<Operation>,
    pub group: FieldGroup,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationPolicy {
    tier_policy: TierPolicy,
    guard_version: bool,
}

impl ReconciliationPolicy {
    pub fn new(tier_policy: TierPolicy, guard_version: bool) -> Self {
        Self {
            tier_policy,
            guard_version,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.tier_policy(), config.guard_version)
    }

    pub fn tier_policy(&self) -> &TierPolicy {
        &self.tier_policy
    }

    /// Proposal and patch for `mutation`, both taken against `baseline`
    pub fn plan(&self, baseline: &Aggregate, mutation: &Mutation) -> Result<Plan, EditorError> {
        let proposal = mutation.propose(baseline, &self.tier_policy)?;
        let mut ops = diff_records(baseline, &proposal)?;
        self.guard(&mut ops, baseline.version);
        Ok(Plan {
            proposal,
            ops,
            group: mutation.field_group(),
        })
    }

    /// Patch for a chart draft, taken against the chart as last loaded
    pub fn plan_item(&self, current: &Item, draft: &Item) -> Result<Vec<Operation>, EditorError> {
        let mut ops = diff_records(current, draft)?;
        self.guard(&mut ops, current.version);
        Ok(ops)
    }

    /// Optimistic local effect: the plan's field group lands on `working`
    pub fn apply_optimistic(&self, working: &mut Aggregate, plan: &Plan) {
        plan.group.copy(&plan.proposal, working);
    }

    /// Undo a failed submission's effect on `working`
    pub fn rollback(&self, working: &mut Aggregate, baseline: &Aggregate, group: FieldGroup) {
        group.copy(baseline, working);
    }

    /// Record the store returned after an accepted patch
    pub fn merge(&self, returned: Aggregate) -> (Aggregate, Aggregate) {
        (returned.clone(), returned)
    }

    fn guard(&self, ops: &mut Vec<Operation>, version: Option<f64>) {
        if !self.guard_version || ops.is_empty() {
            return;
        }
        if let Some(version) = version.and_then(serde_json::Number::from_f64) {
            ops.insert(
                0,
                Operation::test(JsonPointer::root().child("version"), Value::Number(version)),
            );
        }
    }
}

/// Runs mutations end to end against a gateway
pub struct Reconciler<'g, G: SyncGateway + ?Sized> {
    gateway: &'g G,
}

impl<'g, G: SyncGateway + ?Sized> Reconciler<'g, G> {
    pub fn new(gateway: &'g G) -> Self {
        Self { gateway }
    }

    /// Submit `submission` without touching the session
    pub async fn send(&self, submission: &PatchSubmission) -> dashsync_common::GatewayResult<Aggregate> {
        self.gateway
            .submit_aggregate_patch(&submission.aggregate_id, &submission.ops)
            .await
    }

    pub async fn send_item(&self, submission: &ItemSubmission) -> dashsync_common::GatewayResult<Item> {
        self.gateway
            .submit_item_patch(&submission.item_id, &submission.ops)
            .await
    }

    /// Prepare, submit and resolve one root mutation
    #[instrument(skip(self, session, mutation), fields(aggregate_id = %session.aggregate_id(), intent = mutation.name()))]
    pub async fn apply(&self, session: &mut EditSession, mutation: Mutation) -> Result<Resolution, EditorError> {
        let group = mutation.field_group();
        let Some(submission) = session.submit(mutation)? else {
            if session.is_deferred(group) {
                debug!("Mutation waits on an in-flight edit of the same fields");
                return Ok(Resolution::Deferred);
            }
            debug!("Mutation produced no operations");
            return Ok(Resolution::NoChange);
        };

        info!(ops = submission.ops.len(), "Submitting aggregate patch");
        let result = self.send(&submission).await;
        if let Err(e) = &result {
            warn!(error = %e, "Aggregate patch failed");
        }
        let resolution = session.resolve_patch(&submission, result);
        let flushed = self.flush(session).await;
        let resolution = resolution?;
        flushed?;
        Ok(resolution)
    }

    /// Send and resolve every followup the session has released.
    ///
    /// Returns how many patches were sent.
    pub async fn flush(&self, session: &mut EditSession) -> Result<usize, EditorError> {
        let mut sent = 0;
        while let Some(submission) = session.take_followup() {
            info!(ticket = %submission.ticket, ops = submission.ops.len(), "Submitting deferred patch");
            let result = self.send(&submission).await;
            sent += 1;
            session.resolve_patch(&submission, result)?;
        }
        Ok(sent)
    }

    pub async fn edit_description(&self, session: &mut EditSession, description: impl Into<String>) -> Result<Resolution, EditorError> {
        self.apply(session, Mutation::EditDescription { description: description.into() })
            .await
    }

    pub async fn set_owner_and_tier(
        &self,
        session: &mut EditSession,
        owner: Option<EntityRef>,
        tier: Option<String>,
    ) -> Result<Resolution, EditorError> {
        self.apply(session, Mutation::SetOwnerAndTier { owner, tier }).await
    }

    pub async fn set_tags(&self, session: &mut EditSession, names: Vec<String>) -> Result<Resolution, EditorError> {
        self.apply(session, Mutation::SetTags { names }).await
    }

    /// Optimistically flip follow, then confirm or revert
    #[instrument(skip(self, session), fields(aggregate_id = %session.aggregate_id()))]
    pub async fn toggle_follow(&self, session: &mut EditSession) -> Result<Resolution, EditorError> {
        let request = session.toggle_follow()?;
        let result = if request.follow {
            self.gateway
                .add_follower(&request.aggregate_id, &request.user_id)
                .await
        } else {
            self.gateway
                .remove_follower(&request.aggregate_id, &request.user_id)
                .await
        };
        if let Err(e) = &result {
            warn!(error = %e, follow = request.follow, "Follow toggle failed, reverting");
        }
        session.resolve_follow(&request, result)
    }

    /// Submit the open chart draft
    #[instrument(skip(self, session), fields(aggregate_id = %session.aggregate_id()))]
    pub async fn commit_item_edit(&self, session: &mut EditSession) -> Result<Resolution, EditorError> {
        let Some(submission) = session.commit_item_edit()? else {
            return Ok(Resolution::NoChange);
        };

        info!(item_id = %submission.item_id, index = submission.index, ops = submission.ops.len(), "Submitting chart patch");
        let result = self.send_item(&submission).await;
        session.resolve_item(&submission, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn baseline() -> Aggregate {
        let mut aggregate = Aggregate::new("d1", "sales");
        aggregate.description = Some("old".into());
        aggregate.version = Some(0.4);
        aggregate
    }

    #[test]
    fn test_plan_is_taken_against_baseline() {
        let policy = ReconciliationPolicy::default();
        let plan = policy
            .plan(&baseline(), &Mutation::EditDescription { description: "new".into() })
            .unwrap();

        assert_eq!(
            plan.ops,
            vec![Operation::replace("/description".parse().unwrap(), json!("new"))]
        );
        assert_eq!(plan.group, FieldGroup::Description);
    }

    #[test]
    fn test_version_guard_prefixes_test_op() {
        let policy = ReconciliationPolicy::new(TierPolicy::default(), true);
        let plan = policy
            .plan(&baseline(), &Mutation::EditDescription { description: "new".into() })
            .unwrap();

        assert_eq!(plan.ops.len(), 2);
        assert_eq!(plan.ops[0], Operation::test("/version".parse().unwrap(), json!(0.4)));
    }

    #[test]
    fn test_version_guard_skips_empty_patch() {
        let policy = ReconciliationPolicy::new(TierPolicy::default(), true);
        let plan = policy
            .plan(&baseline(), &Mutation::EditDescription { description: "old".into() })
            .unwrap();
        assert!(plan.ops.is_empty());
    }

    #[test]
    fn test_rollback_restores_group_only() {
        let policy = ReconciliationPolicy::default();
        let base = baseline();
        let mut working = base.clone();
        working.description = Some("optimistic".into());
        working.tags = Some(vec![]);

        policy.rollback(&mut working, &base, FieldGroup::Description);
        assert_eq!(working.description.as_deref(), Some("old"));
        assert_eq!(working.tags, Some(vec![]));
    }

    #[test]
    fn test_item_plan() {
        let policy = ReconciliationPolicy::default();
        let current = Item::new("c1", "revenue");
        let mut draft = current.clone();
        draft.description = Some("monthly revenue".into());

        let ops = policy.plan_item(&current, &draft).unwrap();
        assert_eq!(
            ops,
            vec![Operation::add("/description".parse().unwrap(), json!("monthly revenue"))]
        );
    }
}
