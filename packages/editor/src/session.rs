//! # Edit Session Management
//!
//! One client's editing state for one aggregate.
//!
//! An EditSession holds the last-synchronized baseline, the working copy the
//! user sees, the follower state, the embedded chart rows and at most one
//! open chart draft. It is created on load and thrown away when another
//! aggregate is opened.
//!
//! Every mutation is split in two synchronous halves around the network
//! call: `submit`/`toggle_follow`/`commit_item_edit` apply the optimistic
//! effect and hand back what to send, `resolve_*` merges the answer. Nothing
//! is borrowed across the call, so independent requests may interleave.

use crate::follow::{FollowPhase, FollowRequest, FollowToggle, FollowerSet};
use crate::items::{ItemDraft, ItemSlot, ItemSubmission};
use crate::mutations::{FieldGroup, Mutation, MutationError};
use crate::reconcile::ReconciliationPolicy;
use crate::view::{DashboardView, ItemRow, NavigationTrail};
use crate::EditorError;
use chrono::{DateTime, Utc};
use dashsync_common::{
    Aggregate, EntityRef, GatewayResult, Item, ServiceRef, SyncConfig, UsageDisplay, Viewer,
};
use dashsync_patch::Operation;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// Generation of the session; bumped on every new load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epoch(pub u64);

/// Identifies one in-flight request within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of resolving a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The response was merged into the session
    Applied,

    /// Nothing to send: the proposal equals the baseline
    NoChange,

    /// Queued behind an in-flight edit of the same fields; sent once that
    /// edit resolves if the baseline then differs
    Deferred,

    /// The response belongs to a previous session or request and was ignored
    Stale,
}

/// A root patch waiting on the store
#[derive(Debug, Clone, PartialEq)]
pub struct PatchSubmission {
    pub ticket: Ticket,
    pub epoch: Epoch,
    pub aggregate_id: String,
    pub ops: Vec<Operation>,
}

/// Optimistic mutation waiting for server acknowledgment
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub ticket: Ticket,
    pub mutation: Mutation,
    pub group: FieldGroup,

    /// Proposed record, replayed onto the working copy after rebases
    pub proposal: Aggregate,

    /// Held back until the same group has nothing in flight
    pub deferred: bool,

    pub submitted_at: DateTime<Utc>,
}

/// Single edit session for one aggregate
pub struct EditSession {
    epoch: Epoch,
    aggregate_id: String,
    viewer: Viewer,
    policy: ReconciliationPolicy,

    baseline: Aggregate,
    working: Aggregate,
    pending: Vec<PendingMutation>,
    followups: VecDeque<PatchSubmission>,

    followers: FollowerSet,
    follow: FollowToggle,

    items: Vec<ItemSlot>,
    item_draft: Option<ItemDraft>,
    saving_items: Vec<(Ticket, usize)>,

    trail: NavigationTrail,
    next_ticket: u64,
}

impl EditSession {
    /// Create a session; `baseline` becomes both baseline and working copy
    pub fn new(
        epoch: Epoch,
        baseline: Aggregate,
        items: Vec<ItemSlot>,
        trail: NavigationTrail,
        config: &SyncConfig,
    ) -> Self {
        let followers = FollowerSet::new(baseline.follower_ids(), &config.viewer.user_id);
        Self {
            epoch,
            aggregate_id: baseline.id.clone(),
            viewer: config.viewer.clone(),
            policy: ReconciliationPolicy::from_config(config),
            working: baseline.clone(),
            baseline,
            pending: Vec::new(),
            followups: VecDeque::new(),
            followers,
            follow: FollowToggle::new(),
            items,
            item_draft: None,
            saving_items: Vec::new(),
            trail,
            next_ticket: 0,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }

    pub fn baseline(&self) -> &Aggregate {
        &self.baseline
    }

    pub fn working(&self) -> &Aggregate {
        &self.working
    }

    pub fn items(&self) -> &[ItemSlot] {
        &self.items
    }

    pub fn item_draft(&self) -> Option<&ItemDraft> {
        self.item_draft.as_ref()
    }

    pub fn followers(&self) -> &FollowerSet {
        &self.followers
    }

    pub fn follow_phase(&self) -> FollowPhase {
        self.follow.phase()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> &[PendingMutation] {
        &self.pending
    }

    /// Whether a reverting edit of `group` is waiting on an in-flight one
    pub fn is_deferred(&self, group: FieldGroup) -> bool {
        self.pending.iter().any(|p| p.deferred && p.group == group)
    }

    /// Next patch released by a resolved edit; send it and resolve it like
    /// any other submission
    pub fn take_followup(&mut self) -> Option<PatchSubmission> {
        self.followups.pop_front()
    }

    pub fn policy(&self) -> &ReconciliationPolicy {
        &self.policy
    }

    /// No owner, owned by the viewer, or owned by one of the viewer's teams
    pub fn can_edit(&self) -> bool {
        match &self.working.owner {
            None => true,
            Some(owner) if owner.kind == "user" => owner.id == self.viewer.user_id,
            Some(owner) => self.viewer.team_ids.iter().any(|team| *team == owner.id),
        }
    }

    /// Read-only projection for the presentation layer
    pub fn view(&self) -> DashboardView {
        let tier_policy = self.policy.tier_policy();
        let tags = self.working.tags();
        let tier = tier_policy.tier_of(tags).map(|tag| tag.tag_fqn.clone());

        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let mut row = ItemRow::from_slot(index, slot);
                row.editing = self.item_draft.as_ref().is_some_and(|d| d.index == index);
                row.saving = self.saving_items.iter().any(|(_, i)| *i == index);
                row
            })
            .collect();

        DashboardView {
            id: self.aggregate_id.clone(),
            title: self.working.display_label().to_string(),
            description: self.working.description.clone().unwrap_or_default(),
            owner: self.working.owner.clone(),
            tier_label: tier.as_deref().map(|fqn| tier_policy.label(fqn).to_string()),
            tier,
            tags: tier_policy.without_tier(tags),
            follower_count: self.followers.count(),
            is_following: self.followers.is_following(),
            trail: self.trail.clone(),
            items,
            usage: UsageDisplay::from_summary(self.working.usage_summary.as_ref()),
            can_edit: self.can_edit(),
            pending_mutations: self.pending.len(),
        }
    }

    fn issue_ticket(&mut self) -> Ticket {
        self.next_ticket += 1;
        Ticket(self.next_ticket)
    }

    fn is_current(&self, epoch: Epoch, aggregate_id: &str) -> bool {
        epoch == self.epoch && aggregate_id == self.aggregate_id
    }

    // ── Root mutations ───────────────────────────────────────────────────

    pub fn edit_description(&mut self, description: impl Into<String>) -> Result<Option<PatchSubmission>, EditorError> {
        self.submit(Mutation::EditDescription {
            description: description.into(),
        })
    }

    pub fn set_owner_and_tier(
        &mut self,
        owner: Option<EntityRef>,
        tier: Option<String>,
    ) -> Result<Option<PatchSubmission>, EditorError> {
        self.submit(Mutation::SetOwnerAndTier { owner, tier })
    }

    pub fn set_tags<I, S>(&mut self, names: I) -> Result<Option<PatchSubmission>, EditorError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.submit(Mutation::SetTags {
            names: names.into_iter().map(Into::into).collect(),
        })
    }

    /// Apply `mutation` optimistically and return the patch to send.
    ///
    /// `Ok(None)` when the proposal equals the baseline. If an edit of the
    /// same field group is still in flight the proposal is kept as a
    /// deferred entry instead, so reverting to the baseline value is not
    /// lost when that edit lands.
    pub fn submit(&mut self, mutation: Mutation) -> Result<Option<PatchSubmission>, EditorError> {
        let plan = self.policy.plan(&self.baseline, &mutation)?;
        let in_flight = self
            .pending
            .iter()
            .any(|p| !p.deferred && p.group == plan.group);
        if plan.ops.is_empty() && !in_flight {
            return Ok(None);
        }

        self.policy.apply_optimistic(&mut self.working, &plan);
        self.pending.retain(|p| !(p.deferred && p.group == plan.group));

        let ticket = self.issue_ticket();
        let deferred = plan.ops.is_empty();
        debug!(%ticket, mutation = mutation.name(), ops = plan.ops.len(), deferred, "Mutation applied optimistically");
        self.pending.push(PendingMutation {
            ticket,
            mutation,
            group: plan.group,
            proposal: plan.proposal,
            deferred,
            submitted_at: Utc::now(),
        });

        if deferred {
            return Ok(None);
        }
        Ok(Some(PatchSubmission {
            ticket,
            epoch: self.epoch,
            aggregate_id: self.aggregate_id.clone(),
            ops: plan.ops,
        }))
    }

    /// Merge the store's answer to `submission`
    pub fn resolve_patch(
        &mut self,
        submission: &PatchSubmission,
        result: GatewayResult<Aggregate>,
    ) -> Result<Resolution, EditorError> {
        if !self.is_current(submission.epoch, &submission.aggregate_id) {
            warn!(ticket = %submission.ticket, "Ignoring response for a previous session");
            return Ok(Resolution::Stale);
        }
        let Some(position) = self
            .pending
            .iter()
            .position(|p| p.ticket == submission.ticket && !p.deferred)
        else {
            return Ok(Resolution::Stale);
        };
        let pending = self.pending.remove(position);
        let in_flight_ms = (Utc::now() - pending.submitted_at).num_milliseconds();
        debug!(ticket = %submission.ticket, in_flight_ms, ok = result.is_ok(), "Patch answered");

        let resolution = match result {
            Ok(returned) if returned.id == self.aggregate_id => {
                self.rebase(returned);
                Ok(Resolution::Applied)
            }
            Ok(returned) => {
                self.policy.rollback(&mut self.working, &self.baseline, pending.group);
                self.replay_pending();
                Err(EditorError::PatchRejected {
                    target: self.aggregate_id.clone(),
                    reason: format!("store answered with aggregate {}", returned.id),
                })
            }
            Err(error) => {
                self.policy.rollback(&mut self.working, &self.baseline, pending.group);
                self.replay_pending();
                Err(EditorError::from_submission(&self.aggregate_id, error))
            }
        };
        self.release_deferred();
        resolution
    }

    /// Re-plan deferred entries whose group has nothing left in flight.
    ///
    /// Entries that still differ from the baseline become followups under
    /// their own ticket; the rest are dropped.
    fn release_deferred(&mut self) {
        let mut index = 0;
        while index < self.pending.len() {
            let entry = &self.pending[index];
            let (ticket, group) = (entry.ticket, entry.group);
            let blocked = self.pending.iter().any(|p| !p.deferred && p.group == group);
            if !entry.deferred || blocked {
                index += 1;
                continue;
            }

            match self.policy.plan(&self.baseline, &self.pending[index].mutation) {
                Ok(plan) if !plan.ops.is_empty() => {
                    debug!(%ticket, ops = plan.ops.len(), "Releasing deferred mutation");
                    let entry = &mut self.pending[index];
                    entry.deferred = false;
                    entry.proposal = plan.proposal;
                    entry.submitted_at = Utc::now();
                    self.followups.push_back(PatchSubmission {
                        ticket,
                        epoch: self.epoch,
                        aggregate_id: self.aggregate_id.clone(),
                        ops: plan.ops,
                    });
                    index += 1;
                }
                Ok(_) => {
                    debug!(%ticket, "Deferred mutation already matches baseline");
                    self.pending.remove(index);
                }
                Err(error) => {
                    warn!(%ticket, %error, "Dropping deferred mutation");
                    self.pending.remove(index);
                    self.policy.rollback(&mut self.working, &self.baseline, group);
                    self.replay_pending();
                }
            }
        }
    }

    /// Adopt `returned` as baseline and working copy, then replay what is
    /// still in flight on top of the working copy
    fn rebase(&mut self, returned: Aggregate) {
        let (baseline, working) = self.policy.merge(returned);
        self.baseline = baseline;
        self.working = working;
        self.replay_pending();

        self.followers = FollowerSet::new(self.baseline.follower_ids(), &self.viewer.user_id);
        if let Some(request) = self.follow.in_flight() {
            self.followers.set_following(&request.user_id, request.follow);
        }
    }

    fn replay_pending(&mut self) {
        for pending in &self.pending {
            pending.group.copy(&pending.proposal, &mut self.working);
        }
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Put the owning service in front of the aggregate crumb.
    ///
    /// On failure the aggregate-only trail stays and the error is returned.
    pub fn resolve_trail(
        &mut self,
        epoch: Epoch,
        kind: &str,
        result: GatewayResult<ServiceRef>,
    ) -> Result<Resolution, EditorError> {
        if epoch != self.epoch {
            return Ok(Resolution::Stale);
        }
        let service = result?;
        self.trail = NavigationTrail::build(Some((kind, &service)), &self.working);
        Ok(Resolution::Applied)
    }

    // ── Follow ───────────────────────────────────────────────────────────

    /// Flip follow locally and return the request to send
    pub fn toggle_follow(&mut self) -> Result<FollowRequest, EditorError> {
        if self.follow.phase() == FollowPhase::Pending {
            return Err(MutationError::FollowInFlight.into());
        }

        let follow = !self.followers.is_following();
        let request = FollowRequest {
            ticket: self.issue_ticket(),
            epoch: self.epoch,
            aggregate_id: self.aggregate_id.clone(),
            user_id: self.viewer.user_id.clone(),
            follow,
        };
        self.followers.set_following(&request.user_id, follow);
        self.follow.begin(request.clone());
        Ok(request)
    }

    /// Commit or revert a follow toggle
    pub fn resolve_follow(
        &mut self,
        request: &FollowRequest,
        result: GatewayResult<()>,
    ) -> Result<Resolution, EditorError> {
        if !self.is_current(request.epoch, &request.aggregate_id) {
            return Ok(Resolution::Stale);
        }
        if self.follow.finish(request.ticket, result.is_ok()).is_none() {
            return Ok(Resolution::Stale);
        }

        match result {
            Ok(()) => {
                for record in [&mut self.baseline, &mut self.working] {
                    let followers = record.followers.get_or_insert_with(Vec::new);
                    followers.retain(|f| f.id != request.user_id);
                    if request.follow {
                        followers.push(EntityRef::new(request.user_id.as_str(), "user"));
                    }
                }
                Ok(Resolution::Applied)
            }
            Err(error) => {
                self.followers.set_following(&request.user_id, !request.follow);
                Err(EditorError::Gateway(error))
            }
        }
    }

    // ── Embedded charts ──────────────────────────────────────────────────

    /// Open a draft on the chart at `index` with a new description.
    ///
    /// Replaces any draft already open.
    pub fn edit_item(&mut self, index: usize, description: impl Into<String>) -> Result<(), EditorError> {
        let slot = self.items.get(index).ok_or(MutationError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })?;
        let item = slot.item().ok_or(MutationError::ItemUnavailable(index))?;

        let mut draft = item.clone();
        draft.description = Some(description.into());
        self.item_draft = Some(ItemDraft {
            item_id: item.id.clone(),
            index,
            draft,
        });
        Ok(())
    }

    pub fn cancel_item_edit(&mut self) -> Option<ItemDraft> {
        self.item_draft.take()
    }

    /// Close the draft and return the patch addressed to that chart's id
    pub fn commit_item_edit(&mut self) -> Result<Option<ItemSubmission>, EditorError> {
        let draft = self.item_draft.take().ok_or(MutationError::NoItemDraft)?;

        let slot = self.items.get(draft.index).ok_or(MutationError::IndexOutOfRange {
            index: draft.index,
            len: self.items.len(),
        })?;
        let current = match slot.item() {
            Some(item) if item.id == draft.item_id => item,
            _ => {
                return Err(MutationError::DraftOutOfDate {
                    index: draft.index,
                    item_id: draft.item_id,
                }
                .into())
            }
        };

        let ops = self.policy.plan_item(current, &draft.draft)?;
        if ops.is_empty() {
            return Ok(None);
        }

        let ticket = self.issue_ticket();
        self.saving_items.push((ticket, draft.index));
        Ok(Some(ItemSubmission {
            ticket,
            epoch: self.epoch,
            aggregate_id: self.aggregate_id.clone(),
            item_id: draft.item_id,
            index: draft.index,
            ops,
        }))
    }

    /// Replace the chart slot with the store's record
    pub fn resolve_item(
        &mut self,
        submission: &ItemSubmission,
        result: GatewayResult<Item>,
    ) -> Result<Resolution, EditorError> {
        if !self.is_current(submission.epoch, &submission.aggregate_id) {
            return Ok(Resolution::Stale);
        }
        self.saving_items.retain(|(ticket, _)| *ticket != submission.ticket);

        let item = result.map_err(|e| EditorError::from_submission(&submission.item_id, e))?;

        match self.items.get_mut(submission.index) {
            Some(slot) if slot.id() == submission.item_id && item.id == submission.item_id => {
                *slot = ItemSlot::Loaded(item);
                Ok(Resolution::Applied)
            }
            _ => Ok(Resolution::Stale),
        }
    }
}
