//! # Follow State
//!
//! The follower set plus the per-request toggle state machine.
//!
//! ```text
//! Idle ──toggle──▶ Pending ──ok────▶ Committed
//!                     │
//!                     └───error──▶ Reverted (flag and count restored)
//! ```
//!
//! The flag and count flip before the remote call resolves. Only one toggle
//! may be in flight at a time.

use crate::session::{Epoch, Ticket};
use std::collections::BTreeSet;

/// Followers of the aggregate with cached flag and count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowerSet {
    members: BTreeSet<String>,
    following: bool,
    count: usize,
}

impl FollowerSet {
    pub fn new<'a>(members: impl IntoIterator<Item = &'a str>, current_user: &str) -> Self {
        let mut set = Self {
            members: members.into_iter().map(str::to_string).collect(),
            following: false,
            count: 0,
        };
        set.recompute(current_user);
        set
    }

    pub fn is_following(&self) -> bool {
        self.following
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.members.contains(user_id)
    }

    /// Add or remove `user_id` and refresh the caches
    pub fn set_following(&mut self, user_id: &str, follow: bool) {
        if follow {
            self.members.insert(user_id.to_string());
        } else {
            self.members.remove(user_id);
        }
        self.recompute(user_id);
    }

    fn recompute(&mut self, current_user: &str) {
        self.following = self.members.contains(current_user);
        self.count = self.members.len();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowPhase {
    Idle,
    Pending,
    Committed,
    Reverted,
}

/// A follow or unfollow waiting on the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowRequest {
    pub ticket: Ticket,
    pub epoch: Epoch,
    pub aggregate_id: String,
    pub user_id: String,

    /// true = add follower, false = remove
    pub follow: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct FollowToggle {
    phase: FollowPhase,
    in_flight: Option<FollowRequest>,
}

impl FollowToggle {
    pub(crate) fn new() -> Self {
        Self {
            phase: FollowPhase::Idle,
            in_flight: None,
        }
    }

    pub(crate) fn phase(&self) -> FollowPhase {
        self.phase
    }

    pub(crate) fn in_flight(&self) -> Option<&FollowRequest> {
        self.in_flight.as_ref()
    }

    pub(crate) fn begin(&mut self, request: FollowRequest) {
        self.phase = FollowPhase::Pending;
        self.in_flight = Some(request);
    }

    /// Close the request matching `ticket`; `None` if it is not the one in flight
    pub(crate) fn finish(&mut self, ticket: Ticket, succeeded: bool) -> Option<FollowRequest> {
        if self.in_flight.as_ref().map(|r| r.ticket) != Some(ticket) {
            return None;
        }
        self.phase = if succeeded {
            FollowPhase::Committed
        } else {
            FollowPhase::Reverted
        };
        self.in_flight.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_flag_and_count() {
        let set = FollowerSet::new(["u1", "u2"], "u1");
        assert!(set.is_following());
        assert_eq!(set.count(), 2);

        let set = FollowerSet::new(["u1", "u2"], "u3");
        assert!(!set.is_following());
        assert_eq!(set.count(), 2);
    }

    #[test]
    fn test_set_following_is_idempotent() {
        let mut set = FollowerSet::new(["u1"], "u2");
        set.set_following("u2", true);
        set.set_following("u2", true);
        assert!(set.is_following());
        assert_eq!(set.count(), 2);

        set.set_following("u2", false);
        assert!(!set.is_following());
        assert_eq!(set.count(), 1);
    }

    #[test]
    fn test_toggle_phases() {
        let mut toggle = FollowToggle::new();
        assert_eq!(toggle.phase(), FollowPhase::Idle);

        let request = FollowRequest {
            ticket: Ticket(1),
            epoch: Epoch(0),
            aggregate_id: "d1".into(),
            user_id: "u1".into(),
            follow: true,
        };
        toggle.begin(request.clone());
        assert_eq!(toggle.phase(), FollowPhase::Pending);

        assert!(toggle.finish(Ticket(2), true).is_none());
        assert_eq!(toggle.finish(Ticket(1), false), Some(request));
        assert_eq!(toggle.phase(), FollowPhase::Reverted);
        assert!(toggle.in_flight().is_none());
    }
}
