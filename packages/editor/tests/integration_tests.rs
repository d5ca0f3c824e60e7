//! Integration tests for editor crate

use dashsync_common::{
    Aggregate, EntityRef, GatewayCall, InMemoryGateway, Item, SyncConfig, SyncGateway, TagLabel,
};
use dashsync_editor::{
    EditSession, EditorError, Epoch, FollowPhase, ItemSlot, MutationError, NavigationTrail,
    Reconciler, Resolution,
};
use dashsync_patch::Operation;
use serde_json::json;

fn dashboard() -> Aggregate {
    let mut aggregate = Aggregate::new("d1", "sales");
    aggregate.description = Some("Revenue by region".into());
    aggregate.owner = Some(EntityRef::new("u1", "user").with_name("alice"));
    aggregate.tags = Some(vec![TagLabel::manual("Tier.Tier2")]);
    aggregate.followers = Some(vec![EntityRef::new("u2", "user")]);
    aggregate.charts = Some(vec![
        EntityRef::new("c0", "chart"),
        EntityRef::new("c1", "chart"),
        EntityRef::new("c2", "chart"),
    ]);
    aggregate.version = Some(0.1);
    aggregate
}

fn charts() -> Vec<Item> {
    ["c0", "c1", "c2"]
        .iter()
        .map(|id| {
            let mut item = Item::new(*id, format!("chart {}", id));
            item.description = Some(format!("about {}", id));
            item.version = Some(0.1);
            item
        })
        .collect()
}

fn gateway_with(aggregate: Aggregate) -> InMemoryGateway {
    let gateway = InMemoryGateway::new();
    gateway.insert_aggregate(aggregate);
    for item in charts() {
        gateway.insert_item(item);
    }
    gateway
}

fn session_for(aggregate: Aggregate, config: &SyncConfig) -> EditSession {
    let items = charts().into_iter().map(ItemSlot::Loaded).collect();
    EditSession::new(Epoch(1), aggregate, items, NavigationTrail::default(), config)
}

#[tokio::test]
async fn test_description_edit_round_trip() {
    let gateway = gateway_with(dashboard());
    let mut session = session_for(dashboard(), &SyncConfig::for_user("u1"));
    let reconciler = Reconciler::new(&gateway);

    let resolution = reconciler
        .edit_description(&mut session, "Quarterly revenue")
        .await
        .unwrap();

    assert_eq!(resolution, Resolution::Applied);
    assert_eq!(session.view().description, "Quarterly revenue");
    assert_eq!(session.baseline().version, Some(0.2));
    assert_eq!(
        gateway.calls(),
        vec![GatewayCall::SubmitAggregatePatch {
            id: "d1".into(),
            ops: vec![Operation::replace(
                "/description".parse().unwrap(),
                json!("Quarterly revenue")
            )],
        }]
    );
}

#[tokio::test]
async fn test_owner_and_tier_without_arguments_never_reaches_gateway() {
    let gateway = gateway_with(dashboard());
    let mut session = session_for(dashboard(), &SyncConfig::for_user("u1"));

    let result = Reconciler::new(&gateway)
        .set_owner_and_tier(&mut session, None, None)
        .await;

    assert_eq!(
        result,
        Err(EditorError::InvalidMutationArgs(MutationError::OwnerOrTierRequired))
    );
    assert!(gateway.calls().is_empty());
    assert_eq!(session.pending_count(), 0);
}

#[tokio::test]
async fn test_tier_replaces_previous_tier() {
    let gateway = gateway_with(dashboard());
    let mut session = session_for(dashboard(), &SyncConfig::for_user("u1"));

    Reconciler::new(&gateway)
        .set_owner_and_tier(&mut session, None, Some("Tier.Tier1".into()))
        .await
        .unwrap();

    let view = session.view();
    assert_eq!(view.tier.as_deref(), Some("Tier.Tier1"));
    assert_eq!(view.tier_label.as_deref(), Some("Tier1"));
    assert!(view.tags.is_empty());
    assert_eq!(gateway.aggregate("d1").unwrap().tags(), &[TagLabel::manual("Tier.Tier1")]);
}

#[tokio::test]
async fn test_set_tags_keeps_custom_namespace_tier() {
    let mut config = SyncConfig::for_user("u1");
    config.tier_namespace = "PII".into();

    let mut aggregate = dashboard();
    aggregate.tags = Some(vec![TagLabel::manual("PII.Sensitive")]);
    let gateway = gateway_with(aggregate.clone());
    let mut session = session_for(aggregate, &config);

    Reconciler::new(&gateway)
        .set_tags(&mut session, vec!["Marketing.Campaign".into()])
        .await
        .unwrap();

    let view = session.view();
    assert_eq!(view.tags, vec![TagLabel::manual("Marketing.Campaign")]);
    assert_eq!(view.tier.as_deref(), Some("PII.Sensitive"));
}

#[tokio::test]
async fn test_double_toggle_restores_follow_state() {
    let gateway = gateway_with(dashboard());
    let mut session = session_for(dashboard(), &SyncConfig::for_user("u3"));
    let reconciler = Reconciler::new(&gateway);
    let before = session.view();
    assert!(!before.is_following);

    reconciler.toggle_follow(&mut session).await.unwrap();
    assert!(session.view().is_following);
    assert_eq!(session.view().follower_count, before.follower_count + 1);

    reconciler.toggle_follow(&mut session).await.unwrap();
    let after = session.view();
    assert!(!after.is_following);
    assert_eq!(after.follower_count, before.follower_count);
    assert_eq!(session.follow_phase(), FollowPhase::Committed);
}

#[tokio::test]
async fn test_failed_follow_is_reverted() {
    let gateway = gateway_with(dashboard());
    gateway.fail_follows(true);
    let mut session = session_for(dashboard(), &SyncConfig::for_user("u3"));

    let result = Reconciler::new(&gateway).toggle_follow(&mut session).await;

    assert!(matches!(result, Err(EditorError::Gateway(_))));
    assert_eq!(session.follow_phase(), FollowPhase::Reverted);
    assert!(!session.view().is_following);
    assert_eq!(session.view().follower_count, 1);
}

#[test]
fn test_followers_derive_flag_and_count() {
    let mut aggregate = dashboard();
    aggregate.followers = Some(vec![EntityRef::new("u1", "user"), EntityRef::new("u2", "user")]);
    let session = session_for(aggregate, &SyncConfig::for_user("u1"));

    let view = session.view();
    assert!(view.is_following);
    assert_eq!(view.follower_count, 2);
}

#[tokio::test]
async fn test_item_edit_is_addressed_to_one_chart() {
    let gateway = gateway_with(dashboard());
    let mut session = session_for(dashboard(), &SyncConfig::for_user("u1"));

    session.edit_item(1, "new desc").unwrap();
    assert!(session.view().items[1].editing);

    let resolution = Reconciler::new(&gateway)
        .commit_item_edit(&mut session)
        .await
        .unwrap();
    assert_eq!(resolution, Resolution::Applied);

    assert_eq!(
        gateway.calls(),
        vec![GatewayCall::SubmitItemPatch {
            id: "c1".into(),
            ops: vec![Operation::replace("/description".parse().unwrap(), json!("new desc"))],
        }]
    );

    let descriptions: Vec<_> = session
        .items()
        .iter()
        .map(|slot| slot.item().and_then(|item| item.description.clone()))
        .collect();
    assert_eq!(
        descriptions,
        vec![
            Some("about c0".to_string()),
            Some("new desc".to_string()),
            Some("about c2".to_string()),
        ]
    );
    assert!(session.item_draft().is_none());
    assert!(!session.view().items[1].saving);
}

#[tokio::test]
async fn test_rejected_patch_leaves_working_copy_on_baseline() {
    let gateway = gateway_with(dashboard());
    gateway.reject_patches(Some("validation failed"));
    let mut session = session_for(dashboard(), &SyncConfig::for_user("u1"));

    let result = Reconciler::new(&gateway)
        .edit_description(&mut session, "rejected text")
        .await;

    assert_eq!(
        result,
        Err(EditorError::PatchRejected {
            target: "d1".into(),
            reason: "validation failed".into(),
        })
    );
    assert_eq!(session.view().description, "Revenue by region");
    assert_eq!(session.working(), session.baseline());
}

#[tokio::test]
async fn test_interleaved_submissions_last_response_wins() {
    let gateway = gateway_with(dashboard());
    let mut session = session_for(dashboard(), &SyncConfig::for_user("u1"));
    let reconciler = Reconciler::new(&gateway);

    let description = session.edit_description("first").unwrap().unwrap();
    let tags = session.set_tags(["Ops.Daily"]).unwrap().unwrap();

    let tags_result = reconciler.send(&tags).await;
    let description_result = reconciler.send(&description).await;

    session.resolve_patch(&tags, tags_result).unwrap();
    session.resolve_patch(&description, description_result).unwrap();

    // Both patches touched disjoint fields, so the last record carries both
    let view = session.view();
    assert_eq!(view.description, "first");
    assert_eq!(view.tags, vec![TagLabel::manual("Ops.Daily")]);
    assert_eq!(session.pending_count(), 0);
}

#[tokio::test]
async fn test_revert_during_edit_reaches_store() {
    let gateway = gateway_with(dashboard());
    let mut session = session_for(dashboard(), &SyncConfig::for_user("u1"));
    let reconciler = Reconciler::new(&gateway);

    let edit = session.edit_description("Draft text").unwrap().unwrap();
    assert_eq!(session.edit_description("Revenue by region"), Ok(None));
    assert_eq!(session.view().description, "Revenue by region");

    let result = reconciler.send(&edit).await;
    assert_eq!(session.resolve_patch(&edit, result), Ok(Resolution::Applied));
    assert_eq!(reconciler.flush(&mut session).await, Ok(1));

    let stored = gateway.aggregate("d1").unwrap();
    assert_eq!(stored.description.as_deref(), Some("Revenue by region"));
    assert_eq!(session.view().description, "Revenue by region");
    assert_eq!(session.pending_count(), 0);
    assert_eq!(session.working(), session.baseline());
}

#[tokio::test]
async fn test_version_guard_rejects_stale_baseline() {
    let gateway = gateway_with(dashboard());
    let mut config = SyncConfig::for_user("u1");
    config.guard_version = true;
    let mut session = session_for(dashboard(), &config);

    // Someone else edits the dashboard after our load
    gateway.update_aggregate("d1", |aggregate| {
        aggregate.display_name = Some("Sales (shared)".into());
        aggregate.version = Some(0.2);
    });

    let result = Reconciler::new(&gateway)
        .edit_description(&mut session, "mine")
        .await;

    assert!(matches!(result, Err(EditorError::PatchRejected { .. })));
    assert_eq!(
        gateway.aggregate("d1").unwrap().description.as_deref(),
        Some("Revenue by region")
    );
}

#[tokio::test]
async fn test_response_for_previous_session_is_ignored() {
    let gateway = gateway_with(dashboard());
    let config = SyncConfig::for_user("u1");
    let mut old = session_for(dashboard(), &config);
    let submission = old.edit_description("from old session").unwrap().unwrap();
    let result = gateway.submit_aggregate_patch("d1", &submission.ops).await;

    let mut current = EditSession::new(
        Epoch(2),
        gateway.aggregate("d1").unwrap(),
        vec![],
        NavigationTrail::default(),
        &config,
    );
    let before = current.view();

    assert_eq!(current.resolve_patch(&submission, result), Ok(Resolution::Stale));
    assert_eq!(current.view(), before);
}
