//! End-to-end member channel lifecycle: join, sweep, inactivity archival and
//! departure.

mod helpers;

use chrono::{Duration, Utc};

use statuswatch_core::events::PlatformEvent;
use statuswatch_core::types::UserId;

use helpers::{ACTIVE, ARCHIVE, TestWatcher, human};

const ADA: UserId = UserId::new(20);
const GRACE: UserId = UserId::new(21);

#[tokio::test]
async fn test_first_ready_provisions_existing_members() {
    let w = TestWatcher::new().await;
    w.platform.add_member(human(ADA, "Ada"));
    w.platform.add_member(human(GRACE, "Grace Hopper"));

    w.event_loop.handle(PlatformEvent::Ready).await;
    w.event_loop.handle(PlatformEvent::Ready).await;

    let mut names: Vec<_> = w
        .platform
        .resources_in(ACTIVE)
        .into_iter()
        .map(|r| r.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["ada", "grace-hopper"]);
    assert_eq!(w.platform.create_calls(), 2);
    assert_eq!(w.provisioner.creations().count_recent(Utc::now()), 2);
}

#[tokio::test]
async fn test_joining_member_gets_a_channel() {
    let w = TestWatcher::new().await;
    w.platform.add_member(human(ADA, "Ada"));

    w.event_loop
        .handle(PlatformEvent::MemberJoined { member: ADA })
        .await;
    w.event_loop
        .handle(PlatformEvent::MemberJoined { member: ADA })
        .await;

    let resources = w.platform.resources_in(ACTIVE);
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].owner, Some(ADA));
}

#[tokio::test]
async fn test_inactive_channel_is_archived_and_not_recreated() {
    let w = TestWatcher::new().await;
    w.platform.add_member(human(ADA, "Ada"));
    w.platform.add_member(human(GRACE, "Grace"));
    w.provisioner.sweep().await.unwrap();

    let ada_channel = w
        .platform
        .resources_in(ACTIVE)
        .into_iter()
        .find(|r| r.owner == Some(ADA))
        .unwrap()
        .id;
    let now = Utc::now();
    w.platform
        .set_last_activity(ada_channel, now - Duration::days(30));

    let report = w.sweeper.sweep_at(now).await.unwrap();
    assert_eq!(report.archived, 1);
    assert_eq!(report.kept, 1);
    assert_eq!(w.platform.resources_in(ARCHIVE)[0].id, ada_channel);

    // Archived channels no longer count as owned in the active container, so
    // the next sweep gives the member a fresh one.
    let sweep = w.provisioner.sweep().await.unwrap();
    assert_eq!(sweep.created, 1);
    assert_eq!(w.platform.resources_in(ACTIVE).len(), 2);
}

#[tokio::test]
async fn test_departing_member_channel_is_archived() {
    let w = TestWatcher::new().await;
    w.platform.add_member(human(ADA, "Ada"));
    w.platform.add_member(human(GRACE, "Grace"));
    w.provisioner.sweep().await.unwrap();

    w.platform.remove_member(ADA);
    w.event_loop
        .handle(PlatformEvent::MemberRemoved { member: ADA })
        .await;

    let active = w.platform.resources_in(ACTIVE);
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].owner, Some(GRACE));
    let archived = w.platform.resources_in(ARCHIVE);
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].owner, Some(ADA));
}
