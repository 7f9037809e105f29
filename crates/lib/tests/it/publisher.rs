use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use clubhub::{
    FixedClock,
    backend::InMemoryStore,
    constants::{ANNOUNCEMENTS, EVENTS, FEEDBACK_DURATION},
    publisher::{ContentPublisher, EVENT_PUBLISHED, FeedbackKind, FormError, SubmitOutcome},
    store::{DataStore, Select},
};
use serde_json::Value;
use tokio::sync::Notify;

use crate::helpers::*;

fn fill_event(publisher: &ContentPublisher, link: &str) {
    publisher.edit_event(|form| {
        form.title = "Hack night".into();
        form.event_date = "2025-04-12T19:30".into();
        form.venue = "Lab 3".into();
        form.description = "Bring a laptop".into();
        form.registration_link = link.into();
    });
}

#[tokio::test]
async fn blank_registration_link_is_absent_from_stored_row() {
    let (backend, clock) = backend();
    let publisher = ContentPublisher::new(backend.store.clone(), clock);
    assert!(publisher.select_club("finite-loop"));
    fill_event(&publisher, "  ");

    assert_eq!(publisher.publish_event().await, SubmitOutcome::Published);

    let rows = backend.store.rows(EVENTS);
    assert_eq!(rows.len(), 1);
    let row = rows[0].as_object().unwrap();
    assert!(!row.contains_key("registration_link"));
    assert_eq!(row["club_id"], "finite-loop");
    assert_eq!(row["event_date"], "2025-04-12T19:30:00");
}

#[tokio::test]
async fn success_clears_form_and_shows_banner_for_three_seconds() {
    let (backend, clock) = backend();
    let publisher = ContentPublisher::new(backend.store.clone(), clock.clone());
    publisher.select_club("stereo");
    fill_event(&publisher, "https://forms.example/jam");

    assert!(publisher.publish_event().await.is_published());
    let snapshot = publisher.snapshot();
    assert!(snapshot.event.is_blank());
    let feedback = snapshot.feedback.unwrap();
    assert_eq!(feedback.message, EVENT_PUBLISHED);
    assert_eq!(feedback.kind, FeedbackKind::Success);
    assert_eq!(
        backend.store.rows(EVENTS)[0]["registration_link"],
        "https://forms.example/jam"
    );

    clock.advance(FEEDBACK_DURATION - Duration::from_millis(1));
    assert!(publisher.feedback().is_some());
    clock.advance(Duration::from_millis(1));
    assert!(publisher.feedback().is_none());
}

#[tokio::test]
async fn failure_keeps_form_and_reports_error() {
    let (backend, clock) = backend();
    backend.store.set_unavailable(ANNOUNCEMENTS, true);
    let publisher = ContentPublisher::new(backend.store.clone(), clock.clone());
    publisher.select_club("saca");
    publisher.edit_announcement(|form| {
        form.title = "Auditions".into();
        form.description = "Friday 5pm".into();
    });

    let outcome = publisher.publish_announcement().await;
    let SubmitOutcome::Failed(message) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(message.starts_with("Error creating announcement: "));

    let snapshot = publisher.snapshot();
    assert_eq!(snapshot.announcement.title, "Auditions");
    assert!(!snapshot.announcement_pending);
    assert_eq!(snapshot.feedback.unwrap().kind, FeedbackKind::Error);

    clock.advance(FEEDBACK_DURATION);
    assert!(publisher.feedback().is_none());
}

#[tokio::test]
async fn newer_banner_is_not_cut_short_by_older_one() {
    let (backend, clock) = backend();
    let publisher = ContentPublisher::new(backend.store.clone(), clock.clone());
    publisher.select_club("taaleem");
    fill_event(&publisher, "");
    publisher.publish_event().await;

    clock.advance(Duration::from_secs(2));
    publisher.edit_announcement(|form| {
        form.title = "Rehearsal".into();
        form.description = "Moved to Thursday".into();
    });
    publisher.publish_announcement().await;

    // Three seconds after the first banner, the second is still showing.
    clock.advance(Duration::from_secs(1));
    assert_eq!(
        publisher.feedback().map(|f| f.message),
        Some("Announcement published successfully!".to_string())
    );
    clock.advance(Duration::from_secs(2));
    assert!(publisher.feedback().is_none());
}

#[tokio::test]
async fn invalid_form_is_not_sent() {
    let (backend, clock) = backend();
    let publisher = ContentPublisher::new(backend.store.clone(), clock);
    publisher.select_club("grey-matter");
    fill_event(&publisher, "not a url");

    let outcome = publisher.publish_event().await;
    assert!(matches!(
        outcome,
        SubmitOutcome::Invalid(FormError::InvalidUrl { .. })
    ));
    assert!(backend.store.rows(EVENTS).is_empty());
    assert!(publisher.feedback().is_none());
}

#[tokio::test]
async fn nothing_is_sent_without_a_club() {
    let (backend, clock) = backend();
    let publisher = ContentPublisher::new(backend.store.clone(), clock);
    fill_event(&publisher, "");
    assert_eq!(publisher.publish_event().await, SubmitOutcome::NoClub);
    assert!(!publisher.select_club("chess"));
    assert!(publisher.selected_club().is_none());
}

/// Store whose inserts wait until released.
struct GatedStore {
    inner: InMemoryStore,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl DataStore for GatedStore {
    async fn select(&self, query: &Select) -> clubhub::Result<Vec<Value>> {
        self.inner.select(query).await
    }

    async fn insert(&self, table: &str, row: Value) -> clubhub::Result<()> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.insert(table, row).await
    }
}

#[tokio::test]
async fn concurrent_submission_of_the_same_form_is_refused() {
    let store = Arc::new(GatedStore {
        inner: InMemoryStore::new(),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let publisher = ContentPublisher::new(store.clone(), Arc::new(FixedClock::default()));
    publisher.select_club("finite-loop");
    fill_event(&publisher, "");
    publisher.edit_announcement(|form| {
        form.title = "Also".into();
        form.description = "independent".into();
    });

    let first = tokio::spawn({
        let publisher = publisher.clone();
        async move { publisher.publish_event().await }
    });
    tokio::time::timeout(SETTLE_TIMEOUT, store.entered.notified())
        .await
        .unwrap();

    assert!(publisher.is_event_pending());
    assert_eq!(publisher.publish_event().await, SubmitOutcome::Busy);

    // The other form is not blocked by the pending one.
    let second = tokio::spawn({
        let publisher = publisher.clone();
        async move { publisher.publish_announcement().await }
    });
    tokio::time::timeout(SETTLE_TIMEOUT, store.entered.notified())
        .await
        .unwrap();
    assert!(publisher.is_announcement_pending());

    store.release.notify_one();
    store.release.notify_one();
    assert!(first.await.unwrap().is_published());
    assert!(second.await.unwrap().is_published());
    assert!(!publisher.is_event_pending());
    assert_eq!(store.inner.rows(EVENTS).len(), 1);
    assert_eq!(store.inner.rows(ANNOUNCEMENTS).len(), 1);
}
