//! PostgreSQL adapter tests
//!
//! Each test runs the GOP service against a fresh seeded container, so they
//! are ignored by default. Run with `cargo test -p infra_db -- --ignored`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use core_kernel::{AdapterHealth, HealthCheckable};
use domain_gop::{GopPort, GopService, GopStatus, GuaranteeOfPayment, ListingParams};
use domain_messaging::{Notifier, PushHub, RecordingMailSender};
use domain_party::DirectoryPort;
use infra_db::{PostgresDirectoryAdapter, PostgresGopAdapter, PostgresMessagingAdapter};
use test_utils::{db_test, DecisionBuilder, GopDraftBuilder, Ids, UserFixtures, TEST_BASE_URL};

fn service(pool: &PgPool) -> (GopService, Arc<PostgresGopAdapter>) {
    let gops = Arc::new(PostgresGopAdapter::new(pool.clone()));
    let messaging = Arc::new(PostgresMessagingAdapter::new(pool.clone()));
    let notifier = Notifier::new(
        messaging.clone(),
        Arc::new(PushHub::new()),
        Arc::new(RecordingMailSender::new()),
    );
    let service = GopService::new(
        gops.clone(),
        Arc::new(PostgresDirectoryAdapter::new(pool.clone())),
        messaging,
        notifier,
        TEST_BASE_URL,
    );
    (service, gops)
}

/// Postgres keeps microseconds; the service hands back nanoseconds
fn same_instant(stored: DateTime<Utc>, returned: DateTime<Utc>) -> bool {
    (stored - returned).num_microseconds().is_some_and(|delta| delta.abs() <= 1)
}

/// Reloads the request and checks every mutable column survived the save
async fn assert_stored(gops: &PostgresGopAdapter, returned: &GuaranteeOfPayment) {
    let stored = gops.get(returned.id).await.unwrap();

    assert_eq!(stored.content, returned.content);
    assert_eq!(stored.status, returned.status);
    assert_eq!(stored.closed, returned.closed);
    assert_eq!(stored.is_final, returned.is_final);
    assert_eq!(stored.reason_decline, returned.reason_decline);
    assert_eq!(stored.reason_close, returned.reason_close);
    assert_eq!(stored.stamp_author, returned.stamp_author);
    assert!(
        same_instant(stored.created_at, returned.created_at),
        "created_at {} stored as {}",
        returned.created_at,
        stored.created_at
    );
    match (stored.edited_at, returned.edited_at) {
        (Some(stored_at), Some(returned_at)) => assert!(same_instant(stored_at, returned_at)),
        (stored_at, returned_at) => assert_eq!(stored_at, returned_at),
    }
}

db_test!(test_adapters_report_healthy, |pool| {
    let gops = PostgresGopAdapter::new(pool.clone());
    let directory = PostgresDirectoryAdapter::new(pool);
    assert_eq!(gops.health_check().await.status, AdapterHealth::Healthy);
    assert_eq!(directory.health_check().await.status, AdapterHealth::Healthy);
});

db_test!(test_seeded_accounts_resolve_to_actors, |pool| {
    let directory = PostgresDirectoryAdapter::new(pool);
    let user = directory.get_user(Ids::PAYER_A_USER).await.unwrap();
    assert_eq!(user.actor().payer_id(), Some(Ids::PAYER_A));
});

db_test!(test_review_and_decision_persist, |pool| {
    let (service, gops) = service(&pool);
    let gop = service
        .create(&UserFixtures::provider_a(), GopDraftBuilder::new().build())
        .await
        .unwrap();

    service.view(&UserFixtures::payer_a(), gop.id).await.unwrap();
    assert_eq!(gops.get(gop.id).await.unwrap().status, GopStatus::InReview);

    service
        .decide(&UserFixtures::payer_a(), gop.id, DecisionBuilder::approve().build())
        .await
        .unwrap();
    let stored = gops.get(gop.id).await.unwrap();
    assert_eq!(stored.status, GopStatus::Approved);
    assert_eq!(stored.stamp_author.as_deref(), Some("Dr. Reviewer"));
    assert!(stored.edited_at.is_some());
});

db_test!(test_listing_scope_and_counts, |pool| {
    let (service, _) = service(&pool);
    for _ in 0..3 {
        service
            .create(&UserFixtures::provider_a(), GopDraftBuilder::new().build())
            .await
            .unwrap();
    }

    let own = service
        .list(&UserFixtures::payer_a(), ListingParams::default())
        .await
        .unwrap();
    assert_eq!(own.page.total, 3);
    assert_eq!(own.counts.pending, 3);

    let foreign = service
        .list(&UserFixtures::provider_b(), ListingParams::default())
        .await
        .unwrap();
    assert_eq!(foreign.page.total, 0);

    let history = service
        .history(&UserFixtures::admin(), ListingParams::default())
        .await
        .unwrap();
    assert!(history.page.items.is_empty());
});

db_test!(test_notifications_are_consumed_once, |pool| {
    let (service, _) = service(&pool);
    let gop = service
        .create(&UserFixtures::provider_a(), GopDraftBuilder::new().build())
        .await
        .unwrap();
    let payer = UserFixtures::payer_a();

    let next = service.check_notification(&payer).await.unwrap().unwrap();
    assert!(next.message.contains(&format!("#{}", gop.id.value())));
    assert!(service.check_notification(&payer).await.unwrap().is_none());
});

db_test!(test_chat_room_is_created_once, |pool| {
    let (service, _) = service(&pool);
    let gop = service
        .create(&UserFixtures::provider_a(), GopDraftBuilder::new().build())
        .await
        .unwrap();

    let first = service.chat_session(&UserFixtures::payer_a(), gop.id).await.unwrap();
    let second = service.chat_session(&UserFixtures::provider_a(), gop.id).await.unwrap();
    assert_eq!(first.chat.id, second.chat.id);
});

db_test!(test_every_transition_round_trips, |pool| {
    let (service, gops) = service(&pool);
    let provider = UserFixtures::provider_a();
    let payer = UserFixtures::payer_a();
    let gop = service
        .create(&provider, GopDraftBuilder::new().build())
        .await
        .unwrap();
    assert_stored(&gops, &gop).await;

    let decided = service
        .decide(&payer, gop.id, DecisionBuilder::approve().build())
        .await
        .unwrap();
    assert_stored(&gops, &decided).await;

    let edited = service
        .edit(&provider, gop.id, GopDraftBuilder::new().quotation("2,000").patch(), false)
        .await
        .unwrap();
    assert_eq!(edited.status, GopStatus::Pending);
    assert_stored(&gops, &edited).await;

    let resent = service.resend(&provider, gop.id).await.unwrap();
    assert!(resent.created_at > gop.created_at);
    assert!(resent.edited_at.is_none());
    assert_stored(&gops, &resent).await;

    let finalised = service
        .edit(&provider, gop.id, GopDraftBuilder::new().patch(), true)
        .await
        .unwrap();
    assert!(finalised.is_final);
    assert_stored(&gops, &finalised).await;

    let closed = service.close(&provider, gop.id, "resolved").await.unwrap();
    assert!(closed.closed);
    assert_eq!(closed.reason_close.as_deref(), Some("resolved"));
    assert_stored(&gops, &closed).await;
});
