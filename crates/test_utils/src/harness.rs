//! In-memory service harness
//!
//! Wires a [`GopService`] to the mock ports with the fixture directory
//! seeded, and keeps handles on every mock so tests can inspect side effects.

use std::sync::Arc;

use core_kernel::UserId;
use domain_gop::{GopService, GuaranteeOfPayment, InMemoryGopStore};
use domain_messaging::{
    Email, InMemoryChatStore, InMemoryNotificationStore, Notification, Notifier, PushHub, RecordingMailSender,
};
use domain_party::InMemoryDirectory;

use crate::builders::GopDraftBuilder;
use crate::fixtures::{seed_directory, UserFixtures, DIAGNOSIS_CODES};

/// Base URL used in email links
pub const TEST_BASE_URL: &str = "https://gop.test";

/// A service over in-memory ports
pub struct TestHarness {
    pub service: GopService,
    pub directory: Arc<InMemoryDirectory>,
    pub gops: Arc<InMemoryGopStore>,
    pub notifications: Arc<InMemoryNotificationStore>,
    pub mail: Arc<RecordingMailSender>,
    pub push: Arc<PushHub>,
    pub chats: Arc<InMemoryChatStore>,
}

impl TestHarness {
    /// Harness with a working mail sender
    pub async fn new() -> Self {
        Self::with_mail(RecordingMailSender::new()).await
    }

    /// Harness whose mail sender fails every send
    pub async fn with_failing_mail() -> Self {
        Self::with_mail(RecordingMailSender::failing()).await
    }

    async fn with_mail(mail: RecordingMailSender) -> Self {
        let directory = Arc::new(InMemoryDirectory::new());
        seed_directory(&directory).await;

        let gops = Arc::new(InMemoryGopStore::new(directory.clone()).with_diagnosis_codes(DIAGNOSIS_CODES).await);
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let mail = Arc::new(mail);
        let push = Arc::new(PushHub::new());
        let chats = Arc::new(InMemoryChatStore::new());

        let notifier = Notifier::new(notifications.clone(), push.clone(), mail.clone());
        let service = GopService::new(gops.clone(), directory.clone(), chats.clone(), notifier, TEST_BASE_URL);

        Self {
            service,
            directory,
            gops,
            notifications,
            mail,
            push,
            chats,
        }
    }

    /// Submits the default tenant A draft as provider A
    pub async fn submit_default(&self) -> GuaranteeOfPayment {
        self.service
            .create(&UserFixtures::provider_a(), GopDraftBuilder::new().build())
            .await
            .expect("default draft is accepted")
    }

    /// Queued notifications for a user, without consuming them
    pub async fn notifications_for(&self, user: UserId) -> Vec<Notification> {
        self.notifications.pending_for(user).await
    }

    pub async fn sent_mail(&self) -> Vec<Email> {
        self.mail.sent().await
    }
}
