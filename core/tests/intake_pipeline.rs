//! End-to-end behaviour of the submit pipeline against an on-disk store.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use scoreazy_core::config::{DatabaseConfig, IntakeConfig, NotificationConfig};
use scoreazy_core::intake::{IntakeError, IntakePipeline};
use scoreazy_core::notify::{
    MemoryNotifier, MessageKind, NotificationDispatcher, Notifier, NotifyError, OutboundMessage,
};
use scoreazy_core::rate_guard::SlidingWindowGuard;
use scoreazy_core::store::SubmissionStore;
use scoreazy_core::validation::{Field, RawSubmission};
use scoreazy_core::SubmissionStatus;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 9, 0, 0).unwrap()
}

fn jane() -> RawSubmission {
    RawSubmission {
        name: "Jane Doe".to_string(),
        email: "Jane@Ex.com".to_string(),
        phone: "+911234567890".to_string(),
        message: "I need help with math.".to_string(),
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: SubmissionStore,
    pipeline: IntakePipeline,
    notifier: Arc<MemoryNotifier>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = SubmissionStore::open(&dir.path().join("contacts.db"), &DatabaseConfig::default())
        .unwrap();
    let notifier = Arc::new(MemoryNotifier::new());
    let dispatcher = NotificationDispatcher::new(notifier.clone(), NotificationConfig::default());
    let guard = Arc::new(SlidingWindowGuard::new(5, Duration::from_secs(15 * 60)));
    let pipeline = IntakePipeline::new(store.clone(), guard, dispatcher, &IntakeConfig::default());
    Fixture {
        _dir: dir,
        store,
        pipeline,
        notifier,
    }
}

#[tokio::test]
async fn valid_submission_is_retrievable_immediately() {
    let fx = fixture();
    let receipt = fx
        .pipeline
        .submit_at(&jane(), "203.0.113.7", Some("https://scoreazy.com/contact"), t0())
        .await
        .unwrap();

    let stored = fx.store.get(&receipt.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::New);
    assert_eq!(stored.email, "jane@ex.com");
    assert_eq!(stored.name, "Jane Doe");
    assert_eq!(stored.source, "https://scoreazy.com/contact");
    assert_eq!(stored.created_at, stored.updated_at);
}

#[tokio::test]
async fn each_field_violation_is_reported_alone() {
    let fx = fixture();
    let cases = [
        (
            RawSubmission {
                name: "J".to_string(),
                ..jane()
            },
            Field::Name,
        ),
        (
            RawSubmission {
                email: "jane.example.com".to_string(),
                ..jane()
            },
            Field::Email,
        ),
        (
            RawSubmission {
                phone: "0000".to_string(),
                ..jane()
            },
            Field::Phone,
        ),
        (
            RawSubmission {
                message: "hi".to_string(),
                ..jane()
            },
            Field::Message,
        ),
    ];

    for (i, (raw, field)) in cases.into_iter().enumerate() {
        let origin = format!("198.51.100.{i}");
        let err = fx
            .pipeline
            .submit_at(&raw, &origin, None, t0())
            .await
            .unwrap_err();
        match err {
            IntakeError::ValidationFailed(violations) => {
                let fields: Vec<_> = violations.iter().map(|v| v.field).collect();
                assert_eq!(fields, vec![field]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    assert_eq!(fx.store.status_summary(t0()).await.unwrap().total, 0);
}

#[tokio::test]
async fn same_email_is_blocked_for_a_day() {
    let fx = fixture();
    fx.pipeline
        .submit_at(&jane(), "203.0.113.7", None, t0())
        .await
        .unwrap();

    let err = fx
        .pipeline
        .submit_at(&jane(), "203.0.113.8", None, t0() + chrono::Duration::hours(12))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::DuplicateSubmission));

    let after_window = t0() + chrono::Duration::hours(24) + chrono::Duration::seconds(1);
    fx.pipeline
        .submit_at(&jane(), "203.0.113.8", None, after_window)
        .await
        .unwrap();
    assert_eq!(fx.store.status_summary(t0()).await.unwrap().total, 2);
}

#[tokio::test]
async fn sixth_attempt_from_one_origin_is_rate_limited() {
    let fx = fixture();
    for i in 0..5 {
        let raw = RawSubmission {
            email: format!("student{i}@ex.com"),
            ..jane()
        };
        fx.pipeline
            .submit_at(&raw, "203.0.113.7", None, t0() + chrono::Duration::minutes(i))
            .await
            .unwrap();
    }

    let raw = RawSubmission {
        email: "student5@ex.com".to_string(),
        ..jane()
    };
    let err = fx
        .pipeline
        .submit_at(&raw, "203.0.113.7", None, t0() + chrono::Duration::minutes(14))
        .await
        .unwrap_err();
    let IntakeError::RateLimited(limited) = err else {
        panic!("expected rate limit, got {err:?}");
    };
    assert_eq!(limited.retry_after, Duration::from_secs(60));

    // Another origin is unaffected.
    fx.pipeline
        .submit_at(&raw, "203.0.113.99", None, t0() + chrono::Duration::minutes(14))
        .await
        .unwrap();
}

#[tokio::test]
async fn notifications_are_sent_without_blocking() {
    let fx = fixture();
    fx.pipeline
        .submit_at(&jane(), "203.0.113.7", None, t0())
        .await
        .unwrap();

    let mut delivered = Vec::new();
    for _ in 0..200 {
        delivered = fx.notifier.messages();
        if delivered.len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(delivered.len(), 2);
    let welcome = delivered
        .iter()
        .find(|m| m.kind == MessageKind::Welcome)
        .unwrap();
    assert_eq!(welcome.to, "jane@ex.com");
}

/// Relay that is always down.
#[derive(Default)]
struct DownRelay {
    attempts: AtomicUsize,
}

#[async_trait]
impl Notifier for DownRelay {
    async fn deliver(&self, _message: &OutboundMessage) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotifyError::Transport("connection refused".to_string()))
    }
}

#[tokio::test]
async fn failed_notifications_leave_the_submission_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = SubmissionStore::open(&dir.path().join("contacts.db"), &DatabaseConfig::default())
        .unwrap();
    let relay = Arc::new(DownRelay::default());
    let mut notifications = NotificationConfig::default();
    notifications.retry.max_attempts = 2;
    notifications.retry.initial_backoff_ms = 1;
    notifications.retry.max_backoff_ms = 2;
    let dispatcher = NotificationDispatcher::new(relay.clone(), notifications);
    let guard = Arc::new(SlidingWindowGuard::new(5, Duration::from_secs(15 * 60)));
    let pipeline = IntakePipeline::new(store.clone(), guard, dispatcher, &IntakeConfig::default());

    let receipt = pipeline
        .submit(&jane(), "203.0.113.7", Some("   "))
        .await
        .unwrap();

    // Two messages, two attempts each.
    for _ in 0..200 {
        if relay.attempts.load(Ordering::SeqCst) == 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(relay.attempts.load(Ordering::SeqCst), 4);

    let stored = store.get(&receipt.id).await.unwrap().unwrap();
    assert_eq!(stored.status, SubmissionStatus::New);
    assert_eq!(stored.email, "jane@ex.com");
    assert_eq!(stored.source, "website");
}
