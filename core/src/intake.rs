//! The public submit pipeline.
//!
//! Order of checks: rate guard, validation, duplicate guard, insert. Each
//! call fails with at most one error class and nothing is written unless
//! every check passes. Notifications are dispatched after the insert and are
//! never awaited.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::IntakeConfig;
use crate::notify::NotificationDispatcher;
use crate::rate_guard::{RateGuard, RateLimited};
use crate::store::{StoreError, SubmissionStore};
use crate::submission::SubmissionReceipt;
use crate::validation::{FieldViolation, RawSubmission, validate};

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    RateLimited(#[from] RateLimited),

    #[error("validation failed for {} field(s)", .0.len())]
    ValidationFailed(Vec<FieldViolation>),

    #[error("a submission from this email was received recently")]
    DuplicateSubmission,

    #[error("submission conflicts with an existing record")]
    Conflict,

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),
}

impl From<StoreError> for IntakeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::Conflict,
            other => Self::StorageUnavailable(other),
        }
    }
}

#[derive(Clone)]
pub struct IntakePipeline {
    store: SubmissionStore,
    guard: Arc<dyn RateGuard>,
    dispatcher: NotificationDispatcher,
    duplicate_window: chrono::Duration,
    default_source: String,
}

impl IntakePipeline {
    pub fn new(
        store: SubmissionStore,
        guard: Arc<dyn RateGuard>,
        dispatcher: NotificationDispatcher,
        cfg: &IntakeConfig,
    ) -> Self {
        Self {
            store,
            guard,
            dispatcher,
            duplicate_window: chrono::Duration::hours(i64::from(cfg.duplicate_window_hours)),
            default_source: cfg.default_source.clone(),
        }
    }

    /// Run the full pipeline at the current time.
    pub async fn submit(
        &self,
        raw: &RawSubmission,
        origin: &str,
        referer: Option<&str>,
    ) -> Result<SubmissionReceipt, IntakeError> {
        self.submit_at(raw, origin, referer, Utc::now()).await
    }

    pub async fn submit_at(
        &self,
        raw: &RawSubmission,
        origin: &str,
        referer: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, IntakeError> {
        self.admit(origin, now)?;
        self.submit_admitted(raw, referer, now).await
    }

    /// Charge one attempt to `origin` against the rate guard.
    ///
    /// Split out so callers can reject unparseable bodies after the attempt
    /// has been counted.
    pub fn admit(&self, origin: &str, now: DateTime<Utc>) -> Result<(), IntakeError> {
        self.guard.check(origin, now).map_err(|limited| {
            tracing::warn!(
                origin,
                retry_after_s = limited.retry_after.as_secs(),
                "Contact submission rate limited"
            );
            IntakeError::from(limited)
        })
    }

    /// Everything after the rate guard: validate, dedup, insert, notify.
    #[tracing::instrument(skip(self, raw), fields(submission_id))]
    pub async fn submit_admitted(
        &self,
        raw: &RawSubmission,
        referer: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, IntakeError> {
        let new = validate(raw).map_err(|violations| {
            tracing::debug!(violations = violations.len(), "Contact submission invalid");
            IntakeError::ValidationFailed(violations)
        })?;

        let since = now - self.duplicate_window;
        if let Some(existing) = self.store.find_recent_by_email(&new.email, since).await? {
            tracing::info!(
                existing_id = %existing.id,
                "Duplicate contact submission rejected"
            );
            return Err(IntakeError::DuplicateSubmission);
        }

        let source = referer
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.default_source.as_str())
            .to_string();

        let submission = self.store.create(new, source, now).await.map_err(|err| {
            tracing::error!(error = %err, "Failed to persist contact submission");
            IntakeError::from(err)
        })?;

        tracing::Span::current().record("submission_id", submission.id.as_str());
        tracing::info!(
            submission_id = %submission.id,
            source = %submission.source,
            "Contact submission accepted"
        );

        drop(self.dispatcher.dispatch(&submission));
        Ok(submission.receipt())
    }
}
