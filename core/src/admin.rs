//! Admin triage operations over the submission store.
//!
//! Query parameters arrive as loosely-typed strings from the admin UI.
//! Unknown statuses, sort fields and unparseable dates are ignored rather
//! than rejected; only [`AdminService::set_status`] treats a bad status as an
//! error.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::export::render_csv;
use crate::store::{
    PageRequest, Pagination, SortDirection, SortField, StatusSummary, StoreError, SubmissionQuery,
    SubmissionStore,
};
use crate::submission::{Submission, SubmissionBrief, SubmissionPatch, SubmissionStatus};
use crate::validation::{
    FieldViolation, validate_email, validate_message, validate_name, validate_phone,
};

/// Window for the `recent` count in summaries.
const RECENT_DAYS: i64 = 30;
const DASHBOARD_RECENT: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("contact not found")]
    NotFound,

    #[error("validation failed for {} field(s)", .0.len())]
    ValidationFailed(Vec<FieldViolation>),

    #[error("invalid status value")]
    InvalidStatus,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// `GET /admin/contacts` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ListQuery {
    /// Resolve into a store query and a clamped page request.
    pub fn resolve(&self, default_limit: u32) -> (SubmissionQuery, PageRequest) {
        let page = parse_u32(self.page.as_deref()).unwrap_or(1);
        let limit = parse_u32(self.limit.as_deref()).unwrap_or(default_limit);
        let query = SubmissionQuery {
            status: self.status.as_deref().and_then(SubmissionStatus::parse),
            search: self
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            sort: self
                .sort_by
                .as_deref()
                .map(SortField::from_param)
                .unwrap_or_default(),
            direction: self
                .sort_order
                .as_deref()
                .map(SortDirection::from_param)
                .unwrap_or_default(),
            ..Default::default()
        };
        (query, PageRequest::new(page, limit))
    }
}

fn parse_u32(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse().ok())
}

/// Partial update body. Empty strings count as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub status: Option<String>,
}

impl UpdateRequest {
    /// Validate supplied fields and build the patch. An unknown status is
    /// dropped.
    pub fn into_patch(self) -> Result<SubmissionPatch, Vec<FieldViolation>> {
        fn supplied(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        let mut violations = Vec::new();
        let mut check = |value: Option<String>,
                         rule: fn(&str) -> Result<String, FieldViolation>| {
            supplied(value).and_then(|v| match rule(&v) {
                Ok(clean) => Some(clean),
                Err(violation) => {
                    violations.push(violation);
                    None
                }
            })
        };

        let patch = SubmissionPatch {
            name: check(self.name, validate_name),
            email: check(self.email, validate_email),
            phone: check(self.phone, validate_phone),
            message: check(self.message, validate_message),
            status: self.status.as_deref().and_then(SubmissionStatus::parse),
        };

        if violations.is_empty() {
            Ok(patch)
        } else {
            Err(violations)
        }
    }
}

/// `GET /admin/export` query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFilter {
    pub status: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ExportFilter {
    /// Newest-first query with whichever bounds parse.
    pub fn resolve(&self) -> SubmissionQuery {
        SubmissionQuery {
            status: self.status.as_deref().and_then(SubmissionStatus::parse),
            created_from: self.start_date.as_deref().and_then(parse_start),
            created_before: self.end_date.as_deref().and_then(parse_end),
            ..Default::default()
        }
    }
}

fn parse_start(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// Exclusive upper bound: an instant covers itself, a date covers its day.
fn parse_end(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc) + chrono::Duration::milliseconds(1));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.succ_opt())
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContactPage {
    pub contacts: Vec<Submission>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_contacts: Vec<SubmissionBrief>,
}

/// Dashboard counters. The 30-day figure is reported as `recentMonth`.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: u64,
    pub new: u64,
    pub contacted: u64,
    pub converted: u64,
    pub lost: u64,
    pub recent_month: u64,
}

impl From<StatusSummary> for DashboardStats {
    fn from(summary: StatusSummary) -> Self {
        Self {
            total: summary.total,
            new: summary.new,
            contacted: summary.contacted,
            converted: summary.converted,
            lost: summary.lost,
            recent_month: summary.recent,
        }
    }
}

#[derive(Clone)]
pub struct AdminService {
    store: SubmissionStore,
}

impl AdminService {
    pub fn new(store: SubmissionStore) -> Self {
        Self { store }
    }

    /// Counts by status plus submissions from the last 30 days.
    pub async fn list_summary(&self, now: DateTime<Utc>) -> Result<StatusSummary, AdminError> {
        Ok(self
            .store
            .status_summary(now - chrono::Duration::days(RECENT_DAYS))
            .await?)
    }

    /// Same figures as [`Self::list_summary`], for the stats endpoints.
    pub async fn stats(&self, now: DateTime<Utc>) -> Result<StatusSummary, AdminError> {
        self.list_summary(now).await
    }

    pub async fn dashboard(&self, now: DateTime<Utc>) -> Result<Dashboard, AdminError> {
        let stats = DashboardStats::from(self.list_summary(now).await?);
        let recent_contacts = self
            .store
            .recent(DASHBOARD_RECENT)
            .await?
            .iter()
            .map(Submission::brief)
            .collect();
        Ok(Dashboard {
            stats,
            recent_contacts,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery, default_limit: u32) -> Result<ContactPage, AdminError> {
        let (query, page) = query.resolve(default_limit);
        let page = self.store.list(query, page).await?;
        let pagination = page.pagination();
        Ok(ContactPage {
            contacts: page.items,
            pagination,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Submission, AdminError> {
        self.store.get(id).await?.ok_or(AdminError::NotFound)
    }

    #[tracing::instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: &str,
        request: UpdateRequest,
        now: DateTime<Utc>,
    ) -> Result<Submission, AdminError> {
        let patch = request.into_patch().map_err(AdminError::ValidationFailed)?;
        let updated = self
            .store
            .update(id, patch, now)
            .await?
            .ok_or(AdminError::NotFound)?;
        tracing::info!(submission_id = %updated.id, status = %updated.status, "Contact updated");
        Ok(updated)
    }

    /// Status-only update where an unknown status is an error.
    pub async fn set_status(
        &self,
        id: &str,
        status: &str,
        now: DateTime<Utc>,
    ) -> Result<Submission, AdminError> {
        let status = SubmissionStatus::parse(status).ok_or(AdminError::InvalidStatus)?;
        let patch = SubmissionPatch {
            status: Some(status),
            ..Default::default()
        };
        self.store
            .update(id, patch, now)
            .await?
            .ok_or(AdminError::NotFound)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), AdminError> {
        if self.store.delete(id).await? {
            tracing::info!(submission_id = id, "Contact deleted");
            Ok(())
        } else {
            Err(AdminError::NotFound)
        }
    }

    /// Every matching submission as CSV, newest first.
    pub async fn export_csv(&self, filter: &ExportFilter) -> Result<String, AdminError> {
        let rows = self.store.list_all(filter.resolve()).await?;
        tracing::info!(rows = rows.len(), "Contacts exported");
        Ok(render_csv(&rows))
    }
}
