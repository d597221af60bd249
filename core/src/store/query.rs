//! Filter, sort, and paging types for submission queries.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use serde::Serialize;

use crate::submission::SubmissionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
    Email,
    Phone,
    Status,
}

impl SortField {
    /// Parse a `sortBy` query value. Unknown fields sort by creation time.
    pub fn from_param(raw: &str) -> Self {
        match raw {
            "updatedAt" => Self::UpdatedAt,
            "name" => Self::Name,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "status" => Self::Status,
            _ => Self::CreatedAt,
        }
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Status => "status",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// `desc` sorts descending; any other value ascending.
    pub fn from_param(raw: &str) -> Self {
        if raw == "desc" { Self::Desc } else { Self::Asc }
    }

    fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Which submissions to select and in what order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionQuery {
    pub status: Option<SubmissionStatus>,
    /// Case-insensitive substring over name, email, and phone.
    pub search: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub created_before: Option<DateTime<Utc>>,
    pub sort: SortField,
    pub direction: SortDirection,
}

impl SubmissionQuery {
    /// Render the `WHERE` clause (possibly empty) with its bound values.
    pub(crate) fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut values = Vec::new();

        if let Some(status) = self.status {
            clauses.push("status = ?".to_string());
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like(search));
            clauses.push(
                "(name LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\' OR phone LIKE ? ESCAPE '\\')"
                    .to_string(),
            );
            for _ in 0..3 {
                values.push(Value::Text(pattern.clone()));
            }
        }
        if let Some(from) = self.created_from {
            clauses.push("created_at >= ?".to_string());
            values.push(Value::Integer(from.timestamp_millis()));
        }
        if let Some(before) = self.created_before {
            clauses.push("created_at < ?".to_string());
            values.push(Value::Integer(before.timestamp_millis()));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), values)
        }
    }

    pub(crate) fn order_clause(&self) -> String {
        let dir = self.direction.keyword();
        format!(" ORDER BY {} {dir}, id {dir}", self.sort.column())
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// One-based page request. Construct with [`PageRequest::new`] to clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    pub const MAX_LIMIT: u32 = 100;

    /// Clamp `page` to at least 1 and `limit` to `1..=MAX_LIMIT`.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub(crate) fn offset(self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.limit)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn pagination(&self) -> Pagination {
        let limit = u64::from(self.request.limit);
        Pagination {
            current_page: self.request.page,
            total_pages: self.total.div_ceil(limit),
            total_items: self.total,
            items_per_page: self.request.limit,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u32,
}

/// Counts by status plus submissions created since a cutoff.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StatusSummary {
    pub total: u64,
    pub new: u64,
    pub contacted: u64,
    pub converted: u64,
    pub lost: u64,
    pub recent: u64,
}

impl StatusSummary {
    pub(crate) fn add(&mut self, status: SubmissionStatus, count: u64) {
        self.total += count;
        match status {
            SubmissionStatus::New => self.new += count,
            SubmissionStatus::Contacted => self.contacted += count,
            SubmissionStatus::Converted => self.converted += count,
            SubmissionStatus::Lost => self.lost += count,
        }
    }
}
