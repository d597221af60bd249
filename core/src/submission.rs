//! Submission record types.
//!
//! A [`Submission`] is one contact-form record. It is created by the intake
//! pipeline with status [`SubmissionStatus::New`] and afterwards only
//! changed through the admin service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a submission.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    New,
    Contacted,
    Converted,
    Lost,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 4] = [
        SubmissionStatus::New,
        SubmissionStatus::Contacted,
        SubmissionStatus::Converted,
        SubmissionStatus::Lost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Converted => "converted",
            Self::Lost => "lost",
        }
    }

    /// Parse from the wire representation. Returns `None` for anything
    /// outside the four known values.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted contact submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub name: String,
    /// Always lower-cased.
    pub email: String,
    pub phone: String,
    pub message: String,
    /// Referer of the originating request, or the configured default marker.
    pub source: String,
    pub status: SubmissionStatus,
    #[serde(with = "millis_rfc3339")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "millis_rfc3339")]
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    /// The projection returned to the public submitter.
    pub fn receipt(&self) -> SubmissionReceipt {
        SubmissionReceipt {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            submitted_at: self.created_at,
        }
    }

    /// The projection shown in the dashboard's recent list.
    pub fn brief(&self) -> SubmissionBrief {
        SubmissionBrief {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Validated, normalized fields for a new submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubmission {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

/// Public projection of a freshly created submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(with = "millis_rfc3339")]
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionBrief {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub status: SubmissionStatus,
    #[serde(with = "millis_rfc3339")]
    pub created_at: DateTime<Utc>,
}

/// Fields an admin may change. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: Option<String>,
    pub status: Option<SubmissionStatus>,
}

/// RFC 3339 with millisecond precision and a `Z` suffix.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub(crate) mod millis_rfc3339 {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in SubmissionStatus::ALL {
            assert_eq!(SubmissionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SubmissionStatus::parse("archived"), None);
        assert_eq!(SubmissionStatus::parse("NEW"), None);
    }

    #[test]
    fn submission_serializes_camel_case_with_millis() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let sub = Submission {
            id: "abc".to_string(),
            name: "Jane Doe".to_string(),
            email: "jane@ex.com".to_string(),
            phone: "+911234567890".to_string(),
            message: "I need help with math.".to_string(),
            source: "website".to_string(),
            status: SubmissionStatus::New,
            created_at: ts,
            updated_at: ts,
        };

        let json = serde_json::to_value(&sub).unwrap();
        assert_eq!(json["createdAt"], "2026-03-01T09:30:00.000Z");
        assert_eq!(json["status"], "new");
        assert!(json.get("created_at").is_none());

        let back: Submission = serde_json::from_value(json).unwrap();
        assert_eq!(back, sub);
    }

    #[test]
    fn receipt_uses_submitted_at() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let receipt = SubmissionReceipt {
            id: "abc".to_string(),
            name: "Jane".to_string(),
            email: "jane@ex.com".to_string(),
            submitted_at: ts,
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["submittedAt"], "2026-03-01T09:30:00.000Z");
    }
}
