//! Field validation and normalization for contact submissions.
//!
//! [`validate`] is a pure function: it trims every field, checks each rule,
//! and either returns a [`NewSubmission`] or every [`FieldViolation`] found.
//! It never short-circuits across fields so the form can show all problems
//! at once.

use std::sync::LazyLock;

use email_address::EmailAddress;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::submission::NewSubmission;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 100;
pub const MESSAGE_MIN_CHARS: usize = 10;
pub const MESSAGE_MAX_CHARS: usize = 1000;

static PHONE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{0,15}$").ok());

/// Raw form input as received from the client. Missing fields deserialize
/// to empty strings and are reported as violations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Phone,
    Message,
}

impl Field {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Message => "message",
        }
    }
}

/// One rejected field with a user-facing message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldViolation {
    pub field: Field,
    pub msg: String,
}

impl FieldViolation {
    fn new(field: Field, msg: &str) -> Self {
        Self {
            field,
            msg: msg.to_string(),
        }
    }
}

/// Validate and normalize a raw submission.
pub fn validate(raw: &RawSubmission) -> Result<NewSubmission, Vec<FieldViolation>> {
    let name = validate_name(&raw.name);
    let email = validate_email(&raw.email);
    let phone = validate_phone(&raw.phone);
    let message = validate_message(&raw.message);

    match (name, email, phone, message) {
        (Ok(name), Ok(email), Ok(phone), Ok(message)) => Ok(NewSubmission {
            name,
            email,
            phone,
            message,
        }),
        (name, email, phone, message) => Err([name.err(), email.err(), phone.err(), message.err()]
            .into_iter()
            .flatten()
            .collect()),
    }
}

pub fn validate_name(raw: &str) -> Result<String, FieldViolation> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&len) {
        return Err(FieldViolation::new(
            Field::Name,
            "Name must be between 2 and 100 characters",
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
    {
        return Err(FieldViolation::new(
            Field::Name,
            "Name can only contain letters and spaces",
        ));
    }
    Ok(name.to_string())
}

pub fn validate_email(raw: &str) -> Result<String, FieldViolation> {
    normalize_email(raw)
        .ok_or_else(|| FieldViolation::new(Field::Email, "Please enter a valid email address"))
}

pub fn validate_phone(raw: &str) -> Result<String, FieldViolation> {
    let phone = raw.trim();
    let matches = PHONE_PATTERN
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(phone));
    if matches {
        Ok(phone.to_string())
    } else {
        Err(FieldViolation::new(
            Field::Phone,
            "Please enter a valid phone number",
        ))
    }
}

pub fn validate_message(raw: &str) -> Result<String, FieldViolation> {
    let message = raw.trim();
    let len = message.chars().count();
    if (MESSAGE_MIN_CHARS..=MESSAGE_MAX_CHARS).contains(&len) {
        Ok(message.to_string())
    } else {
        Err(FieldViolation::new(
            Field::Message,
            "Message must be between 10 and 1000 characters",
        ))
    }
}

/// Check syntax and return the canonical form of an address, or `None` if
/// it is not a deliverable-looking address.
///
/// The domain must contain a dot (no bare hosts). Canonicalization lower-cases
/// the whole address and applies the usual provider rules: Gmail ignores dots
/// and `+tags`, Outlook and iCloud ignore `+tags`, Yahoo ignores `-tags`.
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if !EmailAddress::is_valid(trimmed) {
        return None;
    }
    let (local, domain) = trimmed.rsplit_once('@')?;
    let domain = domain.to_ascii_lowercase();
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return None;
    }
    let local = local.to_lowercase();

    let (local, domain) = match domain.as_str() {
        "gmail.com" | "googlemail.com" => {
            let base = strip_tag(&local, '+').replace('.', "");
            (base, "gmail.com".to_string())
        }
        "outlook.com" | "hotmail.com" | "live.com" | "icloud.com" | "me.com" => {
            (strip_tag(&local, '+').to_string(), domain)
        }
        "yahoo.com" | "ymail.com" => (strip_tag(&local, '-').to_string(), domain),
        _ => (local, domain),
    };

    if local.is_empty() {
        return None;
    }
    Some(format!("{local}@{domain}"))
}

fn strip_tag(local: &str, separator: char) -> &str {
    match local.split_once(separator) {
        Some((base, _)) if !base.is_empty() => base,
        _ => local,
    }
}
