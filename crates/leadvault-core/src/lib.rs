//! Lead data model shared by the store, relay and intake service.
//!
//! A [`LeadSubmission`] is what a caller sends; a [`Lead`] is what gets
//! persisted and relayed once the submission has been validated and stamped
//! with an identifier and creation time.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{OffsetDateTime, UtcOffset};
use ulid::Ulid;

/// Lifecycle value assigned to every freshly captured lead.
pub const INITIAL_LEAD_STATUS: &str = "New";

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum LeadError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("time error: {0}")]
    Time(String),
}

/// Failure of the medium backing a [`LeadStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to prepare lead collection at {}: {source}", .path.display())]
    Initialize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read lead collection at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("lead collection at {} is not a valid JSON array: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode lead collection: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write lead collection at {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("lead store write lock poisoned")]
    Poisoned,
}

/// Opaque lead identifier.
///
/// Fresh identifiers are ULIDs. Identifiers read back from an existing
/// collection are kept verbatim, whatever scheme produced them.
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(transparent)]
pub struct LeadId(String);

impl LeadId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for LeadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LeadId {
    type Err = LeadError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(LeadError::Validation("lead_id MUST be non-empty".to_string()));
        }
        Ok(Self(value.to_string()))
    }
}

/// Raw intake payload as received from a caller.
///
/// Every field is optional at the type level so that a missing `contact`
/// surfaces as a validation error rather than a decoding failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LeadSubmission {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub contact: Option<Value>,
    #[serde(default)]
    pub qualification: Option<Value>,
}

impl LeadSubmission {
    /// Checks that the submission carries a usable contact email.
    ///
    /// An email made only of whitespace counts as missing.
    ///
    /// # Errors
    /// Returns [`LeadError::Validation`] when `contact` is missing or not an
    /// object, or when `contact.email` is missing, not a string, or blank.
    pub fn validate(&self) -> Result<&str, LeadError> {
        let email = self
            .contact
            .as_ref()
            .and_then(Value::as_object)
            .and_then(|contact| contact.get("email"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        if email.trim().is_empty() {
            return Err(LeadError::Validation(
                "Invalid payload: Email required".to_string(),
            ));
        }

        Ok(email)
    }
}

/// One captured submission as persisted in the lead collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Lead {
    pub lead_id: LeadId,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub contact: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<Value>,
    pub status: String,
    /// Fields added to a stored record after capture, kept untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Lead {
    /// Validates `submission` and stamps it with `lead_id` and `timestamp`.
    ///
    /// # Errors
    /// Returns [`LeadError::Validation`] when the submission fails
    /// [`LeadSubmission::validate`].
    pub fn stamp(
        submission: LeadSubmission,
        lead_id: LeadId,
        timestamp: OffsetDateTime,
    ) -> Result<Self, LeadError> {
        submission.validate()?;
        let LeadSubmission { source, contact, qualification } = submission;

        Ok(Self {
            lead_id,
            timestamp: timestamp.to_offset(UtcOffset::UTC),
            source,
            contact: contact.unwrap_or(Value::Null),
            qualification,
            status: INITIAL_LEAD_STATUS.to_string(),
            extra: Map::new(),
        })
    }

    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.contact.get("email").and_then(Value::as_str)
    }
}

/// Durable, ordered collection of leads.
///
/// Implementations are blocking; async callers run them on a blocking pool.
pub trait LeadStore: Send + Sync {
    /// Creates an empty collection if none exists yet. Safe to call on every boot.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the backing medium cannot be prepared.
    fn ensure_initialized(&self) -> Result<(), StoreError>;

    /// Appends `lead` to the collection and returns its identifier.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the collection cannot be read or written back.
    fn append_lead(&self, lead: &Lead) -> Result<LeadId, StoreError>;

    /// Returns every stored lead in append order.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the collection cannot be read or decoded.
    fn list_leads(&self) -> Result<Vec<Lead>, StoreError>;
}

/// Parses an RFC3339 timestamp and requires UTC (`Z`) offset.
///
/// # Errors
/// Returns [`LeadError::Time`] when parsing fails or the timestamp is not UTC.
pub fn parse_rfc3339_utc(value: &str) -> Result<OffsetDateTime, LeadError> {
    let parsed = OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339)
        .map_err(|err| LeadError::Time(format!("invalid RFC3339 timestamp: {err}")))?;

    if parsed.offset() != UtcOffset::UTC {
        return Err(LeadError::Time("timestamp MUST use UTC offset Z".to_string()));
    }

    Ok(parsed)
}

/// Formats a timestamp as RFC3339 after normalizing to UTC.
///
/// # Errors
/// Returns [`LeadError::Time`] when formatting fails.
pub fn format_rfc3339(value: OffsetDateTime) -> Result<String, LeadError> {
    value
        .to_offset(UtcOffset::UTC)
        .format(&time::format_description::well_known::Rfc3339)
        .map_err(|err| LeadError::Time(format!("failed to format RFC3339 timestamp: {err}")))
}

/// Current UTC time truncated to millisecond precision.
#[must_use]
pub fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc().to_offset(UtcOffset::UTC);
    now.replace_millisecond(now.millisecond()).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn must_ok<T, E: std::fmt::Display>(result: Result<T, E>) -> T {
        match result {
            Ok(value) => value,
            Err(err) => panic!("expected Ok(..), got error: {err}"),
        }
    }

    fn fixture_lead_id() -> LeadId {
        must_ok("01J0SQQP7M70P6Y3R4T8D8G8M2".parse::<LeadId>())
    }

    fn submission(contact: Option<Value>) -> LeadSubmission {
        LeadSubmission {
            source: Some("hero_cta".to_string()),
            contact,
            qualification: Some(json!({"status": "warm", "session_id": "s-1"})),
        }
    }

    #[test]
    fn validate_accepts_non_empty_email() {
        let input = submission(Some(json!({"email": "ana@example.com", "name": "Ana"})));
        assert_eq!(must_ok(input.validate()), "ana@example.com");
    }

    #[test]
    fn validate_rejects_missing_blank_or_non_string_email() {
        for contact in [
            None,
            Some(Value::Null),
            Some(json!("ana@example.com")),
            Some(json!({})),
            Some(json!({"email": ""})),
            Some(json!({"email": "   "})),
            Some(json!({"email": null})),
            Some(json!({"email": 42})),
        ] {
            let input = submission(contact.clone());
            let result = input.validate();
            assert!(
                matches!(result, Err(LeadError::Validation(_))),
                "expected validation error for contact {contact:?}"
            );
        }
    }

    #[test]
    fn stamp_sets_initial_status_and_keeps_opaque_fields() {
        let created_at = must_ok(parse_rfc3339_utc("2026-02-07T12:00:00Z"));
        let lead = must_ok(Lead::stamp(
            submission(Some(json!({"email": "ana@example.com", "phone": "555"}))),
            fixture_lead_id(),
            created_at,
        ));

        assert_eq!(lead.status, INITIAL_LEAD_STATUS);
        assert_eq!(lead.email(), Some("ana@example.com"));
        assert_eq!(lead.contact["phone"], json!("555"));
        assert_eq!(lead.qualification, Some(json!({"status": "warm", "session_id": "s-1"})));
        assert_eq!(lead.timestamp, created_at);
    }

    #[test]
    fn stamp_rejects_invalid_submission() {
        let result = Lead::stamp(submission(None), fixture_lead_id(), now_utc());
        assert!(matches!(result, Err(LeadError::Validation(_))));
    }

    #[test]
    fn lead_json_shape_omits_absent_optional_fields() {
        let created_at = must_ok(parse_rfc3339_utc("2026-02-07T12:00:00Z"));
        let input = LeadSubmission {
            source: None,
            contact: Some(json!({"email": "ana@example.com"})),
            qualification: None,
        };
        let lead = must_ok(Lead::stamp(input, fixture_lead_id(), created_at));
        let value = must_ok(serde_json::to_value(&lead));

        assert_eq!(
            value,
            json!({
                "lead_id": "01J0SQQP7M70P6Y3R4T8D8G8M2",
                "timestamp": "2026-02-07T12:00:00Z",
                "contact": {"email": "ana@example.com"},
                "status": "New"
            })
        );
    }

    #[test]
    fn stored_leads_with_advanced_status_still_decode() {
        let value = json!({
            "lead_id": "01J0SQQP7M70P6Y3R4T8D8G8M2",
            "timestamp": "2026-02-07T12:00:00.250Z",
            "source": "strategy_section",
            "contact": {"email": "ana@example.com"},
            "qualification": null,
            "status": "Contacted"
        });
        let lead: Lead = must_ok(serde_json::from_value(value));
        assert_eq!(lead.status, "Contacted");
        assert_eq!(lead.lead_id, fixture_lead_id());
    }

    #[test]
    fn stored_leads_keep_foreign_ids_and_extra_fields() {
        let value = json!({
            "lead_id": "3b241101-e2bb-4255-8caf-4136c566a962",
            "timestamp": "2025-11-02T09:15:00.000Z",
            "source": "hero_cta",
            "contact": {"email": "ana@example.com"},
            "qualification": {"status": "warm"},
            "status": "Contacted",
            "assigned_to": "rep-7"
        });
        let lead: Lead = must_ok(serde_json::from_value(value.clone()));
        assert_eq!(lead.lead_id.as_str(), "3b241101-e2bb-4255-8caf-4136c566a962");
        assert_eq!(lead.extra.get("assigned_to"), Some(&json!("rep-7")));
        let encoded = must_ok(serde_json::to_value(&lead));
        assert_eq!(encoded["lead_id"], value["lead_id"]);
        assert_eq!(encoded["status"], json!("Contacted"));
        assert_eq!(encoded["assigned_to"], json!("rep-7"));
    }

    #[test]
    fn lead_id_rejects_blank_input() {
        assert!("".parse::<LeadId>().is_err());
        assert!("   ".parse::<LeadId>().is_err());
        assert!(LeadId::new().as_str().parse::<Ulid>().is_ok());
    }

    #[test]
    fn now_utc_round_trips_through_rfc3339() {
        let now = now_utc();
        let formatted = must_ok(format_rfc3339(now));
        assert!(formatted.ends_with('Z'));
        assert_eq!(must_ok(parse_rfc3339_utc(&formatted)), now);
    }

    #[test]
    fn parse_rejects_non_utc_offsets() {
        assert!(parse_rfc3339_utc("2026-02-07T12:00:00+02:00").is_err());
    }
}
