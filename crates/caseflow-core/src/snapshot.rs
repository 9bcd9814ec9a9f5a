//! Read-only snapshot records consumed by the engine.
//!
//! Field names follow the office's camelCase JSON exports. Date fields stay
//! as raw strings until evaluation; see [`crate::calendar`] for the accepted
//! forms.

use serde::{Deserialize, Serialize};

/// Statutory days after filing before administrative silence applies.
pub const DEFAULT_SILENCE_DAYS: i64 = 60;

/// Default cadence for nudging a client about pending documents.
pub const DEFAULT_REMINDER_INTERVAL_DAYS: i64 = 10;

fn default_silence_days() -> i64 {
    DEFAULT_SILENCE_DAYS
}

fn default_reminder_interval_days() -> i64 {
    DEFAULT_REMINDER_INTERVAL_DAYS
}

/// Fee agreed with a client and how much of it has been paid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub total_fee: f64,
    #[serde(default)]
    pub paid_amount: f64,
}

impl Payment {
    pub fn remaining(&self) -> f64 {
        self.total_fee - self.paid_amount
    }
}

/// One entry in a client's document checklist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub submitted: bool,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<String>,
}

impl RequiredDocument {
    /// Mandatory and still missing.
    pub fn is_pending(&self) -> bool {
        !self.submitted && !self.is_optional
    }
}

/// A client case as captured by the data-access layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    /// Manually set "next contact" date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_reminder_date: Option<String>,
    #[serde(default)]
    pub payment: Payment,
    #[serde(default)]
    pub submitted_to_immigration: bool,
    /// Filing date; only meaningful once submitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_date: Option<String>,
    #[serde(default = "default_silence_days")]
    pub administrative_silence_days: i64,
    #[serde(default)]
    pub required_documents: Vec<RequiredDocument>,
    #[serde(default = "default_reminder_interval_days")]
    pub reminder_interval_days: i64,
    /// Baseline for document nudges when nothing has been uploaded yet.
    pub created_at: String,
}

impl ClientSnapshot {
    /// A client with no payment, filing, or documents, and default cadences.
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            custom_reminder_date: None,
            payment: Payment::default(),
            submitted_to_immigration: false,
            application_date: None,
            administrative_silence_days: DEFAULT_SILENCE_DAYS,
            required_documents: Vec::new(),
            reminder_interval_days: DEFAULT_REMINDER_INTERVAL_DAYS,
            created_at: created_at.into(),
        }
    }

    pub fn display_name(&self) -> String {
        join_name(&self.first_name, &self.last_name)
    }

    /// Mandatory documents not yet submitted.
    pub fn pending_documents(&self) -> usize {
        self.required_documents
            .iter()
            .filter(|doc| doc.is_pending())
            .count()
    }
}

/// A manually scheduled reminder not tied to document or payment state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandaloneReminder {
    pub id: String,
    pub client_name: String,
    pub client_surname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Due time, compared at full precision.
    pub reminder_date: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl StandaloneReminder {
    pub fn display_name(&self) -> String {
        join_name(&self.client_name, &self.client_surname)
    }
}

/// Clients and standalone reminders gathered for one evaluation.
///
/// The two collections may have been fetched at slightly different instants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub clients: Vec<ClientSnapshot>,
    #[serde(default)]
    pub reminders: Vec<StandaloneReminder>,
}

fn join_name(first: &str, last: &str) -> String {
    format!("{} {}", first.trim(), last.trim()).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_defaults_from_minimal_json() {
        let json = r#"{
            "id": "c1",
            "firstName": "Amina",
            "lastName": "Diallo",
            "createdAt": "2025-01-10"
        }"#;
        let client: ClientSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(client.administrative_silence_days, 60);
        assert_eq!(client.reminder_interval_days, 10);
        assert!(client.required_documents.is_empty());
        assert!(!client.submitted_to_immigration);
        assert_eq!(client.payment.remaining(), 0.0);
        assert_eq!(client, ClientSnapshot::new("c1", "Amina", "Diallo", "2025-01-10"));
    }

    #[test]
    fn client_full_json() {
        let json = r#"{
            "id": "c2",
            "firstName": "Luis",
            "lastName": "Ortega",
            "customReminderDate": "2025-03-16",
            "payment": { "totalFee": 1200.0, "paidAmount": 450.5 },
            "submittedToImmigration": true,
            "applicationDate": "2025-01-20T10:00:00Z",
            "administrativeSilenceDays": 90,
            "requiredDocuments": [
                { "name": "Passport", "submitted": true, "isOptional": false, "uploadedAt": "2025-01-05" },
                { "name": "Criminal record", "submitted": false, "isOptional": false },
                { "name": "Cover letter", "submitted": false, "isOptional": true }
            ],
            "reminderIntervalDays": 14,
            "createdAt": "2025-01-02"
        }"#;
        let client: ClientSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(client.payment.remaining(), 749.5);
        assert_eq!(client.administrative_silence_days, 90);
        assert_eq!(client.reminder_interval_days, 14);
        assert_eq!(client.pending_documents(), 1);
        assert_eq!(
            client.required_documents[0].uploaded_at.as_deref(),
            Some("2025-01-05")
        );
    }

    #[test]
    fn reminder_json() {
        let json = r#"{
            "id": "r1",
            "clientName": "Fatima",
            "clientSurname": "Benali",
            "phone": "+34 600 000 000",
            "reminderDate": "2025-03-16T09:00:00Z",
            "createdAt": "2025-03-01T12:00:00Z",
            "updatedAt": "2025-03-01T12:00:00Z"
        }"#;
        let reminder: StandaloneReminder = serde_json::from_str(json).unwrap();
        assert_eq!(reminder.display_name(), "Fatima Benali");
        assert_eq!(reminder.phone.as_deref(), Some("+34 600 000 000"));
        assert!(reminder.notes.is_none());
    }

    #[test]
    fn display_name_tolerates_blank_parts() {
        let client = ClientSnapshot::new("c1", " Amina ", "", "2025-01-10");
        assert_eq!(client.display_name(), "Amina");
    }
}
