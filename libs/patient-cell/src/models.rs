use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A patient as listed for their doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EmergencyContact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub relationship: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Insurance {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub policy_number: String,
}

/// Clinical content of a medical record. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_type: Option<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurance: Option<Insurance>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub data: RecordData,
    #[serde(default)]
    pub last_edited_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
}

/// One change to a medical record, as kept in the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub record_id: Uuid,
    #[serde(default)]
    pub changed_by: Option<String>,
    pub change_type: String,
    #[serde(default)]
    pub change_details: Value,
    pub change_timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// `lab_result` -> `Lab Result`
    pub fn display_type(&self) -> String {
        format_change_type(&self.change_type)
    }

    /// Case-insensitive substring match on the change type; `all` matches everything.
    pub fn matches_filter(&self, filter: &str) -> bool {
        let filter = filter.trim();
        filter.is_empty()
            || filter.eq_ignore_ascii_case("all")
            || self.change_type.to_lowercase().contains(&filter.to_lowercase())
    }
}

pub fn format_change_type(raw: &str) -> String {
    raw.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Split a comma-separated edit field into trimmed, non-empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Serialize)]
pub struct UpdateRecordRequest<'a> {
    pub data: &'a RecordData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordPayload {
    #[serde(default)]
    pub record: Option<MedicalRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryPayload {
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PatientsPayload {
    pub patients: Vec<Patient>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(change_type: &str) -> HistoryEntry {
        HistoryEntry {
            id: Uuid::new_v4(),
            record_id: Uuid::new_v4(),
            changed_by: None,
            change_type: change_type.to_string(),
            change_details: Value::Null,
            change_timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_record_data_uses_camel_case() {
        let data: RecordData = serde_json::from_value(json!({
            "bloodType": "A-",
            "allergies": ["latex"],
            "emergencyContact": { "name": "Sam", "phone": "555", "relationship": "sibling" },
            "insurance": { "provider": "VHI", "policyNumber": "P-1" }
        }))
        .unwrap();

        assert_eq!(data.blood_type.as_deref(), Some("A-"));
        assert!(data.medications.is_empty());
        assert_eq!(data.insurance.as_ref().map(|i| i.policy_number.as_str()), Some("P-1"));

        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["emergencyContact"]["relationship"], "sibling");
        assert_eq!(value["insurance"]["policyNumber"], "P-1");
    }

    #[test]
    fn test_empty_record_data_serializes_lists_only() {
        let value = serde_json::to_value(RecordData::default()).unwrap();
        assert_eq!(value, json!({ "allergies": [], "medications": [], "conditions": [] }));
    }

    #[test]
    fn test_format_change_type() {
        assert_eq!(format_change_type("lab_result"), "Lab Result");
        assert_eq!(format_change_type("update"), "Update");
        assert_eq!(format_change_type("record__created"), "Record Created");
    }

    #[test]
    fn test_history_filter() {
        assert!(entry("lab_result").matches_filter("all"));
        assert!(entry("lab_result").matches_filter("LAB"));
        assert!(entry("prescription").matches_filter(""));
        assert!(!entry("prescription").matches_filter("visit"));
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" Penicillin, Peanuts ,,"), vec!["Penicillin", "Peanuts"]);
        assert!(split_list(" , ").is_empty());
    }
}
