use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const UNKNOWN_DEPARTMENT: &str = "Unknown Department";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: Uuid,
    pub name: String,
    pub department_id: Option<Uuid>,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl Doctor {
    pub fn has_photo(&self) -> bool {
        self.profile_photo_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Department {
    pub id: Uuid,
    pub name: String,
}

/// Department suggested for a free-text description of symptoms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepartmentRecommendation {
    pub department_id: Uuid,
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DoctorsPayload {
    pub doctors: Vec<Doctor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DepartmentsPayload {
    pub departments: Vec<Department>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClassificationPayload {
    #[serde(rename = "departmentId")]
    pub department: ClassifiedDepartment,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClassifiedDepartment {
    #[serde(rename = "UUID")]
    pub uuid: Uuid,
    #[serde(default)]
    pub explanation: String,
}

impl From<ClassificationPayload> for DepartmentRecommendation {
    fn from(payload: ClassificationPayload) -> Self {
        Self {
            department_id: payload.department.uuid,
            explanation: payload.department.explanation,
        }
    }
}

/// Display name of a department, falling back when the id is unknown.
pub fn department_name(departments: &[Department], department_id: Option<Uuid>) -> &str {
    department_id
        .and_then(|id| departments.iter().find(|dept| dept.id == id))
        .map(|dept| dept.name.as_str())
        .unwrap_or(UNKNOWN_DEPARTMENT)
}
