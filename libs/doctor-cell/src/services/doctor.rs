use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use shared_api_client::{require_token, PortalClient};
use shared_models::auth::SessionProvider;
use shared_models::error::ApiError;

use crate::models::{Department, DepartmentsPayload, Doctor, DoctorsPayload};

pub struct DoctorService {
    client: Arc<PortalClient>,
    session: Arc<dyn SessionProvider>,
}

impl DoctorService {
    pub fn new(client: Arc<PortalClient>, session: Arc<dyn SessionProvider>) -> Self {
        Self { client, session }
    }

    pub async fn list_departments(&self) -> Result<Vec<Department>, ApiError> {
        let token = require_token(self.session.as_ref())?;

        let payload: DepartmentsPayload = self.client
            .get("/departments", Some(&token), &[])
            .await?;

        debug!("Loaded {} departments", payload.departments.len());
        Ok(payload.departments)
    }

    /// Doctors visible to the patient, optionally limited to one department.
    /// The patient's assigned doctor, if listed, comes first.
    pub async fn list_doctors(&self, department_id: Option<Uuid>) -> Result<Vec<Doctor>, ApiError> {
        let token = require_token(self.session.as_ref())?;

        let query: Vec<(&str, String)> = department_id
            .map(|id| vec![("departmentId", id.to_string())])
            .unwrap_or_default();

        let payload: DoctorsPayload = self.client
            .get("/user/doctors", Some(&token), &query)
            .await?;

        let assigned = self.session
            .current_user()
            .and_then(|user| user.assigned_doctor_id);

        debug!("Loaded {} doctors (department filter: {:?})", payload.doctors.len(), department_id);
        Ok(assigned_first(payload.doctors, assigned))
    }
}

/// Move the assigned doctor to the front, keeping everyone else in order.
pub fn assigned_first(mut doctors: Vec<Doctor>, assigned: Option<Uuid>) -> Vec<Doctor> {
    if let Some(assigned_id) = assigned {
        doctors.sort_by_key(|doctor| doctor.id != assigned_id);
    }
    doctors
}
