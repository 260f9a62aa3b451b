use std::sync::Arc;

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_api_client::{require_token, PortalClient};
use shared_models::auth::SessionProvider;
use shared_models::error::ApiError;

use crate::models::{MedicalRecord, Patient, PatientsPayload, RecordData, RecordPayload, UpdateRecordRequest};

/// A doctor's view of their patients and the patients' records.
pub struct PatientService {
    client: Arc<PortalClient>,
    session: Arc<dyn SessionProvider>,
}

impl PatientService {
    pub fn new(client: Arc<PortalClient>, session: Arc<dyn SessionProvider>) -> Self {
        Self { client, session }
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, ApiError> {
        let token = require_token(self.session.as_ref())?;

        let payload: PatientsPayload = self.client
            .get("/doctor/patients", Some(&token), &[])
            .await?;

        debug!("Loaded {} patients", payload.patients.len());
        Ok(payload.patients)
    }

    /// `None` when the patient has no record yet.
    pub async fn patient_record(&self, patient_id: Uuid) -> Result<Option<MedicalRecord>, ApiError> {
        let token = require_token(self.session.as_ref())?;
        let path = format!("/doctor/patients/{}/record", patient_id);

        let payload: RecordPayload = self.client
            .get(&path, Some(&token), &[])
            .await?;

        Ok(payload.record)
    }

    pub async fn update_patient_record(&self, patient_id: Uuid, data: &RecordData) -> Result<MedicalRecord, ApiError> {
        let token = require_token(self.session.as_ref())?;
        let path = format!("/doctor/patients/{}/record", patient_id);

        let payload: RecordPayload = self.client
            .send_json(Method::PUT, &path, Some(&token), json!(UpdateRecordRequest { data }))
            .await?;

        let record = payload
            .record
            .ok_or_else(|| ApiError::Decode("Record missing from update response".to_string()))?;

        info!("Medical record {} updated for patient {}", record.id, patient_id);
        Ok(record)
    }
}
