use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use auth_cell::SessionStore;
use patient_cell::{split_list, PatientService, RecordData, RecordService};
use shared_api_client::PortalClient;
use shared_models::error::ApiError;
use shared_utils::test_utils::{MockPortalResponses, TestConfig, TestUser};

const SECRET: &str = "patient-test-secret";

struct TestSetup {
    mock_server: MockServer,
    client: Arc<PortalClient>,
    session: Arc<SessionStore>,
}

impl TestSetup {
    async fn new() -> Self {
        let mock_server = MockServer::start().await;
        let config = TestConfig::for_server(mock_server.uri()).to_app_config();
        let client = Arc::new(PortalClient::new(&config).unwrap());

        Self {
            mock_server,
            client,
            session: Arc::new(SessionStore::new()),
        }
    }

    fn sign_in(&self, user: &TestUser) -> String {
        let session = user.session(SECRET);
        let token = session.token.clone();
        self.session.establish(session);
        token
    }

    fn patients(&self) -> PatientService {
        PatientService::new(Arc::clone(&self.client), self.session.clone())
    }

    fn records(&self) -> RecordService {
        RecordService::new(Arc::clone(&self.client), self.session.clone())
    }
}

#[tokio::test]
async fn test_my_record() {
    let setup = TestSetup::new().await;
    let patient = TestUser::patient("ada@example.com");
    let token = setup.sign_in(&patient);

    Mock::given(method("GET"))
        .and(path("/user/record"))
        .and(header("Authorization", format!("Bearer {}", token)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::envelope(json!({
            "record": MockPortalResponses::medical_record(patient.id)
        }))))
        .mount(&setup.mock_server)
        .await;

    let record = setup.records().my_record().await.unwrap().unwrap();

    assert_eq!(record.user_id, patient.id);
    assert_eq!(record.data.blood_type.as_deref(), Some("O+"));
    assert_eq!(record.data.allergies, vec!["penicillin"]);
    assert_eq!(record.data.emergency_contact.map(|c| c.relationship), Some("sibling".to_string()));
    assert_eq!(record.data.insurance, None);
}

#[tokio::test]
async fn test_missing_record_is_none() {
    let setup = TestSetup::new().await;
    setup.sign_in(&TestUser::patient("ada@example.com"));

    Mock::given(method("GET"))
        .and(path("/user/record"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::envelope(json!({
            "record": null
        }))))
        .mount(&setup.mock_server)
        .await;

    assert_eq!(setup.records().my_record().await.unwrap(), None);
}

#[tokio::test]
async fn test_history_newest_first() {
    let setup = TestSetup::new().await;
    setup.sign_in(&TestUser::patient("ada@example.com"));
    let record_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::envelope(json!({
            "history": [
                {
                    "id": Uuid::new_v4(),
                    "record_id": record_id,
                    "changed_by": "Dr. Grey",
                    "change_type": "update",
                    "change_details": { "bloodType": "O+" },
                    "change_timestamp": "2025-03-01T10:00:00Z"
                },
                {
                    "id": Uuid::new_v4(),
                    "record_id": record_id,
                    "change_type": "lab_result",
                    "change_timestamp": "2025-05-20T08:15:00Z"
                }
            ]
        }))))
        .mount(&setup.mock_server)
        .await;

    let history = setup.records().history().await.unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].display_type(), "Lab Result");
    assert_eq!(history[0].changed_by, None);
    assert_eq!(history[1].change_details["bloodType"], "O+");
    assert_eq!(history.iter().filter(|e| e.matches_filter("lab")).count(), 1);
}

#[tokio::test]
async fn test_doctor_lists_patients() {
    let setup = TestSetup::new().await;
    setup.sign_in(&TestUser::doctor("grey@clinic.example"));

    Mock::given(method("GET"))
        .and(path("/doctor/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::envelope(json!({
            "patients": [
                { "id": Uuid::new_v4(), "name": "Ada Lovelace", "email": "ada@example.com" },
                { "id": Uuid::new_v4(), "name": "Alan Turing", "email": "alan@example.com", "profile_photo_url": "https://img.example/alan.png" }
            ]
        }))))
        .mount(&setup.mock_server)
        .await;

    let patients = setup.patients().list_patients().await.unwrap();

    assert_eq!(patients.len(), 2);
    assert_eq!(patients[0].profile_photo_url, None);
    assert_eq!(patients[1].name, "Alan Turing");
}

#[tokio::test]
async fn test_doctor_updates_patient_record() {
    let setup = TestSetup::new().await;
    setup.sign_in(&TestUser::doctor("grey@clinic.example"));
    let patient_id = Uuid::new_v4();

    let data = RecordData {
        blood_type: Some("B+".to_string()),
        allergies: split_list("Penicillin, Peanuts"),
        ..RecordData::default()
    };

    let mut stored = MockPortalResponses::medical_record(patient_id);
    stored["data"] = json!({ "bloodType": "B+", "allergies": ["Penicillin", "Peanuts"] });
    stored["last_edited_by"] = json!("Dr. Grey");

    Mock::given(method("PUT"))
        .and(path(format!("/doctor/patients/{}/record", patient_id)))
        .and(body_json(json!({
            "data": {
                "bloodType": "B+",
                "allergies": ["Penicillin", "Peanuts"],
                "medications": [],
                "conditions": []
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::envelope(json!({
            "record": stored
        }))))
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    let record = setup.patients().update_patient_record(patient_id, &data).await.unwrap();

    assert_eq!(record.data, data);
    assert_eq!(record.last_edited_by.as_deref(), Some("Dr. Grey"));
}

#[tokio::test]
async fn test_patient_record_forbidden() {
    let setup = TestSetup::new().await;
    setup.sign_in(&TestUser::patient("ada@example.com"));
    let patient_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/doctor/patients/{}/record", patient_id)))
        .respond_with(ResponseTemplate::new(403).set_body_json(MockPortalResponses::error_response("Doctors only")))
        .mount(&setup.mock_server)
        .await;

    let result = setup.patients().patient_record(patient_id).await;

    assert_matches!(result, Err(ApiError::Unauthorized(message)) if message == "Doctors only");
}

#[tokio::test]
async fn test_signed_out_history_fails_without_request() {
    let setup = TestSetup::new().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&setup.mock_server)
        .await;

    assert_matches!(setup.records().history().await, Err(ApiError::Unauthorized(_)));
}
