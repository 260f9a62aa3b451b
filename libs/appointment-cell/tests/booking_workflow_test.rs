use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::services::workflow::{AVAILABILITY_ALERT, SERVICES_ALERT};
use appointment_cell::{BookingError, BookingStage, BookingWorkflow, HttpAppointmentApi};
use auth_cell::SessionStore;
use doctor_cell::Doctor;
use shared_api_client::PortalClient;
use shared_models::error::ApiError;
use shared_utils::dates::FixedClock;
use shared_utils::test_utils::{MockPortalResponses, TestConfig, TestUser};

const SECRET: &str = "booking-test-secret";

struct TestSetup {
    mock_server: MockServer,
    session: Arc<SessionStore>,
    workflow: BookingWorkflow,
}

impl TestSetup {
    async fn new() -> Self {
        let mock_server = MockServer::start().await;
        let config = TestConfig::for_server(mock_server.uri()).to_app_config();
        let client = Arc::new(PortalClient::new(&config).unwrap());
        let session = Arc::new(SessionStore::new());

        let api = HttpAppointmentApi::new(client, session.clone());
        let workflow = BookingWorkflow::new(Arc::new(api), Arc::new(FixedClock::on(day(2025, 6, 1))));

        Self {
            mock_server,
            session,
            workflow,
        }
    }

    fn sign_in(&self, user: &TestUser) -> String {
        let session = user.session(SECRET);
        let token = session.token.clone();
        self.session.establish(session);
        token
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn doctor_x() -> Doctor {
    Doctor {
        id: Uuid::new_v4(),
        name: "Meredith Grey".to_string(),
        department_id: None,
        profile_photo_url: None,
        email: None,
    }
}

async fn mount_calendar(server: &MockServer, doctor_id: Uuid, days: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/appointments/calendar"))
        .and(query_param("doctorId", doctor_id.to_string()))
        .and(query_param("monthStart", "2025-06-01"))
        .and(query_param("monthEnd", "2025-07-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::availability_response(days)))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_books_consultation_end_to_end() {
    let mut setup = TestSetup::new().await;
    let patient = TestUser::patient("ada@example.com");
    let token = setup.sign_in(&patient);
    let doctor = doctor_x();
    let consultation = Uuid::new_v4();

    mount_calendar(&setup.mock_server, doctor.id, &["2025-06-10"]).await;

    Mock::given(method("GET"))
        .and(path("/services"))
        .and(header("Authorization", format!("Bearer {}", token)))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::services_response(vec![
            MockPortalResponses::service(consultation, "Consultation", json!(20)),
        ])))
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments/slots"))
        .and(query_param("doctorId", doctor.id.to_string()))
        .and(query_param("date", "2025-06-10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::slots_response(&["09:00", "09:30"])))
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .and(body_json(json!({
            "doctorId": doctor.id,
            "appointmentTime": "2025-06-10T09:00:00.000Z",
            "serviceIds": [consultation]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(MockPortalResponses::booking_response(
            patient.id,
            doctor.id,
            "2025-06-10T09:00:00.000Z",
        )))
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    let wf = &mut setup.workflow;

    wf.select_doctor(doctor.clone()).await;
    assert_eq!(wf.stage(), BookingStage::SelectingDate);
    assert_eq!(wf.selectable_dates(), vec![day(2025, 6, 10)]);
    assert!(!wf.is_date_selectable(day(2025, 6, 11)));

    wf.select_date(day(2025, 6, 10)).await.unwrap();
    let offered: Vec<&str> = wf.slots().loaded().unwrap().slots().iter().map(|s| s.raw.as_str()).collect();
    assert_eq!(offered, vec!["09:00", "09:30"]);

    wf.select_slot(Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap()).unwrap();
    wf.toggle_service(consultation).unwrap();
    assert_eq!(wf.total_fee(), "20.00");
    assert!(wf.can_submit());

    let appointment = wf.submit().await.unwrap();

    assert_eq!(appointment.doctor_id, doctor.id);
    assert_eq!(appointment.user_id, Some(patient.id));
    assert_eq!(wf.stage(), BookingStage::Idle);
    assert!(wf.take_alerts().is_empty());
}

#[tokio::test]
async fn test_catalog_failure_does_not_block_date_selection() {
    let mut setup = TestSetup::new().await;
    setup.sign_in(&TestUser::patient("ada@example.com"));
    let doctor = doctor_x();

    mount_calendar(&setup.mock_server, doctor.id, &["2025-06-10", "2025-06-12"]).await;

    Mock::given(method("GET"))
        .and(path("/services"))
        .respond_with(ResponseTemplate::new(500).set_body_json(MockPortalResponses::error_response("catalog offline")))
        .mount(&setup.mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::slots_response(&["14:00"])))
        .mount(&setup.mock_server)
        .await;

    let wf = &mut setup.workflow;
    wf.select_doctor(doctor).await;

    assert_eq!(wf.take_alerts(), vec![SERVICES_ALERT.to_string()]);
    assert_eq!(wf.catalog().error(), Some("API error (500): catalog offline"));
    assert_eq!(wf.selectable_dates(), vec![day(2025, 6, 10), day(2025, 6, 12)]);

    wf.select_date(day(2025, 6, 12)).await.unwrap();
    wf.select_slot(Utc.with_ymd_and_hms(2025, 6, 12, 14, 0, 0).unwrap()).unwrap();

    assert_matches!(wf.toggle_service(Uuid::new_v4()), Err(BookingError::CatalogUnavailable));
    assert!(!wf.can_submit());
}

#[tokio::test]
async fn test_booking_conflict_keeps_draft() {
    let mut setup = TestSetup::new().await;
    setup.sign_in(&TestUser::patient("ada@example.com"));
    let doctor = doctor_x();
    let service = Uuid::new_v4();

    mount_calendar(&setup.mock_server, doctor.id, &["2025-06-10"]).await;

    Mock::given(method("GET"))
        .and(path("/services"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::services_response(vec![
            MockPortalResponses::service(service, "Blood test", json!("5.50")),
        ])))
        .mount(&setup.mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appointments/slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockPortalResponses::slots_response(&[
            "2025-06-10T09:30:00.000Z",
        ])))
        .mount(&setup.mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockPortalResponses::error_response("Slot already booked")))
        .expect(1)
        .mount(&setup.mock_server)
        .await;

    let wf = &mut setup.workflow;
    wf.select_doctor(doctor).await;
    wf.select_date(day(2025, 6, 10)).await.unwrap();
    wf.select_slot(Utc.with_ymd_and_hms(2025, 6, 10, 9, 30, 0).unwrap()).unwrap();
    wf.toggle_service(service).unwrap();

    let result = wf.submit().await;

    assert_matches!(
        result,
        Err(BookingError::Api(ApiError::Server { status: 409, ref message })) if message == "Slot already booked"
    );
    assert_eq!(wf.stage(), BookingStage::SelectingServices);
    assert_eq!(wf.draft().service_ids, vec![service]);
    assert_eq!(wf.total_fee(), "5.50");
    assert!(wf.can_submit());
}

#[tokio::test]
async fn test_signed_out_user_gets_alerts_without_requests() {
    let mut setup = TestSetup::new().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&setup.mock_server)
        .await;

    let wf = &mut setup.workflow;
    wf.select_doctor(doctor_x()).await;

    assert_eq!(
        wf.take_alerts(),
        vec![AVAILABILITY_ALERT.to_string(), SERVICES_ALERT.to_string()]
    );
    assert_eq!(wf.calendar().error(), Some("Authentication error: No active session"));
    assert_eq!(wf.stage(), BookingStage::SelectingDate);
}
