use std::sync::Arc;

use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use shared_api_client::{require_token, PortalClient};
use shared_models::auth::SessionProvider;
use shared_models::error::ApiError;

use crate::models::{ClassificationPayload, DepartmentRecommendation};

/// Routes a patient's description of their issue to a department using the
/// portal's classification endpoint.
pub struct DepartmentMatchingService {
    client: Arc<PortalClient>,
    session: Arc<dyn SessionProvider>,
}

impl DepartmentMatchingService {
    pub fn new(client: Arc<PortalClient>, session: Arc<dyn SessionProvider>) -> Self {
        Self { client, session }
    }

    pub async fn recommend_department(&self, description: &str) -> Result<DepartmentRecommendation, ApiError> {
        let text = description.trim();
        if text.is_empty() {
            return Err(ApiError::Validation("Describe the issue before asking for a department".to_string()));
        }

        let token = require_token(self.session.as_ref())?;
        debug!("Classifying issue description ({} chars)", text.len());

        let payload: ClassificationPayload = self.client
            .send_json(Method::POST, "/api/ai/classify", Some(&token), json!({ "text": text }))
            .await?;

        let recommendation = DepartmentRecommendation::from(payload);
        info!("Recommended department {}", recommendation.department_id);
        Ok(recommendation)
    }
}
