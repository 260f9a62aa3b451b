use std::sync::Arc;

use tracing::debug;

use shared_api_client::{require_token, PortalClient};
use shared_models::auth::SessionProvider;
use shared_models::error::ApiError;

use crate::models::{HistoryEntry, HistoryPayload, MedicalRecord, RecordPayload};

/// The signed-in patient's own record and its change history.
pub struct RecordService {
    client: Arc<PortalClient>,
    session: Arc<dyn SessionProvider>,
}

impl RecordService {
    pub fn new(client: Arc<PortalClient>, session: Arc<dyn SessionProvider>) -> Self {
        Self { client, session }
    }

    pub async fn my_record(&self) -> Result<Option<MedicalRecord>, ApiError> {
        let token = require_token(self.session.as_ref())?;

        let payload: RecordPayload = self.client
            .get("/user/record", Some(&token), &[])
            .await?;

        Ok(payload.record)
    }

    /// Newest change first.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>, ApiError> {
        let token = require_token(self.session.as_ref())?;

        let payload: HistoryPayload = self.client
            .get("/history", Some(&token), &[])
            .await?;

        let mut history = payload.history;
        history.sort_by(|a, b| b.change_timestamp.cmp(&a.change_timestamp));
        debug!("Loaded {} history entries", history.len());
        Ok(history)
    }
}
