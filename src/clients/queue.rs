//! Orchestrator work-queue client.
//!
//! Every processed message is tracked as a work item in the external
//! orchestrator so operators can see what a run touched and which items
//! ended in failure.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::clients::{WorkItemStatus, WorkQueue};
use crate::config::QueueSettings;
use crate::error::QueueError;

/// Name recorded as the creator of work items.
const CREATED_BY: &str = "refund-intake";

/// HTTP client for the orchestrator's work-queue API.
pub struct OrchestratorQueue {
    base_url: String,
    http: reqwest::Client,
    api_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct CreatedItem {
    id: String,
}

impl OrchestratorQueue {
    pub fn new(settings: &QueueSettings) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            api_key: settings.api_key.clone(),
        }
    }
}

#[async_trait::async_trait]
impl WorkQueue for OrchestratorQueue {
    async fn create_item(
        &self,
        queue: &str,
        reference: &str,
        payload: &str,
    ) -> Result<String, QueueError> {
        let url = format!("{}/queues/{queue}/items", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&serde_json::json!({
                "reference": reference,
                "payload": payload,
                "created_by": CREATED_BY,
            }))
            .send()
            .await
            .map_err(|e| QueueError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(QueueError::Http(format!(
                "work item creation returned {}",
                response.status()
            )));
        }

        let created: CreatedItem = response
            .json()
            .await
            .map_err(|e| QueueError::InvalidResponse(e.to_string()))?;
        Ok(created.id)
    }

    async fn set_item_status(
        &self,
        item_id: &str,
        status: WorkItemStatus,
    ) -> Result<(), QueueError> {
        let url = format!("{}/items/{item_id}", self.base_url);
        let response = self
            .http
            .patch(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .map_err(|e| QueueError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(QueueError::Http(format!(
                "status update of {item_id} returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
