//! Port interfaces for the external services — pure I/O, no business logic.
//!
//! The pipeline only ever talks to these traits; the HTTP implementations
//! live alongside and are swapped for in-memory doubles in tests.

pub mod graph;
pub mod nova;
pub mod queue;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{CaseApiError, MailError, QueueError};
use crate::records::{CaseRecord, DocumentRecord, Identity, TaskRecord};

pub use graph::GraphMail;
pub use nova::NovaClient;
pub use queue::OrchestratorQueue;

// ── Mail ────────────────────────────────────────────────────────────

/// A message as seen in the mail store. The mail service owns the message
/// lifecycle; the pipeline only reads and requests relocation.
#[derive(Debug, Clone)]
pub struct MailMessage {
    /// Service-native message id.
    pub id: String,
    /// Mailbox the message lives in.
    pub mailbox: String,
    pub sender: String,
    pub subject: String,
    /// Plain-text body, HTML stripped on ingest.
    pub body: String,
    pub received_at: DateTime<Utc>,
    /// Folder path the message was listed from.
    pub folder: String,
}

/// Mail service contract.
#[async_trait]
pub trait MailStore: Send + Sync {
    /// List all messages in a folder. Filtering is the caller's job.
    async fn list_folder(&self, mailbox: &str, folder: &str)
    -> Result<Vec<MailMessage>, MailError>;

    /// Move a message to another folder in its mailbox.
    async fn move_message(&self, message: &MailMessage, destination: &str)
    -> Result<(), MailError>;

    /// Export a message as raw MIME bytes.
    async fn export_mime(&self, message: &MailMessage) -> Result<Vec<u8>, MailError>;
}

// ── Case management ─────────────────────────────────────────────────

/// Case-management service contract.
#[async_trait]
pub trait CaseApi: Send + Sync {
    /// All cases associated with a national identity number.
    async fn find_cases(&self, national_id: &str) -> Result<Vec<CaseRecord>, CaseApiError>;

    /// Submit a new case for creation.
    async fn create_case(&self, case: &CaseRecord) -> Result<(), CaseApiError>;

    /// Upload a file, returning the document id to reference it by.
    async fn upload_file(&self, content: Vec<u8>, filename: &str) -> Result<Uuid, CaseApiError>;

    /// Attach an uploaded document to a case.
    async fn attach_document(
        &self,
        case_id: Uuid,
        document: &DocumentRecord,
    ) -> Result<(), CaseApiError>;

    /// All tasks on a case.
    async fn find_tasks(&self, case_id: Uuid) -> Result<Vec<TaskRecord>, CaseApiError>;

    /// Attach a new task to a case.
    async fn create_task(&self, case_id: Uuid, task: &TaskRecord) -> Result<(), CaseApiError>;

    /// Update an existing task on a case.
    async fn update_task(&self, case_id: Uuid, task: &TaskRecord) -> Result<(), CaseApiError>;

    /// Look up a person in the service's identity registry.
    async fn resolve_identity(&self, national_id: &str) -> Result<Identity, CaseApiError>;
}

// ── Work queue ──────────────────────────────────────────────────────

/// Work item lifecycle states in the orchestrator queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkItemStatus {
    InProgress,
    Done,
    Failed,
}

/// Orchestrator work-queue contract.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Register a work item, returning its id.
    async fn create_item(
        &self,
        queue: &str,
        reference: &str,
        payload: &str,
    ) -> Result<String, QueueError>;

    /// Record a work item's terminal status.
    async fn set_item_status(&self, item_id: &str, status: WorkItemStatus)
    -> Result<(), QueueError>;
}
