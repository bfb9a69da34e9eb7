//! Case, task, and document records exchanged with the case-management service.
//!
//! These are wire shapes: the service owns the record lifecycle, the pipeline
//! only submits create/update requests and never caches records across runs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Case ────────────────────────────────────────────────────────────

/// Lifecycle state of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseState {
    Active,
    Inactive,
}

/// A person or organization attached to a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseParty {
    /// Party role, e.g. "Primær".
    pub role: String,
    /// Identity scheme, e.g. "CprNummer".
    pub identification_type: String,
    /// Identity value under that scheme.
    pub identification: String,
    /// Display name. May be absent on records created by other systems.
    pub name: Option<String>,
}

/// The caseworker a case or task is assigned to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caseworker {
    pub id: Uuid,
    pub name: String,
    /// Short login ident, e.g. "az12345".
    pub ident: String,
}

/// An organizational unit in the case service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: u32,
    pub name: String,
    pub user_key: String,
}

/// A case record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: Uuid,
    pub title: String,
    pub state: CaseState,
    /// Categorical classifier, e.g. "29.03.14".
    pub kle_number: String,
    pub proceeding_facet: String,
    pub case_date: DateTime<Utc>,
    pub sensitivity: String,
    pub caseworker: Caseworker,
    pub department: Department,
    pub security_unit: Department,
    pub parties: Vec<CaseParty>,
}

// ── Task ────────────────────────────────────────────────────────────

/// Task status codes as the case service encodes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    #[serde(rename = "N")]
    New,
    #[serde(rename = "S")]
    Started,
    #[serde(rename = "F")]
    Finished,
}

impl TaskStatus {
    /// A task is open until it reaches the terminal Finished state.
    pub fn is_open(self) -> bool {
        self != Self::Finished
    }
}

/// A follow-up task attached to a case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub title: String,
    pub status: TaskStatus,
    pub deadline: NaiveDate,
    pub caseworker_id: Uuid,
}

// ── Document ────────────────────────────────────────────────────────

/// An evidence document attached to a case.
///
/// Documents are created once per processed message and never updated or
/// deduplicated; relocating the message is what prevents duplicates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Identifier returned by the file upload.
    pub id: Uuid,
    pub title: String,
    pub sensitivity: String,
    /// Direction classifier, e.g. "Indgående".
    pub document_type: String,
    pub document_date: DateTime<Utc>,
    pub approved: bool,
    pub description: String,
    pub caseworker_id: Uuid,
}

// ── Identity ────────────────────────────────────────────────────────

/// Result of an identity lookup in the case service's person registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}
