//! Task reconciler — keeps at most one open follow-up task per case.
//!
//! When the same applicant submits again before the first application is
//! handled, the existing open task is reused instead of creating a second
//! follow-up. What happens to its deadline is governed by [`DeadlinePolicy`].

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clients::CaseApi;
use crate::error::CaseApiError;
use crate::records::{TaskRecord, TaskStatus};

/// Title given to a newly created follow-up task.
const NEW_TASK_TITLE: &str = "NYT";
/// Prefix marking a task whose deadline was refreshed.
const RENEWED_PREFIX: &str = "RNYT";

/// How an existing open task's deadline reacts to a new application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeadlinePolicy {
    /// Only ever shorten the deadline; new evidence never pushes it later.
    #[default]
    TightenOnly,
    /// Unconditionally set the candidate deadline and mark the task renewed.
    AlwaysRefresh,
}

impl std::str::FromStr for DeadlinePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tighten" => Ok(Self::TightenOnly),
            "refresh" => Ok(Self::AlwaysRefresh),
            other => Err(format!(
                "unknown deadline policy {other:?} (expected \"tighten\" or \"refresh\")"
            )),
        }
    }
}

/// What the reconciler did to the case's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// No open task existed; a new one was created.
    Created(Uuid),
    /// The open task's deadline was pulled earlier.
    Tightened(Uuid),
    /// The open task was refreshed with the candidate deadline.
    Refreshed(Uuid),
    /// The open task already had an equal or earlier deadline; no I/O.
    Unchanged(Uuid),
}

/// Reconciles the follow-up task on a case against a candidate deadline.
pub struct TaskReconciler {
    cases: Arc<dyn CaseApi>,
    policy: DeadlinePolicy,
    caseworker_id: Uuid,
}

impl TaskReconciler {
    pub fn new(cases: Arc<dyn CaseApi>, policy: DeadlinePolicy, caseworker_id: Uuid) -> Self {
        Self {
            cases,
            policy,
            caseworker_id,
        }
    }

    /// Ensure the case has exactly one open task and apply the deadline
    /// policy to it.
    pub async fn reconcile(
        &self,
        case_id: Uuid,
        candidate: NaiveDate,
    ) -> Result<TaskOutcome, CaseApiError> {
        let tasks = self.cases.find_tasks(case_id).await?;
        let open = tasks.into_iter().find(|t| t.status.is_open());

        let Some(mut task) = open else {
            let task = TaskRecord {
                id: Uuid::new_v4(),
                title: NEW_TASK_TITLE.into(),
                status: TaskStatus::New,
                deadline: candidate,
                caseworker_id: self.caseworker_id,
            };
            self.cases.create_task(case_id, &task).await?;
            info!(case_id = %case_id, task_id = %task.id, deadline = %candidate, "Created follow-up task");
            return Ok(TaskOutcome::Created(task.id));
        };

        match self.policy {
            DeadlinePolicy::TightenOnly => {
                if task.deadline > candidate {
                    task.deadline = candidate;
                    self.cases.update_task(case_id, &task).await?;
                    info!(case_id = %case_id, task_id = %task.id, deadline = %candidate, "Tightened task deadline");
                    Ok(TaskOutcome::Tightened(task.id))
                } else {
                    debug!(case_id = %case_id, task_id = %task.id, "Open task deadline already tight enough");
                    Ok(TaskOutcome::Unchanged(task.id))
                }
            }
            DeadlinePolicy::AlwaysRefresh => {
                task.deadline = candidate;
                task.title = format!("{RENEWED_PREFIX} {}", task.title);
                self.cases.update_task(case_id, &task).await?;
                info!(case_id = %case_id, task_id = %task.id, deadline = %candidate, "Refreshed task deadline");
                Ok(TaskOutcome::Refreshed(task.id))
            }
        }
    }
}
