//! Intake orchestrator — drives one unattended run end to end.
//!
//! Per message the steps run strictly in order, and relocation out of the
//! intake folder comes last: a message is only moved once every record
//! mutation for it succeeded, so anything that failed mid-way is re-listed
//! on the next run. One bad message never blocks the rest of the batch.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::clients::{CaseApi, MailMessage, MailStore, WorkItemStatus, WorkQueue};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::extract::extract_fields;
use crate::pipeline::documents::{DocumentAttacher, document_title};
use crate::pipeline::resolve::CaseResolver;
use crate::pipeline::tasks::TaskReconciler;

/// Stages a message passes through, in order. Used for progress logging;
/// each stage is backed by a separately testable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStage {
    Extracted,
    CaseResolved,
    DocumentAttached,
    TaskReconciled,
    Relocated,
    Recorded,
}

impl ItemStage {
    /// Every stage in processing order.
    pub const ALL: [Self; 6] = [
        Self::Extracted,
        Self::CaseResolved,
        Self::DocumentAttached,
        Self::TaskReconciled,
        Self::Relocated,
        Self::Recorded,
    ];

    /// Short label for logging.
    pub fn label(self) -> &'static str {
        match self {
            Self::Extracted => "extracted",
            Self::CaseResolved => "case_resolved",
            Self::DocumentAttached => "document_attached",
            Self::TaskReconciled => "task_reconciled",
            Self::Relocated => "relocated",
            Self::Recorded => "recorded",
        }
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    /// Messages fully processed and relocated.
    pub processed: usize,
    /// Messages that failed part-way and stay in the intake folder.
    pub failed: usize,
}

/// Orchestrates listing, per-message processing, and queue bookkeeping.
pub struct IntakePipeline {
    mail: Arc<dyn MailStore>,
    queue: Arc<dyn WorkQueue>,
    resolver: CaseResolver,
    reconciler: TaskReconciler,
    attacher: DocumentAttacher,
    mailbox: String,
    source_folder: String,
    destination_folder: String,
    sender_filter: String,
    subject_filter: String,
    queue_name: String,
}

impl IntakePipeline {
    pub fn new(
        mail: Arc<dyn MailStore>,
        cases: Arc<dyn CaseApi>,
        queue: Arc<dyn WorkQueue>,
        settings: &Settings,
    ) -> Self {
        let resolver = CaseResolver::new(
            Arc::clone(&cases),
            settings.case_profile.clone(),
            settings.caseworker.clone(),
            settings.department.clone(),
            settings.security_unit.clone(),
        );
        let reconciler = TaskReconciler::new(
            Arc::clone(&cases),
            settings.deadline_policy,
            settings.caseworker.id,
        );
        let attacher = DocumentAttacher::new(
            Arc::clone(&mail),
            cases,
            settings.caseworker.id,
            settings.case_profile.sensitivity.clone(),
        );

        Self {
            mail,
            queue,
            resolver,
            reconciler,
            attacher,
            mailbox: settings.mailbox.clone(),
            source_folder: settings.source_folder.clone(),
            destination_folder: settings.destination_folder.clone(),
            sender_filter: settings.sender_filter.clone(),
            subject_filter: settings.subject_filter.clone(),
            queue_name: settings.queue_name.clone(),
        }
    }

    /// Process every candidate message currently in the intake folder.
    ///
    /// Per-message failures are logged and counted but do not abort the
    /// batch; a run-level failure (listing itself) propagates.
    pub async fn run(&self) -> Result<RunSummary> {
        let listed = self
            .mail
            .list_folder(&self.mailbox, &self.source_folder)
            .await?;
        let total = listed.len();

        let candidates: Vec<MailMessage> = listed
            .into_iter()
            .filter(|m| m.sender == self.sender_filter && m.subject == self.subject_filter)
            .collect();

        info!(
            listed = total,
            matched = candidates.len(),
            folder = %self.source_folder,
            "Intake run started"
        );

        let mut summary = RunSummary::default();
        for message in &candidates {
            match self.process_message(message).await {
                Ok(()) => summary.processed += 1,
                Err(e) => {
                    summary.failed += 1;
                    error!(
                        message_id = %message.id,
                        error = %e,
                        "Message failed; leaving it for the next run"
                    );
                }
            }
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            "Intake run finished"
        );
        Ok(summary)
    }

    /// Run one message through every stage. The message is relocated, and
    /// its work item marked done, only when all prior stages succeeded.
    async fn process_message(&self, message: &MailMessage) -> Result<()> {
        let fields = extract_fields(&message.body)?;
        self.stage_done(message, ItemStage::Extracted);

        let payload = serde_json::to_string(&fields.references)
            .map_err(crate::error::QueueError::Payload)?;
        let item_id = self
            .queue
            .create_item(&self.queue_name, &fields.national_id, &payload)
            .await?;

        let outcome: Result<()> = async {
            let case = self.resolver.resolve(&fields.national_id).await?;
            self.stage_done(message, ItemStage::CaseResolved);

            let title = document_title(&fields.references);
            self.attacher.attach(&title, message, case.id).await?;
            self.stage_done(message, ItemStage::DocumentAttached);

            self.reconciler
                .reconcile(case.id, Utc::now().date_naive())
                .await
                .map_err(Error::CaseApi)?;
            self.stage_done(message, ItemStage::TaskReconciled);

            self.mail
                .move_message(message, &self.destination_folder)
                .await?;
            self.stage_done(message, ItemStage::Relocated);
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => {
                self.queue
                    .set_item_status(&item_id, WorkItemStatus::Done)
                    .await?;
                self.stage_done(message, ItemStage::Recorded);
                Ok(())
            }
            Err(e) => {
                if let Err(queue_err) = self
                    .queue
                    .set_item_status(&item_id, WorkItemStatus::Failed)
                    .await
                {
                    warn!(
                        item_id = %item_id,
                        error = %queue_err,
                        "Could not mark work item failed"
                    );
                }
                Err(e)
            }
        }
    }

    fn stage_done(&self, message: &MailMessage, stage: ItemStage) {
        debug!(message_id = %message.id, stage = stage.label(), "Stage complete");
    }
}
