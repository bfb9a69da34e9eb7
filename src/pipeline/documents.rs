//! Document attacher — journals the source email on the case.
//!
//! No dedup check happens here. A message is exported and attached at most
//! once per run because relocation out of the intake folder is what keeps
//! it from being listed again; if a later step fails and the message stays,
//! the next run will attach a second copy. Accepted.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::clients::{CaseApi, MailMessage, MailStore};
use crate::error::Result;
use crate::records::DocumentRecord;

/// Direction classifier for inbound evidence documents.
const DOCUMENT_TYPE: &str = "Indgående";
/// Fixed description on journaled documents.
const DOCUMENT_DESCRIPTION: &str = "Automatisk journaliseret.";

/// Uploads the source message and registers it as a case document.
pub struct DocumentAttacher {
    mail: Arc<dyn MailStore>,
    cases: Arc<dyn CaseApi>,
    caseworker_id: Uuid,
    sensitivity: String,
}

impl DocumentAttacher {
    pub fn new(
        mail: Arc<dyn MailStore>,
        cases: Arc<dyn CaseApi>,
        caseworker_id: Uuid,
        sensitivity: String,
    ) -> Self {
        Self {
            mail,
            cases,
            caseworker_id,
            sensitivity,
        }
    }

    /// Export the message as MIME, upload it, and attach the resulting
    /// document to the case.
    pub async fn attach(
        &self,
        title: &str,
        message: &MailMessage,
        case_id: Uuid,
    ) -> Result<DocumentRecord> {
        let mime = self.mail.export_mime(message).await?;
        let file_id = self
            .cases
            .upload_file(mime, &format!("{title}.eml"))
            .await?;

        let document = DocumentRecord {
            id: file_id,
            title: title.to_string(),
            sensitivity: self.sensitivity.clone(),
            document_type: DOCUMENT_TYPE.into(),
            document_date: message.received_at,
            approved: true,
            description: DOCUMENT_DESCRIPTION.into(),
            caseworker_id: self.caseworker_id,
        };

        self.cases.attach_document(case_id, &document).await?;
        debug!(case_id = %case_id, document_id = %document.id, title, "Document attached");
        Ok(document)
    }
}

/// Display title for the journaled application, listing every invoice
/// reference it covers.
pub fn document_title(references: &[String]) -> String {
    format!("Ansøgning om refusion [{}]", references.join(", "))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::error::{CaseApiError, MailError};
    use crate::records::{CaseRecord, Identity, TaskRecord};

    struct FakeMail {
        mime: Vec<u8>,
    }

    #[async_trait::async_trait]
    impl MailStore for FakeMail {
        async fn list_folder(&self, _: &str, _: &str) -> Result<Vec<MailMessage>, MailError> {
            unimplemented!("not used by the attacher")
        }

        async fn move_message(&self, _: &MailMessage, _: &str) -> Result<(), MailError> {
            unimplemented!("not used by the attacher")
        }

        async fn export_mime(&self, _: &MailMessage) -> Result<Vec<u8>, MailError> {
            Ok(self.mime.clone())
        }
    }

    #[derive(Default)]
    struct FakeDocApi {
        uploads: Mutex<Vec<(Vec<u8>, String)>>,
        attached: Mutex<Vec<(Uuid, DocumentRecord)>>,
    }

    #[async_trait::async_trait]
    impl CaseApi for FakeDocApi {
        async fn find_cases(&self, _: &str) -> Result<Vec<CaseRecord>, CaseApiError> {
            unimplemented!("not used by the attacher")
        }

        async fn create_case(&self, _: &CaseRecord) -> Result<(), CaseApiError> {
            unimplemented!("not used by the attacher")
        }

        async fn upload_file(&self, content: Vec<u8>, filename: &str) -> Result<Uuid, CaseApiError> {
            self.uploads
                .lock()
                .unwrap()
                .push((content, filename.to_string()));
            Ok(Uuid::new_v4())
        }

        async fn attach_document(
            &self,
            case_id: Uuid,
            document: &DocumentRecord,
        ) -> Result<(), CaseApiError> {
            self.attached
                .lock()
                .unwrap()
                .push((case_id, document.clone()));
            Ok(())
        }

        async fn find_tasks(&self, _: Uuid) -> Result<Vec<TaskRecord>, CaseApiError> {
            unimplemented!("not used by the attacher")
        }

        async fn create_task(&self, _: Uuid, _: &TaskRecord) -> Result<(), CaseApiError> {
            unimplemented!("not used by the attacher")
        }

        async fn update_task(&self, _: Uuid, _: &TaskRecord) -> Result<(), CaseApiError> {
            unimplemented!("not used by the attacher")
        }

        async fn resolve_identity(&self, _: &str) -> Result<Identity, CaseApiError> {
            unimplemented!("not used by the attacher")
        }
    }

    fn message() -> MailMessage {
        MailMessage {
            id: "msg-1".into(),
            mailbox: "intake@aarhus.dk".into(),
            sender: "noreply@aarhus.dk".into(),
            subject: "Refusion".into(),
            body: "CPR-nummer0101001234".into(),
            received_at: Utc::now(),
            folder: "Indbakke/Refusioner".into(),
        }
    }

    #[tokio::test]
    async fn attach_uploads_mime_under_eml_name_and_links_document() {
        let mail = Arc::new(FakeMail {
            mime: b"raw mime".to_vec(),
        });
        let api = Arc::new(FakeDocApi::default());
        let attacher = DocumentAttacher::new(mail, api.clone(), Uuid::new_v4(), "Følsomme".into());
        let case_id = Uuid::new_v4();
        let msg = message();

        let document = attacher
            .attach("Ansøgning om refusion [INV-1]", &msg, case_id)
            .await
            .unwrap();

        let uploads = api.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, b"raw mime");
        assert_eq!(uploads[0].1, "Ansøgning om refusion [INV-1].eml");

        let attached = api.attached.lock().unwrap();
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].0, case_id);
        assert_eq!(attached[0].1.id, document.id);
        assert_eq!(attached[0].1.document_type, "Indgående");
        assert!(attached[0].1.approved);
        assert_eq!(attached[0].1.document_date, msg.received_at);
    }

    #[test]
    fn document_title_joins_references() {
        assert_eq!(
            document_title(&["INV-1".into(), "INV-2".into()]),
            "Ansøgning om refusion [INV-1, INV-2]"
        );
        assert_eq!(document_title(&[]), "Ansøgning om refusion []");
    }
}
