//! Case-management client — cases, documents, tasks, identity lookup.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use uuid::Uuid;

use crate::clients::CaseApi;
use crate::config::NovaSettings;
use crate::error::CaseApiError;
use crate::records::{CaseRecord, DocumentRecord, Identity, TaskRecord};

/// HTTP client for the case-management service.
#[derive(Debug)]
pub struct NovaClient {
    base_url: String,
    http: reqwest::Client,
    token: SecretString,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct CaseListing {
    cases: Vec<CaseRecord>,
}

#[derive(Debug, Deserialize)]
struct TaskListing {
    tasks: Vec<TaskRecord>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: Uuid,
}

impl NovaClient {
    /// Authenticate with client credentials and return a ready client.
    pub async fn connect(settings: &NovaSettings) -> Result<Self, CaseApiError> {
        let http = reqwest::Client::new();

        let response = http
            .post(&settings.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", settings.client_id.as_str()),
                ("client_secret", settings.client_secret.expose_secret()),
            ])
            .send()
            .await
            .map_err(|e| CaseApiError::Auth {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(CaseApiError::Auth {
                reason: format!("token endpoint returned {}", response.status()),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| CaseApiError::Auth {
            reason: format!("malformed token response: {e}"),
        })?;

        tracing::debug!(base_url = %settings.base_url, "Case service authenticated");

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            http,
            token: token.access_token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, CaseApiError> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| CaseApiError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CaseApiError::Http(format!(
                "GET {path} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| CaseApiError::InvalidResponse(e.to_string()))
    }

    async fn post_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<(), CaseApiError> {
        self.send_json(reqwest::Method::POST, path, body).await
    }

    async fn put_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<(), CaseApiError> {
        self.send_json(reqwest::Method::PUT, path, body).await
    }

    async fn send_json<B: serde::Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<(), CaseApiError> {
        let url = self.url(path);
        let response = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(self.token.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| CaseApiError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CaseApiError::Http(format!(
                "{method} {path} returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CaseApi for NovaClient {
    async fn find_cases(&self, national_id: &str) -> Result<Vec<CaseRecord>, CaseApiError> {
        let listing: CaseListing = self
            .get_json(&format!("/cases?identity={national_id}"))
            .await?;
        Ok(listing.cases)
    }

    async fn create_case(&self, case: &CaseRecord) -> Result<(), CaseApiError> {
        self.post_json("/cases", case).await
    }

    async fn upload_file(&self, content: Vec<u8>, filename: &str) -> Result<Uuid, CaseApiError> {
        let part = reqwest::multipart::Part::bytes(content).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(self.url("/documents/files"))
            .bearer_auth(self.token.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| CaseApiError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CaseApiError::Http(format!(
                "file upload returned {}",
                response.status()
            )));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| CaseApiError::InvalidResponse(e.to_string()))?;
        Ok(uploaded.id)
    }

    async fn attach_document(
        &self,
        case_id: Uuid,
        document: &DocumentRecord,
    ) -> Result<(), CaseApiError> {
        self.post_json(&format!("/cases/{case_id}/documents"), document)
            .await
    }

    async fn find_tasks(&self, case_id: Uuid) -> Result<Vec<TaskRecord>, CaseApiError> {
        let listing: TaskListing = self.get_json(&format!("/cases/{case_id}/tasks")).await?;
        Ok(listing.tasks)
    }

    async fn create_task(&self, case_id: Uuid, task: &TaskRecord) -> Result<(), CaseApiError> {
        self.post_json(&format!("/cases/{case_id}/tasks"), task).await
    }

    async fn update_task(&self, case_id: Uuid, task: &TaskRecord) -> Result<(), CaseApiError> {
        self.put_json(&format!("/cases/{case_id}/tasks/{}", task.id), task)
            .await
    }

    async fn resolve_identity(&self, national_id: &str) -> Result<Identity, CaseApiError> {
        self.get_json(&format!("/identities/{national_id}")).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::records::{CaseParty, CaseState, Caseworker, Department, TaskStatus};

    async fn connected_client(server: &MockServer) -> NovaClient {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "access_token": "test-token" })),
            )
            .mount(server)
            .await;

        let settings = NovaSettings {
            base_url: server.uri(),
            token_url: format!("{}/token", server.uri()),
            client_id: "client".into(),
            client_secret: "secret".to_string().into(),
        };
        NovaClient::connect(&settings).await.unwrap()
    }

    fn sample_case() -> CaseRecord {
        CaseRecord {
            id: Uuid::new_v4(),
            title: "Refusion af lægeregninger".into(),
            state: CaseState::Active,
            kle_number: "29.03.14".into(),
            proceeding_facet: "G01".into(),
            case_date: Utc::now(),
            sensitivity: "Følsomme".into(),
            caseworker: Caseworker {
                id: Uuid::new_v4(),
                name: "Test Sagsbehandler".into(),
                ident: "az99999".into(),
            },
            department: Department {
                id: 70403,
                name: "Folkeregister".into(),
                user_key: "4BFOLKEREG".into(),
            },
            security_unit: Department {
                id: 70403,
                name: "Folkeregister".into(),
                user_key: "4BFOLKEREG".into(),
            },
            parties: vec![CaseParty {
                role: "Primær".into(),
                identification_type: "CprNummer".into(),
                identification: "0101001234".into(),
                name: Some("Test Testersen".into()),
            }],
        }
    }

    #[tokio::test]
    async fn bad_token_response_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let settings = NovaSettings {
            base_url: server.uri(),
            token_url: format!("{}/token", server.uri()),
            client_id: "client".into(),
            client_secret: "secret".to_string().into(),
        };
        let err = NovaClient::connect(&settings).await.unwrap_err();
        assert!(matches!(err, CaseApiError::Auth { .. }));
    }

    #[tokio::test]
    async fn find_cases_round_trips_records() {
        let server = MockServer::start().await;
        let client = connected_client(&server).await;
        let case = sample_case();

        Mock::given(method("GET"))
            .and(path("/cases"))
            .and(query_param("identity", "0101001234"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "cases": [case] })),
            )
            .mount(&server)
            .await;

        let cases = client.find_cases("0101001234").await.unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id, case.id);
        assert_eq!(cases[0].state, CaseState::Active);
    }

    #[tokio::test]
    async fn upload_file_returns_document_id() {
        let server = MockServer::start().await;
        let client = connected_client(&server).await;
        let document_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/documents/files"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "id": document_id })),
            )
            .mount(&server)
            .await;

        let id = client
            .upload_file(b"mime bytes".to_vec(), "ansøgning.eml")
            .await
            .unwrap();
        assert_eq!(id, document_id);
    }

    #[tokio::test]
    async fn update_task_puts_to_task_path() {
        let server = MockServer::start().await;
        let client = connected_client(&server).await;
        let case_id = Uuid::new_v4();
        let task = TaskRecord {
            id: Uuid::new_v4(),
            title: "NYT".into(),
            status: TaskStatus::New,
            deadline: Utc::now().date_naive(),
            caseworker_id: Uuid::new_v4(),
        };

        Mock::given(method("PUT"))
            .and(path(format!("/cases/{case_id}/tasks/{}", task.id)))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client.update_task(case_id, &task).await.unwrap();
    }

    #[tokio::test]
    async fn server_error_surfaces_as_http_error() {
        let server = MockServer::start().await;
        let client = connected_client(&server).await;

        Mock::given(method("GET"))
            .and(path("/identities/0101001234"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client.resolve_identity("0101001234").await.unwrap_err();
        assert!(matches!(err, CaseApiError::Http(_)));
    }
}
