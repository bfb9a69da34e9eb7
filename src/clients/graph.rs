//! Graph-style mail client — folder listing, relocation, MIME export.
//!
//! Folders are addressed by display-name paths ("Indbakke/Refusioner") and
//! resolved by walking the folder tree. Message bodies are taken from the
//! MIME export rather than the JSON listing so that plain-text extraction
//! sees exactly what was sent.

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::clients::{MailMessage, MailStore};
use crate::config::GraphSettings;
use crate::error::MailError;

/// Mail client against a Graph-style REST API.
pub struct GraphMail {
    base_url: String,
    mail_client: reqwest::Client,
    token: SecretString,
}

// ── Wire shapes ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Folder {
    id: String,
    #[serde(rename = "displayName")]
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct MessageMeta {
    id: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    sender: Option<Recipient>,
    #[serde(rename = "receivedDateTime")]
    received_date_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct Recipient {
    #[serde(rename = "emailAddress")]
    email_address: EmailAddress,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    address: String,
}

// ── Client ──────────────────────────────────────────────────────────

impl GraphMail {
    /// Authenticate with client credentials and return a ready client.
    pub async fn connect(settings: &GraphSettings) -> Result<Self, MailError> {
        let client = reqwest::Client::new();

        let response = client
            .post(&settings.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", settings.client_id.as_str()),
                ("client_secret", settings.client_secret.expose_secret()),
                ("scope", "https://graph.microsoft.com/.default"),
            ])
            .send()
            .await
            .map_err(|e| MailError::Auth {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(MailError::Auth {
                reason: format!("token endpoint returned {}", response.status()),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| MailError::Auth {
            reason: format!("malformed token response: {e}"),
        })?;

        tracing::debug!(base_url = %settings.base_url, "Mail service authenticated");

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            mail_client: client,
            token: token.access_token.into(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, MailError> {
        let response = self
            .mail_client
            .get(url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| MailError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MailError::Http(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| MailError::InvalidResponse(e.to_string()))
    }

    /// Resolve a display-name folder path to the service's folder id by
    /// walking the folder tree one segment at a time.
    async fn resolve_folder(&self, mailbox: &str, path: &str) -> Result<String, MailError> {
        let mut url = format!("{}/users/{mailbox}/mailFolders", self.base_url);
        let mut folder_id = None;

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let listing: Listing<Folder> = self.get_json(&url).await?;
            let found = listing
                .value
                .into_iter()
                .find(|f| f.display_name == segment)
                .ok_or_else(|| MailError::FolderNotFound {
                    folder: path.to_string(),
                })?;
            url = format!(
                "{}/users/{mailbox}/mailFolders/{}/childFolders",
                self.base_url, found.id
            );
            folder_id = Some(found.id);
        }

        folder_id.ok_or_else(|| MailError::FolderNotFound {
            folder: path.to_string(),
        })
    }

    async fn fetch_mime(&self, mailbox: &str, message_id: &str) -> Result<Vec<u8>, MailError> {
        let url = format!(
            "{}/users/{mailbox}/messages/{message_id}/$value",
            self.base_url
        );
        let response = self
            .mail_client
            .get(&url)
            .bearer_auth(self.token.expose_secret())
            .send()
            .await
            .map_err(|e| MailError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MailError::Http(format!(
                "MIME export of {message_id} returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| MailError::Http(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl MailStore for GraphMail {
    async fn list_folder(
        &self,
        mailbox: &str,
        folder: &str,
    ) -> Result<Vec<MailMessage>, MailError> {
        let folder_id = self.resolve_folder(mailbox, folder).await?;
        let url = format!(
            "{}/users/{mailbox}/mailFolders/{folder_id}/messages\
             ?$select=id,sender,subject,receivedDateTime&$top=100",
            self.base_url
        );
        let listing: Listing<MessageMeta> = self.get_json(&url).await?;

        let mut messages = Vec::with_capacity(listing.value.len());
        for meta in listing.value {
            let mime = self.fetch_mime(mailbox, &meta.id).await?;
            messages.push(MailMessage {
                id: meta.id,
                mailbox: mailbox.to_string(),
                sender: meta
                    .sender
                    .map(|s| s.email_address.address)
                    .unwrap_or_default(),
                subject: meta.subject.unwrap_or_default(),
                body: extract_body_text(&mime),
                received_at: meta.received_date_time,
                folder: folder.to_string(),
            });
        }

        tracing::debug!(folder, count = messages.len(), "Listed mail folder");
        Ok(messages)
    }

    async fn move_message(
        &self,
        message: &MailMessage,
        destination: &str,
    ) -> Result<(), MailError> {
        let destination_id = self.resolve_folder(&message.mailbox, destination).await?;
        let url = format!(
            "{}/users/{}/messages/{}/move",
            self.base_url, message.mailbox, message.id
        );

        let response = self
            .mail_client
            .post(&url)
            .bearer_auth(self.token.expose_secret())
            .json(&serde_json::json!({ "destinationId": destination_id }))
            .send()
            .await
            .map_err(|e| MailError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(MailError::Http(format!(
                "move of {} returned {}",
                message.id,
                response.status()
            )));
        }

        tracing::debug!(message_id = %message.id, destination, "Message moved");
        Ok(())
    }

    async fn export_mime(&self, message: &MailMessage) -> Result<Vec<u8>, MailError> {
        self.fetch_mime(&message.mailbox, &message.id).await
    }
}

// ── Body extraction ─────────────────────────────────────────────────

/// Plain-text body of a raw MIME message. Prefers the text part; falls back
/// to the HTML part with tags stripped; empty when neither parses.
pub fn extract_body_text(mime: &[u8]) -> String {
    let Some(parsed) = MessageParser::default().parse(mime) else {
        return String::new();
    };
    if let Some(text) = parsed.body_text(0) {
        return text.to_string();
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    String::new()
}

/// Drop HTML tags and collapse whitespace.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
