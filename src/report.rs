//! Run status notification.
//!
//! One plain-text mail per run, sent through the internal relay. The relay
//! speaks plaintext SMTP upgraded with STARTTLS and takes no credentials.

use chrono::Utc;
use lettre::message::Mailbox;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use tracing::{info, warn};

use crate::config::SmtpSettings;
use crate::error::ReportError;

/// Sends the end-of-run summary mail.
pub struct RunReporter {
    host: String,
    port: u16,
    sender: String,
}

impl RunReporter {
    pub fn new(smtp: &SmtpSettings, sender: String) -> Self {
        Self {
            host: smtp.host.clone(),
            port: smtp.port,
            sender,
        }
    }

    /// Send the summary to the configured receivers. Runs once per run,
    /// also when zero messages were processed.
    pub fn send_summary(&self, processed: usize, receivers: &[String]) -> Result<(), ReportError> {
        if receivers.is_empty() {
            warn!("No status receivers configured; skipping summary mail");
            return Ok(());
        }

        let message = build_summary(&self.sender, receivers, processed)?;

        let tls = TlsParameters::new(self.host.clone())
            .map_err(|e| ReportError::Smtp(e.to_string()))?;
        let transport = SmtpTransport::builder_dangerous(self.host.as_str())
            .port(self.port)
            .tls(Tls::Required(tls))
            .build();

        transport
            .send(&message)
            .map_err(|e| ReportError::Smtp(e.to_string()))?;

        info!(processed, receivers = receivers.len(), "Status mail sent");
        Ok(())
    }
}

/// Subject template: fixed text plus the run date.
fn summary_subject() -> String {
    format!(
        "Status på journalisering af refusionsanmodninger {}",
        Utc::now().date_naive()
    )
}

/// Body template with the processed count.
fn summary_body(processed: usize) -> String {
    format!(
        "Antal anmodninger journaliseret i dagens kørsel: {processed}\n\nVenlig hilsen\nRobotten"
    )
}

/// Assemble the summary mail for the given receivers.
fn build_summary(
    sender: &str,
    receivers: &[String],
    processed: usize,
) -> Result<Message, ReportError> {
    let parse = |address: &str| -> Result<Mailbox, ReportError> {
        address.parse().map_err(|e: lettre::address::AddressError| {
            ReportError::Address {
                address: address.to_string(),
                reason: e.to_string(),
            }
        })
    };

    let mut builder = Message::builder()
        .from(parse(sender)?)
        .subject(summary_subject());
    for receiver in receivers {
        builder = builder.to(parse(receiver)?);
    }

    builder
        .body(summary_body(processed))
        .map_err(|e| ReportError::Build(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_carries_current_date() {
        let subject = summary_subject();
        assert!(subject.starts_with("Status på journalisering af refusionsanmodninger"));
        assert!(subject.ends_with(&Utc::now().date_naive().to_string()));
    }

    #[test]
    fn body_states_processed_count() {
        let body = summary_body(7);
        assert!(body.contains("dagens kørsel: 7"));
    }

    #[test]
    fn summary_addresses_every_receiver() {
        let message = build_summary(
            "intake@aarhus.dk",
            &["a@aarhus.dk".to_string(), "b@aarhus.dk".to_string()],
            0,
        )
        .unwrap();

        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("a@aarhus.dk"));
        assert!(raw.contains("b@aarhus.dk"));
    }

    #[test]
    fn invalid_receiver_address_is_an_error() {
        let err = build_summary("intake@aarhus.dk", &["ikke en adresse".to_string()], 0)
            .unwrap_err();
        assert!(matches!(err, ReportError::Address { .. }));
    }
}
