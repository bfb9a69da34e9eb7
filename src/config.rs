//! Process configuration.
//!
//! Everything the pipeline needs is resolved up front into an immutable
//! [`Settings`] value and threaded into the components explicitly; nothing
//! reads the environment after startup. Run-scoped values the orchestration
//! runner varies per run (recipients, caseworker/department overrides)
//! arrive as a JSON [`ProcessArgs`] document.

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::pipeline::tasks::DeadlinePolicy;
use crate::records::{CaseRecord, CaseState, Caseworker, Department};

// ── Settings ────────────────────────────────────────────────────────

/// Immutable per-process configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Mailbox the intake folder lives in.
    pub mailbox: String,
    /// Folder that receives new applications.
    pub source_folder: String,
    /// Folder processed messages are moved to.
    pub destination_folder: String,
    /// Only messages from exactly this sender are processed.
    pub sender_filter: String,
    /// Only messages with exactly this subject are processed.
    pub subject_filter: String,
    /// Work-queue name items are registered under.
    pub queue_name: String,
    /// The canonical case this pipeline manages.
    pub case_profile: CaseProfile,
    pub caseworker: Caseworker,
    pub department: Department,
    pub security_unit: Department,
    pub deadline_policy: DeadlinePolicy,
    pub graph: GraphSettings,
    pub nova: NovaSettings,
    pub queue: QueueSettings,
    pub smtp: SmtpSettings,
    /// From-address on the status notification.
    pub status_sender: String,
}

/// The case title, classification, and sensitivity the pipeline looks for
/// and creates. This is the canonical-case predicate as configuration: a
/// deployment that changes it simply starts matching under the new values.
#[derive(Debug, Clone)]
pub struct CaseProfile {
    pub title: String,
    pub kle_number: String,
    pub proceeding_facet: String,
    pub sensitivity: String,
}

impl CaseProfile {
    /// Whether an existing case satisfies the canonical predicate.
    pub fn matches(&self, case: &CaseRecord) -> bool {
        case.title == self.title
            && case.kle_number == self.kle_number
            && case.state == CaseState::Active
    }
}

/// Mail service (Graph-style) endpoint and credentials.
#[derive(Debug, Clone)]
pub struct GraphSettings {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Case-management service endpoint and credentials.
#[derive(Debug, Clone)]
pub struct NovaSettings {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Orchestrator work-queue endpoint.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    pub base_url: String,
    pub api_key: SecretString,
}

/// Status-mail relay. The relay requires STARTTLS but no authentication.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
}

impl Settings {
    /// Build settings from environment variables.
    ///
    /// Service endpoints, credentials, and deployment identities are
    /// required; the domain constants (folders, filters, case profile)
    /// default to the production values and can be overridden.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            mailbox: required("INTAKE_MAILBOX")?,
            source_folder: var_or("INTAKE_SOURCE_FOLDER", "Indbakke/Refusioner"),
            destination_folder: var_or(
                "INTAKE_DESTINATION_FOLDER",
                "Indbakke/Refusioner/Journaliserede ansøgninger",
            ),
            sender_filter: var_or("INTAKE_SENDER_FILTER", "noreply@aarhus.dk"),
            subject_filter: var_or(
                "INTAKE_SUBJECT_FILTER",
                "Refusion sikringsgruppe 2 (fra Selvbetjening.aarhuskommune.dk)",
            ),
            queue_name: var_or(
                "INTAKE_QUEUE_NAME",
                "Journalisering af anmodninger om refusion",
            ),
            case_profile: CaseProfile {
                title: var_or("INTAKE_CASE_TITLE", "Refusion af lægeregninger"),
                kle_number: var_or("INTAKE_CASE_KLE", "29.03.14"),
                proceeding_facet: var_or("INTAKE_CASE_FACET", "G01"),
                sensitivity: var_or("INTAKE_CASE_SENSITIVITY", "Følsomme"),
            },
            caseworker: Caseworker {
                id: parse_var("INTAKE_CASEWORKER_ID", required("INTAKE_CASEWORKER_ID")?)?,
                name: required("INTAKE_CASEWORKER_NAME")?,
                ident: required("INTAKE_CASEWORKER_IDENT")?,
            },
            department: Department {
                id: parse_var("INTAKE_DEPARTMENT_ID", required("INTAKE_DEPARTMENT_ID")?)?,
                name: required("INTAKE_DEPARTMENT_NAME")?,
                user_key: required("INTAKE_DEPARTMENT_USER_KEY")?,
            },
            security_unit: Department {
                id: parse_var(
                    "INTAKE_SECURITY_UNIT_ID",
                    required("INTAKE_SECURITY_UNIT_ID")?,
                )?,
                name: required("INTAKE_SECURITY_UNIT_NAME")?,
                user_key: required("INTAKE_SECURITY_UNIT_USER_KEY")?,
            },
            deadline_policy: parse_var(
                "INTAKE_DEADLINE_POLICY",
                var_or("INTAKE_DEADLINE_POLICY", "tighten"),
            )?,
            graph: GraphSettings {
                base_url: required("GRAPH_BASE_URL")?,
                token_url: required("GRAPH_TOKEN_URL")?,
                client_id: required("GRAPH_CLIENT_ID")?,
                client_secret: required("GRAPH_CLIENT_SECRET")?.into(),
            },
            nova: NovaSettings {
                base_url: required("NOVA_BASE_URL")?,
                token_url: required("NOVA_TOKEN_URL")?,
                client_id: required("NOVA_CLIENT_ID")?,
                client_secret: required("NOVA_CLIENT_SECRET")?.into(),
            },
            queue: QueueSettings {
                base_url: required("QUEUE_BASE_URL")?,
                api_key: required("QUEUE_API_KEY")?.into(),
            },
            smtp: SmtpSettings {
                host: required("SMTP_HOST")?,
                port: parse_var("SMTP_PORT", var_or("SMTP_PORT", "25"))?,
            },
            status_sender: required("INTAKE_STATUS_SENDER")?,
        })
    }

    /// Apply run-scoped overrides from the orchestration runner.
    pub fn with_overrides(mut self, args: &ProcessArgs) -> Self {
        if let Some(caseworker) = &args.caseworker {
            self.caseworker = caseworker.clone();
        }
        if let Some(department) = &args.department {
            self.department = department.clone();
        }
        self
    }
}

// ── Process arguments ───────────────────────────────────────────────

/// Run-scoped arguments delivered by the orchestration runner as JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessArgs {
    /// Recipients of the status notification.
    pub receivers: Vec<String>,
    /// Per-run caseworker override.
    #[serde(default)]
    pub caseworker: Option<Caseworker>,
    /// Per-run department override.
    #[serde(default)]
    pub department: Option<Department>,
}

impl ProcessArgs {
    /// Parse the JSON arguments document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Read the arguments from the `INTAKE_PROCESS_ARGS` variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = std::env::var("INTAKE_PROCESS_ARGS")
            .map_err(|_| ConfigError::MissingEnvVar("INTAKE_PROCESS_ARGS".into()))?;
        Self::from_json(&raw)
    }
}

// ── Env helpers ─────────────────────────────────────────────────────

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(key: &str, raw: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;
    use crate::records::CaseParty;

    fn profile() -> CaseProfile {
        CaseProfile {
            title: "Refusion af lægeregninger".into(),
            kle_number: "29.03.14".into(),
            proceeding_facet: "G01".into(),
            sensitivity: "Følsomme".into(),
        }
    }

    fn case(title: &str, kle: &str, state: CaseState) -> CaseRecord {
        CaseRecord {
            id: Uuid::new_v4(),
            title: title.into(),
            state,
            kle_number: kle.into(),
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

    #[test]
    fn profile_matches_title_kle_and_active_state() {
        let p = profile();
        assert!(p.matches(&case("Refusion af lægeregninger", "29.03.14", CaseState::Active)));
        assert!(!p.matches(&case("Refusion af lægeregninger", "29.03.14", CaseState::Inactive)));
        assert!(!p.matches(&case("Anden sag", "29.03.14", CaseState::Active)));
        assert!(!p.matches(&case("Refusion af lægeregninger", "00.00.00", CaseState::Active)));
    }

    #[test]
    fn process_args_parse_receivers_only() {
        let args = ProcessArgs::from_json(r#"{"receivers": ["a@example.com", "b@example.com"]}"#)
            .unwrap();
        assert_eq!(args.receivers.len(), 2);
        assert!(args.caseworker.is_none());
        assert!(args.department.is_none());
    }

    #[test]
    fn process_args_with_caseworker_override() {
        let raw = r#"{
            "receivers": ["a@example.com"],
            "caseworker": {
                "id": "c38ccf61-c879-46e5-92c6-c0abf737d076",
                "name": "Vikar Vikarsen",
                "ident": "az11111"
            }
        }"#;
        let args = ProcessArgs::from_json(raw).unwrap();
        let settings_caseworker = args.caseworker.unwrap();
        assert_eq!(settings_caseworker.name, "Vikar Vikarsen");
    }

    #[test]
    fn process_args_malformed_json_is_an_error() {
        assert!(ProcessArgs::from_json("not json").is_err());
    }
}
