//! Case resolver — idempotent find-or-create of the canonical case.
//!
//! The canonical-case rule: a given identity number has at most one active
//! case matching the configured profile. Repeated resolution with unchanged
//! external state returns the same case and performs no second creation;
//! the predicate is applied to a freshly fetched list on every call, never
//! to a cached one.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::clients::CaseApi;
use crate::config::CaseProfile;
use crate::error::CaseResolutionError;
use crate::records::{CaseParty, CaseRecord, Caseworker, Department};

/// Role given to the applicant on a newly created case.
const PRIMARY_ROLE: &str = "Primær";
/// Identity scheme of the applicant party.
const IDENTITY_TYPE: &str = "CprNummer";

/// Finds or creates the canonical case for an identity number.
pub struct CaseResolver {
    cases: Arc<dyn CaseApi>,
    profile: CaseProfile,
    caseworker: Caseworker,
    department: Department,
    security_unit: Department,
}

impl CaseResolver {
    pub fn new(
        cases: Arc<dyn CaseApi>,
        profile: CaseProfile,
        caseworker: Caseworker,
        department: Department,
        security_unit: Department,
    ) -> Self {
        Self {
            cases,
            profile,
            caseworker,
            department,
            security_unit,
        }
    }

    /// Return the canonical case for the identity, creating it if absent.
    pub async fn resolve(&self, national_id: &str) -> Result<CaseRecord, CaseResolutionError> {
        let existing = self.cases.find_cases(national_id).await?;

        if let Some(case) = existing.iter().find(|c| self.profile.matches(c)) {
            debug!(case_id = %case.id, "Reusing canonical case");
            return Ok(case.clone());
        }

        let name = match party_name(&existing, national_id) {
            Some(name) => name,
            None => {
                let identity = self.cases.resolve_identity(national_id).await?;
                if identity.name.is_empty() {
                    return Err(CaseResolutionError::NameUnavailable {
                        national_id: national_id.to_string(),
                    });
                }
                identity.name
            }
        };

        let case = CaseRecord {
            id: Uuid::new_v4(),
            title: self.profile.title.clone(),
            state: crate::records::CaseState::Active,
            kle_number: self.profile.kle_number.clone(),
            proceeding_facet: self.profile.proceeding_facet.clone(),
            case_date: Utc::now(),
            sensitivity: self.profile.sensitivity.clone(),
            caseworker: self.caseworker.clone(),
            department: self.department.clone(),
            security_unit: self.security_unit.clone(),
            parties: vec![CaseParty {
                role: PRIMARY_ROLE.into(),
                identification_type: IDENTITY_TYPE.into(),
                identification: national_id.to_string(),
                name: Some(name),
            }],
        };

        self.cases.create_case(&case).await?;
        info!(case_id = %case.id, "Created new case");
        Ok(case)
    }
}

/// Scan already-fetched cases for a party matching the identity with a
/// non-empty name. Saves an identity lookup when the person is known.
fn party_name(cases: &[CaseRecord], national_id: &str) -> Option<String> {
    cases
        .iter()
        .flat_map(|c| c.parties.iter())
        .find(|p| {
            p.identification == national_id && p.name.as_deref().is_some_and(|n| !n.is_empty())
        })
        .and_then(|p| p.name.clone())
}
