//! Field extraction from application message text.
//!
//! The self-service form renders labels and values back-to-back in the mail
//! body, so the identity number is found positionally: locate the label and
//! take the characters immediately after it. Invoice references use a
//! label-pair pattern instead and there may be any number of them.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ExtractionError;

/// Present in the body when the application concerns the applicant's child.
const CHILD_FLAG: &str = "Omhandler ansøgningen dit barn?Ja";
/// Label preceding the chosen child's identity number.
const CHILD_ID_MARKER: &str = "Vælg barn";
/// Label preceding the applicant's own identity number.
const ADULT_ID_MARKER: &str = "CPR-nummer";
/// Length of a national identity number.
const ID_LEN: usize = 10;

/// An invoice reference sits between these two labels in the body.
static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Fakturanummer: (.+?)Dato for behandling").unwrap());

/// Identifying fields pulled out of one message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFields {
    /// 10-character national identity number.
    pub national_id: String,
    /// Invoice references in document order. May be empty.
    pub references: Vec<String>,
}

/// Extract the identity number and invoice references from a message body.
///
/// When the child flag is present the child's identity label is used and the
/// applicant's own label is ignored, even if both appear. Fails if the
/// selected label is absent or the value after it is shorter than [`ID_LEN`]
/// characters; a missing reference list is not a failure.
pub fn extract_fields(text: &str) -> Result<ExtractedFields, ExtractionError> {
    let marker = if text.contains(CHILD_FLAG) {
        CHILD_ID_MARKER
    } else {
        ADULT_ID_MARKER
    };

    let start = text
        .find(marker)
        .ok_or(ExtractionError::MarkerNotFound { marker })?
        + marker.len();

    let national_id: String = text[start..].chars().take(ID_LEN).collect();
    let found = national_id.chars().count();
    if found < ID_LEN {
        return Err(ExtractionError::TruncatedIdentity {
            expected: ID_LEN,
            found,
        });
    }

    let references = REFERENCE_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect();

    Ok(ExtractedFields {
        national_id,
        references,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adult_marker_yields_following_ten_digits() {
        let text = "Navn: Test Testersen CPR-nummer0101001234 Adresse: Testvej 1";
        let fields = extract_fields(text).unwrap();
        assert_eq!(fields.national_id, "0101001234");
        assert!(fields.references.is_empty());
    }

    #[test]
    fn child_marker_takes_precedence_over_adult_marker() {
        let text = "CPR-nummer1111111111 Omhandler ansøgningen dit barn?Ja Vælg barn2222222222";
        let fields = extract_fields(text).unwrap();
        assert_eq!(fields.national_id, "2222222222");
    }

    #[test]
    fn child_flag_without_child_marker_fails() {
        let text = "Omhandler ansøgningen dit barn?Ja CPR-nummer1111111111";
        let err = extract_fields(text).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::MarkerNotFound { marker: "Vælg barn" }
        ));
    }

    #[test]
    fn child_flag_answered_no_uses_adult_marker() {
        let text = "Omhandler ansøgningen dit barn?Nej CPR-nummer0101001234";
        let fields = extract_fields(text).unwrap();
        assert_eq!(fields.national_id, "0101001234");
    }

    #[test]
    fn missing_adult_marker_fails() {
        let err = extract_fields("Der er ingen identitet i denne besked").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::MarkerNotFound {
                marker: "CPR-nummer"
            }
        ));
    }

    #[test]
    fn short_value_after_marker_fails() {
        let err = extract_fields("CPR-nummer12345").unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::TruncatedIdentity {
                expected: 10,
                found: 5
            }
        ));
    }

    #[test]
    fn single_reference_block() {
        let text = "CPR-nummer0101001234 Fakturanummer: INV-1Dato for behandling 01-01-2025";
        let fields = extract_fields(text).unwrap();
        assert_eq!(fields.references, vec!["INV-1"]);
    }

    #[test]
    fn multiple_reference_blocks_in_document_order() {
        let text = "CPR-nummer0101001234 \
                    Fakturanummer: INV-1Dato for behandling \
                    Fakturanummer: INV-2Dato for behandling \
                    Fakturanummer: INV-3Dato for behandling";
        let fields = extract_fields(text).unwrap();
        assert_eq!(fields.references, vec!["INV-1", "INV-2", "INV-3"]);
    }

    #[test]
    fn malformed_reference_block_without_closing_label_not_matched() {
        let text = "CPR-nummer0101001234 \
                    Fakturanummer: INV-1Dato for behandling \
                    Fakturanummer: INV-2 uden afslutning";
        let fields = extract_fields(text).unwrap();
        assert_eq!(fields.references, vec!["INV-1"]);
    }

    #[test]
    fn empty_reference_list_is_not_a_failure() {
        let fields = extract_fields("CPR-nummer0101001234").unwrap();
        assert_eq!(fields.national_id, "0101001234");
        assert!(fields.references.is_empty());
    }

    #[test]
    fn non_digit_characters_after_marker_are_taken_verbatim() {
        // The extractor is positional, not validating; the case search
        // downstream is what rejects a nonsense identity.
        let fields = extract_fields("CPR-nummerabcdefghij").unwrap();
        assert_eq!(fields.national_id, "abcdefghij");
    }

    #[test]
    fn end_to_end_body_shape() {
        let text = "Refusion sikringsgruppe 2\n\
                    Omhandler ansøgningen dit barn?Nej\n\
                    CPR-nummer0101001234Navn: Test Testersen\n\
                    Fakturanummer: INV-1Dato for behandling 02-03-2025\n\
                    Fakturanummer: INV-2Dato for behandling 04-05-2025\n";
        let fields = extract_fields(text).unwrap();
        assert_eq!(fields.national_id, "0101001234");
        assert_eq!(fields.references, vec!["INV-1", "INV-2"]);
    }
}
