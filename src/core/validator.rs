use crate::domain::model::{ExtractedFields, ValidationOutcome};

pub const NAME_MISMATCH: &str = "Name doesn't match";
pub const NAME_NOT_FOUND: &str = "Name not found";
pub const BIRTHDATE_NOT_FOUND: &str = "Birthdate not found";
pub const ID_NUMBER_NOT_FOUND: &str = "ID number not found";

/// Cross-checks extracted fields against the user's claims.
///
/// Every check runs; errors come back in check order
/// (name, birthdate, ID number). Birthdate and ID number are presence
/// checks only: `_claimed_birthdate` is not compared.
pub fn validate_claims(
    fields: &ExtractedFields,
    claimed_full_name: &str,
    _claimed_birthdate: &str,
) -> ValidationOutcome {
    let mut errors = Vec::new();

    match fields.name.as_deref() {
        Some(name) if names_overlap(name, claimed_full_name) => {}
        Some(_) => errors.push(NAME_MISMATCH.to_string()),
        None => errors.push(NAME_NOT_FOUND.to_string()),
    }

    if fields.birthdate.is_none() {
        errors.push(BIRTHDATE_NOT_FOUND.to_string());
    }

    if fields.id_number.is_none() {
        errors.push(ID_NUMBER_NOT_FOUND.to_string());
    }

    ValidationOutcome::from_errors(errors)
}

/// Case-insensitive containment in either direction, so OCR truncation or
/// extra words on the card still match. An empty claim is contained in any
/// extracted name, so it passes.
pub fn names_overlap(extracted: &str, claimed: &str) -> bool {
    let extracted = extracted.trim().to_lowercase();
    let claimed = claimed.trim().to_lowercase();

    claimed.contains(&extracted) || extracted.contains(&claimed)
}
