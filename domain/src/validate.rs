//! Input shape checks. The only coercion the phonebook performs is parsing
//! contact identifiers; field values are passed through unchanged.

use crate::{ContactId, CoreError};

/// Parse a decimal contact identifier as sent in a query string or form.
///
/// An optional leading sign is accepted; surrounding whitespace is not.
pub fn parse_contact_id(s: &str) -> Result<ContactId, CoreError> {
    s.parse::<i64>()
        .map(ContactId::new)
        .map_err(|e| CoreError::InvalidId(format!("{s:?}: {e}")))
}
