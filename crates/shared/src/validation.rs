//! Input validation and normalization helpers.

/// Normalizes an email address for storage and lookup: trimmed and lowercased.
/// Syntax is checked at the DTO boundary; this only canonicalizes.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
