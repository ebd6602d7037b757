//! Local input validation for the registration flows.
//!
//! The backend rejects bad input too; these checks just fail fast before a
//! network round trip.

use anyhow::Result;

/// Validate an e-mail address shape: one `@`, non-empty local part, a dot in
/// the domain.
pub fn validate_email(email: &str) -> Result<bool> {
    let re = regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")?;
    Ok(re.is_match(email))
}

/// Passwords must have at least 8 characters.
pub fn validate_senha(senha: &str) -> bool {
    senha.chars().count() >= 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ana@example.com").unwrap());
        assert!(validate_email("contato@abrigo.org.br").unwrap());
        assert!(!validate_email("ana").unwrap());
        assert!(!validate_email("ana@").unwrap());
        assert!(!validate_email("@example.com").unwrap());
        assert!(!validate_email("a b@example.com").unwrap());
        assert!(!validate_email("ana@example").unwrap());
    }

    #[test]
    fn test_validate_senha() {
        assert!(validate_senha("12345678"));
        assert!(validate_senha("uma senha longa"));
        assert!(!validate_senha("1234567"));
    }
}
