//! Client-side checks run before any sign-in request leaves the process.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MtchatError, Result};

/// Number of digits in a one-time passcode.
pub const OTP_LENGTH: usize = 6;

/// Trims `input` and requires an `@`.
///
/// The remote API performs the real address check; this only catches
/// obviously malformed input so no request is wasted.
pub fn validate_email(input: &str) -> Result<String> {
    let email = input.trim();
    if email.is_empty() {
        return Err(MtchatError::validation("Please enter your email address"));
    }
    if !email.contains('@') {
        return Err(MtchatError::validation("Please enter a valid email address"));
    }
    Ok(email.to_string())
}

/// A six-digit one-time passcode that has passed client-side validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OtpCode(String);

impl OtpCode {
    /// Accepts exactly six ASCII digits after trimming surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self> {
        let code = input.trim();
        if code.len() != OTP_LENGTH || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MtchatError::validation(format!(
                "Please enter a valid {OTP_LENGTH}-digit code"
            )));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_rejects_letters() {
        assert!(OtpCode::parse("12a456").unwrap_err().is_validation());
    }

    #[test]
    fn test_otp_length() {
        assert!(OtpCode::parse("12345").is_err());
        assert!(OtpCode::parse("1234567").is_err());
        assert_eq!(OtpCode::parse(" 123456 ").unwrap().as_str(), "123456");
    }

    #[test]
    fn test_otp_rejects_non_ascii_digits() {
        // Arabic-Indic digits are numeric but not ASCII.
        assert!(OtpCode::parse("١٢٣٤٥٦").is_err());
    }

    #[test]
    fn test_email() {
        assert_eq!(validate_email("  a@b.io ").unwrap(), "a@b.io");
        assert!(validate_email("").is_err());
        assert!(validate_email("nobody").is_err());
    }
}
