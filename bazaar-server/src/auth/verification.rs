//! Verification code management
//!
//! Each account owns a set of verification slots, at most one per purpose.
//! Issuing a code replaces any previous slot for the same purpose (and for
//! paired purposes, see [`CodeType::cleared_types`]); consuming a code
//! removes the slot so it can never be replayed.
//!
//! The value types here are pure; the atomic read-modify-write against the
//! stored user document lives in the user repository.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use shared::{AppError, ErrorCode};

/// Delivered code length (digits)
pub const CODE_LEN: usize = 4;
/// Reference code length (alphanumeric)
pub const REFERENCE_LEN: usize = 10;

/// The purpose a verification code was issued for
///
/// A submitted code only counts against the slot of the same purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeType {
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "mobile")]
    Mobile,
    #[serde(rename = "forgotPassword")]
    ForgotPassword,
    #[serde(rename = "resetPassword")]
    ResetPassword,
    #[serde(rename = "googleAuth")]
    GoogleAuth,
    #[serde(rename = "twoFA")]
    TwoFa,
}

impl CodeType {
    /// The slot types displaced when a code of this type is issued
    ///
    /// The forgot-password and reset-password flows both end in a password
    /// change, so starting either one invalidates any pending code of the
    /// other. Every other purpose only displaces itself.
    pub fn cleared_types(&self) -> &'static [CodeType] {
        match self {
            CodeType::ForgotPassword => &[CodeType::ForgotPassword, CodeType::ResetPassword],
            CodeType::ResetPassword => &[CodeType::ResetPassword, CodeType::ForgotPassword],
            CodeType::Email => &[CodeType::Email],
            CodeType::Mobile => &[CodeType::Mobile],
            CodeType::GoogleAuth => &[CodeType::GoogleAuth],
            CodeType::TwoFa => &[CodeType::TwoFa],
        }
    }

    /// Wire name, as stored in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::Email => "email",
            CodeType::Mobile => "mobile",
            CodeType::ForgotPassword => "forgotPassword",
            CodeType::ResetPassword => "resetPassword",
            CodeType::GoogleAuth => "googleAuth",
            CodeType::TwoFa => "twoFA",
        }
    }
}

/// A pending verification code owned by an account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSlot {
    pub code_type: CodeType,
    /// The secret delivered out-of-band (or supplied by the authenticator
    /// provider for googleAuth enrollment)
    pub code: String,
    /// Opaque handle echoed to the caller, identifies the challenge without
    /// exposing the code
    pub reference_code: String,
    /// Issue timestamp, unix seconds
    pub issued_at: i64,
}

/// Random code generator backed by the system CSPRNG
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    rng: SystemRandom,
}

impl CodeGenerator {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Generate a numeric delivery code of [`CODE_LEN`] digits
    pub fn numeric_code(&self) -> Result<String, AppError> {
        let mut bytes = [0u8; CODE_LEN];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::new(ErrorCode::EntropyFailure))?;

        Ok(bytes.iter().map(|b| char::from(b'0' + b % 10)).collect())
    }

    /// Generate an alphanumeric reference code of [`REFERENCE_LEN`] chars
    pub fn reference_code(&self) -> Result<String, AppError> {
        const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

        let mut bytes = [0u8; REFERENCE_LEN];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::new(ErrorCode::EntropyFailure))?;

        Ok(bytes
            .iter()
            .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
            .collect())
    }

    /// Build a fresh slot for the given purpose
    ///
    /// For most purposes the delivery code is generated here; googleAuth
    /// enrollment carries a provider-supplied secret instead.
    pub fn issue_slot(
        &self,
        code_type: CodeType,
        provided_code: Option<String>,
        now: i64,
    ) -> Result<VerificationSlot, AppError> {
        let code = match provided_code {
            Some(c) => c,
            None => self.numeric_code()?,
        };
        Ok(VerificationSlot {
            code_type,
            code,
            reference_code: self.reference_code()?,
            issued_at: now,
        })
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory view of an account's verification slots
///
/// Mirrors the mutation the repository performs atomically in storage, and
/// is what flow logic and tests reason about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationSet(pub Vec<VerificationSlot>);

impl VerificationSet {
    /// Insert a slot, displacing every slot whose type the new slot clears
    pub fn issue(&mut self, slot: VerificationSlot) {
        let cleared = slot.code_type.cleared_types();
        self.0.retain(|s| !cleared.contains(&s.code_type));
        self.0.push(slot);
    }

    /// Remove the slot for a purpose. No-op when absent.
    pub fn consume(&mut self, code_type: CodeType) {
        self.0.retain(|s| s.code_type != code_type);
    }

    pub fn find(&self, code_type: CodeType) -> Option<&VerificationSlot> {
        self.0.iter().find(|s| s.code_type == code_type)
    }

    /// Check a submission against the slot for a purpose
    ///
    /// Wrong code, wrong reference and absent slot all produce the same
    /// invalid-code error; an aged-out slot reports expiry. The slot is NOT
    /// removed here; callers consume it through the repository only after
    /// the whole operation succeeds.
    pub fn verify(
        &self,
        code_type: CodeType,
        reference_code: &str,
        code: &str,
        now: i64,
        ttl_secs: i64,
    ) -> Result<(), AppError> {
        let slot = self.find(code_type).ok_or_else(AppError::invalid_code)?;

        if slot.reference_code != reference_code || slot.code != code {
            return Err(AppError::invalid_code());
        }
        if now - slot.issued_at > ttl_secs {
            return Err(AppError::new(ErrorCode::VerificationCodeExpired));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(code_type: CodeType, code: &str, reference: &str, issued_at: i64) -> VerificationSlot {
        VerificationSlot {
            code_type,
            code: code.into(),
            reference_code: reference.into(),
            issued_at,
        }
    }

    #[test]
    fn test_single_slot_per_purpose() {
        let mut set = VerificationSet::default();
        set.issue(slot(CodeType::Email, "1111", "ref-one", 100));
        set.issue(slot(CodeType::Email, "2222", "ref-two", 200));

        assert_eq!(set.0.len(), 1);
        let kept = set.find(CodeType::Email).unwrap();
        assert_eq!(kept.code, "2222");

        // The displaced code no longer verifies
        assert!(set.verify(CodeType::Email, "ref-one", "1111", 210, 600).is_err());
        assert!(set.verify(CodeType::Email, "ref-two", "2222", 210, 600).is_ok());
    }

    #[test]
    fn test_purposes_are_independent() {
        let mut set = VerificationSet::default();
        set.issue(slot(CodeType::Email, "1111", "ref-email", 100));
        set.issue(slot(CodeType::Mobile, "2222", "ref-mobile", 100));
        set.issue(slot(CodeType::TwoFa, "3333", "ref-2fa", 100));

        assert_eq!(set.0.len(), 3);
        set.consume(CodeType::Mobile);
        assert!(set.find(CodeType::Email).is_some());
        assert!(set.find(CodeType::Mobile).is_none());
        assert!(set.find(CodeType::TwoFa).is_some());
    }

    #[test]
    fn test_code_only_counts_for_its_own_purpose() {
        let mut set = VerificationSet::default();
        set.issue(slot(CodeType::Email, "1111", "ref-email", 100));

        assert!(set.verify(CodeType::Mobile, "ref-email", "1111", 110, 600).is_err());
        assert!(set.verify(CodeType::Email, "ref-email", "1111", 110, 600).is_ok());
    }

    #[test]
    fn test_forgot_and_reset_displace_each_other() {
        let mut set = VerificationSet::default();
        set.issue(slot(CodeType::Email, "0000", "ref-email", 100));
        set.issue(slot(CodeType::ResetPassword, "1111", "ref-reset", 100));

        // Starting the forgot flow kills the pending reset code
        set.issue(slot(CodeType::ForgotPassword, "2222", "ref-forgot", 200));
        assert!(set.find(CodeType::ResetPassword).is_none());
        assert!(set.find(CodeType::ForgotPassword).is_some());
        // Unrelated purposes are untouched
        assert!(set.find(CodeType::Email).is_some());

        // And the other direction
        set.issue(slot(CodeType::ResetPassword, "3333", "ref-reset2", 300));
        assert!(set.find(CodeType::ForgotPassword).is_none());
        assert!(set.find(CodeType::ResetPassword).is_some());
    }

    #[test]
    fn test_consume_absent_slot_is_noop() {
        let mut set = VerificationSet::default();
        set.issue(slot(CodeType::Email, "1111", "ref-email", 100));
        set.consume(CodeType::TwoFa);
        assert_eq!(set.0.len(), 1);
    }

    #[test]
    fn test_wrong_code_and_absent_slot_are_indistinguishable() {
        let mut set = VerificationSet::default();
        set.issue(slot(CodeType::Email, "1111", "ref-email", 100));

        let wrong_code = set
            .verify(CodeType::Email, "ref-email", "9999", 110, 600)
            .unwrap_err();
        let wrong_ref = set
            .verify(CodeType::Email, "ref-other", "1111", 110, 600)
            .unwrap_err();
        let absent = set
            .verify(CodeType::Mobile, "ref-email", "1111", 110, 600)
            .unwrap_err();

        assert_eq!(wrong_code.code, ErrorCode::VerificationCodeInvalid);
        assert_eq!(wrong_code.message, wrong_ref.message);
        assert_eq!(wrong_code.message, absent.message);
    }

    #[test]
    fn test_expired_code_rejected() {
        let mut set = VerificationSet::default();
        set.issue(slot(CodeType::ForgotPassword, "1111", "ref-fp", 1000));

        assert!(set.verify(CodeType::ForgotPassword, "ref-fp", "1111", 1600, 600).is_ok());
        let err = set
            .verify(CodeType::ForgotPassword, "ref-fp", "1111", 1601, 600)
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::VerificationCodeExpired);
    }

    #[test]
    fn test_generated_code_charset() {
        let generator = CodeGenerator::new();

        let code = generator.numeric_code().unwrap();
        assert_eq!(code.len(), CODE_LEN);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        let reference = generator.reference_code().unwrap();
        assert_eq!(reference.len(), REFERENCE_LEN);
        assert!(reference.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_issue_slot_keeps_provided_secret() {
        let generator = CodeGenerator::new();
        let slot = generator
            .issue_slot(CodeType::GoogleAuth, Some("JBSWY3DPEHPK3PXP".into()), 42)
            .unwrap();
        assert_eq!(slot.code, "JBSWY3DPEHPK3PXP");
        assert_eq!(slot.issued_at, 42);
        assert_eq!(slot.reference_code.len(), REFERENCE_LEN);
    }

    #[test]
    fn test_code_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&CodeType::TwoFa).unwrap(),
            "\"twoFA\""
        );
        assert_eq!(
            serde_json::to_string(&CodeType::ForgotPassword).unwrap(),
            "\"forgotPassword\""
        );
        let back: CodeType = serde_json::from_str("\"googleAuth\"").unwrap();
        assert_eq!(back, CodeType::GoogleAuth);
    }
}
