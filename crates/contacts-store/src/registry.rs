use std::fmt;

use dashmap::DashMap;
use subtle::ConstantTimeEq;
use tracing::debug;

use contacts_types::models::IdentityStatus;

use crate::error::InvalidCredential;

/// Random bytes behind each verification token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Opaque verification token handed to the notifier, never to the HTTP caller.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationToken(String);

impl VerificationToken {
    pub fn generate() -> Self {
        let bytes: [u8; TOKEN_BYTES] = rand::random();
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VerificationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("VerificationToken(..)")
    }
}

/// Registration and verification status per email.
pub trait IdentityRegistry: Send + Sync + 'static {
    /// Create or overwrite the record for `email` as unverified with a fresh
    /// token, and return that token.
    fn register(&self, email: &str) -> VerificationToken;

    /// Mark `email` verified if `token` matches the stored token exactly.
    /// Repeating a successful verification is a no-op.
    fn verify(&self, email: &str, token: &str) -> Result<(), InvalidCredential>;

    fn status(&self, email: &str) -> IdentityStatus;

    fn is_verified(&self, email: &str) -> bool {
        self.status(email).is_verified()
    }
}

struct IdentityRecord {
    verified: bool,
    token: VerificationToken,
}

#[derive(Default)]
pub struct MemoryIdentityRegistry {
    records: DashMap<String, IdentityRecord>,
}

impl MemoryIdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IdentityRegistry for MemoryIdentityRegistry {
    fn register(&self, email: &str) -> VerificationToken {
        let token = VerificationToken::generate();
        let previous = self.records.insert(
            email.to_owned(),
            IdentityRecord {
                verified: false,
                token: token.clone(),
            },
        );
        if previous.is_some_and(|r| r.verified) {
            debug!(email, "Re-registration reset a verified identity");
        }
        token
    }

    fn verify(&self, email: &str, token: &str) -> Result<(), InvalidCredential> {
        let mut record = self.records.get_mut(email).ok_or(InvalidCredential)?;

        if !bool::from(record.token.as_str().as_bytes().ct_eq(token.as_bytes())) {
            return Err(InvalidCredential);
        }

        record.verified = true;
        Ok(())
    }

    fn status(&self, email: &str) -> IdentityStatus {
        match self.records.get(email) {
            None => IdentityStatus::Unregistered,
            Some(record) if record.verified => IdentityStatus::Verified,
            Some(_) => IdentityStatus::Unverified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_long_and_distinct() {
        let a = VerificationToken::generate();
        let b = VerificationToken::generate();
        assert_eq!(a.as_str().len(), TOKEN_BYTES * 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_hides_token() {
        let token = VerificationToken::generate();
        assert!(!format!("{:?}", token).contains(token.as_str()));
    }

    #[test]
    fn test_register_then_verify() {
        let registry = MemoryIdentityRegistry::new();
        assert_eq!(registry.status("a@example.com"), IdentityStatus::Unregistered);

        let token = registry.register("a@example.com");
        assert_eq!(registry.status("a@example.com"), IdentityStatus::Unverified);
        assert!(!registry.is_verified("a@example.com"));

        registry.verify("a@example.com", token.as_str()).unwrap();
        assert!(registry.is_verified("a@example.com"));

        // Idempotent
        registry.verify("a@example.com", token.as_str()).unwrap();
        assert_eq!(registry.status("a@example.com"), IdentityStatus::Verified);
    }

    #[test]
    fn test_wrong_token_never_verifies() {
        let registry = MemoryIdentityRegistry::new();
        let token = registry.register("a@example.com");

        assert_eq!(registry.verify("a@example.com", "x"), Err(InvalidCredential));
        assert_eq!(
            registry.verify("a@example.com", &token.as_str().to_uppercase()),
            Err(InvalidCredential)
        );
        assert_eq!(registry.verify("a@example.com", ""), Err(InvalidCredential));
        assert!(!registry.is_verified("a@example.com"));
    }

    #[test]
    fn test_unknown_identity_is_indistinguishable() {
        let registry = MemoryIdentityRegistry::new();
        let token = registry.register("a@example.com");

        let unknown = registry.verify("b@example.com", token.as_str());
        let wrong = registry.verify("a@example.com", "x");
        assert_eq!(unknown, wrong);
        assert!(!registry.is_verified("b@example.com"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reregistration_resets_and_rotates() {
        let registry = MemoryIdentityRegistry::new();
        let first = registry.register("a@example.com");
        registry.verify("a@example.com", first.as_str()).unwrap();

        let second = registry.register("a@example.com");
        assert_ne!(first, second);
        assert!(!registry.is_verified("a@example.com"));

        // Only the newest token counts
        assert_eq!(registry.verify("a@example.com", first.as_str()), Err(InvalidCredential));
        registry.verify("a@example.com", second.as_str()).unwrap();
        assert!(registry.is_verified("a@example.com"));
    }

    #[test]
    fn test_email_is_not_normalized() {
        let registry = MemoryIdentityRegistry::new();
        let token = registry.register("A@example.com");
        assert_eq!(registry.verify("a@example.com", token.as_str()), Err(InvalidCredential));
        assert_eq!(registry.status("a@example.com"), IdentityStatus::Unregistered);
    }
}
