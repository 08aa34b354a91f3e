/// Where an identity sits in the registration state machine.
///
/// `Unregistered -> Unverified -> Verified`. Re-registering a verified
/// identity moves it back to `Unverified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStatus {
    Unregistered,
    Unverified,
    Verified,
}

impl IdentityStatus {
    pub fn is_verified(self) -> bool {
        matches!(self, IdentityStatus::Verified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_verified_is_verified() {
        assert!(IdentityStatus::Verified.is_verified());
        assert!(!IdentityStatus::Unverified.is_verified());
        assert!(!IdentityStatus::Unregistered.is_verified());
    }
}
