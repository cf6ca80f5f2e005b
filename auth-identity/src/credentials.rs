use crate::error::{IdentityError, Result};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use lazy_static::lazy_static;
use tracing::warn;

lazy_static! {
    /// Argon2 hash of a random value; stands in for a missing hash.
    static ref DUMMY_HASH: Option<String> = {
        let unguessable = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(unguessable.as_str().as_bytes(), &SaltString::generate(&mut OsRng))
            .map(|hash| hash.to_string())
            .ok()
    };
}

/// Checks plaintext passwords against stored hashes.
///
/// Understands Argon2 PHC strings (what [`CredentialVerifier::hash`] produces)
/// and bcrypt (`$2a$`, `$2b$`, `$2y$`) hashes carried over from older
/// deployments. Verification never errors: a missing, malformed or
/// unrecognised hash is a mismatch. A missing hash still pays for one
/// Argon2 verification.
#[derive(Clone, Default)]
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
}

impl CredentialVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verify(&self, plaintext: &str, stored_hash: Option<&str>) -> bool {
        let Some(hash) = stored_hash else {
            // Unknown or provider-only account
            self.verify_dummy(plaintext);
            return false;
        };

        if hash.starts_with("$argon2") {
            match PasswordHash::new(hash) {
                Ok(parsed) => self.argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok(),
                Err(e) => {
                    warn!(error = %e, "Stored argon2 hash is malformed");
                    false
                }
            }
        } else if hash.starts_with("$2") {
            bcrypt::verify(plaintext, hash).unwrap_or_else(|e| {
                warn!(error = %e, "Stored bcrypt hash is malformed");
                false
            })
        } else {
            warn!("Stored password hash has an unknown scheme");
            false
        }
    }

    /// Burn one Argon2 verification; the outcome is discarded.
    pub fn verify_dummy(&self, plaintext: &str) {
        if let Some(parsed) = DUMMY_HASH.as_deref().and_then(|hash| PasswordHash::new(hash).ok()) {
            let _ = self.argon2.verify_password(plaintext.as_bytes(), &parsed);
        }
    }

    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|_| IdentityError::HashingError)?
            .to_string();
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_round_trip() {
        let verifier = CredentialVerifier::new();
        let hash = verifier.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verifier.verify("correct horse", Some(&hash)));
        assert!(!verifier.verify("wrong horse", Some(&hash)));
    }

    #[test]
    fn test_bcrypt_hashes_are_accepted() {
        let verifier = CredentialVerifier::new();
        let hash = bcrypt::hash("s3cret!", 4).unwrap();
        assert!(verifier.verify("s3cret!", Some(&hash)));
        assert!(!verifier.verify("S3cret!", Some(&hash)));
    }

    #[test]
    fn test_missing_hash_costs_a_verification() {
        let verifier = CredentialVerifier::new();
        let dummy = DUMMY_HASH.as_deref().unwrap();
        assert!(dummy.starts_with("$argon2id$"));
        // The dummy's own input is not a way in
        assert!(!verifier.verify(dummy, None));

        let real = verifier.hash("correct horse").unwrap();
        verifier.verify("warm-up", None);
        let started = std::time::Instant::now();
        verifier.verify("wrong horse", Some(&real));
        let wrong_password = started.elapsed();
        let started = std::time::Instant::now();
        verifier.verify("wrong horse", None);
        let missing_hash = started.elapsed();

        assert!(missing_hash * 5 >= wrong_password, "{missing_hash:?} vs {wrong_password:?}");
    }

    #[test]
    fn test_fails_closed() {
        let verifier = CredentialVerifier::new();
        assert!(!verifier.verify("anything", None));
        assert!(!verifier.verify("anything", Some("")));
        assert!(!verifier.verify("anything", Some("plaintext-password")));
        assert!(!verifier.verify("anything", Some("$argon2id$garbage")));
        assert!(!verifier.verify("anything", Some("$2b$04$short")));
    }
}
