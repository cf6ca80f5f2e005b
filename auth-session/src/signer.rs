use crate::error::SignerError;
use crate::tokens::AccessClaims;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};

/// Signing capability for access tokens.
///
/// Key management lives behind this trait; the issuer only ever sees
/// `sign(claims) -> string` and `verify(string) -> claims`.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, claims: &AccessClaims) -> Result<String, SignerError>;

    /// Checks signature and expiry. Issuer checks belong to the caller.
    fn verify(&self, token: &str) -> Result<AccessClaims, SignerError>;
}

/// HS256 signer over a shared secret
pub struct HmacSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl HmacSigner {
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            validation,
        }
    }
}

impl TokenSigner for HmacSigner {
    fn sign(&self, claims: &AccessClaims) -> Result<String, SignerError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| SignerError::Signing(e.to_string()))
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, SignerError> {
        decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => SignerError::Expired,
                _ => SignerError::Invalid,
            })
    }
}
