//! Access token verification.
//!
//! Tokens are issued by the external authentication service; this side only
//! checks the signature and expiry and turns the claims into a [`Caller`].

use super::errors::AuthResult;
use super::models::{AccessTokenClaims, Caller};
use jsonwebtoken::{DecodingKey, Validation, decode};

/// HS256 access token verifier
#[derive(Clone)]
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    /// Create a verifier for tokens signed with `jwt_secret`
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Verify an access token and return its claims
    ///
    /// # Arguments
    ///
    /// * `token` - Encoded JWT
    ///
    /// # Returns
    ///
    /// * `AuthResult<AccessTokenClaims>` - Decoded claims or error
    pub fn verify_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let token_data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?;

        Ok(token_data.claims)
    }

    /// Verify an access token and return the caller it identifies
    pub fn caller(&self, token: &str) -> AuthResult<Caller> {
        self.verify_access_token(token)
            .map(|claims| Caller::from(&claims))
    }
}
