use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use shared::types::ExpiringClaims;

use crate::auth::error::AuthError;

/// HS256 codec bound to a single secret.
///
/// One instance exists per claim kind, so a token signed for one kind never
/// verifies as another.
pub struct ClaimsCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl ClaimsCodec {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked in `parse` against the caller's clock reading.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn sign<C: Serialize>(&self, claims: &C) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            error!("Failed to sign token: {}", e);
            AuthError::Signing
        })
    }

    /// Verify the signature, decode the claims, then reject them if `now`
    /// (Unix seconds) is past their expiry.
    pub fn parse<C>(&self, token: &str, now: u64) -> Result<C, AuthError>
    where
        C: DeserializeOwned + ExpiringClaims,
    {
        let data = decode::<C>(token, &self.decoding_key, &self.validation).map_err(|e| {
            let mapped = map_jwt_error(e.kind());
            debug!("Token rejected: {:?} ({:?})", e.kind(), mapped);
            mapped
        })?;

        if now > data.claims.expires_at() {
            debug!(
                "Token expired {}s ago",
                now.saturating_sub(data.claims.expires_at())
            );
            return Err(AuthError::Unauthorized);
        }

        Ok(data.claims)
    }
}

fn map_jwt_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::ExpiredSignature => AuthError::Unauthorized,
        _ => AuthError::Malformed,
    }
}
