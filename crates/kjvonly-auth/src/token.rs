// crates/kjvonly-auth/src/token.rs
//
// TokenService: issues and verifies signed session tokens.
//
// Tokens are compact JWS strings `header.payload.signature`, each segment
// unpadded base64url. The header names the signing key by `kid` so keys can
// rotate without invalidating tokens that are still live. Times are whole
// seconds since the epoch.

use std::collections::BTreeSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::Signature;
use kjvonly_core::{Claims, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keystore::KeyStore;

/// Signature algorithm named in every token header.
pub const TOKEN_ALG: &str = "EdDSA";

/// Default session lifetime.
pub const DEFAULT_LIFETIME_SECS: i64 = 3600;

/// Reasons a presented token is rejected.
///
/// The dispatcher collapses every kind to an anonymous caller; the kinds
/// exist for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token signature does not verify")]
    InvalidSignature,

    #[error("token signed by unknown key")]
    UnknownKey,

    #[error("token expired")]
    Expired,

    #[error("token is malformed")]
    Malformed,
}

/// Reasons `issue` refuses to sign a set of claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IssueError {
    #[error("cannot issue a token for anonymous claims")]
    AnonymousSubject,

    #[error("token expiry is out of range")]
    ExpiryOutOfRange,
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default)]
    typ: Option<String>,
    kid: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Payload {
    sub: String,
    iss: String,
    roles: Vec<String>,
    iat: i64,
    exp: i64,
}

impl Payload {
    fn into_claims(self) -> Result<Claims, TokenError> {
        if self.sub.is_empty() || self.exp <= self.iat {
            return Err(TokenError::Malformed);
        }
        let roles = self
            .roles
            .iter()
            .map(|r| r.parse::<Role>())
            .collect::<Result<BTreeSet<_>, _>>()
            .map_err(|_| TokenError::Malformed)?;
        let issued_at = DateTime::from_timestamp(self.iat, 0).ok_or(TokenError::Malformed)?;
        let expires_at = DateTime::from_timestamp(self.exp, 0).ok_or(TokenError::Malformed)?;
        Ok(Claims {
            subject: Some(self.sub),
            issuer: self.iss,
            roles,
            issued_at,
            expires_at,
        })
    }
}

fn encode_segment<T: Serialize>(value: &T) -> String {
    // Header and Payload hold only strings and integers; serialization cannot fail.
    let json = serde_json::to_vec(value).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| TokenError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| TokenError::Malformed)
}

// ---------------------------------------------------------------------------
// TokenService
// ---------------------------------------------------------------------------

/// Issues and verifies session tokens against a `KeyStore`.
#[derive(Debug, Clone)]
pub struct TokenService {
    keys: KeyStore,
    issuer: String,
    lifetime: Duration,
}

impl TokenService {
    pub fn new(keys: KeyStore, issuer: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            keys,
            issuer: issuer.into(),
            lifetime,
        }
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    /// Sign `claims` as a new session token.
    ///
    /// Issuer and validity window are overwritten: the token is issued at
    /// `now` (whole seconds) and expires one lifetime later. Claims without
    /// a subject are refused.
    pub fn issue(&self, claims: &Claims, now: DateTime<Utc>) -> Result<String, IssueError> {
        let sub = match claims.subject.as_deref() {
            Some(sub) if !sub.is_empty() => sub.to_string(),
            _ => return Err(IssueError::AnonymousSubject),
        };
        let iat = now.timestamp();
        let exp = iat
            .checked_add(self.lifetime.num_seconds())
            .filter(|exp| *exp > iat && DateTime::from_timestamp(*exp, 0).is_some())
            .ok_or(IssueError::ExpiryOutOfRange)?;
        let payload = Payload {
            sub,
            iss: self.issuer.clone(),
            roles: claims.roles.iter().map(|r| r.as_str().to_string()).collect(),
            iat,
            exp,
        };

        let header = Header {
            alg: TOKEN_ALG.to_string(),
            typ: Some("JWT".to_string()),
            kid: self.keys.active_kid().to_string(),
        };

        let signing_input = format!("{}.{}", encode_segment(&header), encode_segment(&payload));
        let signature = self.keys.sign_active(signing_input.as_bytes());
        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    /// Verify `token` and return the claims it carries.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed);
        };

        let header: Header = decode_segment(header_b64)?;
        if header.alg != TOKEN_ALG {
            return Err(TokenError::Malformed);
        }
        let key = self
            .keys
            .lookup_key(&header.kid)
            .ok_or(TokenError::UnknownKey)?;

        let signature_bytes: [u8; 64] = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::InvalidSignature)?
            .try_into()
            .map_err(|_| TokenError::InvalidSignature)?;
        let signature = Signature::from_bytes(&signature_bytes);
        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
        if !key.verify(signing_input.as_bytes(), &signature) {
            return Err(TokenError::InvalidSignature);
        }

        let claims = decode_segment::<Payload>(payload_b64)?.into_claims()?;
        if now >= claims.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}
