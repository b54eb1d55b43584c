//! Identity-provider token verification.
//!
//! Clients authenticate against a hosted identity provider and send the
//! resulting ID token as a bearer credential. The token is a JWT; this module
//! checks its signature, expiry and (when configured) issuer and audience,
//! and yields the verified email as the request principal.

use anyhow::{bail, Context, Result};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AuthConfig;

/// Authenticated caller, identified by the email the provider verified
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Provider user id (`sub`), when the token carries one
    pub uid: Option<String>,
    pub email: String,
    pub name: Option<String>,
}

/// Claims read from an identity token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub exp: i64,
}

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Invalid or expired token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("Token carries no email claim")]
    MissingEmail,
}

/// Verifies bearer tokens with a fixed key and validation rules
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let (key, algorithm) = if let Some(ref pem) = config.jwt_public_key_pem {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .context("Failed to parse auth.jwt_public_key_pem")?;
            (key, Algorithm::RS256)
        } else if let Some(ref secret) = config.jwt_secret {
            if secret.is_empty() {
                bail!("auth.jwt_secret must not be empty");
            }
            (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256)
        } else {
            bail!("Either auth.jwt_secret or auth.jwt_public_key_pem must be configured");
        };

        let mut validation = Validation::new(algorithm);
        if let Some(ref issuer) = config.issuer {
            validation.set_issuer(&[issuer]);
        }
        match config.audience {
            Some(ref audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self { key, validation })
    }

    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        let data = decode::<IdentityClaims>(token, &self.key, &self.validation)?;
        let email = data
            .claims
            .email
            .filter(|e| !e.is_empty())
            .ok_or(TokenError::MissingEmail)?;

        Ok(Principal {
            uid: data.claims.sub.filter(|s| !s.is_empty()),
            email: email.to_lowercase(),
            name: data.claims.name,
        })
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next()?;
    let token = parts.next()?.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}
