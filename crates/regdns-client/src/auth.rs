//! Ed25519 challenge/response login
//!
//! The registrar never sees the private key. The public key is sent to the
//! challenge endpoint, the returned challenge bytes are signed locally, and
//! the signature is exchanged for a bearer token:
//!
//! ```http
//! POST /api/v0/auth/challenge   {"public_key": "<hex>"}
//!   -> {"challenge": "<hex>"}
//! POST /api/v0/auth/login       {"public_key": "<hex>", "challenge": "<hex>", "signature": "<hex>"}
//!   -> {"access": "<token>"}
//! ```
//!
//! Challenge freshness is the registrar's responsibility. No step is retried.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use regdns_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::http::check_status;

pub(crate) const CHALLENGE_PATH: &str = "/api/v0/auth/challenge";
pub(crate) const LOGIN_PATH: &str = "/api/v0/auth/login";

/// An Ed25519 key pair used to prove account ownership
#[derive(Clone)]
pub struct SigningIdentity {
    signing_key: SigningKey,
}

// Only the public half is ever shown
impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("public_key", &self.public_key_hex())
            .field("private_key", &"<REDACTED>")
            .finish()
    }
}

impl SigningIdentity {
    /// Decode a hex-encoded private key
    ///
    /// Accepts a 32-byte seed, or a 64-byte seed‖public-key pair whose public
    /// half must match the seed.
    pub fn from_hex(hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| Error::invalid_key(format!("private key is not valid hex: {e}")))?;

        let signing_key = match bytes.len() {
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                SigningKey::from_bytes(&seed)
            }
            64 => {
                let mut pair = [0u8; 64];
                pair.copy_from_slice(&bytes);
                SigningKey::from_keypair_bytes(&pair)
                    .map_err(|e| Error::invalid_key(format!("inconsistent key pair: {e}")))?
            }
            n => {
                return Err(Error::invalid_key(format!(
                    "private key must be 32 or 64 bytes, got {n}"
                )));
            }
        };

        Ok(Self { signing_key })
    }

    /// Wrap an existing signing key
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        Self { signing_key }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Hex-encoded public key, derived locally
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.verifying_key().as_bytes())
    }

    pub fn sign(&self, challenge: &[u8]) -> Signature {
        self.signing_key.sign(challenge)
    }

    /// Decode a hex challenge, sign its bytes and return the hex signature
    pub fn sign_challenge_hex(&self, challenge_hex: &str) -> Result<String> {
        let challenge = hex::decode(challenge_hex).map_err(|e| {
            Error::malformed_response(format!("challenge is not valid hex: {e}"))
        })?;
        Ok(hex::encode(self.sign(&challenge).to_bytes()))
    }
}

#[derive(Debug, Serialize)]
struct ChallengeRequest<'a> {
    public_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChallengeResponse {
    challenge: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    public_key: &'a str,
    challenge: &'a str,
    signature: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access: String,
}

/// Exchange a signed challenge for a bearer token
///
/// `client` must not carry an Authorization header; the auth endpoints are
/// unauthenticated.
pub async fn authenticate(
    client: &reqwest::Client,
    base_url: &str,
    identity: &SigningIdentity,
) -> Result<String> {
    let public_key = identity.public_key_hex();
    let base_url = base_url.trim_end_matches('/');

    tracing::debug!("Requesting login challenge for public key {}", public_key);
    let response = client
        .post(format!("{base_url}{CHALLENGE_PATH}"))
        .json(&ChallengeRequest {
            public_key: &public_key,
        })
        .send()
        .await
        .map_err(|e| Error::http(format!("challenge request failed: {e}")))?;
    let ChallengeResponse { challenge } = check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| Error::malformed_response(format!("invalid challenge response: {e}")))?;

    let signature = identity.sign_challenge_hex(&challenge)?;

    tracing::debug!("Submitting signed challenge");
    let response = client
        .post(format!("{base_url}{LOGIN_PATH}"))
        .json(&LoginRequest {
            public_key: &public_key,
            challenge: &challenge,
            signature: &signature,
        })
        .send()
        .await
        .map_err(|e| Error::http(format!("login request failed: {e}")))?;
    let LoginResponse { access } = check_status(response)
        .await?
        .json()
        .await
        .map_err(|e| Error::malformed_response(format!("invalid login response: {e}")))?;

    tracing::info!("Authenticated with signing key {}", public_key);
    Ok(access)
}
