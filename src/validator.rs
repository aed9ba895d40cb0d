// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 Tokengate Contributors

//! HS512 token validation.
//!
//! Checks run in a fixed order so the first failure determines the rejection
//! reason: structure, issuer trust, signature, audience, lifetime. The
//! signature check uses the issuer's shared secret directly over
//! `header.payload`; claims are only trusted after it passes, except `iss`,
//! which has to be read first to pick the secret at all.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use jsonwebtoken::{decode_header, Algorithm};
use serde_json::{Map, Value};
use sha2::Sha512;

use crate::claims::{AuthenticatedIdentity, Claim};
use crate::error::AuthError;
use crate::secret;

type HmacSha512 = Hmac<Sha512>;

/// Claim names lifted out of the payload and re-emitted in a fixed position.
const REGISTERED_CLAIMS: [&str; 5] = ["iss", "aud", "exp", "nbf", "iat"];

/// A trusted issuer with its decoded HMAC secret.
pub(crate) struct ServerKey {
    pub issuer: String,
    pub secret: Vec<u8>,
}

/// Validate a signed JWT against the trusted servers and allowed clients,
/// producing the ordered identity claims on success.
pub(crate) fn validate(
    token: &str,
    servers: &[ServerKey],
    allowed_clients: &[String],
) -> Result<AuthenticatedIdentity, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    let [header_b64, payload_b64, signature_b64] = parts[..] else {
        return Err(AuthError::MalformedToken);
    };
    if header_b64.is_empty() || payload_b64.is_empty() || signature_b64.is_empty() {
        return Err(AuthError::MalformedToken);
    }

    let header = decode_header(token).map_err(|_| AuthError::MalformedToken)?;
    if header.alg != Algorithm::HS512 {
        tracing::debug!(alg = ?header.alg, "token signed with an unsupported algorithm");
        return Err(AuthError::SignatureInvalid);
    }

    let payload_bytes = secret::decode_segment(payload_b64).ok_or(AuthError::MalformedToken)?;
    let payload: Map<String, Value> =
        serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::MalformedToken)?;

    // iss is read before the signature is checked: it selects the secret.
    // Nothing else is trusted until the signature passes.
    let issuer = payload
        .get("iss")
        .and_then(Value::as_str)
        .ok_or(AuthError::IssuerUntrusted)?;
    let server = servers
        .iter()
        .find(|server| server.issuer == issuer)
        .ok_or(AuthError::IssuerUntrusted)?;

    let signature = secret::decode_segment(signature_b64).ok_or(AuthError::MalformedToken)?;
    let mut mac = HmacSha512::new_from_slice(&server.secret)
        .map_err(|_| AuthError::SignatureInvalid)?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AuthError::SignatureInvalid)?;

    let audiences = token_audiences(&payload).ok_or(AuthError::AudienceInvalid)?;
    if !audiences
        .iter()
        .any(|audience| allowed_clients.iter().any(|client| client == audience))
    {
        return Err(AuthError::AudienceInvalid);
    }

    let now = unix_now();
    let expires = payload
        .get("exp")
        .and_then(Value::as_i64)
        .ok_or(AuthError::MalformedToken)?;
    if now > expires {
        return Err(AuthError::Expired);
    }
    if let Some(not_before) = payload.get("nbf") {
        let not_before = not_before.as_i64().ok_or(AuthError::MalformedToken)?;
        if now < not_before {
            tracing::debug!("token is not yet valid");
            return Err(AuthError::Expired);
        }
    }

    Ok(AuthenticatedIdentity::new(build_claims(
        &payload, issuer, &audiences, expires,
    )))
}

/// Audience is either a single string or an array of strings. Anything else
/// (including absence) fails the audience check.
fn token_audiences(payload: &Map<String, Value>) -> Option<Vec<String>> {
    match payload.get("aud")? {
        Value::String(aud) => Some(vec![aud.clone()]),
        Value::Array(entries) => {
            let audiences: Vec<String> = entries
                .iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect();
            (audiences.len() == entries.len()).then_some(audiences)
        }
        _ => None,
    }
}

/// Custom claims first in payload order, then issuer, one claim per
/// audience, and the expiry.
fn build_claims(
    payload: &Map<String, Value>,
    issuer: &str,
    audiences: &[String],
    expires: i64,
) -> Vec<Claim> {
    let mut claims = Vec::with_capacity(payload.len() + audiences.len());
    for (name, value) in payload {
        if REGISTERED_CLAIMS.contains(&name.as_str()) {
            continue;
        }
        let value = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        claims.push(Claim::new(name, value));
    }
    claims.push(Claim::new("iss", issuer));
    for audience in audiences {
        claims.push(Claim::new("aud", audience));
    }
    claims.push(Claim::new("exp", expires.to_string()));
    claims
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
