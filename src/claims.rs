// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 Tokengate Contributors

//! Claims and the authenticated identity attached to requests.

use serde::{Deserialize, Serialize};

/// A single fact asserted about the token subject.
///
/// Serializes as `{"type": ..., "value": ...}`, the wire shape handlers are
/// expected to echo when exposing the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim type (e.g. `iss`, `aud`, or a custom name)
    #[serde(rename = "type")]
    pub claim_type: String,

    /// Claim value, always a string
    pub value: String,
}

impl Claim {
    /// Create a new claim.
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}

/// The validated identity of a request.
///
/// Produced by token validation and inserted into request extensions by the
/// authentication middleware. Claim order is the order asserted in the token
/// payload, followed by the issuer, audience, and expiry claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    claims: Vec<Claim>,
}

impl AuthenticatedIdentity {
    pub(crate) fn new(claims: Vec<Claim>) -> Self {
        Self { claims }
    }

    /// All claims, in order.
    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    /// The value of the first claim with the given type, if any.
    pub fn find(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }

    /// The token issuer (`iss` claim).
    pub fn issuer(&self) -> Option<&str> {
        self.find("iss")
    }

    /// The audience this token was accepted for (`aud` claim).
    pub fn audience(&self) -> Option<&str> {
        self.find("aud")
    }
}
