// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 Tokengate Contributors

//! Authentication and configuration errors.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Per-request authentication rejection.
///
/// Every variant maps to an opaque `401 Unauthorized` response. The reason is
/// never sent to the client; it is available through [`AuthError::error_code`]
/// for logging and diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// No source yielded a candidate token
    MissingToken,
    /// Token is structurally not a JWT
    MalformedToken,
    /// Token signature does not verify against the issuer's secret
    SignatureInvalid,
    /// Token audience does not intersect the allowed clients
    AudienceInvalid,
    /// Token issuer is not a trusted server
    IssuerUntrusted,
    /// Token has expired (or is not yet valid)
    Expired,
    /// Envelope decryption failed
    DecryptionFailed,
}

impl AuthError {
    /// Get the error code for this rejection.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::AudienceInvalid => "audience_invalid",
            AuthError::IssuerUntrusted => "issuer_untrusted",
            AuthError::Expired => "expired",
            AuthError::DecryptionFailed => "decryption_failed",
        }
    }

    /// Get the HTTP status code for this rejection.
    ///
    /// Every rejection is a 401; clients cannot distinguish why.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "No bearer token was presented"),
            AuthError::MalformedToken => write!(f, "Token is malformed"),
            AuthError::SignatureInvalid => write!(f, "Token signature is invalid"),
            AuthError::AudienceInvalid => write!(f, "Token audience is not allowed"),
            AuthError::IssuerUntrusted => write!(f, "Token issuer is not trusted"),
            AuthError::Expired => write!(f, "Token has expired"),
            AuthError::DecryptionFailed => write!(f, "Token envelope could not be decrypted"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Deliberately bare: no body, no reason detail.
        self.status_code().into_response()
    }
}

/// Fatal configuration errors raised while building a [`crate::JwtGate`].
///
/// These abort startup; none of them is ever produced on the request path.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("certificate configuration is ambiguous: both a relative file certificate and a store certificate are set")]
    AmbiguousCertificateSource,

    #[error("secret for issuer {issuer:?} is not valid base64url")]
    InvalidSecret { issuer: String },

    #[error("certificate could not be found")]
    CertificateNotFound,

    #[error("certificate does not contain a usable private key")]
    UnusablePrivateKey,

    #[error("certificate at {path:?} could not be loaded: {detail}")]
    InvalidCertificate { path: PathBuf, detail: String },

    #[error("certificate store at {path:?} could not be opened: {detail}")]
    StoreUnavailable { path: PathBuf, detail: String },
}
