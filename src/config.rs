// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 Tokengate Contributors

//! # Authentication Settings
//!
//! Configuration consumed by [`crate::JwtGate::new`]. Settings are designed
//! for deserialization from an external settings provider and accept both
//! snake_case and the legacy PascalCase field names, so existing JSON
//! configuration carries over unchanged:
//!
//! ```json
//! {
//!     "AllowedClients": ["my-identifier"],
//!     "AllowedServers": [
//!         { "Issuer": "http://auth.localhost", "Secret": "cDEyMw" }
//!     ],
//!     "AuthorizationKey": "Authorization",
//!     "AuthorizationPriority": ["Header", "Form", "QueryString"]
//! }
//! ```
//!
//! Settings are constructed once at application configuration time, validated
//! eagerly, and shared read-only across all concurrent requests.

use std::path::PathBuf;

use secrecy::SecretString;
use serde::Deserialize;

use crate::certificate::CertificateSource;
use crate::error::ConfigError;

/// Set of all possible authorization sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum AuthorizationSource {
    Header,
    Form,
    QueryString,
}

/// Default extraction order when no priority is configured.
pub const DEFAULT_AUTHORIZATION_PRIORITY: [AuthorizationSource; 3] = [
    AuthorizationSource::Header,
    AuthorizationSource::Form,
    AuthorizationSource::QueryString,
];

/// One JWT-signing authority whose tokens are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrustedServer {
    /// Issuer identity, matched case-sensitively against the `iss` claim
    #[serde(alias = "Issuer")]
    pub issuer: String,

    /// Shared HMAC secret, base64url-encoded (unpadded) at rest
    #[serde(alias = "Secret")]
    pub secret: String,
}

/// Describes how to load a certificate bundle from a file.
///
/// The bundle is a PEM file carrying the certificate and its RSA private key;
/// the key may be a password-encrypted PKCS#8 block.
#[derive(Debug, Clone, Deserialize)]
pub struct RelativeFileCertificate {
    /// Optional base path. If unset the current directory is used.
    #[serde(default, alias = "BasePath")]
    pub base_path: Option<PathBuf>,

    /// Certificate file path, relative to the base path.
    #[serde(alias = "RelativeFilePath")]
    pub relative_file_path: PathBuf,

    /// Password for an encrypted private key. Held as a scoped secret; it is
    /// never logged and never serialized back out.
    #[serde(default, alias = "Password")]
    pub password: Option<SecretString>,
}

/// Describes a certificate in a store directory, identified by thumbprint.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreCertificate {
    /// Directory holding PEM certificate bundles.
    #[serde(alias = "StorePath")]
    pub store_path: PathBuf,

    /// SHA-1 certificate thumbprint. Normalized before matching: all
    /// non-alphanumeric characters are stripped and the rest upper-cased.
    #[serde(alias = "CertificateThumbprint")]
    pub certificate_thumbprint: String,

    /// Whether the certificate must be within its validity period.
    /// Defaults to true.
    #[serde(default = "default_validity_required", alias = "CertificateValidityRequired")]
    pub certificate_validity_required: bool,
}

fn default_validity_required() -> bool {
    true
}

/// Settings for the JWT bearer authentication middleware.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthenticationSettings {
    /// Client identifiers the token audience must intersect.
    #[serde(default, alias = "AllowedClients")]
    pub allowed_clients: Vec<String>,

    /// Trusted signing authorities, in configuration order. On duplicate
    /// issuers the first entry wins.
    #[serde(default, alias = "AllowedServers")]
    pub allowed_servers: Vec<TrustedServer>,

    /// File-based certificate for envelope decryption.
    #[serde(default, alias = "RelativeFileCertificate")]
    pub relative_file_certificate: Option<RelativeFileCertificate>,

    /// Store-based certificate for envelope decryption. Mutually exclusive
    /// with `relative_file_certificate`.
    #[serde(default, alias = "StoreCertificate")]
    pub store_certificate: Option<StoreCertificate>,

    /// Field name carrying the token in form bodies and query strings.
    /// Without it the Form and QueryString sources yield nothing.
    #[serde(default, alias = "AuthorizationKey")]
    pub authorization_key: Option<String>,

    /// Extraction order. Empty means the default order
    /// [Header, Form, QueryString].
    #[serde(default, alias = "AuthorizationPriority")]
    pub authorization_priority: Vec<AuthorizationSource>,
}

impl AuthenticationSettings {
    /// The effective extraction order.
    pub fn priority(&self) -> Vec<AuthorizationSource> {
        if self.authorization_priority.is_empty() {
            DEFAULT_AUTHORIZATION_PRIORITY.to_vec()
        } else {
            self.authorization_priority.clone()
        }
    }

    /// Resolve the configured certificate source, if any.
    ///
    /// Runs before any I/O: configuring both variants at once is rejected
    /// here, not at fetch time.
    pub(crate) fn certificate_source(&self) -> Result<Option<CertificateSource>, ConfigError> {
        match (&self.relative_file_certificate, &self.store_certificate) {
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousCertificateSource),
            (Some(file), None) => Ok(Some(CertificateSource::RelativeFile(file.clone()))),
            (None, Some(store)) => Ok(Some(CertificateSource::Store(store.clone()))),
            (None, None) => Ok(None),
        }
    }
}
