// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 Tokengate Contributors

//! Base64-URL codec for shared signing secrets.
//!
//! Secrets are stored base64url-encoded (unpadded) in configuration and
//! decoded once at gate construction. Malformed encodings are configuration
//! errors, never deferred to the request path.

use base64ct::{Base64UrlUnpadded, Encoding};

use crate::error::ConfigError;

/// Decode a trusted server's shared secret.
///
/// The `issuer` is only used to produce a useful error message.
pub(crate) fn decode(issuer: &str, secret: &str) -> Result<Vec<u8>, ConfigError> {
    Base64UrlUnpadded::decode_vec(secret).map_err(|_| ConfigError::InvalidSecret {
        issuer: issuer.to_string(),
    })
}

/// Decode an arbitrary base64url (unpadded) JWT segment.
pub(crate) fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    Base64UrlUnpadded::decode_vec(segment).ok()
}

/// Encode bytes as unpadded base64url.
pub(crate) fn encode_segment(bytes: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(bytes)
}
