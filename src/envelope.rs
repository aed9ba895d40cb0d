// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 Tokengate Contributors

//! JWE compact envelope decryption.
//!
//! Tokens may arrive wrapped in a JWE compact envelope (RSA-OAEP-256 key
//! unwrap, AES-256-GCM content encryption, optional DEFLATE compression of
//! the plaintext). With no private key configured the token passes through
//! unchanged; with one configured every token must be an envelope. This
//! module only unwraps. Producing envelopes is the token issuer's job, so
//! there is no encrypt counterpart here.

use std::io::Read;

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use flate2::read::DeflateDecoder;
use rsa::{Oaep, RsaPrivateKey};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use crate::error::AuthError;
use crate::secret;

const KEY_MANAGEMENT_ALG: &str = "RSA-OAEP-256";
const CONTENT_ENCRYPTION_ALG: &str = "A256GCM";
const DEFLATE_ZIP: &str = "DEF";

const CEK_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Unwrap a JWE compact envelope, or pass the token through when no
/// decryption key is configured. Every failure collapses to
/// [`AuthError::DecryptionFailed`]; the specific cause is logged, never
/// returned to the caller of the endpoint.
pub(crate) fn decrypt(token: &str, key: Option<&RsaPrivateKey>) -> Result<String, AuthError> {
    let Some(key) = key else {
        return Ok(token.to_string());
    };

    unwrap_envelope(token, key).map_err(|err| {
        tracing::debug!(detail = %err, "token envelope could not be opened");
        AuthError::DecryptionFailed
    })
}

#[derive(Debug, Error)]
enum EnvelopeError {
    #[error("token is not a five-part JWE compact serialization")]
    Structure,
    #[error("protected header is not valid base64url JSON")]
    Header,
    #[error("unsupported algorithm pair {alg:?}/{enc:?}")]
    Algorithm { alg: String, enc: String },
    #[error("unsupported compression {0:?}")]
    Compression(String),
    #[error("content key could not be unwrapped")]
    KeyUnwrap,
    #[error("content key is not {CEK_LEN} bytes")]
    KeyLength,
    #[error("initialization vector is not {NONCE_LEN} bytes")]
    NonceLength,
    #[error("ciphertext authentication failed")]
    Decryption,
    #[error("plaintext could not be inflated")]
    Inflate,
    #[error("plaintext is not UTF-8")]
    Encoding,
}

#[derive(Deserialize)]
struct ProtectedHeader {
    alg: String,
    enc: String,
    #[serde(default)]
    zip: Option<String>,
}

fn unwrap_envelope(token: &str, key: &RsaPrivateKey) -> Result<String, EnvelopeError> {
    let parts: Vec<&str> = token.split('.').collect();
    let [protected_b64, encrypted_key, iv, ciphertext, tag] = parts[..] else {
        return Err(EnvelopeError::Structure);
    };

    let header_bytes = secret::decode_segment(protected_b64).ok_or(EnvelopeError::Header)?;
    let header: ProtectedHeader =
        serde_json::from_slice(&header_bytes).map_err(|_| EnvelopeError::Header)?;
    if header.alg != KEY_MANAGEMENT_ALG || header.enc != CONTENT_ENCRYPTION_ALG {
        return Err(EnvelopeError::Algorithm {
            alg: header.alg,
            enc: header.enc,
        });
    }
    match header.zip.as_deref() {
        None | Some(DEFLATE_ZIP) => {}
        Some(other) => return Err(EnvelopeError::Compression(other.to_string())),
    }

    let encrypted_key = secret::decode_segment(encrypted_key).ok_or(EnvelopeError::Structure)?;
    let iv = secret::decode_segment(iv).ok_or(EnvelopeError::Structure)?;
    let ciphertext = secret::decode_segment(ciphertext).ok_or(EnvelopeError::Structure)?;
    let tag = secret::decode_segment(tag).ok_or(EnvelopeError::Structure)?;

    let cek = key
        .decrypt(Oaep::new::<Sha256>(), &encrypted_key)
        .map_err(|_| EnvelopeError::KeyUnwrap)?;
    if cek.len() != CEK_LEN {
        return Err(EnvelopeError::KeyLength);
    }
    if iv.len() != NONCE_LEN {
        return Err(EnvelopeError::NonceLength);
    }

    // GCM wants ciphertext and tag as one buffer; the protected header (in
    // its base64url form) is the additional authenticated data.
    let mut sealed = ciphertext;
    sealed.extend_from_slice(&tag);
    let cipher = Aes256Gcm::new_from_slice(&cek).map_err(|_| EnvelopeError::KeyLength)?;
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: &sealed,
                aad: protected_b64.as_bytes(),
            },
        )
        .map_err(|_| EnvelopeError::Decryption)?;

    let plaintext = if header.zip.as_deref() == Some(DEFLATE_ZIP) {
        let mut inflated = Vec::new();
        DeflateDecoder::new(plaintext.as_slice())
            .read_to_end(&mut inflated)
            .map_err(|_| EnvelopeError::Inflate)?;
        inflated
    } else {
        plaintext
    };

    String::from_utf8(plaintext).map_err(|_| EnvelopeError::Encoding)
}
