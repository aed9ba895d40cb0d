// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 Tokengate Contributors

//! Certificate bundle loading for envelope decryption.
//!
//! A bundle is a PEM file carrying an X.509 certificate together with its RSA
//! private key. Bundles come from one of two places: a configured file path,
//! or a store directory searched by SHA-1 thumbprint. Either way the result
//! is the decryption key the envelope layer needs; loading happens once at
//! gate construction, never per request.

use std::fs;
use std::path::Path;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use secrecy::{ExposeSecret, SecretString};
use sha1::{Digest, Sha1};
use x509_parser::prelude::parse_x509_certificate;

use crate::config::{RelativeFileCertificate, StoreCertificate};
use crate::error::ConfigError;

/// A loaded certificate and its private key.
pub(crate) struct CertificateKeyPair {
    /// DER-encoded certificate, retained for thumbprint reporting.
    #[allow(dead_code)]
    pub certificate: Vec<u8>,
    pub private_key: RsaPrivateKey,
}

/// Where to load the decryption certificate from.
pub(crate) enum CertificateSource {
    RelativeFile(RelativeFileCertificate),
    Store(StoreCertificate),
}

impl CertificateSource {
    /// Load the certificate bundle. `Ok(None)` means the source was searched
    /// and nothing matched; the caller decides whether that is fatal.
    pub(crate) fn fetch(&self) -> Result<Option<CertificateKeyPair>, ConfigError> {
        match self {
            CertificateSource::RelativeFile(file) => fetch_file(file),
            CertificateSource::Store(store) => fetch_store(store),
        }
    }
}

fn fetch_file(
    config: &RelativeFileCertificate,
) -> Result<Option<CertificateKeyPair>, ConfigError> {
    let base = match &config.base_path {
        Some(base) => base.clone(),
        None => std::env::current_dir().map_err(|err| ConfigError::InvalidCertificate {
            path: config.relative_file_path.clone(),
            detail: err.to_string(),
        })?,
    };
    let path = base.join(&config.relative_file_path);
    if !path.exists() {
        return Ok(None);
    }

    let blocks = read_bundle(&path)?;
    let certificate = find_certificate(&blocks).ok_or_else(|| ConfigError::InvalidCertificate {
        path: path.clone(),
        detail: "no CERTIFICATE block in bundle".to_string(),
    })?;
    let private_key = find_private_key(&blocks, config.password.as_ref())?;

    Ok(Some(CertificateKeyPair {
        certificate,
        private_key,
    }))
}

fn fetch_store(config: &StoreCertificate) -> Result<Option<CertificateKeyPair>, ConfigError> {
    let wanted = normalize_thumbprint(&config.certificate_thumbprint);

    let entries = fs::read_dir(&config.store_path).map_err(|err| ConfigError::StoreUnavailable {
        path: config.store_path.clone(),
        detail: err.to_string(),
    })?;
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    for path in paths {
        let blocks = match read_bundle(&path) {
            Ok(blocks) => blocks,
            Err(_) => {
                tracing::debug!(path = %path.display(), "skipping unparsable store entry");
                continue;
            }
        };
        let Some(certificate) = find_certificate(&blocks) else {
            continue;
        };
        if thumbprint(&certificate) != wanted {
            continue;
        }
        if config.certificate_validity_required && !is_currently_valid(&certificate) {
            tracing::debug!(
                path = %path.display(),
                "thumbprint matched but certificate is outside its validity period"
            );
            continue;
        }

        let private_key = find_private_key(&blocks, None)?;
        return Ok(Some(CertificateKeyPair {
            certificate,
            private_key,
        }));
    }

    Ok(None)
}

fn read_bundle(path: &Path) -> Result<Vec<pem::Pem>, ConfigError> {
    let text = fs::read(path).map_err(|err| ConfigError::InvalidCertificate {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })?;
    pem::parse_many(&text).map_err(|err| ConfigError::InvalidCertificate {
        path: path.to_path_buf(),
        detail: err.to_string(),
    })
}

fn find_certificate(blocks: &[pem::Pem]) -> Option<Vec<u8>> {
    blocks
        .iter()
        .find(|block| block.tag() == "CERTIFICATE")
        .map(|block| block.contents().to_vec())
}

/// Pull the first RSA private key out of the bundle. Non-RSA keys and key
/// blocks the password does not open count as unusable.
fn find_private_key(
    blocks: &[pem::Pem],
    password: Option<&SecretString>,
) -> Result<RsaPrivateKey, ConfigError> {
    for block in blocks {
        let decoded = match block.tag() {
            "ENCRYPTED PRIVATE KEY" => {
                let Some(password) = password else {
                    return Err(ConfigError::UnusablePrivateKey);
                };
                RsaPrivateKey::from_pkcs8_encrypted_der(
                    block.contents(),
                    password.expose_secret().as_bytes(),
                )
                .map_err(|_| ConfigError::UnusablePrivateKey)
            }
            "PRIVATE KEY" => RsaPrivateKey::from_pkcs8_der(block.contents())
                .map_err(|_| ConfigError::UnusablePrivateKey),
            "RSA PRIVATE KEY" => RsaPrivateKey::from_pkcs1_der(block.contents())
                .map_err(|_| ConfigError::UnusablePrivateKey),
            _ => continue,
        };
        return decoded;
    }
    Err(ConfigError::UnusablePrivateKey)
}

/// SHA-1 thumbprint of a DER certificate, upper-case hex with no separators.
pub(crate) fn thumbprint(der: &[u8]) -> String {
    let digest = Sha1::digest(der);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02X}"));
    }
    out
}

/// Canonicalize a configured thumbprint: strip every non-alphanumeric
/// character (colons, spaces, the invisible junk copy-paste introduces) and
/// upper-case the rest.
pub(crate) fn normalize_thumbprint(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase()
}

fn is_currently_valid(der: &[u8]) -> bool {
    let Ok((_, cert)) = parse_x509_certificate(der) else {
        return false;
    };
    let not_before = cert.validity().not_before.timestamp();
    let not_after = cert.validity().not_after.timestamp();
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    not_before <= now && now <= not_after
}
