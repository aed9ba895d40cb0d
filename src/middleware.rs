// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 Tokengate Contributors

//! # Authentication Middleware
//!
//! [`JwtGate`] holds the validated runtime state (decoded secrets, resolved
//! decryption key, extraction priority) behind an `Arc`, so cloning it per
//! request is cheap. Wire it up with [`axum::middleware::from_fn_with_state`]:
//!
//! ```ignore
//! let gate = JwtGate::new(settings)?;
//! let app = Router::new()
//!     .route("/authorization-required", get(handler))
//!     .layer(middleware::from_fn_with_state(gate, authenticate));
//! ```
//!
//! Every request is re-verified in full; there is no caching and no retry.
//! A rejected request produces a bare 401 with the reason visible only in
//! the logs, and the downstream handler never runs.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::CONTENT_LENGTH;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use rsa::RsaPrivateKey;

use crate::claims::AuthenticatedIdentity;
use crate::config::{AuthenticationSettings, AuthorizationSource};
use crate::envelope;
use crate::error::{AuthError, ConfigError};
use crate::extract::{self, FormFields};
use crate::secret;
use crate::validator::{self, ServerKey};

/// Cap on how much of a form body is buffered while looking for a token.
/// Matches axum's default request body limit.
const FORM_BUFFER_LIMIT: usize = 2 * 1024 * 1024;

struct GateInner {
    allowed_clients: Vec<String>,
    servers: Vec<ServerKey>,
    authorization_key: Option<String>,
    priority: Vec<AuthorizationSource>,
    private_key: Option<RsaPrivateKey>,
}

/// Shared authentication state, built once from validated settings.
#[derive(Clone)]
pub struct JwtGate {
    inner: Arc<GateInner>,
}

impl JwtGate {
    /// Validate the settings and build the gate. Secrets are decoded and the
    /// decryption certificate is loaded here; any problem aborts construction
    /// so a misconfigured gate never serves traffic.
    pub fn new(settings: AuthenticationSettings) -> Result<Self, ConfigError> {
        let certificate_source = settings.certificate_source()?;

        let mut servers = Vec::with_capacity(settings.allowed_servers.len());
        for server in &settings.allowed_servers {
            servers.push(ServerKey {
                issuer: server.issuer.clone(),
                secret: secret::decode(&server.issuer, &server.secret)?,
            });
        }

        let private_key = match certificate_source {
            Some(source) => {
                let pair = source.fetch()?.ok_or(ConfigError::CertificateNotFound)?;
                Some(pair.private_key)
            }
            None => None,
        };

        Ok(Self {
            inner: Arc::new(GateInner {
                allowed_clients: settings.allowed_clients.clone(),
                priority: settings.priority(),
                authorization_key: settings.authorization_key.clone(),
                servers,
                private_key,
            }),
        })
    }

    /// Run the full pipeline: extract, decrypt, validate. On success the
    /// request comes back with the identity attached and its body intact.
    async fn check(&self, request: Request) -> Result<Request, AuthError> {
        let (mut parts, body) = request.into_parts();
        let key = self.inner.authorization_key.as_deref();
        let priority = self.inner.priority.as_slice();

        // The form source needs the body, and reading the body consumes it.
        // Walk the sources ahead of the form source first; only when none of
        // them yields a candidate is the body buffered and re-attached. The
        // body is parsed as urlencoded fields whatever its declared
        // content type.
        let form_index = if key.is_some() {
            priority
                .iter()
                .position(|source| *source == AuthorizationSource::Form)
        } else {
            None
        };
        let ahead = &priority[..form_index.unwrap_or(priority.len())];

        let mut token = extract::candidate(&parts.headers, parts.uri.query(), None, key, ahead);
        let mut body = body;
        if let (true, Some(index)) = (token.is_none(), form_index) {
            if declared_within_limit(&parts.headers) {
                match to_bytes(body, FORM_BUFFER_LIMIT).await {
                    Ok(bytes) => {
                        let form = FormFields::parse(&bytes);
                        token = extract::candidate(
                            &parts.headers,
                            parts.uri.query(),
                            Some(&form),
                            key,
                            &priority[index..],
                        );
                        body = Body::from(bytes);
                    }
                    Err(_) => {
                        // The body is gone and cannot be handed downstream.
                        tracing::debug!("form body could not be buffered");
                        return Err(AuthError::MissingToken);
                    }
                }
            } else {
                // Declared too large to buffer: skip the form source, keep
                // the body untouched, and let the remaining sources run.
                tracing::debug!("form body exceeds the buffer limit, form source skipped");
                token = extract::candidate(
                    &parts.headers,
                    parts.uri.query(),
                    None,
                    key,
                    &priority[index + 1..],
                );
            }
        }

        let token = token.ok_or(AuthError::MissingToken)?;

        let token = envelope::decrypt(&token, self.inner.private_key.as_ref())?;
        let identity = validator::validate(
            &token,
            &self.inner.servers,
            &self.inner.allowed_clients,
        )?;

        parts.extensions.insert::<AuthenticatedIdentity>(identity);
        Ok(Request::from_parts(parts, body))
    }
}

fn declared_within_limit(headers: &HeaderMap) -> bool {
    match headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok())
    {
        Some(length) => length <= FORM_BUFFER_LIMIT,
        None => true,
    }
}

/// Middleware entry point. Rejections short-circuit with an opaque 401; the
/// reason is logged, never sent to the client.
pub async fn authenticate(
    State(gate): State<JwtGate>,
    request: Request,
    next: Next,
) -> Response {
    match gate.check(request).await {
        Ok(request) => next.run(request).await,
        Err(reason) => {
            tracing::debug!(
                reason = reason.error_code(),
                "rejecting unauthenticated request"
            );
            reason.into_response()
        }
    }
}
