// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 Tokengate Contributors

//! # Tokengate
//!
//! Bearer-token authentication middleware for axum services. Tokens are
//! plucked from the `Authorization` header, a form body, or the query string
//! in a configurable priority order, optionally unwrapped from a JWE
//! envelope, then verified as HS512-signed JWTs against a set of trusted
//! issuers and allowed client audiences. Anything short of a fully valid
//! token gets an opaque `401 Unauthorized` before the handler runs.
//!
//! ```ignore
//! use axum::{middleware, routing::get, Json, Router};
//! use tokengate::{authenticate, Auth, AuthenticationSettings, Claim, JwtGate};
//!
//! let settings: AuthenticationSettings = serde_json::from_str(config_json)?;
//! let gate = JwtGate::new(settings)?;
//!
//! let app: Router = Router::new()
//!     .route(
//!         "/authorization-required",
//!         get(|Auth(identity): Auth| async move {
//!             Json(identity.claims().to_vec())
//!         }),
//!     )
//!     .layer(middleware::from_fn_with_state(gate, authenticate));
//! ```

mod certificate;
mod claims;
mod config;
mod envelope;
mod error;
mod extract;
mod middleware;
mod secret;
mod validator;

pub use claims::{AuthenticatedIdentity, Claim};
pub use config::{
    AuthenticationSettings, AuthorizationSource, RelativeFileCertificate, StoreCertificate,
    TrustedServer, DEFAULT_AUTHORIZATION_PRIORITY,
};
pub use error::{AuthError, ConfigError};
pub use extract::Auth;
pub use middleware::{authenticate, JwtGate};
