// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 Tokengate Contributors

//! Shared helpers for the end-to-end API tests: a minimal protected router,
//! token minting, and a JWE envelope encryptor (the library only decrypts,
//! so the tests play the token issuer).

use std::path::PathBuf;

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::{middleware, Json, Router};
use base64ct::{Base64UrlUnpadded, Encoding};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;

use tokengate::{authenticate, Auth, AuthenticationSettings, Claim, JwtGate, TrustedServer};

pub const ISSUER: &str = "http://auth.localhost";
pub const SECRET: &str = "pu6txARocfowC1b3eNZEYuNcnTBGwEGfupX9kShMc8U";
pub const OTHER_SECRET: &str = "HayCkqRlBqeILBmvywxwzWsANzQ5YQQaJdjnDPR5CW0";
pub const CLIENT: &str = "my-identifier";

pub fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn settings() -> AuthenticationSettings {
    AuthenticationSettings {
        allowed_clients: vec![CLIENT.to_string()],
        allowed_servers: vec![TrustedServer {
            issuer: ISSUER.to_string(),
            secret: SECRET.to_string(),
        }],
        ..Default::default()
    }
}

async fn claims(Auth(identity): Auth) -> Json<Vec<Claim>> {
    Json(identity.claims().to_vec())
}

/// A router with one protected endpoint mirroring the gate under test.
pub fn app(settings: AuthenticationSettings) -> Router {
    let gate = JwtGate::new(settings).expect("gate builds");
    Router::new()
        .route("/authorization-required", get(claims).post(claims))
        .layer(middleware::from_fn_with_state(gate, authenticate))
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response: Response = app.clone().oneshot(request).await.expect("infallible");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    (status, String::from_utf8(body.to_vec()).expect("utf8 body"))
}

pub fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs() as i64
}

/// Mint an HS512 token. The payload keeps its insertion order, which the
/// claim endpoint is expected to echo back.
pub fn mint(payload: &Value, secret_b64: &str) -> String {
    let secret = Base64UrlUnpadded::decode_vec(secret_b64).expect("valid secret");
    encode(
        &Header::new(Algorithm::HS512),
        payload,
        &EncodingKey::from_secret(&secret),
    )
    .expect("token encodes")
}

pub fn standard_payload(exp: i64) -> Value {
    serde_json::json!({
        "user": "test",
        "iss": ISSUER,
        "aud": CLIENT,
        "exp": exp,
    })
}

/// The claim list the endpoint should produce for `standard_payload`.
pub fn expected_body(exp: i64) -> String {
    format!(
        concat!(
            "[{{\"type\":\"user\",\"value\":\"test\"}},",
            "{{\"type\":\"iss\",\"value\":\"http://auth.localhost\"}},",
            "{{\"type\":\"aud\",\"value\":\"my-identifier\"}},",
            "{{\"type\":\"exp\",\"value\":\"{exp}\"}}]"
        ),
        exp = exp
    )
}

pub fn envelope_public_key() -> RsaPublicKey {
    let text = std::fs::read(fixture_dir().join("envelope.pem")).expect("fixture present");
    let key_block = pem::parse_many(&text)
        .expect("valid pem")
        .into_iter()
        .find(|block| block.tag() == "PRIVATE KEY")
        .expect("bundle carries a key");
    RsaPrivateKey::from_pkcs8_der(key_block.contents())
        .expect("rsa key")
        .to_public_key()
}

/// Wrap a signed token in a JWE compact envelope the way the issuer would:
/// RSA-OAEP-256 key wrap, AES-256-GCM, DEFLATE-compressed plaintext.
pub fn encrypt(token: &str, public_key: &RsaPublicKey) -> String {
    use std::io::Write;

    let protected = Base64UrlUnpadded::encode_string(
        br#"{"alg":"RSA-OAEP-256","enc":"A256GCM","zip":"DEF"}"#,
    );

    let mut cek = [0u8; 32];
    OsRng.fill_bytes(&mut cek);
    let mut iv = [0u8; 12];
    OsRng.fill_bytes(&mut iv);

    let mut compressor = DeflateEncoder::new(Vec::new(), Compression::default());
    compressor.write_all(token.as_bytes()).expect("compresses");
    let plaintext = compressor.finish().expect("compresses");

    let cipher = Aes256Gcm::new_from_slice(&cek).expect("32-byte key");
    let sealed = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: &plaintext,
                aad: protected.as_bytes(),
            },
        )
        .expect("encrypts");
    let (ciphertext, tag) = sealed.split_at(sealed.len() - 16);

    let encrypted_key = public_key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), &cek)
        .expect("key wraps");

    [
        protected,
        Base64UrlUnpadded::encode_string(&encrypted_key),
        Base64UrlUnpadded::encode_string(&iv),
        Base64UrlUnpadded::encode_string(ciphertext),
        Base64UrlUnpadded::encode_string(tag),
    ]
    .join(".")
}
