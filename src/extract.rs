// SPDX-License-Identifier: MIT
//
// Copyright (C) 2026 Tokengate Contributors

//! Token extraction from the configured request sources.
//!
//! Each source is consulted in the configured priority order and the first
//! non-empty candidate wins, even if it later fails validation. The header
//! source reads the standard `Authorization: Bearer` scheme; form and query
//! sources both require a configured field name and match it
//! case-insensitively, last occurrence winning.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::claims::AuthenticatedIdentity;
use crate::config::AuthorizationSource;
use crate::error::AuthError;

const BEARER_SCHEME: &str = "bearer ";

/// Handler-side extractor for the identity the middleware established.
///
/// ```ignore
/// async fn whoami(Auth(identity): Auth) -> Json<Vec<Claim>> {
///     Json(identity.claims().to_vec())
/// }
/// ```
///
/// Rejects with a bare 401 when the route was reached without the
/// authentication middleware having run.
pub struct Auth(pub AuthenticatedIdentity);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedIdentity>()
            .cloned()
            .map(Auth)
            .ok_or(AuthError::MissingToken)
    }
}

/// Parsed `application/x-www-form-urlencoded` body fields.
pub(crate) struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub(crate) fn parse(body: &[u8]) -> Self {
        Self(
            url::form_urlencoded::parse(body)
                .map(|(name, value)| (name.into_owned(), value.into_owned()))
                .collect(),
        )
    }

    fn last_match(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }
}

/// Pick the token candidate for this request, walking the priority order.
pub(crate) fn candidate(
    headers: &HeaderMap,
    query: Option<&str>,
    form: Option<&FormFields>,
    authorization_key: Option<&str>,
    priority: &[AuthorizationSource],
) -> Option<String> {
    priority.iter().find_map(|source| match source {
        AuthorizationSource::Header => from_header(headers),
        AuthorizationSource::Form => from_form(form, authorization_key),
        AuthorizationSource::QueryString => from_query(query, authorization_key),
    })
}

fn from_header(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let rest = if value.len() >= BEARER_SCHEME.len()
        && value[..BEARER_SCHEME.len()].eq_ignore_ascii_case(BEARER_SCHEME)
    {
        &value[BEARER_SCHEME.len()..]
    } else {
        value
    };
    non_empty(rest)
}

fn from_form(form: Option<&FormFields>, authorization_key: Option<&str>) -> Option<String> {
    let key = authorization_key?;
    non_empty(form?.last_match(key)?)
}

fn from_query(query: Option<&str>, authorization_key: Option<&str>) -> Option<String> {
    let key = authorization_key?;
    let fields = FormFields::parse(query?.as_bytes());
    non_empty(fields.last_match(key)?)
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const PRIORITY: [AuthorizationSource; 3] = [
        AuthorizationSource::Header,
        AuthorizationSource::Form,
        AuthorizationSource::QueryString,
    ];

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn strips_the_bearer_scheme_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("bEaReR abc.def.ghi"));
        assert_eq!(
            candidate(&headers, None, None, None, &PRIORITY),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn raw_header_value_is_used_without_a_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("abc.def.ghi"));
        assert_eq!(
            candidate(&headers, None, None, None, &PRIORITY),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn non_bearer_header_still_shadows_lower_sources() {
        // A non-bearer Authorization value is a candidate like any other:
        // first-non-empty-wins applies to it, even though it can never
        // validate. Only the bearer scheme prefix is ever stripped.
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw"));
        assert_eq!(
            candidate(
                &headers,
                Some("authorization=query-token"),
                None,
                Some("authorization"),
                &PRIORITY,
            ),
            Some("Basic dXNlcjpwdw".to_string())
        );
    }

    #[test]
    fn whitespace_only_header_yields_nothing() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer    "));
        assert_eq!(candidate(&headers, None, None, None, &PRIORITY), None);
    }

    #[test]
    fn header_beats_form_and_query_by_default() {
        let form = FormFields::parse(b"authorization=form-token");
        assert_eq!(
            candidate(
                &bearer("header-token"),
                Some("authorization=query-token"),
                Some(&form),
                Some("authorization"),
                &PRIORITY,
            ),
            Some("header-token".to_string())
        );
    }

    #[test]
    fn priority_order_is_honored() {
        let form = FormFields::parse(b"authorization=form-token");
        assert_eq!(
            candidate(
                &bearer("header-token"),
                Some("authorization=query-token"),
                Some(&form),
                Some("authorization"),
                &[AuthorizationSource::QueryString, AuthorizationSource::Header],
            ),
            Some("query-token".to_string())
        );
    }

    #[test]
    fn first_non_empty_source_wins_even_if_invalid() {
        // An empty header falls through; the form value is picked up even
        // though nothing guarantees it will validate.
        let form = FormFields::parse(b"authorization=broken");
        assert_eq!(
            candidate(
                &HeaderMap::new(),
                Some("authorization=query-token"),
                Some(&form),
                Some("authorization"),
                &PRIORITY,
            ),
            Some("broken".to_string())
        );
    }

    #[test]
    fn form_and_query_need_a_configured_key() {
        let form = FormFields::parse(b"authorization=form-token");
        assert_eq!(
            candidate(
                &HeaderMap::new(),
                Some("authorization=query-token"),
                Some(&form),
                None,
                &PRIORITY,
            ),
            None
        );
    }

    #[test]
    fn field_names_match_case_insensitively_last_wins() {
        let form = FormFields::parse(b"Authorization=first&AUTHORIZATION=second");
        assert_eq!(
            candidate(
                &HeaderMap::new(),
                None,
                Some(&form),
                Some("authorization"),
                &PRIORITY,
            ),
            Some("second".to_string())
        );
    }

    #[test]
    fn query_values_are_percent_decoded() {
        assert_eq!(
            candidate(
                &HeaderMap::new(),
                Some("authorization=a%2Eb%2Ec"),
                None,
                Some("authorization"),
                &PRIORITY,
            ),
            Some("a.b.c".to_string())
        );
    }

    #[test]
    fn sources_outside_the_priority_are_ignored() {
        assert_eq!(
            candidate(
                &bearer("header-token"),
                None,
                None,
                None,
                &[AuthorizationSource::QueryString],
            ),
            None
        );
    }
}
