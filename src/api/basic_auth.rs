//! HTTP Basic Authentication on top of [`CredentialVerifier`].
//!
//! Flow Overview: read the `Authorization` header, decode the `Basic`
//! credentials, and let the verifier decide. A missing header gets an
//! immediate challenge; a malformed one is handed to the verifier as absent
//! credentials so it is throttled like any other failed attempt.

use crate::verifier::CredentialVerifier;
use axum::{
    http::{
        header::{AUTHORIZATION, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
};
use base64ct::{Base64, Encoding};
use std::{fmt, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

/// Authenticated user for the current request.
#[derive(Clone, Debug)]
pub struct Principal {
    pub username: String,
}

/// Credentials decoded from an `Authorization: Basic` header.
pub struct BasicCredentials {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"...")
            .finish()
    }
}

#[derive(Debug)]
enum Authorization {
    Missing,
    Malformed,
    Basic(BasicCredentials),
}

/// Shared per-endpoint state: the verifier plus the server shutdown token,
/// so pending rejection delays end when the server stops.
#[derive(Clone, Debug)]
pub struct BasicAuthGate {
    verifier: Arc<CredentialVerifier>,
    shutdown: CancellationToken,
}

impl BasicAuthGate {
    #[must_use]
    pub fn new(verifier: Arc<CredentialVerifier>, shutdown: CancellationToken) -> Self {
        Self { verifier, shutdown }
    }

    /// Authenticate the request, or return the `401` challenge to send back.
    /// # Errors
    /// Returns the challenge response when the credentials are missing or rejected.
    #[instrument(skip_all, fields(realm = %self.verifier.realm()))]
    pub async fn require(&self, headers: &HeaderMap) -> Result<Principal, Response> {
        let credentials = match parse_authorization(headers) {
            Authorization::Missing => {
                debug!("no Authorization header, sending challenge");
                return Err(challenge(self.verifier.realm()));
            }
            Authorization::Malformed => None,
            Authorization::Basic(credentials) => Some(credentials),
        };

        let cancel = self.shutdown.child_token();
        let accepted = self
            .verifier
            .verify(
                credentials.as_ref().map(|c| c.username.as_str()),
                credentials.as_ref().map(|c| c.password.as_str()),
                &cancel,
            )
            .await;

        match credentials {
            Some(credentials) if accepted => Ok(Principal {
                username: credentials.username,
            }),
            _ => Err(challenge(self.verifier.realm())),
        }
    }
}

fn parse_authorization(headers: &HeaderMap) -> Authorization {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Authorization::Missing;
    };

    value
        .to_str()
        .ok()
        .and_then(decode_basic)
        .map_or(Authorization::Malformed, Authorization::Basic)
}

/// Decode the value of an `Authorization` header using the `Basic` scheme.
#[must_use]
pub fn decode_basic(value: &str) -> Option<BasicCredentials> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = Zeroizing::new(Base64::decode_vec(encoded.trim()).ok()?);
    let decoded = std::str::from_utf8(&decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;

    Some(BasicCredentials {
        username: username.to_string(),
        password: Zeroizing::new(password.to_string()),
    })
}

/// `401 Unauthorized` with a `Basic` challenge for `realm`.
#[must_use]
pub fn challenge(realm: &str) -> Response {
    let escaped = realm.replace('\\', "\\\\").replace('"', "\\\"");
    let mut response = StatusCode::UNAUTHORIZED.into_response();
    if let Ok(value) = HeaderValue::from_str(&format!("Basic realm=\"{escaped}\"")) {
        response.headers_mut().insert(WWW_AUTHENTICATE, value);
    }
    response
}
