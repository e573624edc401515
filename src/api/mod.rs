pub mod basic_auth;
mod handlers;

use self::basic_auth::BasicAuthGate;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Router,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, debug_span, info, Span};
use ulid::Ulid;

/// Build the router: `/health` is open, `/` sits behind Basic Authentication.
#[must_use]
pub fn router(gate: BasicAuthGate) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health).options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(gate)),
        )
}

/// Bind `addr` and serve until `shutdown` is cancelled.
///
/// Binding `[::]` relies on the host accepting IPv4 on IPv6 sockets; when the
/// IPv6 bind fails it falls back to `0.0.0.0`. Hosts with `bindv6only=1` should
/// pass an IPv4 address.
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails
pub async fn new(addr: SocketAddr, gate: BasicAuthGate, shutdown: CancellationToken) -> Result<()> {
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) if addr.ip() == IpAddr::V6(Ipv6Addr::UNSPECIFIED) => {
            debug!("IPv6 bind failed ({err}), falling back to IPv4");
            TcpListener::bind((Ipv4Addr::UNSPECIFIED, addr.port()))
                .await
                .with_context(|| format!("Failed to bind port {}", addr.port()))?
        }
        Err(err) => return Err(err).with_context(|| format!("Failed to bind {addr}")),
    };

    serve(listener, gate, shutdown).await
}

/// Serve on an already bound listener until `shutdown` is cancelled.
/// # Errors
/// Returns an error if the server fails
pub async fn serve(
    listener: TcpListener,
    gate: BasicAuthGate,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router(gate).into_make_service())
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

// span, never includes the Authorization header
fn make_span(request: &Request<Body>) -> Span {
    let method = request.method().as_str();
    let path = request.uri().path();
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");

    debug_span!("http-request", method, path, request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verifier::{CredentialVerifier, SharedCredentials};
    use anyhow::Result;
    use axum::{
        body::to_bytes,
        http::{header, StatusCode},
    };
    use base64ct::{Base64, Encoding};
    use secrecy::SecretString;
    use std::{sync::Arc, time::Duration};
    use tower::ServiceExt;

    fn app(fail_delay: Duration) -> Router {
        let verifier = CredentialVerifier::new(
            "admin",
            SharedCredentials::new("root", SecretString::from("hunter2")),
        );
        verifier.set_fail_delay(fail_delay);
        router(BasicAuthGate::new(
            Arc::new(verifier),
            CancellationToken::new(),
        ))
    }

    fn get_root(authorization: Option<&str>) -> Result<Request<Body>> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        Ok(builder.body(Body::empty())?)
    }

    fn basic(userpass: &str) -> String {
        format!("Basic {}", Base64::encode_string(userpass.as_bytes()))
    }

    #[tokio::test]
    async fn health_is_open() -> Result<()> {
        let request = Request::builder().uri("/health").body(Body::empty())?;
        let response = app(Duration::ZERO).oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        Ok(())
    }

    #[tokio::test]
    async fn request_id_is_propagated() -> Result<()> {
        let request = Request::builder()
            .uri("/health")
            .header("x-request-id", "01HZX3J4T7Q6ZK2N4M5P6R7S8T")
            .body(Body::empty())?;
        let response = app(Duration::ZERO).oneshot(request).await?;
        assert_eq!(
            response
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok()),
            Some("01HZX3J4T7Q6ZK2N4M5P6R7S8T")
        );
        Ok(())
    }

    #[tokio::test]
    async fn root_without_credentials_is_challenged() -> Result<()> {
        let response = app(Duration::ZERO).oneshot(get_root(None)?).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response
                .headers()
                .get(header::WWW_AUTHENTICATE)
                .and_then(|v| v.to_str().ok()),
            Some("Basic realm=\"admin\"")
        );
        Ok(())
    }

    #[tokio::test]
    async fn root_with_valid_credentials() -> Result<()> {
        let response = app(Duration::from_secs(30))
            .oneshot(get_root(Some(&basic("root:hunter2")))?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(String::from_utf8(body.to_vec())?, "Hello, root!");
        Ok(())
    }

    #[tokio::test]
    async fn root_with_wrong_password_is_delayed_and_challenged() -> Result<()> {
        let delay = Duration::from_millis(50);
        let started = tokio::time::Instant::now();
        let response = app(delay)
            .oneshot(get_root(Some(&basic("root:hunter3")))?)
            .await?;
        assert!(started.elapsed() >= delay);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        Ok(())
    }

    #[tokio::test]
    async fn malformed_authorization_is_delayed_and_challenged() -> Result<()> {
        let delay = Duration::from_millis(50);
        let started = tokio::time::Instant::now();
        let response = app(delay)
            .oneshot(get_root(Some("Basic not base64"))?)
            .await?;
        assert!(started.elapsed() >= delay);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn new_binds_ipv4_and_stops_on_shutdown() -> Result<()> {
        let shutdown = CancellationToken::new();
        let gate = BasicAuthGate::new(
            Arc::new(CredentialVerifier::new(
                "admin",
                SharedCredentials::new("root", SecretString::from("hunter2")),
            )),
            shutdown.clone(),
        );

        let server = tokio::spawn(new(
            SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            gate,
            shutdown.clone(),
        ));
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), server).await???;
        Ok(())
    }

    #[tokio::test]
    async fn new_reports_bind_failures() -> Result<()> {
        let taken = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = taken.local_addr()?;
        let gate = BasicAuthGate::new(
            Arc::new(CredentialVerifier::new(
                "admin",
                SharedCredentials::new("root", SecretString::from("hunter2")),
            )),
            CancellationToken::new(),
        );

        let result = new(addr, gate, CancellationToken::new()).await;
        assert!(result.is_err_and(|e| e.to_string().contains("Failed to bind")));
        Ok(())
    }
}
