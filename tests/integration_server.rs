use anyhow::{ensure, Context, Result};
use base64ct::{Base64, Encoding};
use realmguard::{
    api::{self, basic_auth::BasicAuthGate},
    verifier::{CredentialVerifier, SharedCredentials},
};
use secrecy::SecretString;
use std::{net::Ipv4Addr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;

struct TestServer {
    port: u16,
    shutdown: CancellationToken,
    handle: tokio::task::JoinHandle<Result<()>>,
}

impl TestServer {
    async fn start(fail_delay: Duration) -> Result<Self> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let port = listener.local_addr()?.port();

        let verifier = CredentialVerifier::new(
            "admin",
            SharedCredentials::new("root", SecretString::from("hunter2")),
        );
        verifier.set_fail_delay(fail_delay);

        let shutdown = CancellationToken::new();
        let gate = BasicAuthGate::new(Arc::new(verifier), shutdown.clone());
        let handle = tokio::spawn(api::serve(listener, gate, shutdown.clone()));

        let server = Self {
            port,
            shutdown,
            handle,
        };
        server.wait_until_ready().await?;
        Ok(server)
    }

    async fn wait_until_ready(&self) -> Result<()> {
        for _ in 0..50 {
            if TcpStream::connect((Ipv4Addr::LOCALHOST, self.port)).await.is_ok() {
                return Ok(());
            }
            sleep(Duration::from_millis(20)).await;
        }
        anyhow::bail!("server did not start on port {}", self.port)
    }

    async fn get(&self, path: &str, authorization: Option<&str>) -> Result<String> {
        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, self.port)).await?;
        let mut request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n");
        if let Some(value) = authorization {
            request.push_str(&format!("Authorization: {value}\r\n"));
        }
        request.push_str("\r\n");
        stream.write_all(request.as_bytes()).await?;

        let mut response = String::new();
        stream.read_to_string(&mut response).await?;
        Ok(response)
    }

    async fn stop(self) -> Result<()> {
        self.shutdown.cancel();
        timeout(Duration::from_secs(5), self.handle)
            .await
            .context("server did not shut down")???;
        Ok(())
    }
}

fn basic(userpass: &str) -> String {
    format!("Basic {}", Base64::encode_string(userpass.as_bytes()))
}

#[tokio::test]
async fn serves_health_and_protected_root() -> Result<()> {
    let server = TestServer::start(Duration::from_millis(50)).await?;

    let health = server.get("/health", None).await?;
    ensure!(health.starts_with("HTTP/1.1 200"), "health: {health}");
    ensure!(health.contains("\"name\":\"realmguard\""));

    let challenged = server.get("/", None).await?;
    ensure!(challenged.starts_with("HTTP/1.1 401"), "root: {challenged}");
    ensure!(challenged
        .to_ascii_lowercase()
        .contains("www-authenticate: basic realm=\"admin\""));

    let accepted = server.get("/", Some(&basic("root:hunter2"))).await?;
    ensure!(accepted.starts_with("HTTP/1.1 200"), "root: {accepted}");
    ensure!(accepted.ends_with("Hello, root!"));

    let rejected = server.get("/", Some(&basic("root:wrong"))).await?;
    ensure!(rejected.starts_with("HTTP/1.1 401"), "root: {rejected}");

    server.stop().await
}

#[tokio::test]
async fn shutdown_ends_pending_rejections() -> Result<()> {
    let server = TestServer::start(Duration::from_secs(60)).await?;
    let port = server.port;

    let pending = tokio::spawn(async move {
        let mut stream = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await?;
        let request = format!(
            "GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nAuthorization: {}\r\n\r\n",
            basic("root:wrong")
        );
        stream.write_all(request.as_bytes()).await?;
        let mut response = String::new();
        stream.read_to_string(&mut response).await?;
        Ok::<_, anyhow::Error>(response)
    });

    sleep(Duration::from_millis(100)).await;
    server.stop().await?;

    let response = timeout(Duration::from_secs(5), pending)
        .await
        .context("pending request was not released")???;
    ensure!(response.starts_with("HTTP/1.1 401"), "pending: {response}");
    Ok(())
}
