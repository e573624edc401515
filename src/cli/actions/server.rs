use crate::{
    api::{self, basic_auth::BasicAuthGate},
    cli::commands::auth::{Options, PasswordSource},
    verifier::{
        CredentialSource, CredentialVerifier, FileCredentials, FnCredentials, SharedCredentials,
    },
};
use anyhow::{Context, Result};
use std::{net::SocketAddr, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug)]
pub struct Args {
    pub listen: SocketAddr,
    pub auth: Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the verifier cannot be configured or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let verifier = Arc::new(build_verifier(args.auth)?);

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    api::new(
        args.listen,
        BasicAuthGate::new(verifier, shutdown.clone()),
        shutdown,
    )
    .await
}

/// Build the verifier described by the CLI options.
/// # Errors
/// Returns an error if the digest algorithm is not supported.
pub fn build_verifier(options: Options) -> Result<CredentialVerifier> {
    let source: Arc<dyn CredentialSource> = match options.password {
        PasswordSource::Inline(password) => {
            Arc::new(SharedCredentials::new(options.username, password))
        }
        PasswordSource::File(path) => Arc::new(FileCredentials::new(options.username, path)),
        PasswordSource::Unset => {
            warn!("no expected password configured, every request will be rejected");
            let username = options.username;
            Arc::new(FnCredentials::new(move || Some(username.clone()), || None))
        }
    };

    let verifier = CredentialVerifier::with_digest(
        options.realm,
        source,
        options.digest.as_deref().unwrap_or_default(),
    )
    .context("invalid --digest")?;

    verifier.set_text_encoding(options.charset);
    verifier.set_fail_delay(options.fail_delay);
    verifier.set_failure_log_level(options.failure_log_level);

    Ok(verifier)
}

async fn shutdown_signal(shutdown: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received SIGINT (Ctrl+C)");
            shutdown.cancel();
        }
        Err(err) => error!("Failed to listen for Ctrl+C: {err}"),
    }
}

fn log_startup_args(args: &Args) {
    let password = match &args.auth.password {
        PasswordSource::Inline(_) => "inline (REDACTED)".to_string(),
        PasswordSource::File(path) => format!("file {}", path.display()),
        PasswordSource::Unset => "none".to_string(),
    };
    let entries = [
        ("listen", format!("tcp:{}", args.listen)),
        ("realm", args.auth.realm.clone()),
        ("username", args.auth.username.clone()),
        ("password", password),
        (
            "digest",
            args.auth
                .digest
                .clone()
                .unwrap_or_else(|| "none".to_string()),
        ),
        ("charset", args.auth.charset.to_string()),
        ("fail_delay_ms", args.auth.fail_delay.as_millis().to_string()),
        ("failure_log_level", args.auth.failure_log_level.to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        crate::short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}
