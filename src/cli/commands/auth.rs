use crate::verifier::TextEncoding;
use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};
use tracing::Level;

pub const ARG_REALM: &str = "realm";
pub const ARG_USERNAME: &str = "username";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_PASSWORD_FILE: &str = "password-file";
pub const ARG_DIGEST: &str = "digest";
pub const ARG_CHARSET: &str = "charset";
pub const ARG_FAIL_DELAY_MS: &str = "fail-delay-ms";
pub const ARG_FAILURE_LOG_LEVEL: &str = "failure-log-level";

/// # Errors
/// Returns an error string if the encoding is not supported.
pub fn parse_text_encoding(value: &str) -> Result<TextEncoding, String> {
    value.parse::<TextEncoding>().map_err(|e| e.to_string())
}

/// # Errors
/// Returns an error string if the value is not a tracing level.
pub fn parse_level(value: &str) -> Result<Level, String> {
    value.parse::<Level>().map_err(|e| e.to_string())
}

/// Where the expected password comes from.
#[derive(Debug)]
pub enum PasswordSource {
    Inline(SecretString),
    File(PathBuf),
    Unset,
}

#[derive(Debug)]
pub struct Options {
    pub realm: String,
    pub username: String,
    pub password: PasswordSource,
    pub digest: Option<String>,
    pub charset: TextEncoding,
    pub fail_delay: Duration,
    pub failure_log_level: Level,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let username = matches
            .get_one::<String>(ARG_USERNAME)
            .cloned()
            .context("missing required argument: --username")?;

        // a password file wins over an inline password
        let password = if let Some(path) = matches.get_one::<String>(ARG_PASSWORD_FILE) {
            PasswordSource::File(PathBuf::from(path))
        } else if let Some(password) = matches.get_one::<String>(ARG_PASSWORD) {
            PasswordSource::Inline(SecretString::from(password.clone()))
        } else {
            PasswordSource::Unset
        };

        Ok(Self {
            realm: matches
                .get_one::<String>(ARG_REALM)
                .cloned()
                .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string()),
            username,
            password,
            digest: matches
                .get_one::<String>(ARG_DIGEST)
                .filter(|name| !name.trim().is_empty())
                .cloned(),
            charset: matches
                .get_one::<TextEncoding>(ARG_CHARSET)
                .copied()
                .unwrap_or_default(),
            fail_delay: Duration::from_millis(
                matches
                    .get_one::<u64>(ARG_FAIL_DELAY_MS)
                    .copied()
                    .unwrap_or(3000),
            ),
            failure_log_level: matches
                .get_one::<Level>(ARG_FAILURE_LOG_LEVEL)
                .copied()
                .unwrap_or(Level::WARN),
        })
    }
}

#[must_use]
pub fn digest_arg() -> Arg {
    Arg::new(ARG_DIGEST)
        .long("digest")
        .help("Digest algorithm applied to supplied passwords, e.g. SHA-256 (default: none)")
        .long_help(
            "Digest algorithm applied to supplied passwords before comparison: MD5, SHA-1, SHA-224, SHA-256, SHA-384, SHA-512, SHA-512/224, SHA-512/256, SHA3-224, SHA3-256, SHA3-384 or SHA3-512. The expected password must then be the lowercase hex digest, see the `hash` command.",
        )
        .env("REALMGUARD_DIGEST")
}

#[must_use]
pub fn charset_arg() -> Arg {
    Arg::new(ARG_CHARSET)
        .long("charset")
        .help("Text encoding of passwords before hashing")
        .env("REALMGUARD_CHARSET")
        .default_value("UTF-8")
        .value_parser(parse_text_encoding)
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_REALM)
                .long("realm")
                .help("Realm announced in the Basic Authentication challenge")
                .env("REALMGUARD_REALM")
                .default_value(env!("CARGO_PKG_NAME")),
        )
        .arg(
            Arg::new(ARG_USERNAME)
                .short('u')
                .long("username")
                .help("Expected username (compared case-insensitively)")
                .env("REALMGUARD_USERNAME")
                .required(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long("password")
                .help("Expected password, or its hex digest when --digest is set")
                .env("REALMGUARD_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_PASSWORD_FILE)
                .long("password-file")
                .help("File holding the expected password, re-read on every request")
                .env("REALMGUARD_PASSWORD_FILE"),
        )
        .arg(digest_arg())
        .arg(charset_arg())
        .arg(
            Arg::new(ARG_FAIL_DELAY_MS)
                .long("fail-delay-ms")
                .help("Delay before answering a failed authentication, in milliseconds")
                .env("REALMGUARD_FAIL_DELAY_MS")
                .default_value("3000")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_FAILURE_LOG_LEVEL)
                .long("failure-log-level")
                .help("Log level of failed authentications, which include the supplied credentials")
                .env("REALMGUARD_FAILURE_LOG_LEVEL")
                .default_value("warn")
                .value_parser(parse_level),
        )
}
