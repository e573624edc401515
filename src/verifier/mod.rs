//! Credential verification for HTTP Basic Authentication.
//!
//! [`CredentialVerifier::verify`] answers a single question, accept or
//! reject, for a username/password pair decoded from an `Authorization`
//! header. Every rejection looks the same to the caller: `false`, returned
//! only after the configured fail delay, whether the password was wrong, the
//! expected credentials were not configured, or the credential source failed.
//!
//! # Audit logging of rejected credentials
//!
//! A credential mismatch is logged at the configurable failure level and the
//! event carries the supplied username **and password** in clear text. Operators
//! rely on this as an audit trail of attempted logins, but it also means a
//! legitimate user's mistyped password (often a near miss of the real one) ends
//! up in the logs. Lower the failure level below the active log filter, or
//! restrict access to the log sink, where that exposure is unacceptable.

mod compare;
mod digest;
mod encoding;
mod error;
mod source;
mod throttle;

pub use self::compare::{fixed_work_eq, COMPARE_ROUNDS};
pub use self::digest::{DigestAlgorithm, DigestEngine};
pub use self::encoding::TextEncoding;
pub use self::error::{CredentialKind, Error, Result};
pub use self::source::{CredentialSource, FileCredentials, FnCredentials, SharedCredentials};

use secrecy::{ExposeSecret, SecretString};
use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::{Mutex, PoisonError, RwLock},
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn, Level};
use zeroize::Zeroizing;

pub const DEFAULT_FAIL_DELAY: Duration = Duration::from_millis(3000);
pub const DEFAULT_FAILURE_LOG_LEVEL: Level = Level::WARN;

// Emit an event at a level chosen at run time.
macro_rules! event_at {
    ($level:expr, $($arg:tt)+) => {{
        let level = $level;
        if level == Level::ERROR {
            tracing::error!($($arg)+);
        } else if level == Level::WARN {
            tracing::warn!($($arg)+);
        } else if level == Level::INFO {
            tracing::info!($($arg)+);
        } else if level == Level::DEBUG {
            tracing::debug!($($arg)+);
        } else {
            tracing::trace!($($arg)+);
        }
    }};
}

// Upper-cased with `-` and `_` dropped, used to match algorithm and encoding names.
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Runtime-adjustable settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// Encoding applied to the supplied password before hashing.
    pub text_encoding: TextEncoding,
    pub fail_delay: Duration,
    /// Level used when logging a credential mismatch.
    pub failure_log_level: Level,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            text_encoding: TextEncoding::default(),
            fail_delay: DEFAULT_FAIL_DELAY,
            failure_log_level: DEFAULT_FAILURE_LOG_LEVEL,
        }
    }
}

pub struct CredentialVerifier {
    realm: String,
    source: Box<dyn CredentialSource>,
    // Shared hashing state, one caller at a time.
    engine: Option<Mutex<DigestEngine>>,
    settings: RwLock<Settings>,
}

impl CredentialVerifier {
    /// Verifier comparing passwords as raw characters.
    pub fn new(realm: impl Into<String>, source: impl CredentialSource + 'static) -> Self {
        Self {
            realm: realm.into(),
            source: Box::new(source),
            engine: None,
            settings: RwLock::new(Settings::default()),
        }
    }

    /// Verifier hashing supplied passwords with `algorithm` before comparing
    /// them with the expected lowercase hex digest. An empty name falls back
    /// to raw comparison.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedDigestAlgorithm`] if `algorithm` is not known.
    pub fn with_digest(
        realm: impl Into<String>,
        source: impl CredentialSource + 'static,
        algorithm: &str,
    ) -> Result<Self> {
        let mut verifier = Self::new(realm, source);
        if !algorithm.trim().is_empty() {
            let algorithm: DigestAlgorithm = algorithm.parse()?;
            verifier.engine = Some(Mutex::new(DigestEngine::new(algorithm)));
        }
        Ok(verifier)
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    #[must_use]
    pub fn digest_algorithm(&self) -> Option<DigestAlgorithm> {
        self.engine
            .as_ref()
            .map(|engine| engine.lock().unwrap_or_else(PoisonError::into_inner).algorithm())
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        *self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, apply: impl FnOnce(&mut Settings)) {
        apply(&mut self.settings.write().unwrap_or_else(PoisonError::into_inner));
    }

    #[must_use]
    pub fn text_encoding(&self) -> TextEncoding {
        self.settings().text_encoding
    }

    pub fn set_text_encoding(&self, text_encoding: TextEncoding) {
        self.update(|settings| settings.text_encoding = text_encoding);
    }

    #[must_use]
    pub fn fail_delay(&self) -> Duration {
        self.settings().fail_delay
    }

    pub fn set_fail_delay(&self, fail_delay: Duration) {
        self.update(|settings| settings.fail_delay = fail_delay);
    }

    #[must_use]
    pub fn failure_log_level(&self) -> Level {
        self.settings().failure_log_level
    }

    pub fn set_failure_log_level(&self, level: Level) {
        self.update(|settings| settings.failure_log_level = level);
    }

    /// Accept or reject the supplied credentials.
    ///
    /// Never fails: every problem ends as `false`, after the fail delay or as
    /// soon as `cancel` fires. Settings are read once per call, so a
    /// concurrent change applies to the next call at the latest.
    #[instrument(skip_all, fields(realm = %self.realm))]
    pub async fn verify(
        &self,
        username: Option<&str>,
        password: Option<&str>,
        cancel: &CancellationToken,
    ) -> bool {
        let settings = self.settings();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.check(username, password, settings.text_encoding)
        }))
        .unwrap_or_else(|payload| Err(Error::UnexpectedFault(panic_message(&*payload))));

        match outcome {
            Ok(()) => true,
            Err(err) => {
                log_rejection(&err, settings.failure_log_level);
                throttle::reject(settings.fail_delay, cancel).await
            }
        }
    }

    fn check(
        &self,
        username: Option<&str>,
        password: Option<&str>,
        text_encoding: TextEncoding,
    ) -> Result<()> {
        let (Some(username), Some(password)) = (
            username.filter(|u| !u.is_empty()),
            password.filter(|p| !p.is_empty()),
        ) else {
            return Err(Error::EmptyCredentials);
        };

        let expected_username = self
            .source
            .current_username()?
            .filter(|u| !u.is_empty())
            .ok_or(Error::MissingExpectedCredential(CredentialKind::Username))?;

        let expected_password = self
            .source
            .current_secret()?
            .filter(|p| !p.expose_secret().is_empty())
            .ok_or(Error::MissingExpectedCredential(CredentialKind::Password))?;

        if eq_ignore_case(username, &expected_username)
            && self.password_matches(password, &expected_password, text_encoding)
        {
            Ok(())
        } else {
            Err(Error::CredentialMismatch {
                username: username.to_string(),
                password: password.to_string(),
            })
        }
    }

    // Digest mode hashes the encoded password to lowercase hex and compares
    // while still holding the engine lock; plain mode compares the characters.
    fn password_matches(
        &self,
        supplied: &str,
        expected: &SecretString,
        text_encoding: TextEncoding,
    ) -> bool {
        let expected: Zeroizing<Vec<char>> =
            Zeroizing::new(expected.expose_secret().chars().collect());

        match &self.engine {
            Some(engine) => {
                let input = text_encoding.encode(supplied);
                let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
                let computed = engine.hex_digest(&input);
                fixed_work_eq(&computed, &expected)
            }
            None => {
                let computed: Zeroizing<Vec<char>> = Zeroizing::new(supplied.chars().collect());
                fixed_work_eq(&computed, &expected)
            }
        }
    }
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("realm", &self.realm)
            .field("digest", &self.digest_algorithm())
            .field("settings", &self.settings())
            .finish_non_exhaustive()
    }
}

fn log_rejection(err: &Error, failure_log_level: Level) {
    match err {
        Error::EmptyCredentials => debug!("{err}"),
        Error::MissingExpectedCredential(_) => warn!("configuration error: {err}"),
        Error::CredentialMismatch { username, password } => {
            event_at!(
                failure_log_level,
                username = %username,
                password = %password,
                "authentication failed"
            );
        }
        _ => error!("{err}"),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic in credential source".to_string())
}

// Character-wise comparison that treats upper and lower case forms as equal.
fn eq_ignore_case(supplied: &str, expected: &str) -> bool {
    supplied.chars().count() == expected.chars().count()
        && supplied.chars().zip(expected.chars()).all(|(a, b)| {
            a == b
                || a.to_uppercase().eq(b.to_uppercase())
                || a.to_lowercase().eq(b.to_lowercase())
        })
}
