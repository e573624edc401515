//! Credential sources: where the verifier reads the *expected* credentials.
//!
//! Sources are consulted on every verification, never cached, so expected
//! credentials can be rotated while the verifier is running.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{
    fmt,
    path::PathBuf,
    sync::{Arc, PoisonError, RwLock},
};

pub trait CredentialSource: Send + Sync {
    /// Current expected username, `None` when not configured.
    /// # Errors
    /// Returns an error if the lookup itself fails.
    fn current_username(&self) -> Result<Option<String>>;

    /// Current expected password, `None` when not configured.
    /// In digest mode this is the lowercase hex digest of the password.
    /// # Errors
    /// Returns an error if the lookup itself fails.
    fn current_secret(&self) -> Result<Option<SecretString>>;
}

impl<T: CredentialSource + ?Sized> CredentialSource for Arc<T> {
    fn current_username(&self) -> Result<Option<String>> {
        (**self).current_username()
    }

    fn current_secret(&self) -> Result<Option<SecretString>> {
        (**self).current_secret()
    }
}

/// In-memory credentials that can be swapped at run time.
pub struct SharedCredentials {
    inner: RwLock<(String, SecretString)>,
}

impl SharedCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            inner: RwLock::new((username.into(), password)),
        }
    }

    pub fn rotate(&self, username: impl Into<String>, password: SecretString) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *inner = (username.into(), password);
    }
}

impl CredentialSource for SharedCredentials {
    fn current_username(&self) -> Result<Option<String>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(Some(inner.0.clone()))
    }

    fn current_secret(&self) -> Result<Option<SecretString>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(Some(inner.1.clone()))
    }
}

impl fmt::Debug for SharedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("SharedCredentials")
            .field("username", &inner.0)
            .field("password", &inner.1)
            .finish()
    }
}

/// Two lookup closures, one per credential.
pub struct FnCredentials<U, P> {
    username: U,
    password: P,
}

impl<U, P> FnCredentials<U, P>
where
    U: Fn() -> Option<String> + Send + Sync,
    P: Fn() -> Option<SecretString> + Send + Sync,
{
    pub const fn new(username: U, password: P) -> Self {
        Self { username, password }
    }
}

impl<U, P> CredentialSource for FnCredentials<U, P>
where
    U: Fn() -> Option<String> + Send + Sync,
    P: Fn() -> Option<SecretString> + Send + Sync,
{
    fn current_username(&self) -> Result<Option<String>> {
        Ok((self.username)())
    }

    fn current_secret(&self) -> Result<Option<SecretString>> {
        Ok((self.password)())
    }
}

/// Fixed username with a password read from a file on every lookup.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    username: String,
    password_file: PathBuf,
}

impl FileCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password_file: impl Into<PathBuf>) -> Self {
        Self {
            username: username.into(),
            password_file: password_file.into(),
        }
    }
}

impl CredentialSource for FileCredentials {
    fn current_username(&self) -> Result<Option<String>> {
        Ok(Some(self.username.clone()))
    }

    fn current_secret(&self) -> Result<Option<SecretString>> {
        let mut contents = std::fs::read_to_string(&self.password_file).with_context(|| {
            format!(
                "failed to read password file {}",
                self.password_file.display()
            )
        })?;

        let len = contents.trim_end_matches(&['\r', '\n'][..]).len();
        contents.truncate(len);
        let secret = SecretString::from(contents);

        if secret.expose_secret().is_empty() {
            Ok(None)
        } else {
            Ok(Some(secret))
        }
    }
}
