use thiserror::Error;

/// Which expected credential the source failed to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialKind {
    Username,
    Password,
}

impl std::fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Username => f.write_str("username"),
            Self::Password => f.write_str("password"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedDigestAlgorithm(String),
    #[error("unsupported text encoding: {0}")]
    UnsupportedTextEncoding(String),
    #[error("no credentials supplied")]
    EmptyCredentials,
    #[error("expected {0} is not configured")]
    MissingExpectedCredential(CredentialKind),
    #[error("authentication failed for username {username:?}")]
    CredentialMismatch { username: String, password: String },
    #[error("unexpected fault during verification: {0}")]
    UnexpectedFault(String),
    #[error("rejection delay interrupted")]
    ThrottleInterrupted,
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::UnexpectedFault(format!("{err:#}"))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
