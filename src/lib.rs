//! # Realmguard
//!
//! Username/password verification for HTTP Basic Authentication.
//!
//! The core is [`verifier::CredentialVerifier`]: it compares supplied
//! credentials with the expected ones read from a
//! [`verifier::CredentialSource`], optionally hashing the supplied password
//! first, and delays every rejection so online guessing stays slow.
//!
//! [`api`] puts the verifier in front of an `axum` router and [`cli`] wires
//! both into the `realmguard` binary.

pub mod api;
pub mod cli;
pub mod verifier;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Abbreviated commit hash, the first seven characters of `hash`.
#[must_use]
pub fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
