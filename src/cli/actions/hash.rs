use crate::verifier::{DigestAlgorithm, DigestEngine, TextEncoding};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::io::BufRead;

#[derive(Debug)]
pub struct Args {
    pub digest: String,
    pub charset: TextEncoding,
    pub password: Option<SecretString>,
}

/// Lowercase hex digest of `password`, the form the server expects in digest mode.
/// # Errors
/// Returns an error if the algorithm is not supported.
pub fn hex_digest(
    algorithm: &str,
    charset: TextEncoding,
    password: &SecretString,
) -> crate::verifier::Result<String> {
    let algorithm: DigestAlgorithm = algorithm.parse()?;
    let mut engine = DigestEngine::new(algorithm);
    let bytes = charset.encode(password.expose_secret());
    Ok(engine.hex_digest(&bytes).iter().collect())
}

/// Execute the hash action, reading the password from stdin when not given.
/// # Errors
/// Returns an error if stdin cannot be read or the algorithm is not supported.
pub fn execute(args: Args) -> Result<()> {
    let password = match args.password {
        Some(password) => password,
        None => read_password(std::io::stdin().lock())?,
    };

    let digest = hex_digest(&args.digest, args.charset, &password)?;
    println!("{digest}");

    Ok(())
}

fn read_password(mut reader: impl BufRead) -> Result<SecretString> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let len = line.trim_end_matches(&['\r', '\n'][..]).len();
    line.truncate(len);
    Ok(SecretString::from(line))
}
