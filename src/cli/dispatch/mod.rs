//! Map validated CLI matches to the action to run.

use crate::cli::actions::{hash, server, Action};
use crate::cli::commands::{auth, ARG_BIND, ARG_PORT, CMD_HASH, CMD_SERVER};
use crate::verifier::TextEncoding;
use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

/// # Errors
/// Returns an error if the subcommand is unknown or an argument is missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((CMD_SERVER, sub_m)) => Ok(Action::Server(server::Args {
            listen: SocketAddr::new(
                sub_m
                    .get_one::<IpAddr>(ARG_BIND)
                    .copied()
                    .unwrap_or(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
                sub_m.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080),
            ),
            auth: auth::Options::parse(sub_m)?,
        })),
        Some((CMD_HASH, sub_m)) => Ok(Action::Hash(hash::Args {
            digest: sub_m
                .get_one::<String>(auth::ARG_DIGEST)
                .cloned()
                .context("missing required argument: --digest")?,
            charset: sub_m
                .get_one::<TextEncoding>(auth::ARG_CHARSET)
                .copied()
                .unwrap_or_default(),
            password: sub_m
                .get_one::<String>(auth::ARG_PASSWORD)
                .map(|password| SecretString::from(password.clone())),
        })),
        Some((name, _)) => bail!("unknown command: {name}"),
        None => bail!("missing command"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use std::time::Duration;

    fn without_env<F: FnOnce()>(f: F) {
        temp_env::with_vars(
            [
                ("REALMGUARD_PORT", None::<&str>),
                ("REALMGUARD_BIND", None),
                ("REALMGUARD_USERNAME", None),
                ("REALMGUARD_PASSWORD", None),
                ("REALMGUARD_PASSWORD_FILE", None),
                ("REALMGUARD_DIGEST", None),
                ("REALMGUARD_FAIL_DELAY_MS", None),
            ],
            f,
        );
    }

    #[test]
    fn dispatch_server() {
        without_env(|| {
            let matches = commands::new().get_matches_from([
                "realmguard",
                "server",
                "--port",
                "9090",
                "--bind",
                "127.0.0.1",
                "-u",
                "root",
                "--password",
                "hunter2",
                "--fail-delay-ms",
                "50",
            ]);

            match handler(&matches) {
                Ok(Action::Server(args)) => {
                    assert_eq!(args.listen, SocketAddr::from(([127, 0, 0, 1], 9090)));
                    assert_eq!(args.auth.username, "root");
                    assert_eq!(args.auth.fail_delay, Duration::from_millis(50));
                }
                other => panic!("unexpected dispatch result: {other:?}"),
            }
        });
    }

    #[test]
    fn dispatch_hash() {
        without_env(|| {
            let matches = commands::new().get_matches_from([
                "realmguard",
                "hash",
                "--digest",
                "SHA-256",
                "--password",
                "secret",
            ]);

            match handler(&matches) {
                Ok(Action::Hash(args)) => {
                    assert_eq!(args.digest, "SHA-256");
                    assert_eq!(args.charset, TextEncoding::Utf8);
                    assert!(args.password.is_some());
                }
                other => panic!("unexpected dispatch result: {other:?}"),
            }
        });
    }
}
