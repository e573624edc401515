pub mod auth;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};
use std::net::IpAddr;

pub const CMD_SERVER: &str = "server";
pub const CMD_HASH: &str = "hash";
pub const ARG_PORT: &str = "port";
pub const ARG_BIND: &str = "bind";

fn server() -> Command {
    let command = Command::new(CMD_SERVER)
        .about("Serve a Basic Authentication protected endpoint")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("REALMGUARD_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_BIND)
                .long("bind")
                .help("Address to listen on, use 0.0.0.0 on hosts without dual-stack sockets")
                .default_value("::")
                .env("REALMGUARD_BIND")
                .value_parser(clap::value_parser!(IpAddr)),
        );

    auth::with_args(command)
}

fn hash() -> Command {
    Command::new(CMD_HASH)
        .about("Print the hex digest of a password, as expected by `server --digest`")
        .arg(auth::digest_arg().required(true))
        .arg(auth::charset_arg())
        .arg(
            Arg::new(auth::ARG_PASSWORD)
                .long("password")
                .help("Password to hash (default: read one line from stdin)"),
        )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(server())
        .subcommand(hash());

    logging::with_args(command)
}
