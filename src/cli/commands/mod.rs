pub mod backend;
pub mod flow;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const CMD_LOGIN: &str = "login";
pub const CMD_CALLBACK: &str = "callback";
pub const ARG_CALLBACK_URL: &str = "url";

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

    let command = Command::new("authflow")
        .about("Passwordless and federated sign-in with profile completion")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new(CMD_LOGIN)
                .about("Sign in with an emailed code or a federated provider"),
        )
        .subcommand(
            Command::new(CMD_CALLBACK)
                .about("Resume a federated sign-in from the provider callback URL")
                .arg(
                    Arg::new(ARG_CALLBACK_URL)
                        .help("Callback URL the browser landed on, including the fragment")
                        .required(true),
                ),
        );

    let command = backend::with_args(command);
    let command = flow::with_args(command);
    logging::with_args(command)
}
