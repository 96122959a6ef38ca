//! # authflow (sign-in orchestration)
//!
//! `authflow` drives a user session through passwordless sign-in (an emailed
//! one-time code), federated sign-in (GitHub or Google through the identity
//! service) and a mandatory profile-completion step before the user counts as
//! onboarded.
//!
//! ## Layers
//!
//! - [`auth`]: the core. Input validation, the session gate that decides between
//!   the home view and profile completion, and the flow controller state machine.
//!   The identity service is only reached through the [`auth::IdentityBackend`]
//!   trait.
//! - [`client`]: [`client::HttpBackend`], an `IdentityBackend` over the hosted
//!   identity service REST API.
//! - [`cli`]: argument parsing, telemetry, and a terminal presentation layer that
//!   renders the controller state and forwards user actions into it.
//!
//! ## Onboarding policy
//!
//! A session is complete once it carries a non-empty display name. Both entry
//! paths (one-time code and federated callback) reach that decision through the
//! same post-authentication checkpoint, so the policy cannot drift between them.
//!
//! Nothing is persisted locally: session tokens live in the backend client for
//! the lifetime of the process, and codes are held as secrets that never reach
//! logs.

pub mod auth;
pub mod cli;
pub mod client;

pub const GIT_COMMIT_HASH: &str = match option_env!("AUTHFLOW_GIT_SHA") {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
