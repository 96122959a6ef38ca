//! Identity backend abstraction used by the flow controller.
//!
//! The backend owns credential issuance, code verification, session tokens and
//! profile storage. The controller never sees tokens: it only receives
//! [`SessionSnapshot`]s. Implementations must not log codes or tokens.

use crate::auth::{
    error::BackendError,
    types::{
        CurrentSession, FederatedRedirect, OneTimeCode, ProfileUpdate, Provider, SessionSnapshot,
    },
};
use async_trait::async_trait;
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestCodeOptions {
    /// Create the identity when the email is unknown.
    pub allow_create: bool,
}

#[async_trait]
pub trait IdentityBackend: Send + Sync {
    /// Send a one-time code to `email`.
    async fn request_one_time_code(
        &self,
        email: &str,
        options: RequestCodeOptions,
    ) -> Result<(), BackendError>;

    /// Verify `code` for `email` and start a session.
    async fn verify_one_time_code(
        &self,
        email: &str,
        code: &OneTimeCode,
    ) -> Result<SessionSnapshot, BackendError>;

    /// Build the provider redirect; the identity service sends the browser back
    /// to `callback_url` when the provider is done.
    async fn begin_federated_sign_in(
        &self,
        provider: Provider,
        callback_url: &Url,
    ) -> Result<FederatedRedirect, BackendError>;

    /// Adopt the session carried by the provider callback URL.
    async fn complete_federated_sign_in(&self, callback_url: &Url) -> Result<(), BackendError>;

    /// Save display name and phone number on the signed-in user.
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<(), BackendError>;

    /// Renew session tokens and return the refreshed snapshot.
    async fn refresh_session(&self) -> Result<SessionSnapshot, BackendError>;

    /// Read the current session, if any.
    async fn get_current_session(&self) -> Result<CurrentSession, BackendError>;
}
