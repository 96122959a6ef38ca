//! Request and response payloads for the identity service REST API. Session
//! responses carry bearer tokens; these types have no `Debug` impl and must
//! never be logged.

use crate::auth::SessionSnapshot;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
pub(crate) struct OtpRequest<'a> {
    pub email: &'a str,
    pub create_user: bool,
}

#[derive(Serialize)]
pub(crate) struct VerifyOtpRequest<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub email: &'a str,
    pub token: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshTokenRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Serialize)]
pub(crate) struct PkceTokenRequest<'a> {
    pub auth_code: &'a str,
    pub code_verifier: &'a str,
}

#[derive(Serialize)]
pub(crate) struct UpdateUserRequest<'a> {
    pub data: ProfileData<'a>,
}

#[derive(Serialize)]
pub(crate) struct ProfileData<'a> {
    pub full_name: &'a str,
    pub phone_number: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct SessionResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

#[derive(Deserialize)]
pub(crate) struct UserResponse {
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

#[derive(Default, Deserialize)]
pub(crate) struct UserMetadata {
    pub full_name: Option<String>,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<UserResponse> for SessionSnapshot {
    fn from(user: UserResponse) -> Self {
        let metadata = user.user_metadata;
        Self {
            is_authenticated: true,
            display_name: metadata.full_name.or(metadata.name),
            phone_number: metadata.phone_number,
            avatar_url: metadata.avatar_url,
        }
    }
}

/// Error payloads differ per endpoint; the first present field wins.
#[derive(Default, Deserialize)]
pub(crate) struct ErrorResponse {
    pub msg: Option<String>,
    pub error_description: Option<String>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorResponse {
    pub(crate) fn into_message(self) -> Option<String> {
        [self.msg, self.error_description, self.message, self.error]
            .into_iter()
            .flatten()
            .map(|message| message.trim().to_string())
            .find(|message| !message.is_empty())
    }
}
