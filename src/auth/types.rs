//! Identity and session types shared by the controller and backends. Codes are
//! wrapped in `SecretString` so they never show up in `Debug` output or traces.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// User-entered identity data for the current visit. Never persisted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    pub email_address: String,
    pub raw_phone_input: String,
    pub display_name: String,
}

/// Phone number in international format (country prefix + national digits).
///
/// Only [`crate::auth::validator::normalize_phone`] builds one, so holding a
/// `NormalizedPhone` means the length check already passed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NormalizedPhone(String);

impl NormalizedPhone {
    pub(crate) fn new_unchecked(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedPhone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-time code typed by the user. Validity is decided by the backend.
#[derive(Clone)]
pub struct OneTimeCode(SecretString);

impl OneTimeCode {
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(SecretString::from(code.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for OneTimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OneTimeCode(***)")
    }
}

/// Point-in-time read of the signed-in user, produced by the backend.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub is_authenticated: bool,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
}

impl SessionSnapshot {
    /// Authenticated snapshot with only a display name, mostly for tests.
    #[must_use]
    pub fn authenticated(display_name: Option<&str>) -> Self {
        Self {
            is_authenticated: true,
            display_name: display_name.map(str::to_string),
            ..Self::default()
        }
    }

    /// Display name when present and not blank.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Result of reading the current session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CurrentSession {
    Authenticated(SessionSnapshot),
    Unauthenticated,
}

/// Federated identity providers offered on the sign-in screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Github,
    Google,
}

impl Provider {
    pub const ALL: [Self; 2] = [Self::Github, Self::Google];

    /// Identifier the identity service expects in `provider=`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Google => "google",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Github => "GitHub",
            Self::Google => "Google",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "github" => Ok(Self::Github),
            "google" => Ok(Self::Google),
            other => Err(format!("unsupported provider: {other}")),
        }
    }
}

/// Where the presentation layer must send the browser to start federated sign-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FederatedRedirect {
    pub provider: Provider,
    pub url: Url,
}

/// Profile attributes saved at the end of onboarding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: String,
    pub phone_number: NormalizedPhone,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_time_code_debug_is_redacted() {
        let code = OneTimeCode::new("123456");
        assert_eq!(format!("{code:?}"), "OneTimeCode(***)");
        assert_eq!(code.expose(), "123456");
    }

    #[test]
    fn display_name_ignores_blank_values() {
        let mut snapshot = SessionSnapshot::authenticated(Some("   "));
        assert_eq!(snapshot.display_name(), None);

        snapshot.display_name = Some(" Jane ".to_string());
        assert_eq!(snapshot.display_name(), Some("Jane"));
    }

    #[test]
    fn provider_parses_case_insensitively() {
        assert_eq!("GitHub".parse::<Provider>(), Ok(Provider::Github));
        assert_eq!(" google ".parse::<Provider>(), Ok(Provider::Google));
        assert!("gitlab".parse::<Provider>().is_err());
    }
}
