//! Session gate: the whole "is onboarding finished" policy.

use crate::auth::types::SessionSnapshot;
use std::fmt;

/// Where an authenticated user goes next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Destination {
    Home,
    ProfileCompletion,
}

impl Destination {
    /// Route path used by the web app for this destination.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::ProfileCompletion => "/auth/complete-profile",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Decide the destination for an authenticated session.
///
/// Calling this with an unauthenticated snapshot is a contract violation; the
/// controller only reaches it through [`crate::auth::checkpoint`], which rejects
/// unauthenticated snapshots first.
#[must_use]
pub fn decide_destination(snapshot: &SessionSnapshot) -> Destination {
    debug_assert!(
        snapshot.is_authenticated,
        "session gate called before authentication"
    );

    if snapshot.display_name().is_some() {
        Destination::Home
    } else {
        Destination::ProfileCompletion
    }
}
