use thiserror::Error;

/// Local input problems. These never reach the identity backend.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a valid phone number ({expected_digits} digits)")]
    InvalidPhoneLength { expected_digits: usize },
    #[error("The code must be {expected_length} digits")]
    MalformedCode { expected_length: usize },
    #[error("Email address looks invalid.")]
    InvalidEmail,
    #[error("Full name is required.")]
    MissingDisplayName,
}

/// Failures returned by, or raised while calling, the identity backend.
///
/// Every variant is recoverable: the user may resubmit the same step.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Unable to reach the server: {0}")]
    Network(String),
    #[error("Request timed out. Please try again.")]
    Timeout,
    /// The service answered with an error; `message` is shown to the user as is.
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("Response error: {0}")]
    Parse(String),
    #[error("Sign-in was not completed: {0}")]
    Provider(String),
    #[error("You are not signed in.")]
    NotSignedIn,
}

/// Error attached to the current flow step.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Sign-in did not produce an authenticated session.")]
    NotAuthenticated,
}
