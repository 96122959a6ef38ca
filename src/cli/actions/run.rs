use crate::cli::{
    actions::{Action, callback, login},
    telemetry,
};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    let result = match action {
        Action::Login(args) => login::execute(args).await,
        Action::Callback(args) => callback::execute(args).await,
    };

    telemetry::shutdown_tracer();
    result
}
