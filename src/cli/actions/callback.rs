use crate::{
    auth::{AuthFlowController, FlowConfig, FlowState},
    cli::{actions::screen, commands::backend},
    client::HttpBackend,
};
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub backend: backend::Options,
    pub flow: FlowConfig,
    pub callback_url: Url,
}

/// Resume a federated sign-in from a callback URL captured in the browser.
///
/// # Errors
/// Returns an error if the callback does not yield a signed-in session.
pub async fn execute(args: Args) -> Result<()> {
    let backend = HttpBackend::new(&args.backend.url, args.backend.api_key)
        .context("failed to build identity service client")?;
    let mut controller = AuthFlowController::new(Arc::new(backend), args.flow);
    info!(flow_id = %controller.flow_id(), "resuming federated sign-in");

    controller.resume_federated_sign_in(&args.callback_url).await;

    match controller.state() {
        FlowState::Complete(_) => screen::finish(&mut controller).await,
        _ => Err(controller
            .error()
            .map_or_else(|| anyhow!("federated sign-in did not complete"), anyhow::Error::new)),
    }
}
