use crate::{
    auth::{AuthFlowController, FlowConfig, FlowState, IdentityBackend, Provider},
    cli::{actions::screen, commands::backend},
    client::HttpBackend,
};
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub backend: backend::Options,
    pub flow: FlowConfig,
}

enum Method {
    Email,
    Federated(Provider),
}

fn methods() -> Vec<(Method, String)> {
    let mut methods = vec![(Method::Email, "Email me a sign-in code".to_string())];
    methods.extend(Provider::ALL.iter().map(|provider| {
        (
            Method::Federated(*provider),
            format!("Continue with {}", provider.label()),
        )
    }));
    methods
}

/// Interactive sign-in: email and code, or a federated provider, then profile
/// completion when needed.
///
/// # Errors
/// Returns an error if the identity client cannot be built or a prompt fails.
pub async fn execute(args: Args) -> Result<()> {
    let backend = HttpBackend::new(&args.backend.url, args.backend.api_key)
        .context("failed to build identity service client")?;
    let mut controller = AuthFlowController::new(Arc::new(backend), args.flow);
    info!(flow_id = %controller.flow_id(), "sign-in started");

    loop {
        match controller.state() {
            FlowState::AwaitingEmail => choose_method(&mut controller).await?,
            FlowState::CodeSent => enter_code(&mut controller).await?,
            FlowState::Complete(_) => break,
            state => bail!("sign-in stopped in unexpected state {state:?}"),
        }
    }

    screen::finish(&mut controller).await
}

async fn choose_method<B: IdentityBackend + ?Sized>(
    controller: &mut AuthFlowController<B>,
) -> Result<()> {
    let mut methods = methods();
    let labels = methods.iter().map(|(_, label)| label.clone()).collect();
    let choice = screen::select("How do you want to sign in?", labels).await?;
    if choice >= methods.len() {
        return Ok(());
    }

    match methods.swap_remove(choice).0 {
        Method::Email => {
            let email = screen::input("Email".to_string()).await?;
            controller.submit_email(&email).await;
            if controller.state() == FlowState::CodeSent {
                println!("We sent a code to {}.", controller.identity().email_address);
            }
        }
        Method::Federated(provider) => federated(controller, provider).await?,
    }

    screen::show_error(controller);
    Ok(())
}

async fn federated<B: IdentityBackend + ?Sized>(
    controller: &mut AuthFlowController<B>,
    provider: Provider,
) -> Result<()> {
    let Some(redirect) = controller.choose_provider(provider).await else {
        return Ok(());
    };

    println!("Open this URL in your browser to continue with {}:", provider.label());
    println!("\n  {}\n", redirect.url);

    let pasted = screen::input("Paste the URL your browser was sent back to".to_string()).await?;
    let pasted = pasted.trim();
    if pasted.is_empty() {
        return Ok(());
    }

    match Url::parse(pasted) {
        Ok(callback_url) => controller.resume_federated_sign_in(&callback_url).await,
        Err(err) => eprintln!("✗ That does not look like a URL: {err}"),
    }
    Ok(())
}

async fn enter_code<B: IdentityBackend + ?Sized>(
    controller: &mut AuthFlowController<B>,
) -> Result<()> {
    let label = format!(
        "Enter the {}-digit code (leave empty to change email)",
        controller.config().code_length()
    );
    let code = screen::input(label).await?;

    if code.trim().is_empty() {
        controller.go_back();
        return Ok(());
    }

    controller.submit_code(&code).await;
    screen::show_error(controller);
    Ok(())
}
