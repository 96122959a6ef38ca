//! Terminal views for the flow controller.
//!
//! Prompts are blocking, so each one runs on the blocking pool while the
//! scheduled navigation timer keeps ticking on the runtime.

use crate::auth::{AuthFlowController, Destination, FlowState, IdentityBackend, SessionSnapshot};
use anyhow::{Context, Result};
use dialoguer::{Input, Select, theme::ColorfulTheme};
use tracing::debug;

/// Run a blocking prompt off the async runtime.
pub(crate) async fn prompt<T, F>(ask: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&ColorfulTheme) -> dialoguer::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || ask(&ColorfulTheme::default()))
        .await
        .context("prompt task failed")?
        .context("failed to read input")
}

pub(crate) async fn input(label: String) -> Result<String> {
    input_with_initial(label, String::new()).await
}

/// Text prompt prefilled with `initial`, so a rejected value can be corrected.
pub(crate) async fn input_with_initial(label: String, initial: String) -> Result<String> {
    prompt(move |theme| {
        Input::<String>::with_theme(theme)
            .with_prompt(label)
            .with_initial_text(initial)
            .allow_empty(true)
            .interact_text()
    })
    .await
}

/// Drop the separators people type inside phone numbers. A leading `+` and
/// every digit are kept, so the length check still sees what was entered.
fn strip_phone_separators(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

pub(crate) async fn select(label: &'static str, items: Vec<String>) -> Result<usize> {
    prompt(move |theme| {
        Select::with_theme(theme)
            .with_prompt(label)
            .items(&items)
            .default(0)
            .interact()
    })
    .await
}

/// Print the error attached to the current step, if any.
pub(crate) fn show_error<B: IdentityBackend + ?Sized>(controller: &AuthFlowController<B>) {
    if let Some(err) = controller.error() {
        eprintln!("✗ {err}");
    }
}

/// Drive a completed sign-in to the home view, passing through profile
/// completion when the session gate asks for it.
pub(crate) async fn finish<B: IdentityBackend + ?Sized>(
    controller: &mut AuthFlowController<B>,
) -> Result<()> {
    if controller.state() == FlowState::Complete(Destination::ProfileCompletion) {
        println!("Almost there! Tell us who you are to finish setting up your account.");
        controller.open_profile_completion();
        complete_profile(controller).await?;
    }

    render_home(controller);
    Ok(())
}

async fn complete_profile<B: IdentityBackend + ?Sized>(
    controller: &mut AuthFlowController<B>,
) -> Result<()> {
    let scheme = controller.config().phone().clone();

    while controller.state() == FlowState::AwaitingProfile {
        let entered = controller.identity().clone();
        let display_name = input_with_initial("Full name".to_string(), entered.display_name).await?;
        let raw_phone = input_with_initial(
            format!(
                "Phone number ({} digits, {} optional)",
                scheme.national_digits, scheme.country_prefix
            ),
            entered.raw_phone_input,
        )
        .await?;

        controller
            .submit_profile(&display_name, &strip_phone_separators(&raw_phone))
            .await;
        show_error(controller);
    }

    if controller.state() == FlowState::Complete(Destination::Home) {
        println!("Account completed successfully!");
        if let Some(mut navigation) = controller.take_scheduled_navigation() {
            let destination = navigation.wait().await;
            debug!(?destination, "leaving profile completion");
        }
    }

    Ok(())
}

fn render_home<B: IdentityBackend + ?Sized>(controller: &AuthFlowController<B>) {
    let name = controller
        .snapshot()
        .and_then(SessionSnapshot::display_name)
        .map(str::to_string)
        .or_else(|| {
            let name = controller.identity().display_name.trim();
            (!name.is_empty()).then(|| name.to_string())
        });

    println!();
    match name {
        Some(name) => println!("Welcome, {name}!"),
        None => println!("Welcome!"),
    }

    if let Some(avatar_url) = controller.snapshot().and_then(|s| s.avatar_url.as_deref()) {
        println!("Avatar: {avatar_url}");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::auth::{ValidationError, validator::normalize_phone};

    fn submitted(raw: &str) -> Result<String, ValidationError> {
        normalize_phone(&strip_phone_separators(raw), "+506", 8).map(|p| p.as_str().to_string())
    }

    #[test]
    fn prefixed_number_is_kept_as_entered() {
        assert_eq!(submitted("+50688889999").unwrap(), "+50688889999");
    }

    #[test]
    fn spaces_and_dashes_are_ignored() {
        assert_eq!(submitted("+506 8888 9999").unwrap(), "+50688889999");
        assert_eq!(submitted("8888-9999").unwrap(), "+50688889999");
    }

    #[test]
    fn extra_digits_are_rejected_not_truncated() {
        assert_eq!(
            submitted("123456789"),
            Err(ValidationError::InvalidPhoneLength { expected_digits: 8 })
        );
        assert_eq!(
            submitted("+506 8888 99990"),
            Err(ValidationError::InvalidPhoneLength { expected_digits: 8 })
        );
    }
}
