//! Auth flow controller: the state machine behind the sign-in and
//! profile-completion screens.
//!
//! The controller reacts to one user event at a time. Each `async` event handler
//! is one row of the transition table: it validates locally, makes at most one
//! backend call, and leaves the controller in its next state with at most one
//! error attached. Errors never end the flow; the user can always resubmit the
//! current step.
//!
//! State is published through a `watch` channel so a presentation layer can
//! render `VerifyingCode`/`SavingProfile` and disable its triggers while a call
//! is in flight.

use crate::auth::{
    backend::{IdentityBackend, RequestCodeOptions},
    config::FlowConfig,
    error::{BackendError, FlowError, ValidationError},
    gate::{Destination, decide_destination},
    navigation::ScheduledNavigation,
    types::{
        CurrentSession, FederatedRedirect, Identity, OneTimeCode, ProfileUpdate, Provider,
        SessionSnapshot,
    },
    validator,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use ulid::Ulid;
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlowState {
    AwaitingEmail,
    CodeSent,
    VerifyingCode,
    AwaitingProfile,
    SavingProfile,
    Complete(Destination),
}

impl FlowState {
    /// A backend call is in flight; triggers must stay disabled.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::VerifyingCode | Self::SavingProfile)
    }
}

/// Current step plus the most recent error for that step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowStatus {
    pub state: FlowState,
    pub error: Option<FlowError>,
}

impl FlowStatus {
    fn at(state: FlowState) -> Self {
        Self { state, error: None }
    }
}

/// Outcome of the post-authentication checkpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub destination: Destination,
    pub snapshot: SessionSnapshot,
}

/// Post-authentication checkpoint shared by the code and federated paths.
///
/// # Errors
/// Returns [`FlowError::NotAuthenticated`] for an unauthenticated snapshot; the
/// session gate is not consulted in that case.
pub fn checkpoint(snapshot: SessionSnapshot) -> Result<Checkpoint, FlowError> {
    if !snapshot.is_authenticated {
        return Err(FlowError::NotAuthenticated);
    }

    let destination = decide_destination(&snapshot);
    Ok(Checkpoint {
        destination,
        snapshot,
    })
}

pub struct AuthFlowController<B: IdentityBackend + ?Sized> {
    backend: Arc<B>,
    config: FlowConfig,
    flow_id: Ulid,
    status: watch::Sender<FlowStatus>,
    identity: Identity,
    snapshot: Option<SessionSnapshot>,
    navigation: Option<ScheduledNavigation>,
}

impl<B: IdentityBackend + ?Sized> AuthFlowController<B> {
    #[must_use]
    pub fn new(backend: Arc<B>, config: FlowConfig) -> Self {
        let (status, _) = watch::channel(FlowStatus::at(FlowState::AwaitingEmail));
        Self {
            backend,
            config,
            flow_id: Ulid::new(),
            status,
            identity: Identity::default(),
            snapshot: None,
            navigation: None,
        }
    }

    #[must_use]
    pub fn flow_id(&self) -> Ulid {
        self.flow_id
    }

    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    #[must_use]
    pub fn status(&self) -> FlowStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn state(&self) -> FlowState {
        self.status.borrow().state.clone()
    }

    #[must_use]
    pub fn error(&self) -> Option<FlowError> {
        self.status.borrow().error.clone()
    }

    /// Receiver that observes every status change, including in-flight states.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<FlowStatus> {
        self.status.subscribe()
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Snapshot read at the last checkpoint or profile refresh.
    #[must_use]
    pub fn snapshot(&self) -> Option<&SessionSnapshot> {
        self.snapshot.as_ref()
    }

    #[must_use]
    pub fn scheduled_navigation(&self) -> Option<&ScheduledNavigation> {
        self.navigation.as_ref()
    }

    /// Hand the pending navigation to the caller; it is cancelled when dropped.
    pub fn take_scheduled_navigation(&mut self) -> Option<ScheduledNavigation> {
        self.navigation.take()
    }

    /// Submit the email address and request a one-time code.
    #[instrument(skip_all, fields(flow_id = %self.flow_id))]
    pub async fn submit_email(&mut self, email: &str) {
        if !self.accepts("submit_email", |state| *state == FlowState::AwaitingEmail) {
            return;
        }
        self.clear_error();

        let email = validator::normalize_email(email);
        if !validator::is_well_formed_email(&email) {
            self.fail(FlowState::AwaitingEmail, ValidationError::InvalidEmail.into());
            return;
        }
        self.identity.email_address.clone_from(&email);

        let options = RequestCodeOptions { allow_create: true };
        match self.backend.request_one_time_code(&email, options).await {
            Ok(()) => {
                info!("one-time code requested");
                self.set(FlowState::CodeSent);
            }
            Err(err) => {
                warn!(error = %err, "one-time code request failed");
                self.fail(FlowState::AwaitingEmail, err.into());
            }
        }
    }

    /// Submit the one-time code for the email given earlier.
    #[instrument(skip_all, fields(flow_id = %self.flow_id))]
    pub async fn submit_code(&mut self, code: &str) {
        if !self.accepts("submit_code", |state| *state == FlowState::CodeSent) {
            return;
        }
        self.clear_error();

        let code = code.trim();
        let expected_length = self.config.code_length();
        if !validator::is_well_formed_code(code, expected_length) {
            self.fail(
                FlowState::CodeSent,
                ValidationError::MalformedCode { expected_length }.into(),
            );
            return;
        }

        self.set(FlowState::VerifyingCode);
        let code = OneTimeCode::new(code);
        let email = self.identity.email_address.clone();
        match self.backend.verify_one_time_code(&email, &code).await {
            Ok(snapshot) => self.finish_checkpoint(snapshot, FlowState::CodeSent),
            Err(err) => {
                warn!(error = %err, "one-time code verification failed");
                self.fail(FlowState::CodeSent, err.into());
            }
        }
    }

    /// Leave code entry and go back to the email form.
    pub fn go_back(&mut self) {
        if !self.accepts("go_back", |state| *state == FlowState::CodeSent) {
            return;
        }
        self.set(FlowState::AwaitingEmail);
    }

    /// Start federated sign-in. The caller must send the browser to the returned
    /// redirect; the flow resumes in [`Self::resume_federated_sign_in`].
    #[instrument(skip_all, fields(flow_id = %self.flow_id, %provider))]
    pub async fn choose_provider(&mut self, provider: Provider) -> Option<FederatedRedirect> {
        if !self.accepts("choose_provider", |state| *state == FlowState::AwaitingEmail) {
            return None;
        }
        self.clear_error();

        let callback_url = match self.config.callback_url() {
            Ok(url) => url,
            Err(err) => {
                let err = BackendError::Config(format!("invalid callback URL: {err}"));
                self.fail(FlowState::AwaitingEmail, err.into());
                return None;
            }
        };

        match self
            .backend
            .begin_federated_sign_in(provider, &callback_url)
            .await
        {
            Ok(redirect) => {
                info!("federated sign-in started");
                Some(redirect)
            }
            Err(err) => {
                warn!(error = %err, "federated sign-in could not start");
                self.fail(FlowState::AwaitingEmail, err.into());
                None
            }
        }
    }

    /// Resume after the provider redirected back to the callback URL.
    #[instrument(skip_all, fields(flow_id = %self.flow_id))]
    pub async fn resume_federated_sign_in(&mut self, callback_url: &Url) {
        if !self.accepts("resume_federated_sign_in", |state| {
            *state == FlowState::AwaitingEmail
        }) {
            return;
        }
        self.clear_error();

        if let Err(err) = self.backend.complete_federated_sign_in(callback_url).await {
            warn!(error = %err, "federated callback rejected");
            self.fail(FlowState::AwaitingEmail, err.into());
            return;
        }

        match self.backend.get_current_session().await {
            Ok(CurrentSession::Authenticated(snapshot)) => {
                self.finish_checkpoint(snapshot, FlowState::AwaitingEmail);
            }
            Ok(CurrentSession::Unauthenticated) => {
                warn!("federated callback left no session");
                self.fail(FlowState::AwaitingEmail, FlowError::NotAuthenticated);
            }
            Err(err) => {
                warn!(error = %err, "session lookup after federated callback failed");
                self.fail(FlowState::AwaitingEmail, err.into());
            }
        }
    }

    /// Follow a `ProfileCompletion` decision to the profile form.
    pub fn open_profile_completion(&mut self) {
        if !self.accepts("open_profile_completion", |state| {
            *state == FlowState::Complete(Destination::ProfileCompletion)
        }) {
            return;
        }
        self.set(FlowState::AwaitingProfile);
    }

    /// Validate and save the profile, then schedule the navigation home.
    #[instrument(skip_all, fields(flow_id = %self.flow_id))]
    pub async fn submit_profile(&mut self, display_name: &str, raw_phone: &str) {
        if !self.accepts("submit_profile", |state| *state == FlowState::AwaitingProfile) {
            return;
        }
        self.clear_error();
        self.identity.display_name = display_name.to_string();
        self.identity.raw_phone_input = raw_phone.to_string();

        let display_name = display_name.trim();
        if display_name.is_empty() {
            self.fail(
                FlowState::AwaitingProfile,
                ValidationError::MissingDisplayName.into(),
            );
            return;
        }

        let scheme = self.config.phone();
        let phone_number = match validator::normalize_phone(
            raw_phone.trim(),
            &scheme.country_prefix,
            scheme.national_digits,
        ) {
            Ok(phone) => phone,
            Err(err) => {
                debug!("phone number rejected locally");
                self.fail(FlowState::AwaitingProfile, err.into());
                return;
            }
        };

        self.set(FlowState::SavingProfile);
        let update = ProfileUpdate {
            display_name: display_name.to_string(),
            phone_number,
        };
        if let Err(err) = self.backend.update_profile(&update).await {
            warn!(error = %err, "profile update failed");
            self.fail(FlowState::AwaitingProfile, err.into());
            return;
        }

        match self.backend.refresh_session().await {
            Ok(snapshot) => self.snapshot = Some(snapshot),
            Err(err) => warn!(error = %err, "session refresh after profile save failed"),
        }

        info!("profile completed");
        self.set(FlowState::Complete(Destination::Home));
        self.navigation = Some(ScheduledNavigation::schedule(
            Destination::Home,
            self.config.redirect_delay(),
        ));
    }

    fn finish_checkpoint(&mut self, snapshot: SessionSnapshot, retry_state: FlowState) {
        match checkpoint(snapshot) {
            Ok(Checkpoint {
                destination,
                snapshot,
            }) => {
                info!(%destination, "post-authentication checkpoint passed");
                self.snapshot = Some(snapshot);
                self.set(FlowState::Complete(destination));
            }
            Err(err) => {
                warn!(error = %err, "post-authentication checkpoint failed");
                self.fail(retry_state, err);
            }
        }
    }

    fn accepts(&self, event: &'static str, allowed: impl Fn(&FlowState) -> bool) -> bool {
        let state = self.state();
        if allowed(&state) {
            true
        } else {
            warn!(flow_id = %self.flow_id, event, ?state, "event ignored in current state");
            false
        }
    }

    fn set(&self, state: FlowState) {
        self.status.send_replace(FlowStatus::at(state));
    }

    fn fail(&self, state: FlowState, error: FlowError) {
        self.status.send_replace(FlowStatus {
            state,
            error: Some(error),
        });
    }

    fn clear_error(&self) {
        self.status.send_modify(|status| status.error = None);
    }
}
