//! Authentication core: validation, the session gate, and the flow controller.
//! Nothing here talks to the network directly; every remote call goes through
//! [`IdentityBackend`]. This module handles one-time codes and session data, so
//! it must never log codes, tokens, or raw phone input.
//!
//! Flow Overview: the one-time-code path requests a code for an email and then
//! verifies it. The federated path hands the caller a provider redirect and later
//! resumes from the provider callback. Both paths end at the post-authentication
//! checkpoint, which runs the session gate and routes either home or to profile
//! completion. Profile completion validates the phone locally, saves the profile,
//! refreshes the session, and schedules the navigation home.

mod backend;
mod config;
mod controller;
mod error;
pub mod gate;
mod navigation;
mod types;
pub mod validator;

pub use backend::{IdentityBackend, RequestCodeOptions};
pub use config::{FlowConfig, PhoneScheme};
pub use controller::{AuthFlowController, Checkpoint, FlowState, FlowStatus, checkpoint};
pub use error::{BackendError, FlowError, ValidationError};
pub use gate::{Destination, decide_destination};
pub use navigation::ScheduledNavigation;
pub use types::{
    CurrentSession, FederatedRedirect, Identity, NormalizedPhone, OneTimeCode, ProfileUpdate,
    Provider, SessionSnapshot,
};
