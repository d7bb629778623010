//! Signup provisioning: reacts to user-creation events from the
//! authentication provider and creates the user's organization-of-one.
//!
//! Trigger payloads arrive in per-integration shapes and are normalized by
//! the adapters in [`event`] before the shared [`Provisioner`] logic runs.

mod event;
mod workflow;

pub use event::UserCreated;
pub use workflow::{Outcome, Provisioner};
