//! JSON REST API for the onboarding tracker.
//!
//! Exposes an axum [`Router`] backed by any [`OnboardingStore`] and optional
//! [`Exporter`]. Identity arrives in the `X-Onboard-User` header and is
//! resolved through a [`UserDirectory`]; TLS and whatever vouches for that
//! header are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", onboard_api::api_router(tracker, directory))
//! ```

pub mod actor;
pub mod admin;
pub mod error;
pub mod onboardings;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use onboard_core::{
  directory::UserDirectory, export::Exporter, store::OnboardingStore, tracker::Tracker,
};

pub use actor::{Actor, USER_HEADER};
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, E> {
  pub tracker:   Tracker<S, E>,
  pub directory: Arc<dyn UserDirectory>,
}

impl<S, E> Clone for AppState<S, E> {
  fn clone(&self) -> Self {
    Self {
      tracker:   self.tracker.clone(),
      directory: Arc::clone(&self.directory),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, E>(tracker: Tracker<S, E>, directory: Arc<dyn UserDirectory>) -> Router<()>
where
  S: OnboardingStore + 'static,
  E: Exporter + 'static,
{
  Router::new()
    .route("/me", get(admin::me))
    // Onboardings
    .route(
      "/onboardings",
      get(onboardings::list::<S, E>).post(onboardings::create::<S, E>),
    )
    .route("/onboardings/import", post(onboardings::import::<S, E>))
    .route(
      "/onboardings/{id}",
      get(onboardings::get_one::<S, E>)
        .patch(onboardings::edit::<S, E>)
        .delete(onboardings::delete_one::<S, E>),
    )
    .route("/onboardings/{id}/attendance", post(onboardings::attendance::<S, E>))
    .route("/onboardings/{id}/no-show", post(onboardings::no_show::<S, E>))
    // Whole dataset
    .route("/renumber", post(admin::renumber::<S, E>))
    .route("/sync", post(admin::sync::<S, E>))
    .route("/stats", get(admin::stats::<S, E>))
    .with_state(AppState { tracker, directory })
}

// ─── Integration tests ───────────────────────────────────────────────────────
