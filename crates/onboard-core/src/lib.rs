//! Core types and trait definitions for the onboarding tracker.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! session numbering engine lives in [`session`]; every write path reaches it
//! through [`tracker::Tracker`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod attendance;
pub mod directory;
pub mod error;
pub mod export;
pub mod feed;
pub mod normalize;
pub mod record;
pub mod session;
pub mod stats;
pub mod store;
pub mod tracker;

pub use error::{Error, Result, ValidationError};
