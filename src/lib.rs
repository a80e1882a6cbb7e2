//! Relays Expo build, submission and update webhooks to Slack, annotated
//! with what changed since the previous event of the same kind.

pub mod config;
pub mod error;
pub mod expo;
pub mod notify;
pub mod payload;
pub mod relay;
pub mod resolve;
pub mod slack;
pub mod webhook;

pub use error::{Error, Result};
