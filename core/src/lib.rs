//! `scoreazy-core`: contact-submission intake and admin triage.
//!
//! The website's contact form posts into an [`intake::IntakePipeline`],
//! which runs the per-origin rate guard, field validation, and the
//! per-email duplicate guard before persisting a [`submission::Submission`]
//! and handing it to the notification dispatcher. The
//! [`admin::AdminService`] reads and mutates the same store for the
//! credential-gated admin surface.
//!
//! ## Modules
//! - [`submission`]: record types and lifecycle status
//! - [`validation`]: field rules and email normalization
//! - [`rate_guard`]: sliding-window limiter keyed by origin
//! - [`store`]: SQLite persistence (r2d2 pool, migrations, async bridge)
//! - [`notify`]: notifier capability, message rendering, retrying dispatch
//! - [`intake`]: the submit pipeline
//! - [`admin`]: list/get/update/delete/export/stats
//! - [`export`]: CSV rendering
//! - [`config`]: TOML + environment configuration

pub mod admin;
pub mod config;
pub mod export;
pub mod intake;
pub mod notify;
pub mod rate_guard;
pub mod store;
pub mod submission;
pub mod validation;

pub use admin::AdminService;
pub use config::ServiceConfig;
pub use intake::IntakePipeline;
pub use store::SubmissionStore;
pub use submission::{Submission, SubmissionStatus};
