//! `scoreazy-service`: HTTP surface for contact intake and admin triage.
//!
//! Public: `POST /api/contact`, `GET /healthz`. Everything under `/admin`
//! plus the `/api/contact` list, stats and status aliases sit behind HTTP
//! Basic authentication.

pub mod auth;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};
use chrono::Utc;
use scoreazy_core::config::ServiceConfig;
use scoreazy_core::notify::NotificationDispatcher;
use scoreazy_core::rate_guard::RateGuard;
use scoreazy_core::{AdminService, IntakePipeline, SubmissionStore};
use tokio::task::JoinHandle;

pub use auth::AdminCredentials;
pub use error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub intake: IntakePipeline,
    pub admin: AdminService,
    pub credentials: Option<Arc<AdminCredentials>>,
    pub trust_forwarded_for: bool,
}

impl AppState {
    pub fn new(
        cfg: &ServiceConfig,
        store: SubmissionStore,
        guard: Arc<dyn RateGuard>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            intake: IntakePipeline::new(store.clone(), guard, dispatcher, &cfg.intake),
            admin: AdminService::new(store),
            credentials: AdminCredentials::from_config(&cfg.admin).map(Arc::new),
            trust_forwarded_for: cfg.server.trust_forwarded_for,
        }
    }
}

/// Build the application router. Serve it with
/// `into_make_service_with_connect_info::<SocketAddr>()` so handlers can
/// attribute requests to a peer address.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/admin", get(routes::admin::dashboard))
        .route("/admin/contacts", get(routes::admin::list_contacts))
        .route(
            "/admin/contacts/:id",
            get(routes::admin::get_contact)
                .put(routes::admin::update_contact)
                .delete(routes::admin::delete_contact),
        )
        .route("/admin/export", get(routes::admin::export_contacts))
        .route("/api/contact", get(routes::contact::list_contacts))
        .route("/api/contact/stats", get(routes::contact::stats))
        .route("/api/contact/:id/status", put(routes::contact::update_status))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ));

    Router::new()
        .route("/api/contact", post(routes::contact::submit))
        .route("/healthz", get(routes::healthz))
        .merge(protected)
        .with_state(state)
}

/// Periodically drop idle origins from the rate guard.
pub fn spawn_rate_guard_sweeper(guard: Arc<dyn RateGuard>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = guard.prune(Utc::now());
            if removed > 0 {
                tracing::debug!(removed, "Pruned idle rate-guard origins");
            }
        }
    })
}
