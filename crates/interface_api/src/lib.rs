//! HTTP API Layer
//!
//! The web surface of the Guarantee of Payment core, built on Axum.
//!
//! # Architecture
//!
//! - **Handlers**: thin adapters from HTTP onto [`GopService`]
//! - **Middleware**: bearer authentication and audit logging
//! - **DTOs**: request bodies and listing envelopes
//! - **Error Handling**: hidden outcomes become a redirect to `/`
//! - **Realtime**: one websocket per user for notifications and chat
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::from_pool(pool, config)?;
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use domain_gop::{GopPort, GopService};
use domain_messaging::{
    ChatHub, ChatPort, DeliveryError, HttpMailSender, LogMailSender, MailSender, NotificationPort, Notifier, PushHub,
};
use domain_party::DirectoryPort;
use infra_db::{DatabasePool, PostgresDirectoryAdapter, PostgresGopAdapter, PostgresMessagingAdapter};

use crate::config::ApiConfig;
use crate::handlers::{gop, health, listing, notification, ws};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<GopService>,
    pub gops: Arc<dyn GopPort>,
    pub directory: Arc<dyn DirectoryPort>,
    pub chat_hub: Arc<ChatHub>,
    pub push: Arc<PushHub>,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the service and realtime hubs over the given ports
    pub fn new(
        gops: Arc<dyn GopPort>,
        directory: Arc<dyn DirectoryPort>,
        notifications: Arc<dyn NotificationPort>,
        chats: Arc<dyn ChatPort>,
        mail: Arc<dyn MailSender>,
        config: ApiConfig,
    ) -> Self {
        let push = Arc::new(PushHub::new());
        let notifier = Notifier::new(notifications, push.clone(), mail);
        let service = GopService::new(
            gops.clone(),
            directory.clone(),
            chats.clone(),
            notifier,
            config.public_base_url.clone(),
        );

        Self {
            service: Arc::new(service),
            gops,
            directory,
            chat_hub: Arc::new(ChatHub::new(push.clone(), chats)),
            push,
            config,
        }
    }

    /// State over the PostgreSQL adapters
    ///
    /// # Errors
    ///
    /// Fails when a mail relay is configured but its client cannot be built.
    pub fn from_pool(pool: DatabasePool, config: ApiConfig) -> Result<Self, DeliveryError> {
        let mail: Arc<dyn MailSender> = match &config.mail_endpoint {
            Some(endpoint) => Arc::new(HttpMailSender::new(endpoint.clone(), config.mail_sender.clone())?),
            None => {
                info!("no mail relay configured, emails are logged only");
                Arc::new(LogMailSender)
            }
        };
        let messaging = Arc::new(PostgresMessagingAdapter::new(pool.clone()));

        Ok(Self::new(
            Arc::new(PostgresGopAdapter::new(pool.clone())),
            Arc::new(PostgresDirectoryAdapter::new(pool)),
            messaging.clone(),
            messaging,
            mail,
            config,
        ))
    }
}

/// Creates the main router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let request_routes = Router::new()
        .route("/request", post(gop::create))
        .route("/request/claim", post(gop::open_claim))
        .route("/request/claim/:id", post(gop::create_from_claim))
        .route("/request/:id", get(gop::view).post(gop::decide))
        .route("/request/:id/edit", post(gop::edit))
        .route("/request/:id/resend", get(gop::resend))
        .route("/request/:id/close/:reason", get(gop::close))
        .route("/request/:id/set-stamp-author", post(gop::set_stamp_author))
        .route("/admin/request/:id", get(gop::admin_view));

    let listing_routes = Router::new()
        .route("/", get(listing::index))
        .route("/get-gops", get(listing::list))
        .route("/search", get(listing::search))
        .route("/history", get(listing::history))
        .route("/requests/filter", get(listing::filter))
        .route("/check-notification", get(notification::check_notification));

    // Machine clients
    let api_routes = Router::new()
        .route("/requests", post(gop::create_bulk))
        .route("/request/:id/edit", post(gop::edit))
        .route("/request/:id/set-status", post(gop::decide));

    let protected_routes = Router::new()
        .merge(request_routes)
        .merge(listing_routes)
        .nest("/api", api_routes)
        .route("/ws", get(ws::ws_handler))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config)),
        )
        .with_state(state)
}

fn cors_layer(config: &ApiConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}
