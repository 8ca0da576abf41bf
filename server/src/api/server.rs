//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::{Extension, Router};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::auth::{AuthState, IdentityIssuer, RoleGuard, require_auth};
use super::middleware::{self, AllowedOrigins};
use super::openapi::{openapi_json, swagger_ui_html};
use super::routes::{applications, auth, health, loans, payments, users};
use crate::core::CoreApp;
use crate::core::config::Environment;
use crate::core::constants::{AUTH_BODY_LIMIT, DEFAULT_BODY_LIMIT};
use crate::data::TransactionalRepository;
use crate::domain::payments::{CheckoutService, PaymentProcessor, ReconcileService};

/// Everything the HTTP surface needs, independent of process wiring
#[derive(Clone)]
pub struct RouterDeps {
    pub store: Arc<dyn TransactionalRepository>,
    pub issuer: Arc<dyn IdentityIssuer>,
    pub processor: Arc<dyn PaymentProcessor>,
    pub environment: Environment,
    pub site_domain: String,
    pub allowed_origins: AllowedOrigins,
}

/// Assemble the full application router
///
/// Users, loans and applications sit behind the credential verifier and share
/// one role guard. Auth and payment routes are public.
pub fn build_router(deps: RouterDeps) -> Router {
    let RouterDeps {
        store,
        issuer,
        processor,
        environment,
        site_domain,
        allowed_origins,
    } = deps;

    let auth_state = AuthState {
        issuer: issuer.clone(),
    };
    let guard = Arc::new(RoleGuard::new(store.clone()));

    let protected = Router::new()
        .merge(users::routes(store.clone()))
        .merge(loans::routes(store.clone()))
        .merge(applications::routes(store.clone()))
        .layer(Extension(guard))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            require_auth,
        ));

    let auth_routes = auth::routes(issuer, store.clone(), environment)
        .layer(DefaultBodyLimit::max(AUTH_BODY_LIMIT));

    let checkout = Arc::new(CheckoutService::new(
        store.clone(),
        processor.clone(),
        &site_domain,
    ));
    let reconcile = Arc::new(ReconcileService::new(store, processor));

    Router::new()
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi_json))
        .route("/docs", get(swagger_ui_html))
        .nest("/auth", auth_routes)
        .merge(protected)
        .merge(payments::routes(checkout, reconcile))
        .fallback(middleware::handle_404)
        .layer(CompressionLayer::new())
        .layer(middleware::cors(&allowed_origins))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown is triggered; returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let Self { app } = self;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let router = build_router(RouterDeps {
            store: app.database.repository(),
            issuer: app.issuer.clone(),
            processor: app.processor.clone(),
            environment: app.config.environment,
            site_domain: app.config.site_domain.clone(),
            allowed_origins: AllowedOrigins::new(&app.config.cors.allowed_origins),
        });

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "HTTP server listening");
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}
