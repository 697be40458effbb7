//! Application startup and lifecycle management.

use axum::routing::{get, post, put};
use axum::Router;
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::TrackerConfig;
use crate::handlers;
use crate::services::classifier::Categorizer;
use crate::services::database::Database;
use crate::services::gmail::{GmailApiClient, MailProvider};
use crate::services::ingest::IngestService;
use crate::services::jwt::JwtService;
use crate::services::providers::gemini::{GeminiConfig, GeminiTextProvider};
use crate::services::providers::TextProvider;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: TrackerConfig,
    pub db: Database,
    pub jwt: JwtService,
    pub ingest: IngestService,
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the real Gemini and Gmail clients.
    pub async fn build(config: TrackerConfig) -> Result<Self, AppError> {
        let text_provider: Arc<dyn TextProvider> =
            Arc::new(GeminiTextProvider::new(GeminiConfig {
                api_key: config.google.api_key.clone(),
                model: config.genai.text_model.clone(),
            }));
        let mail: Arc<dyn MailProvider> = Arc::new(GmailApiClient::new());

        Self::build_with(config, text_provider, mail).await
    }

    /// Build with explicit collaborators; the seam tests use to
    /// substitute mocks.
    pub async fn build_with(
        config: TrackerConfig,
        text_provider: Arc<dyn TextProvider>,
        mail: Arc<dyn MailProvider>,
    ) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;
        db.run_migrations().await?;

        let jwt = JwtService::new(&config.jwt);
        let categorizer = Categorizer::new(text_provider);
        let ingest = IngestService::new(
            db.clone(),
            categorizer,
            mail,
            config.genai.clone(),
            config.gmail.clone(),
        );

        let state = AppState {
            config: config.clone(),
            db,
            jwt,
            ingest,
        };

        // Port 0 = random port for testing.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Tracker service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = app_router(self.state);
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

/// Assemble the full route table.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/auth/google", get(handlers::auth::google_login))
        .route("/auth/google/callback", get(handlers::auth::google_callback))
        .route(
            "/users",
            post(handlers::users::create_user).get(handlers::users::list_users),
        )
        .route(
            "/users/:id",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/card-companies",
            post(handlers::card_companies::create_card_company)
                .get(handlers::card_companies::list_card_companies),
        )
        .route(
            "/card-companies/:id",
            get(handlers::card_companies::get_card_company)
                .patch(handlers::card_companies::update_card_company)
                .delete(handlers::card_companies::delete_card_company),
        )
        .route(
            "/categories",
            post(handlers::categories::create_category).get(handlers::categories::list_categories),
        )
        .route(
            "/categories/:id",
            get(handlers::categories::get_category)
                .patch(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        .route("/files/upload", post(handlers::files::upload_file))
        .route("/transactions", get(handlers::transactions::list_transactions))
        .route(
            "/transactions/:id/recategorize",
            put(handlers::transactions::recategorize_transaction),
        )
        .route("/gmail/sync", get(handlers::gmail::sync_card_emails))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
