//! Main server implementation for the Docsmith API

use crate::{
    api,
    config::Config,
    error::{Error, Result},
};
use axum::Router;
use docsmith_auth::{CredentialResolver, FileTokenStore, HttpOAuthClient, StateTracker};
use docsmith_common::logging::mask_secret;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Main server structure
pub struct Server {
    config: Arc<Config>,
    app: Router,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Credential resolver shared by all sessions
    pub resolver: Arc<CredentialResolver>,
}

impl Server {
    /// Create a new server instance
    pub async fn new(config: Config) -> Result<Self> {
        info!("Initializing Docsmith API server");

        config.validate()?;
        let config = Arc::new(config);

        let client_config = Arc::new(config.oauth.to_client_config());
        info!(
            client_id = %mask_secret(&client_config.client_id),
            redirect_uri = %client_config.redirect_uri,
            "Identity provider client configured"
        );
        let client = HttpOAuthClient::new(client_config, config.provider_timeout())?;

        let store = FileTokenStore::new(&config.storage.token_path);
        info!(
            "Credential store at {}",
            config.storage.token_path.display()
        );

        let resolver = CredentialResolver::new(
            Arc::new(store),
            Arc::new(client),
            Arc::new(StateTracker::new(config.attempt_ttl())),
        )
        .with_options(config.oauth.authorization_options());

        let state = AppState {
            config: config.clone(),
            resolver: Arc::new(resolver),
        };

        let app = Self::build_router(state);

        Ok(Self { config, app })
    }

    /// Build the application router with all routes and middleware
    fn build_router(state: AppState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::new(state.config.request_timeout()))
            .layer(cors);

        Router::new()
            .merge(api::routes(state.clone()))
            .layer(middleware)
            .with_state(state)
    }

    /// Run the server until shutdown signal
    pub async fn run(self) -> Result<()> {
        let addr = self.config.server.bind_address;

        info!("Starting HTTP server on {}", addr);

        let listener = TcpListener::bind(addr).await.map_err(|e| Error::Internal {
            message: format!("Failed to bind to address {addr}: {e}"),
        })?;

        self.serve(listener, shutdown_signal()).await
    }

    /// Run on an already bound listener until `shutdown_rx` fires or is dropped
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<()> {
        self.serve(listener, async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("Docsmith API listening on {}", addr);
        }

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Internal {
                message: format!("Server error: {e}"),
            })
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            warn!("Received terminate signal, shutting down");
        },
    }
}
