//! Application startup and lifecycle management.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::middleware::from_fn;
use axum::routing::{get, post};
use axum::Router;
use service_core::error::AppError;
use service_core::middleware::tracing::{request_id_middleware, REQUEST_ID_HEADER};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::FloorvizConfig;
use crate::handlers::convert::convert_image;
use crate::handlers::generate::generate_floor;
use crate::handlers::health::health_check;
use crate::services::codec::ImageCodec;
use crate::services::providers::gemini::{GeminiConfig, GeminiImageProvider};
use crate::services::providers::ImageProvider;

/// Origin the local Vite dev server runs on.
const DEV_FRONTEND_ORIGIN: &str = "http://localhost:5173";

/// Shared application state, constructed once and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: FloorvizConfig,
    pub codec: ImageCodec,
    pub provider: Option<Arc<dyn ImageProvider>>,
}

fn cors_layer(config: &FloorvizConfig) -> CorsLayer {
    let mut origins = vec![HeaderValue::from_static(DEV_FRONTEND_ORIGIN)];

    if let Some(frontend) = &config.server.frontend_url {
        match frontend.parse::<HeaderValue>() {
            Ok(origin) => origins.push(origin),
            Err(e) => tracing::error!("Invalid CORS origin '{}': {}", frontend, e),
        }
    }

    // Credentialed CORS forbids wildcards, so methods and headers are
    // mirrored from the preflight request instead.
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health_check))
        .route("/convert-image", post(convert_image))
        .route("/generate-floor", post(generate_floor))
        // Uploads are not size-capped; the codec rejects what it cannot parse.
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application, constructing the live provider when an API
    /// key is available and mock mode is off.
    pub async fn build(config: FloorvizConfig) -> Result<Self, AppError> {
        let provider: Option<Arc<dyn ImageProvider>> = match &config.google.api_key {
            Some(api_key) if !config.server.mock_mode => {
                let gemini_config = GeminiConfig {
                    api_key: api_key.clone(),
                    model: config.models.image_model.clone(),
                };
                tracing::info!(
                    model = %config.models.image_model,
                    "Initialized Gemini image provider"
                );
                Some(Arc::new(GeminiImageProvider::new(gemini_config)))
            }
            _ => None,
        };

        Self::build_with_provider(config, provider).await
    }

    /// Build with a caller-supplied provider. Tests use this to substitute
    /// the external collaborator.
    pub async fn build_with_provider(
        config: FloorvizConfig,
        provider: Option<Arc<dyn ImageProvider>>,
    ) -> Result<Self, AppError> {
        let codec = ImageCodec::new();

        if codec.heif_supported() {
            tracing::info!("HEIC/HEIF format support enabled");
        } else {
            tracing::warn!(
                "HEIC/HEIF support not compiled in, uploads in those formats will fail to decode"
            );
        }

        if !config.server.mock_mode && provider.is_none() {
            tracing::warn!(
                "NANO_BANANA_API_KEY not found in environment, live generation calls will fail"
            );
        }

        let state = AppState {
            config: config.clone(),
            codec,
            provider,
        };

        // port 0 = random port for testing
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("floorviz service listening on port {}", port);

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

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.listener, router).await
    }
}
