pub mod forward;
pub mod static_assets;

use std::path::PathBuf;
use std::time::Duration;

use axum::{routing::any, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use url::Url;

use crate::config::AppConfig;
use self::forward::forward;
use self::static_assets::spa_static_service;

/// Shared state for the forwarding handlers. Cheap to clone; the inner
/// reqwest client is reference-counted and reused across requests.
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub http: reqwest::Client,
    pub upstream_origin: Url,
    pub upstream_host: String,
    pub static_root: PathBuf,
    pub spa_index: String,
    pub enable_cors: bool,
    pub enable_request_logging: bool,
}

impl GatewayState {
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            upstream_origin: Url::parse(&config.upstream.origin())?,
            upstream_host: config.upstream.host_header(),
            static_root: PathBuf::from(&config.gateway.static_root),
            spa_index: config.gateway.spa_index.clone(),
            enable_cors: config.gateway.enable_cors,
            enable_request_logging: config.gateway.enable_request_logging,
        })
    }
}

/// Build the gateway router: everything under /api forwards to the upstream
/// service, everything else resolves against the static asset root with the
/// SPA entry point as fallback.
pub fn router(state: GatewayState) -> Router {
    let enable_cors = state.enable_cors;
    let enable_request_logging = state.enable_request_logging;
    let static_files = spa_static_service(&state.static_root, &state.spa_index);

    let mut router = Router::new()
        .route("/api", any(forward))
        .route("/api/", any(forward))
        .route("/api/*path", any(forward))
        .fallback_service(static_files)
        .with_state(state);

    if enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    if enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}
