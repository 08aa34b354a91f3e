mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{
    HeaderValue, Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use contacts_api::media::CloudinaryStore;
use contacts_api::notify::LogNotifier;
use contacts_api::router::router;
use contacts_api::state::AppStateInner;

use crate::config::{Config, CorsPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "contacts=debug,contacts_api=debug,contacts_store=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    let media = CloudinaryStore::new(config.cloudinary.clone(), config.policy.upload_timeout)?;
    let state = AppStateInner::in_memory(Arc::new(LogNotifier), Arc::new(media), config.policy);

    let app = router(state, config.max_avatar_bytes)
        .layer(cors_layer(&config.cors)?)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Contacts server listening on {}", addr);
    info!(
        "Throttle {:?} per origin, cooldown {:?} per identity, upload timeout {:?}",
        config.policy.throttle_period, config.policy.cooldown_period, config.policy.upload_timeout
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Peer addresses key the request throttle.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

fn cors_layer(policy: &CorsPolicy) -> anyhow::Result<CorsLayer> {
    let layer = match policy {
        CorsPolicy::Any => CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(Any)
            .allow_headers(Any),
        CorsPolicy::Origins(origins) => {
            let origins = origins
                .iter()
                .map(|o| HeaderValue::from_str(o))
                .collect::<Result<Vec<_>, _>>()?;
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(true)
        }
    };
    Ok(layer)
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
