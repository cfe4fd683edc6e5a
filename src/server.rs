use std::{future::Future, net::SocketAddr, time::Duration};

use aide::openapi::{Info, OpenApi};
use axum::{extract::DefaultBodyLimit, routing::get, Extension, Json, Router};
use eyre::WrapErr;
use tokio::net::TcpListener;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::{
    routes,
    utils::{GlobalConfig, DEFAULT_REQUEST_TIMEOUT_SECS},
};

#[must_use]
pub fn get_timeout_layer(timeout: Option<u64>) -> TimeoutLayer {
    let timeout = timeout.map_or(
        Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        Duration::from_secs,
    );
    TimeoutLayer::new(timeout)
}

/// Allows every origin, method and header.
///
/// A literal `*` origin cannot be combined with credentials, so when credentials are allowed the
/// origin, methods and headers are mirrored back from the request instead. Note this differs from
/// middlewares that answer simple requests with `*` next to `Access-Control-Allow-Credentials:
/// true` and only mirror on preflights or cookie-bearing requests: a literal
/// `Access-Control-Allow-Origin: *` is only ever sent with `allow_credentials` off.
#[must_use]
pub fn get_cors_layer(allow_credentials: bool) -> CorsLayer {
    if allow_credentials {
        CorsLayer::very_permissive()
    } else {
        CorsLayer::permissive()
    }
}

async fn serve_openapi(Extension(openapi): Extension<OpenApi>) -> Json<OpenApi> {
    Json(openapi)
}

/// Assembles the full application: routes, OpenAPI document and middleware.
#[must_use]
pub fn build_app(global_config: GlobalConfig) -> Router {
    let mut openapi = OpenApi {
        info: Info {
            title: "Slow Echo".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };

    let timeout_layer = get_timeout_layer(Some(global_config.request_timeout_secs));
    let cors_layer = get_cors_layer(global_config.cors_allow_credentials);

    routes::handler()
        .finish_api(&mut openapi)
        .route("/openapi.json", get(serve_openapi))
        .layer(Extension(openapi))
        .layer(Extension(global_config))
        // echoes are unbounded, any body size must round-trip
        .layer(DefaultBodyLimit::disable())
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::new().include_headers(true)),
        )
        .layer(timeout_layer)
        // outermost, so timeouts and unmatched routes get CORS headers too
        .layer(cors_layer)
}

/// Serves the application on an already bound listener until `shutdown` resolves.
///
/// # Errors
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(
    listener: TcpListener,
    global_config: GlobalConfig,
    shutdown: F,
) -> eyre::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(global_config);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .wrap_err("Failed to start server")
}

/// Binds the configured address and serves until SIGINT or SIGTERM.
///
/// # Errors
/// Returns an error if the address cannot be bound or the server fails.
pub async fn start(global_config: GlobalConfig) -> eyre::Result<()> {
    let address = global_config.bind_address;
    let listener = TcpListener::bind(&address)
        .await
        .wrap_err_with(|| format!("Failed to bind address {address}"))?;

    tracing::info!(
        delay = ?global_config.echo_delay,
        "🐢 Slow echo server started on http://{address}"
    );

    serve(listener, global_config, shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = ?e, "failed to listen for Ctrl-C.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = ?e, "failed to listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests...");
}
