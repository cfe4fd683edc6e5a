use axum::{Extension, Json};
use serde_json::Value;

use crate::{
    extract::JsonBody,
    utils::{EchoRequest, EchoResponse, GlobalConfig},
};

#[tracing::instrument(name = "echo", skip_all, fields(endpoint = "/echo"))]
pub async fn handler(
    Extension(global_config): Extension<GlobalConfig>,
    JsonBody(request): JsonBody<EchoRequest>,
) -> Json<EchoResponse> {
    match &request.message {
        Value::String(message) => tracing::info!("Received message: {message}"),
        other => tracing::info!("Received message: {other}"),
    }
    tracing::info!("Processing message...");

    // Timer-based wait, the worker stays free for other connections
    tokio::time::sleep(global_config.echo_delay).await;

    tracing::info!("Processing complete");

    Json(EchoResponse {
        message: request.message,
    })
}

// NOTE: Integration tests for route handlers are in the `/tests` module
