use aide::axum::{routing::get, routing::post, ApiRouter};
mod echo;
mod health;

pub fn handler() -> ApiRouter {
    ApiRouter::new()
        .api_route("/echo", post(echo::handler))
        .api_route("/health", get(health::handler))
}
