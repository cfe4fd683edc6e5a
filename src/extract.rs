use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
    http::StatusCode,
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::error::Category;

use crate::utils::{ErrorCode, RequestError};

/// JSON body extractor that parses the payload whatever its `Content-Type` says.
///
/// Unlike [`axum::Json`] this never answers `415`. Syntax errors map to `400`, shape errors to `422`,
/// and an exceeded body limit keeps its `413`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| RequestError {
                code: if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    ErrorCode::PayloadTooLarge
                } else {
                    ErrorCode::BadRequest
                },
                details: Some(e.body_text()),
            })?;

        serde_json::from_slice(&bytes)
            .map(Self)
            .map_err(|e| RequestError {
                code: match e.classify() {
                    Category::Data => ErrorCode::InvalidBody,
                    Category::Io | Category::Syntax | Category::Eof => ErrorCode::MalformedJson,
                },
                details: Some(e.to_string()),
            })
    }
}

impl<T: JsonSchema> aide::OperationInput for JsonBody<T> {
    fn operation_input(
        ctx: &mut aide::gen::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        <axum::Json<T> as aide::OperationInput>::operation_input(ctx, operation);
    }
}
