use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use eyre::{bail, WrapErr};
use schemars::JsonSchema;
use serde_json::Value;

pub const DEFAULT_PORT: u16 = 8090;
pub const DEFAULT_ECHO_DELAY_MS: u64 = 5000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, serde::Deserialize, serde::Serialize, JsonSchema)]
pub struct EchoRequest {
    /// Value to send back, of any JSON type. Defaults to an empty string when omitted.
    #[serde(default = "empty_message")]
    pub message: Value,
}

#[derive(Debug, serde::Deserialize, serde::Serialize, JsonSchema)]
pub struct EchoResponse {
    pub message: Value,
}

fn empty_message() -> Value {
    Value::String(String::new())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    pub bind_address: SocketAddr,
    /// How long `/echo` holds each request before answering.
    pub echo_delay: Duration,
    pub request_timeout_secs: u64,
    /// When set, CORS mirrors the caller's origin and allows credentials instead of answering `*`.
    pub cors_allow_credentials: bool,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            echo_delay: Duration::from_millis(DEFAULT_ECHO_DELAY_MS),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cors_allow_credentials: true,
        }
    }
}

impl GlobalConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    /// Returns an error if any variable is set to a value that cannot be parsed, or if the request
    /// timeout would cut off every echo.
    pub fn from_env() -> eyre::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, falling back to defaults for unset keys.
    ///
    /// # Errors
    /// See [`GlobalConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> eyre::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = match lookup("HOST") {
            Some(host) => host
                .trim()
                .parse::<IpAddr>()
                .wrap_err_with(|| format!("invalid `HOST` environment variable: {host}"))?,
            None => defaults.bind_address.ip(),
        };

        let port = parse_var("PORT", &lookup)?.unwrap_or(DEFAULT_PORT);

        let echo_delay = parse_var("ECHO_DELAY_MS", &lookup)?
            .map_or(defaults.echo_delay, Duration::from_millis);

        let request_timeout_secs =
            parse_var("REQUEST_TIMEOUT_SECS", &lookup)?.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        let cors_allow_credentials = parse_var("CORS_ALLOW_CREDENTIALS", &lookup)?
            .unwrap_or(defaults.cors_allow_credentials);

        if Duration::from_secs(request_timeout_secs) <= echo_delay {
            bail!(
                "`REQUEST_TIMEOUT_SECS` ({request_timeout_secs}s) must be longer than the echo delay ({}ms).",
                echo_delay.as_millis()
            );
        }

        Ok(Self {
            bind_address: SocketAddr::new(host, port),
            echo_delay,
            request_timeout_secs,
            cors_allow_credentials,
        })
    }
}

fn parse_var<T, F>(key: &str, lookup: &F) -> eyre::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .wrap_err_with(|| format!("invalid `{key}` environment variable: {raw}"))
        })
        .transpose()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    PayloadTooLarge,
    MalformedJson,
    InvalidBody,
}

impl ErrorCode {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest | Self::MalformedJson => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::InvalidBody => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest => write!(f, "bad_request"),
            Self::PayloadTooLarge => write!(f, "payload_too_large"),
            // Body is not syntactically valid JSON
            Self::MalformedJson => write!(f, "malformed_json"),
            // Valid JSON, but not an object
            Self::InvalidBody => write!(f, "invalid_body"),
        }
    }
}

#[derive(Debug, PartialEq, Eq, serde::Serialize)]
pub struct RequestError {
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {details}", self.code),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for RequestError {}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        (self.code.status(), Json(self)).into_response()
    }
}
