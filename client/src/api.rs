// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use common::ErrorEnvelope;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use crate::hydrate::hydrate_dates;

/// Transport-level failure. Every store operation maps this into the
/// shared error envelope; pages that chain follow-up actions on success
/// still receive it through the operation's `Result`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status and (possibly) an
    /// error envelope body.
    #[error("{}: {}", .0.title, .0.message)]
    Server(ErrorEnvelope),
    /// The request never completed (DNS, connect, timeout, ...).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The response body did not match the expected shape.
    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Normalizes any variant into the envelope the UI renders.
    pub fn envelope(&self) -> ErrorEnvelope {
        match self {
            ApiError::Server(envelope) => envelope.clone(),
            ApiError::Network(err) => ErrorEnvelope::new(
                "Connection failed",
                &format!("Could not reach the server: {err}."),
                "client/network",
            ),
            ApiError::Decode(err) => ErrorEnvelope::new(
                "Unexpected response",
                &format!("The server answered with an unexpected shape: {err}."),
                "client/decode",
            ),
        }
    }

    /// True when this error means the session must be re-established.
    pub fn is_auth_invalid(&self) -> bool {
        matches!(self, ApiError::Server(envelope) if envelope.is_auth_invalid())
    }
}

/// Options bag for a single API call.
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub query: Vec<(&'static str, String)>,
    /// When set, an authentication-invalid failure triggers the client's
    /// redirect hook before the error is returned. Used by calls made from
    /// pages that cannot recover in place.
    pub auth_redirect: bool,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::new(Method::GET, None)
    }

    pub fn post(body: Value) -> Self {
        Self::new(Method::POST, Some(body))
    }

    pub fn put(body: Value) -> Self {
        Self::new(Method::PUT, Some(body))
    }

    pub fn patch(body: Option<Value>) -> Self {
        Self::new(Method::PATCH, body)
    }

    pub fn delete(body: Value) -> Self {
        Self::new(Method::DELETE, Some(body))
    }

    fn new(method: Method, body: Option<Value>) -> Self {
        Self {
            method,
            body,
            query: Vec::new(),
            auth_redirect: false,
        }
    }

    pub fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    pub fn with_auth_redirect(mut self) -> Self {
        self.auth_redirect = true;
        self
    }
}

type RedirectHook = Box<dyn Fn() + Send + Sync>;

/// Thin wrapper around one `reqwest::Client` with a cookie store, so the
/// session cookie set by `/auth/signin` rides along on every later call.
///
/// All response bodies pass through `hydrate_dates` before being handed to
/// a store; stores never parse dates themselves.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    on_auth_redirect: Option<RedirectHook>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            on_auth_redirect: None,
        })
    }

    /// Installs the sign-in redirect hook. In the real application this
    /// navigates to the sign-in route; tests inject a counter.
    pub fn with_auth_redirect_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_auth_redirect = Some(Box::new(hook));
        self
    }

    /// Issues one request and returns the hydrated JSON body.
    ///
    /// Failures surface unchanged for the caller to classify, except when
    /// `auth_redirect` is set and the code is authentication-invalid: then
    /// the redirect hook fires first. That bypass is intentional; an
    /// expired session is not recoverable in page.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", options.method, path);

        let mut request = self
            .http
            .request(options.method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        if !options.query.is_empty() {
            request = request.query(&options.query);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            // Failure bodies are best-effort: anything unparsable falls
            // through to a synthesized envelope.
            let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
            let envelope = envelope_from_failure(status, &body);
            error!(
                "{} {} failed: {} ({})",
                options.method, path, envelope.message, envelope.code
            );
            if options.auth_redirect && envelope.is_auth_invalid() {
                if let Some(hook) = &self.on_auth_redirect {
                    hook();
                }
            }
            return Err(ApiError::Server(envelope));
        }

        // Empty success bodies (e.g. 204 on delete) read as null; anything
        // else must be valid JSON.
        let mut body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        hydrate_dates(&mut body);
        Ok(body)
    }
}

/// Reads the server's envelope out of a failure body, or synthesizes one
/// when the body carries no recognizable shape.
fn envelope_from_failure(status: StatusCode, body: &Value) -> ErrorEnvelope {
    if let Ok(envelope) = serde_json::from_value::<ErrorEnvelope>(body.clone()) {
        return envelope;
    }
    ErrorEnvelope::new(
        "Request failed",
        &format!(
            "The server responded with status {}.",
            status.canonical_reason().unwrap_or(status.as_str())
        ),
        &format!("http/{}", status.as_u16()),
    )
}
