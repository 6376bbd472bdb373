use axum::extract::FromRequestParts;
use axum::http::{StatusCode, header, request::Parts};
use axum::response::IntoResponse;
use serde::Serialize;

use crate::payment::PaymentError;

/// Root element of every payment API response. `data` and `error` are
/// mutually exclusive.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    links: Links,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: u16,
    msg: String,
}

#[derive(Debug, Serialize)]
struct Links {
    #[serde(rename = "self")]
    this: String,
}

/// `host + path` of the current request, echoed back as `links.self` on every
/// enveloped response.
#[derive(Debug, Clone)]
pub struct SelfLink(pub String);

impl SelfLink {
    pub fn from_parts(parts: &Parts) -> Self {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        Self(format!("{host}{}", parts.uri))
    }

    pub fn data<T: Serialize>(self, status: StatusCode, payload: T) -> Reply<T> {
        Reply {
            status,
            envelope: Envelope {
                data: Some(payload),
                error: None,
                links: Links { this: self.0 },
            },
        }
    }

    /// Log the failure and wrap it into an error envelope.
    pub fn error(self, err: PaymentError) -> axum::response::Response {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {err}");
        } else {
            tracing::warn!("Request rejected: {err}");
        }
        Reply::<()> {
            status,
            envelope: Envelope {
                data: None,
                error: Some(ErrorBody {
                    code: status.as_u16(),
                    msg: err.to_string(),
                }),
                links: Links { this: self.0 },
            },
        }
        .into_response()
    }
}

impl<S: Send + Sync> FromRequestParts<S> for SelfLink {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}

#[derive(Debug)]
pub struct Reply<T> {
    status: StatusCode,
    envelope: Envelope<T>,
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> axum::response::Response {
        match serde_json::to_vec(&self.envelope) {
            Ok(body) => (
                self.status,
                [(header::CONTENT_TYPE, "application/json")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Failed to serialize response envelope: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    }
}
