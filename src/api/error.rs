// API error module
// Maps handler failures onto status codes and the `{"error": ...}` body

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::ALLOW;
use hyper::{Response, StatusCode};

use super::response::json_response;
use crate::logger;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed body, missing field, invalid value or unparseable id
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Method not allowed")]
    MethodNotAllowed { allow: String },
    #[error("Origin not allowed")]
    Forbidden,
    #[error("Request body too large")]
    PayloadTooLarge,
    /// Store failure or timeout; the detail is logged, not returned
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// Log a store failure and hide it behind `message`
    pub fn store(message: &str, err: &StoreError) -> Self {
        logger::log_store_error(message, err);
        Self::Internal(message.to_string())
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let body = serde_json::json!({ "error": self.to_string() });
        let mut response = json_response(self.status(), &body);
        if let Self::MethodNotAllowed { allow } = &self {
            if let Ok(value) = allow.parse() {
                response.headers_mut().insert(ALLOW, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::time::Duration;

    async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ApiError::NotFound("Book not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Book not found" })
        );
    }

    #[tokio::test]
    async fn test_store_error_is_hidden() {
        let err = ApiError::store(
            "Failed to fetch books",
            &StoreError::Timeout(Duration::from_secs(10)),
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Failed to fetch books" })
        );
    }

    #[test]
    fn test_method_not_allowed_sets_allow() {
        let response = ApiError::MethodNotAllowed {
            allow: "GET, POST, OPTIONS".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, POST, OPTIONS");
    }
}
