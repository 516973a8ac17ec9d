/// API Error types
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use mailsink_core::MailsinkError;
use serde_json::json;

/// API Error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            ApiError::BadRequest(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::PreconditionFailed(msg)
            | ApiError::BadGateway(msg)
            | ApiError::Internal(msg) => msg,
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Convert mailsink-core errors to API errors
impl From<MailsinkError> for ApiError {
    fn from(err: MailsinkError) -> Self {
        match err {
            MailsinkError::BadRequest(msg) | MailsinkError::Parse(msg) => ApiError::BadRequest(msg),
            MailsinkError::NotFound(msg) => ApiError::NotFound(msg),
            MailsinkError::Conflict(msg) => ApiError::Conflict(msg),
            MailsinkError::PreconditionFailed(msg) => ApiError::PreconditionFailed(msg),
            MailsinkError::RelayFailure(msg) => ApiError::BadGateway(msg),
            MailsinkError::Storage(msg) | MailsinkError::Config(msg) => ApiError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (MailsinkError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (MailsinkError::Parse("x".into()), StatusCode::BAD_REQUEST),
            (MailsinkError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (MailsinkError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                MailsinkError::PreconditionFailed("x".into()),
                StatusCode::PRECONDITION_FAILED,
            ),
            (MailsinkError::RelayFailure("x".into()), StatusCode::BAD_GATEWAY),
            (
                MailsinkError::Storage("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[tokio::test]
    async fn test_error_body_is_structured() {
        let response = ApiError::Conflict("Server already exists named work".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Server already exists named work");
    }
}
