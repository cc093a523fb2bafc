use axum::response::IntoResponse;
use axum::Json;
use http::StatusCode;
use serde_json::json;

#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: &'static str,
    pub detail: String,
    pub status_code: StatusCode,
}

impl ApiError {
    /// Create a new ApiError with a machine readable code, a detail message and status code
    pub fn new<S: ToString>(code: &'static str, detail: S, status_code: StatusCode) -> Self {
        Self {
            code,
            detail: detail.to_string(),
            status_code,
        }
    }

    /// Create new Internal Server Error (500) with a detail message
    pub fn internal<S: ToString>(detail: S) -> Self {
        Self::new("internal_error", detail, StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Create new Bad Request Error (400)
    pub fn bad_request<S: ToString>(code: &'static str, detail: S) -> Self {
        Self::new(code, detail, StatusCode::BAD_REQUEST)
    }

    /// Create new Forbidden Error (403)
    pub fn forbidden<S: ToString>(code: &'static str, detail: S) -> Self {
        Self::new(code, detail, StatusCode::FORBIDDEN)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status_code = self.status_code;
        let body = json!({
            "code": self.code,
            "detail": self.detail,
        });
        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_api_error_response() {
        let response = ApiError::forbidden("missing_scope", "missing scope servers.view")
            .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            body,
            json!({ "code": "missing_scope", "detail": "missing scope servers.view" })
        );
    }

    #[test]
    fn test_internal_error() {
        let err = ApiError::internal("boom");
        assert_eq!(err.status_code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "internal_error");
    }
}
