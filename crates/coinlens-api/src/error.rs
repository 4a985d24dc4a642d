//! API 에러 응답.
//!
//! 모든 실패는 `{ "error": ..., "details": ... }` 형식의 JSON으로 응답합니다.
//!
//! ```json
//! {
//!   "error": "An error occurred while fetching data",
//!   "details": "coin not found"
//! }
//! ```

use std::any::Any;

use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use coinlens_upstream::UpstreamError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

/// 상위 자산 목록/자산 상세 조회 실패 메시지.
pub const FETCH_ERROR: &str = "An error occurred while fetching data";

/// 과거 시세 조회 실패 메시지.
pub const CHART_FETCH_ERROR: &str = "An error occurred while fetching market chart data";

/// 콘텐츠 조회 실패 메시지.
pub const CONTENT_FETCH_ERROR: &str = "An error occurred while fetching content";

/// 요청 한도 초과 메시지.
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests from this IP, please try again later.";

/// 핸들러 패닉 시 메시지.
pub const PANIC_MESSAGE: &str = "Something broke!";

/// 에러 응답 본문.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// 고정된 에러 요약
    pub error: String,
    /// 원인 설명 (업스트림 에러 텍스트 등)
    pub details: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

/// API 에러.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 클라이언트 요청 한도 초과
    #[error("rate limit exceeded, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    /// 업스트림 호출 실패
    ///
    /// `passthrough`가 켜져 있으면 업스트림 상태 코드로 응답하고, 아니면 500.
    #[error("{context}: {source}")]
    Upstream {
        context: &'static str,
        #[source]
        source: UpstreamError,
        passthrough: bool,
    },

    /// 요청 경로/쿼리를 해석할 수 없음
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 리소스 없음 (미등록 콘텐츠, 알 수 없는 경로)
    #[error("not found: {0}")]
    NotFound(String),

    /// 콘텐츠 서비스 미설정
    #[error("content service is not configured")]
    ContentUnavailable,

    /// 내부 에러
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn upstream(context: &'static str, source: UpstreamError, passthrough: bool) -> Self {
        ApiError::Upstream {
            context,
            source,
            passthrough,
        }
    }

    /// 응답 상태 코드.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream {
                source,
                passthrough: true,
                ..
            } => StatusCode::from_u16(source.status_code())
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ContentUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 응답 본문.
    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::RateLimited { retry_after } => ErrorBody::new(
                RATE_LIMIT_MESSAGE,
                format!("Retry after {} seconds", retry_after),
            ),
            ApiError::Upstream {
                context, source, ..
            } => ErrorBody::new(*context, source.message()),
            ApiError::BadRequest(what) => ErrorBody::new("Bad Request", what.as_str()),
            ApiError::NotFound(what) => ErrorBody::new("Not Found", what.as_str()),
            ApiError::ContentUnavailable => {
                ErrorBody::new(CONTENT_FETCH_ERROR, "Content service is not configured")
            }
            ApiError::Internal(msg) => ErrorBody::new(PANIC_MESSAGE, msg.as_str()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Upstream { context, source, .. } => {
                error!(
                    context = %context,
                    upstream_status = source.status_code(),
                    kind = source.kind(),
                    error = %source,
                    status = status.as_u16(),
                    "Upstream request failed"
                );
            }
            ApiError::Internal(msg) => error!(error = %msg, "Internal error"),
            ApiError::ContentUnavailable => {
                warn!("Content request without configured content service")
            }
            ApiError::BadRequest(msg) => warn!(error = %msg, "Rejected malformed request"),
            ApiError::RateLimited { .. } | ApiError::NotFound(_) => {}
        }

        let mut response = (status, Json(self.body())).into_response();

        if let ApiError::RateLimited { retry_after } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
        }

        response
    }
}

/// API 핸들러 Result 타입.
pub type ApiResult<T> = Result<T, ApiError>;

/// 알 수 없는 경로에 대한 404 핸들러.
pub async fn not_found_fallback(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// 핸들러 패닉을 500 응답으로 변환 (`CatchPanicLayer::custom`용).
///
/// 스택 트레이스는 응답에 포함하지 않습니다.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "Unknown panic".to_string()
    };

    ApiError::Internal(details).into_response()
}
