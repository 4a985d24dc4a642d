//! 업스트림 호출 에러 타입.

use thiserror::Error;

/// 상태 코드를 제공하지 않는 실패(네트워크 등)에 사용하는 기본 상태 코드.
pub const DEFAULT_FAILURE_STATUS: u16 = 500;

/// 업스트림(시세 제공자, 콘텐츠 시스템) 호출 에러.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// 2xx 이외의 응답
    #[error("Request failed with status code {status}: {message}")]
    Status { status: u16, message: String },

    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 요청 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 응답 본문 파싱 에러
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 클라이언트 구성 에러 (잘못된 base URL 등)
    #[error("Client configuration error: {0}")]
    Config(String),
}

impl UpstreamError {
    /// 업스트림이 돌려준 상태 코드. 없으면 500.
    pub fn status_code(&self) -> u16 {
        match self {
            UpstreamError::Status { status, .. } => *status,
            _ => DEFAULT_FAILURE_STATUS,
        }
    }

    /// 업스트림 에러 텍스트, 없으면 전송 계층 에러 설명.
    pub fn message(&self) -> &str {
        match self {
            UpstreamError::Status { message, .. } => message,
            UpstreamError::NetworkError(msg)
            | UpstreamError::Timeout(msg)
            | UpstreamError::ParseError(msg)
            | UpstreamError::Config(msg) => msg,
        }
    }

    /// 재시도 가능한 일시적 에러인지 확인.
    ///
    /// 네트워크, 타임아웃, 429, 5xx만 재시도 대상입니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamError::NetworkError(_) | UpstreamError::Timeout(_) => true,
            UpstreamError::Status { status, .. } => *status == 429 || *status >= 500,
            UpstreamError::ParseError(_) | UpstreamError::Config(_) => false,
        }
    }

    /// 메트릭 라벨용 분류.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Status { .. } => "status",
            UpstreamError::NetworkError(_) => "network",
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::ParseError(_) => "parse",
            UpstreamError::Config(_) => "config",
        }
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout(err.to_string())
        } else if err.is_decode() {
            UpstreamError::ParseError(err.to_string())
        } else if err.is_builder() {
            UpstreamError::Config(err.to_string())
        } else {
            UpstreamError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::ParseError(err.to_string())
    }
}

/// 업스트림 호출 결과 타입.
pub type UpstreamResult<T> = Result<T, UpstreamError>;
