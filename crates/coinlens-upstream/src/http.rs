//! 공통 HTTP 응답 처리.

use reqwest::{Response, Url};
use serde_json::Value;
use tracing::error;

use crate::error::{UpstreamError, UpstreamResult};

/// 에러 메시지로 그대로 옮길 원문 본문의 최대 길이.
const MAX_RAW_ERROR_LEN: usize = 512;

/// base URL 뒤에 경로 세그먼트를 붙인 URL 생성.
///
/// 세그먼트는 퍼센트 인코딩되므로 식별자에 `/`나 `?`가 있어도 경로가 바뀌지 않습니다.
pub(crate) fn endpoint_url(base_url: &str, segments: &[&str]) -> UpstreamResult<Url> {
    let mut url = Url::parse(base_url)
        .map_err(|e| UpstreamError::Config(format!("invalid base URL {}: {}", base_url, e)))?;

    url.path_segments_mut()
        .map_err(|_| UpstreamError::Config(format!("base URL cannot be a base: {}", base_url)))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

/// 응답을 JSON 값으로 변환.
///
/// 2xx가 아니면 `UpstreamError::Status`를 반환하며, 메시지는 업스트림 에러 텍스트를 우선합니다.
pub(crate) async fn read_json(response: Response) -> UpstreamResult<Value> {
    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        serde_json::from_slice(&body).map_err(|e| {
            error!(status = status.as_u16(), error = %e, "Failed to parse upstream response");
            UpstreamError::ParseError(e.to_string())
        })
    } else {
        let message = error_message(&body)
            .unwrap_or_else(|| format!("Request failed with status code {}", status.as_u16()));

        Err(UpstreamError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// 에러 응답 본문에서 사람이 읽을 수 있는 메시지 추출.
///
/// 지원 형식:
/// - `{"error": "coin not found"}`
/// - `{"status": {"error_code": 429, "error_message": "..."}}`
/// - `{"message": "The resource could not be found."}`
/// - 그 외 비어있지 않은 원문 본문
pub(crate) fn error_message(body: &[u8]) -> Option<String> {
    if let Ok(json) = serde_json::from_slice::<Value>(body) {
        let candidates = [
            json.get("error"),
            json.pointer("/status/error_message"),
            json.get("message"),
        ];

        if let Some(text) = candidates.into_iter().flatten().find_map(Value::as_str) {
            return Some(text.to_string());
        }
    }

    let raw = String::from_utf8_lossy(body);
    let raw = raw.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.chars().take(MAX_RAW_ERROR_LEN).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_encodes_segments() {
        let url = endpoint_url("https://api.example.com/api/v3", &["coins", "a/b?c"]).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/v3/coins/a%2Fb%3Fc");
    }

    #[test]
    fn test_endpoint_url_trailing_slash() {
        let url = endpoint_url("http://127.0.0.1:1234/", &["coins", "markets"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:1234/coins/markets");
    }

    #[test]
    fn test_endpoint_url_rejects_invalid_base() {
        let err = endpoint_url("not a url", &["coins"]).unwrap_err();
        assert!(matches!(err, UpstreamError::Config(_)));
    }

    #[test]
    fn test_error_message_formats() {
        assert_eq!(
            error_message(br#"{"error":"coin not found"}"#).as_deref(),
            Some("coin not found")
        );
        assert_eq!(
            error_message(
                br#"{"status":{"error_code":429,"error_message":"You've exceeded the Rate Limit"}}"#
            )
            .as_deref(),
            Some("You've exceeded the Rate Limit")
        );
        assert_eq!(
            error_message(
                br#"{"sys":{"id":"NotFound"},"message":"The resource could not be found."}"#
            )
            .as_deref(),
            Some("The resource could not be found.")
        );
        assert_eq!(error_message(b"Bad Gateway").as_deref(), Some("Bad Gateway"));
        assert_eq!(error_message(b"   "), None);
    }
}
