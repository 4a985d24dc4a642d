//! CoinGecko 시세 데이터 클라이언트.
//!
//! CoinGecko v3 공개 REST API에서 상위 자산 목록, 자산 상세, 과거 시세를 조회합니다.
//! 응답은 변환하지 않고 JSON 그대로 반환합니다.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::{UpstreamError, UpstreamResult};
use crate::http::{endpoint_url, read_json};
use crate::retry::{with_retry, RetryConfig};
use crate::traits::MarketDataProvider;

/// 기본 API 주소.
pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// 상위 자산 목록 페이지 크기.
pub const TOP_ASSETS_PAGE_SIZE: u32 = 10;

/// 상위 자산 목록 기준 통화.
pub const TOP_ASSETS_VS_CURRENCY: &str = "usd";

/// 데모 API 키 헤더.
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

// ============================================================================
// 설정
// ============================================================================

/// CoinGecko 클라이언트 설정.
///
/// # 보안
/// - `Debug` 구현은 `api_key`를 마스킹합니다.
#[derive(Clone)]
pub struct CoinGeckoConfig {
    /// REST API 기본 URL
    pub base_url: String,
    /// 데모 API 키 (선택)
    pub api_key: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 재시도 설정
    pub retry: RetryConfig,
}

impl fmt::Debug for CoinGeckoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoinGeckoConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***REDACTED***"))
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

impl CoinGeckoConfig {
    /// base URL을 지정해 생성.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// API 키 설정.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// 요청 타임아웃 설정.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// 재시도 설정.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

// ============================================================================
// 클라이언트
// ============================================================================

/// CoinGecko REST 클라이언트.
pub struct CoinGeckoClient {
    config: CoinGeckoConfig,
    client: Client,
}

impl CoinGeckoClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `UpstreamError::Config`를 반환합니다.
    pub fn new(config: CoinGeckoConfig) -> UpstreamResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("coinlens/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 현재 설정 반환.
    pub fn config(&self) -> &CoinGeckoConfig {
        &self.config
    }

    /// 공개 API GET 요청 (재시도 정책 적용).
    async fn public_get(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
    ) -> UpstreamResult<Value> {
        let url = endpoint_url(&self.config.base_url, segments)?;
        let label = url.path().to_string();

        with_retry(&self.config.retry, &label, || {
            let url = url.clone();
            async move {
                debug!(%url, "GET");

                let mut request = self.client.get(url).query(params);
                if let Some(key) = &self.config.api_key {
                    request = request.header(API_KEY_HEADER, key);
                }

                let response = request.send().await?;
                read_json(response).await
            }
        })
        .await
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoClient {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn top_assets(&self) -> UpstreamResult<Value> {
        let per_page = TOP_ASSETS_PAGE_SIZE.to_string();
        self.public_get(
            &["coins", "markets"],
            &[
                ("vs_currency", TOP_ASSETS_VS_CURRENCY),
                ("order", "market_cap_desc"),
                ("per_page", per_page.as_str()),
                ("page", "1"),
                ("sparkline", "false"),
            ],
        )
        .await
    }

    async fn asset_detail(&self, id: &str) -> UpstreamResult<Value> {
        self.public_get(&["coins", id], &[]).await
    }

    async fn market_chart(
        &self,
        id: &str,
        vs_currency: Option<&str>,
        days: Option<&str>,
    ) -> UpstreamResult<Value> {
        let params: Vec<(&str, &str)> = [("vs_currency", vs_currency), ("days", days)]
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect();

        self.public_get(&["coins", id, "market_chart"], &params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client_for(server: &mockito::Server) -> CoinGeckoClient {
        CoinGeckoClient::new(CoinGeckoConfig::new(server.url())).unwrap()
    }

    #[test]
    fn test_config_debug_masks_api_key() {
        let config = CoinGeckoConfig::default().with_api_key("CG-secret-key");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("CG-secret-key"));
        assert!(debug.contains("REDACTED"));
    }

    #[tokio::test]
    async fn test_top_assets_query() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/markets")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
                Matcher::UrlEncoded("order".into(), "market_cap_desc".into()),
                Matcher::UrlEncoded("per_page".into(), "10".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
                Matcher::UrlEncoded("sparkline".into(), "false".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"id":"bitcoin","market_cap_rank":1}]"#)
            .create_async()
            .await;

        let assets = client_for(&server).top_assets().await.unwrap();

        assert_eq!(assets[0]["id"], "bitcoin");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_asset_detail_not_found_uses_upstream_text() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/coins/notacoin")
            .with_status(404)
            .with_body(r#"{"error":"coin not found"}"#)
            .create_async()
            .await;

        let err = client_for(&server).asset_detail("notacoin").await.unwrap_err();

        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "coin not found");
    }

    #[tokio::test]
    async fn test_status_without_body_falls_back_to_generic_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/coins/bitcoin")
            .with_status(502)
            .create_async()
            .await;

        let err = client_for(&server).asset_detail("bitcoin").await.unwrap_err();

        assert_eq!(err.status_code(), 502);
        assert_eq!(err.message(), "Request failed with status code 502");
    }

    #[tokio::test]
    async fn test_market_chart_passes_params_verbatim() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/bitcoin/market_chart")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("vs_currency".into(), "usd".into()),
                Matcher::UrlEncoded("days".into(), "not-a-number".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"prices":[[1700000000000,37000.5]]}"#)
            .create_async()
            .await;

        let chart = client_for(&server)
            .market_chart("bitcoin", Some("usd"), Some("not-a-number"))
            .await
            .unwrap();

        assert_eq!(chart["prices"][0][1], 37000.5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_market_chart_keeps_upstream_key_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/bitcoin/market_chart")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"prices":[[1,2]],"market_caps":[[1,3]],"total_volumes":[[1,4]]}"#)
            .create_async()
            .await;

        let chart = client_for(&server)
            .market_chart("bitcoin", Some("usd"), Some("1"))
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_string(&chart).unwrap(),
            r#"{"prices":[[1,2]],"market_caps":[[1,3]],"total_volumes":[[1,4]]}"#
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_market_chart_omits_missing_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/bitcoin/market_chart")
            .match_query(Matcher::Missing)
            .with_status(400)
            .with_body(r#"{"error":"Missing parameter vs_currency"}"#)
            .create_async()
            .await;

        let err = client_for(&server)
            .market_chart("bitcoin", None, None)
            .await
            .unwrap_err();

        assert_eq!(err.message(), "Missing parameter vs_currency");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_key_header_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/bitcoin")
            .match_header(API_KEY_HEADER, "CG-demo")
            .with_status(200)
            .with_body(r#"{"id":"bitcoin"}"#)
            .create_async()
            .await;

        let config = CoinGeckoConfig::new(server.url()).with_api_key("CG-demo");
        let client = CoinGeckoClient::new(config).unwrap();
        client.asset_detail("bitcoin").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_retries_server_errors_when_enabled() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/bitcoin")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let config = CoinGeckoConfig::new(server.url())
            .with_retry(RetryConfig::new(2, Duration::from_millis(1)).with_jitter(0.0));
        let err = CoinGeckoClient::new(config)
            .unwrap()
            .asset_detail("bitcoin")
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 503);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/coins/notacoin")
            .with_status(404)
            .with_body(r#"{"error":"coin not found"}"#)
            .expect(1)
            .create_async()
            .await;

        let config = CoinGeckoConfig::new(server.url())
            .with_retry(RetryConfig::new(2, Duration::from_millis(1)));
        let _ = CoinGeckoClient::new(config)
            .unwrap()
            .asset_detail("notacoin")
            .await;

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_network_failure_reports_500() {
        // 닫힌 포트로 연결 실패 유도
        let client = CoinGeckoClient::new(CoinGeckoConfig::new("http://127.0.0.1:1")).unwrap();

        let err = client.top_assets().await.unwrap_err();

        assert_eq!(err.status_code(), 500);
        assert!(!err.message().is_empty());
    }
}
