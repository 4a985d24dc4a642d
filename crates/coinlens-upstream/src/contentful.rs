//! Contentful Delivery API 클라이언트.
//!
//! 자산별 설명 섹션과 용어집 항목을 조회합니다. 리치 텍스트는 렌더링하지 않고
//! 원본 문서 구조 그대로 전달합니다.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::{UpstreamError, UpstreamResult};
use crate::http::{endpoint_url, read_json};
use crate::retry::{with_retry, RetryConfig};
use crate::traits::ContentProvider;

/// 기본 Delivery API 주소.
pub const DEFAULT_BASE_URL: &str = "https://cdn.contentful.com";

/// 자산 설명 콘텐츠 타입.
pub const ASSET_CONTENT_TYPE: &str = "cryptocurrencyDetails";

/// 용어집 콘텐츠 타입.
pub const GLOSSARY_CONTENT_TYPE: &str = "glossaryTerm";

/// 노출 가능한 자산 설명 섹션 (표시 순서).
pub const ASSET_SECTIONS: [&str; 8] = [
    "about",
    "history",
    "whereToBuyAndSell",
    "useCases",
    "compatibleWallets",
    "yield",
    "staking",
    "otherUsefulInformation",
];

/// Delivery API 페이지 최대 크기.
const MAX_PAGE_SIZE: u32 = 1000;

/// Contentful 클라이언트 설정.
#[derive(Clone)]
pub struct ContentfulConfig {
    pub base_url: String,
    pub space_id: String,
    pub access_token: String,
    pub environment: String,
    pub timeout_secs: u64,
    pub retry: RetryConfig,
}

impl fmt::Debug for ContentfulConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentfulConfig")
            .field("base_url", &self.base_url)
            .field("space_id", &self.space_id)
            .field("access_token", &"***REDACTED***")
            .field("environment", &self.environment)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ContentfulConfig {
    /// 스페이스와 토큰으로 생성 (`master` 환경).
    pub fn new(space_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            space_id: space_id.into(),
            access_token: access_token.into(),
            environment: "master".to_string(),
            timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// 자산 설명 콘텐츠.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetContent {
    pub crypto_id: String,
    pub symbol: String,
    /// 내용이 있는 섹션만 포함 (섹션 이름 → 리치 텍스트 문서)
    pub sections: Map<String, Value>,
    pub video_links: Vec<Value>,
    /// RFC 3339 시각
    pub last_updated: String,
}

impl AssetContent {
    /// 엔트리의 `fields` 객체에서 생성.
    ///
    /// 누락된 문자열 필드는 빈 문자열, `videoLinks`는 빈 배열,
    /// `lastUpdated`는 현재 시각으로 채웁니다.
    pub fn from_fields(fields: &Value) -> Self {
        let text = |name: &str| {
            fields
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let sections = ASSET_SECTIONS
            .iter()
            .filter_map(|&name| {
                let section = fields.get(name)?;
                let has_content = section
                    .get("content")
                    .and_then(Value::as_array)
                    .is_some_and(|blocks| !blocks.is_empty());
                has_content.then(|| (name.to_string(), section.clone()))
            })
            .collect();

        let video_links = fields
            .get("videoLinks")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let last_updated = fields
            .get("lastUpdated")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));

        Self {
            crypto_id: text("cryptoId"),
            symbol: text("symbol"),
            sections,
            video_links,
            last_updated,
        }
    }
}

/// 용어 기준 대소문자 무시 정렬.
fn sort_by_term(entries: &mut [Value]) {
    entries.sort_by_cached_key(|entry| {
        entry
            .pointer("/fields/term")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    });
}

/// Contentful Delivery API 클라이언트.
pub struct ContentfulClient {
    config: ContentfulConfig,
    client: Client,
}

impl ContentfulClient {
    pub fn new(config: ContentfulConfig) -> UpstreamResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 엔트리 목록 조회. 응답의 `items` 배열을 반환합니다.
    async fn entries(&self, params: &[(&str, &str)]) -> UpstreamResult<Vec<Value>> {
        let url = endpoint_url(
            &self.config.base_url,
            &[
                "spaces",
                self.config.space_id.as_str(),
                "environments",
                self.config.environment.as_str(),
                "entries",
            ],
        )?;

        let body = with_retry(&self.config.retry, "contentful/entries", || {
            let url = url.clone();
            async move {
                debug!(%url, ?params, "GET entries");
                let response = self
                    .client
                    .get(url)
                    .bearer_auth(&self.config.access_token)
                    .query(params)
                    .send()
                    .await?;
                read_json(response).await
            }
        })
        .await?;

        match body.get("items") {
            Some(Value::Array(items)) => Ok(items.clone()),
            _ => Err(UpstreamError::ParseError(
                "entries response has no items array".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ContentProvider for ContentfulClient {
    fn name(&self) -> &str {
        "contentful"
    }

    async fn asset_content(&self, id: &str) -> UpstreamResult<Option<AssetContent>> {
        let items = self
            .entries(&[
                ("content_type", ASSET_CONTENT_TYPE),
                ("fields.cryptoId", id),
                ("limit", "1"),
            ])
            .await?;

        let Some(fields) = items.first().and_then(|item| item.get("fields")) else {
            info!(crypto_id = id, "No content entry found");
            return Ok(None);
        };

        Ok(Some(AssetContent::from_fields(fields)))
    }

    async fn glossary_terms(&self) -> UpstreamResult<Vec<Value>> {
        let limit = MAX_PAGE_SIZE.to_string();
        let mut items = self
            .entries(&[("content_type", GLOSSARY_CONTENT_TYPE), ("limit", limit.as_str())])
            .await?;

        sort_by_term(&mut items);
        debug!(count = items.len(), "Glossary terms fetched");
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn rich_text(text: &str) -> Value {
        json!({
            "nodeType": "document",
            "content": [{
                "nodeType": "paragraph",
                "content": [{"nodeType": "text", "value": text}]
            }]
        })
    }

    fn client_for(server: &mockito::Server) -> ContentfulClient {
        let config = ContentfulConfig::new("space1", "token1").with_base_url(server.url());
        ContentfulClient::new(config).unwrap()
    }

    #[test]
    fn test_config_debug_masks_token() {
        let config = ContentfulConfig::new("space1", "very-secret-token");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("very-secret-token"));
        assert!(debug.contains("space1"));
    }

    #[test]
    fn test_from_fields_keeps_only_filled_sections() {
        let fields = json!({
            "cryptoId": "bitcoin",
            "symbol": "BTC",
            "about": rich_text("Digital gold"),
            "history": {"nodeType": "document", "content": []},
            "staking": {"nodeType": "document"},
            "unknownSection": rich_text("ignored"),
            "videoLinks": ["https://video.example/1"],
            "lastUpdated": "2024-01-01T00:00:00.000Z"
        });

        let content = AssetContent::from_fields(&fields);

        assert_eq!(content.crypto_id, "bitcoin");
        assert_eq!(content.symbol, "BTC");
        assert_eq!(content.sections.keys().collect::<Vec<_>>(), vec!["about"]);
        assert_eq!(content.video_links, vec![json!("https://video.example/1")]);
        assert_eq!(content.last_updated, "2024-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_from_fields_defaults() {
        let content = AssetContent::from_fields(&json!({"videoLinks": "not-an-array"}));

        assert_eq!(content.crypto_id, "");
        assert_eq!(content.symbol, "");
        assert!(content.sections.is_empty());
        assert!(content.video_links.is_empty());
        assert!(chrono::DateTime::parse_from_rfc3339(&content.last_updated).is_ok());
    }

    #[test]
    fn test_serializes_camel_case() {
        let content = AssetContent::from_fields(&json!({"cryptoId": "eth", "symbol": "ETH"}));
        let value = serde_json::to_value(&content).unwrap();

        assert_eq!(value["cryptoId"], "eth");
        assert!(value.get("videoLinks").is_some());
        assert!(value.get("lastUpdated").is_some());
    }

    #[tokio::test]
    async fn test_asset_content_query_and_auth() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "total": 1,
            "items": [{
                "sys": {"id": "abc"},
                "fields": {
                    "cryptoId": "bitcoin",
                    "symbol": "BTC",
                    "about": rich_text("Digital gold")
                }
            }]
        });
        let mock = server
            .mock("GET", "/spaces/space1/environments/master/entries")
            .match_header("authorization", "Bearer token1")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("content_type".into(), ASSET_CONTENT_TYPE.into()),
                Matcher::UrlEncoded("fields.cryptoId".into(), "bitcoin".into()),
            ]))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let content = client_for(&server).asset_content("bitcoin").await.unwrap().unwrap();

        assert_eq!(content.symbol, "BTC");
        assert!(content.sections.contains_key("about"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_asset_content_missing_is_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/spaces/space1/environments/master/entries")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"total":0,"items":[]}"#)
            .create_async()
            .await;

        let content = client_for(&server).asset_content("notacoin").await.unwrap();
        assert!(content.is_none());
    }

    #[tokio::test]
    async fn test_glossary_sorted_case_insensitive() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "items": [
                {"fields": {"term": "staking"}},
                {"fields": {"term": "Altcoin"}},
                {"fields": {"term": "blockchain"}}
            ]
        });
        let _mock = server
            .mock("GET", "/spaces/space1/environments/master/entries")
            .match_query(Matcher::UrlEncoded(
                "content_type".into(),
                GLOSSARY_CONTENT_TYPE.into(),
            ))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let terms = client_for(&server).glossary_terms().await.unwrap();
        let names: Vec<_> = terms
            .iter()
            .map(|t| t["fields"]["term"].as_str().unwrap())
            .collect();

        assert_eq!(names, vec!["Altcoin", "blockchain", "staking"]);
    }

    #[tokio::test]
    async fn test_access_denied_surfaces_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/spaces/space1/environments/master/entries")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(
                json!({
                    "sys": {"id": "AccessTokenInvalid"},
                    "message": "The access token you sent could not be found or is invalid."
                })
                .to_string(),
            )
            .create_async()
            .await;

        let err = client_for(&server).glossary_terms().await.unwrap_err();

        assert_eq!(err.status_code(), 401);
        assert!(err.message().contains("access token"));
    }
}
