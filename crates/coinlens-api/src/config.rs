//! 환경변수 기반 설정 모듈.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use coinlens_upstream::{coingecko, contentful, CoinGeckoConfig, ContentfulConfig, RetryConfig};
use thiserror::Error;

use crate::middleware::RateLimitConfig;

/// 설정 에러.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 파싱할 수 없는 값
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },

    /// 바인딩 주소 오류
    #[error("invalid socket address {host}:{port}: {source}")]
    InvalidAddress {
        host: String,
        port: u16,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// `LOG_FORMAT` 환경변수에서 읽기 (`json`이면 JSON, 그 외 기본 형식).
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// API 서버 전체 설정.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 캐시 설정
    pub cache: CacheConfig,
    /// Rate limit 설정
    pub rate_limit: RateLimitSettings,
    /// 업스트림 설정
    pub upstream: UpstreamSettings,
    /// 콘텐츠 시스템 설정 (스페이스 ID와 토큰이 모두 있을 때만)
    pub content: Option<ContentSettings>,
}

/// 서버 설정.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 바인딩할 호스트 주소
    pub host: String,
    /// 바인딩할 포트
    pub port: u16,
    /// 허용 CORS origin 목록 (비어있으면 모든 origin 허용)
    pub cors_origins: Vec<String>,
}

/// 캐시 설정.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// 항목 유효 시간 (초)
    pub ttl_secs: u64,
}

/// Rate limit 설정.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    /// 윈도우당 최대 요청 수
    pub max_requests: u32,
    /// 윈도우 길이 (초)
    pub window_secs: u64,
    /// rate limit 비활성화
    pub disabled: bool,
    /// X-Forwarded-For / X-Real-IP 신뢰 여부
    pub trust_proxy_headers: bool,
}

/// 업스트림 설정.
#[derive(Clone)]
pub struct UpstreamSettings {
    pub coingecko_base_url: String,
    pub coingecko_api_key: Option<String>,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 일시적 실패 재시도 횟수 (0 = 재시도 없음)
    pub max_retries: u32,
    /// 첫 재시도 대기 시간 (밀리초)
    pub retry_base_ms: u64,
    /// 업스트림 상태 코드를 그대로 응답할지 여부
    pub status_passthrough: bool,
}

impl std::fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("coingecko_base_url", &self.coingecko_base_url)
            .field(
                "coingecko_api_key",
                &self.coingecko_api_key.as_ref().map(|_| "***REDACTED***"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_base_ms", &self.retry_base_ms)
            .field("status_passthrough", &self.status_passthrough)
            .finish()
    }
}

/// 콘텐츠 시스템 설정.
#[derive(Clone)]
pub struct ContentSettings {
    pub space_id: String,
    pub access_token: String,
    pub environment: String,
    pub base_url: String,
}

impl std::fmt::Debug for ContentSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentSettings")
            .field("space_id", &self.space_id)
            .field("access_token", &"***REDACTED***")
            .field("environment", &self.environment)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiConfig {
    /// 환경변수에서 설정 로드 (`.env` 파일 포함).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정 로드.
    ///
    /// 값이 없으면 기본값을 사용하고, 값이 있지만 파싱할 수 없으면 에러를 반환합니다.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let window_secs = env_var_positive(&lookup, "RATE_LIMIT_WINDOW_SECS", 60)?;
        let timeout_secs = env_var_positive(&lookup, "UPSTREAM_TIMEOUT_SECS", 10)?;

        let credentials = (
            non_empty("CONTENTFUL_SPACE_ID"),
            non_empty("CONTENTFUL_ACCESS_TOKEN"),
        );
        let content = match credentials {
            (Some(space_id), Some(access_token)) => Some(ContentSettings {
                space_id,
                access_token,
                environment: non_empty("CONTENTFUL_ENVIRONMENT")
                    .unwrap_or_else(|| "master".to_string()),
                base_url: non_empty("CONTENTFUL_BASE_URL")
                    .unwrap_or_else(|| contentful::DEFAULT_BASE_URL.to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            server: ServerConfig {
                host: non_empty("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: env_var_parse(&lookup, "PORT", 5000)?,
                cors_origins: non_empty("CORS_ORIGINS")
                    .map(|origins| {
                        origins
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            cache: CacheConfig {
                ttl_secs: env_var_parse(&lookup, "CACHE_TTL_SECS", 60)?,
            },
            rate_limit: RateLimitSettings {
                max_requests: env_var_parse(&lookup, "RATE_LIMIT_MAX_REQUESTS", 30)?,
                window_secs,
                disabled: env_var_bool(&lookup, "RATE_LIMIT_DISABLED", false),
                trust_proxy_headers: env_var_bool(&lookup, "TRUST_PROXY_HEADERS", false),
            },
            upstream: UpstreamSettings {
                coingecko_base_url: non_empty("COINGECKO_BASE_URL")
                    .unwrap_or_else(|| coingecko::DEFAULT_BASE_URL.to_string()),
                coingecko_api_key: non_empty("COINGECKO_API_KEY"),
                timeout_secs,
                max_retries: env_var_parse(&lookup, "UPSTREAM_MAX_RETRIES", 0)?,
                retry_base_ms: env_var_parse(&lookup, "UPSTREAM_RETRY_BASE_MS", 250)?,
                status_passthrough: env_var_bool(&lookup, "UPSTREAM_STATUS_PASSTHROUGH", false),
            },
            content,
        })
    }

    /// 바인딩 소켓 주소.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|source| ConfigError::InvalidAddress {
                host: self.server.host.clone(),
                port: self.server.port,
                source,
            })
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl RateLimitSettings {
    pub fn limiter_config(&self) -> RateLimitConfig {
        RateLimitConfig::new(self.max_requests, Duration::from_secs(self.window_secs))
    }
}

impl UpstreamSettings {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries, Duration::from_millis(self.retry_base_ms))
    }

    pub fn coingecko_config(&self) -> CoinGeckoConfig {
        let config = CoinGeckoConfig::new(self.coingecko_base_url.clone())
            .with_timeout_secs(self.timeout_secs)
            .with_retry(self.retry());

        match &self.coingecko_api_key {
            Some(key) => config.with_api_key(key.clone()),
            None => config,
        }
    }
}

impl ContentSettings {
    pub fn contentful_config(&self, upstream: &UpstreamSettings) -> ContentfulConfig {
        ContentfulConfig::new(self.space_id.clone(), self.access_token.clone())
            .with_base_url(self.base_url.clone())
            .with_environment(self.environment.clone())
            .with_timeout_secs(upstream.timeout_secs)
            .with_retry(upstream.retry())
    }
}

/// 환경변수에서 값을 파싱 (없으면 기본값, 파싱 실패 시 에러).
fn env_var_parse<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(v) if !v.trim().is_empty() => {
            v.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value: v })
        }
        _ => Ok(default),
    }
}

/// 0을 허용하지 않는 초 단위 설정 파싱.
fn env_var_positive<F>(lookup: &F, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match env_var_parse(lookup, key, default)? {
        0 => Err(ConfigError::InvalidValue {
            key,
            value: "0".to_string(),
        }),
        secs => Ok(secs),
    }
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}
