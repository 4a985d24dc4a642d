//! Rate limiting middleware.
//!
//! 클라이언트 IP별 고정 윈도우(fixed window) rate limiting을 제공합니다.
//! 윈도우 경계에서 카운트가 0으로 초기화되므로, 경계 직전과 직후에 걸쳐
//! 최대 2배의 요청이 짧은 시간 안에 허용될 수 있습니다.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::ApiError;

/// 남은 요청 수 헤더.
const REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// 윈도우당 한도 헤더.
const LIMIT_HEADER: &str = "x-ratelimit-limit";

/// Rate Limiter 설정.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// 윈도우당 최대 요청 수
    pub max_requests: u32,
    /// 윈도우 길이
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 30,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }
}

/// 클라이언트별 윈도우 상태.
#[derive(Debug)]
struct RateWindow {
    /// 현재 윈도우에서 허용된 요청 수
    count: u32,
    /// 윈도우 시작 시각
    window_start: Instant,
}

impl RateWindow {
    fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }
}

/// Rate Limiter.
///
/// IP 주소별로 Rate Limiting을 적용합니다. 거절된 요청은 카운트하지 않습니다.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<RwLock<HashMap<IpAddr, RateWindow>>>,
}

impl RateLimiter {
    /// 새 Rate Limiter 생성.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 기본 설정(60초당 30회)으로 생성.
    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// 요청 허용 여부 확인.
    pub async fn check(&self, ip: IpAddr) -> RateLimitResult {
        let mut windows = self.windows.write().await;
        let now = Instant::now();

        let window = windows.entry(ip).or_insert_with(|| RateWindow::new(now));

        if window.is_expired(now, self.config.window) {
            *window = RateWindow::new(now);
        }

        if window.count < self.config.max_requests {
            window.count += 1;
            RateLimitResult::Allowed {
                remaining: self.config.max_requests - window.count,
            }
        } else {
            let reset_at = window.window_start + self.config.window;
            let wait = reset_at.saturating_duration_since(now);
            let retry_after = (wait.as_secs_f64().ceil() as u64).max(1);
            RateLimitResult::Limited { retry_after }
        }
    }

    /// 끝난 윈도우 정리.
    pub async fn cleanup(&self) {
        let mut windows = self.windows.write().await;
        let now = Instant::now();

        windows.retain(|_, window| !window.is_expired(now, self.config.window));
    }

    /// 현재 추적 중인 IP 수 반환.
    pub async fn tracked_ips(&self) -> usize {
        self.windows.read().await.len()
    }
}

/// Rate Limit 확인 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// 요청 허용됨
    Allowed {
        /// 현재 윈도우에서 남은 요청 수
        remaining: u32,
    },
    /// Rate limit 초과
    Limited {
        /// 윈도우 초기화까지 대기 시간 (초)
        retry_after: u64,
    },
}

/// Rate Limit 미들웨어 상태.
#[derive(Clone)]
pub struct RateLimitState {
    limiter: RateLimiter,
    /// `X-Forwarded-For` / `X-Real-IP` 신뢰 여부
    trust_proxy_headers: bool,
}

impl RateLimitState {
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            limiter,
            trust_proxy_headers: false,
        }
    }

    /// 리버스 프록시 헤더 신뢰 설정.
    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }
}

/// Rate Limiting 미들웨어 함수.
///
/// 클라이언트 IP별로 Rate Limiting을 적용합니다.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let ip = extract_client_ip(&request, state.trust_proxy_headers);

    match state.limiter.check(ip).await {
        RateLimitResult::Allowed { remaining } => {
            counter!("rate_limit_requests_total", "status" => "allowed").increment(1);

            let mut response = next.run(request).await;

            let headers = response.headers_mut();
            headers.insert(
                LIMIT_HEADER,
                HeaderValue::from(state.limiter.config.max_requests),
            );
            headers.insert(REMAINING_HEADER, HeaderValue::from(remaining));

            response
        }
        RateLimitResult::Limited { retry_after } => {
            counter!("rate_limit_requests_total", "status" => "limited").increment(1);

            tracing::warn!(
                client_ip = %ip,
                retry_after = retry_after,
                "Rate limit exceeded"
            );

            ApiError::RateLimited { retry_after }.into_response()
        }
    }
}

/// 요청에서 클라이언트 IP 추출.
///
/// 기본적으로 TCP 연결 주소(`ConnectInfo`)를 사용합니다. 프록시/로드밸런서 뒤에서
/// `trust_proxy_headers`가 켜져 있으면 X-Forwarded-For, X-Real-IP 헤더를 우선 확인합니다.
fn extract_client_ip(request: &Request, trust_proxy_headers: bool) -> IpAddr {
    if trust_proxy_headers {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|ip| ip.trim().parse().ok());

        if let Some(ip) = forwarded {
            return ip;
        }

        let real_ip = request
            .headers()
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .and_then(|ip| ip.trim().parse().ok());

        if let Some(ip) = real_ip {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
