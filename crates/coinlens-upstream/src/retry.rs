//! 업스트림 호출 재시도.
//!
//! 일시적 실패(네트워크, 타임아웃, 429, 5xx)에 대해 지수 백오프 + 지터로
//! 제한된 횟수만큼 재시도합니다. 기본 설정은 재시도 없음(`max_retries = 0`)입니다.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::UpstreamResult;

/// 재시도 설정.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 최초 시도 이후 최대 재시도 횟수
    pub max_retries: u32,
    /// 첫 재시도 대기 시간
    pub base_delay: Duration,
    /// 대기 시간 상한
    pub max_delay: Duration,
    /// 지터 비율 (0.2 = ±20%)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    /// 재시도 없음.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// 재시도 횟수와 기본 대기 시간 지정.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    /// 지터 비율 변경.
    #[must_use]
    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// `attempt`번째 재시도(0부터) 전 대기 시간.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);

        if self.jitter_factor <= 0.0 {
            return exp;
        }

        let jitter = rand::thread_rng().gen_range(-self.jitter_factor..=self.jitter_factor);
        exp.mul_f64((1.0 + jitter).max(0.0))
    }
}

/// 재시도 가능한 에러에 한해 `operation`을 반복 실행.
///
/// 재시도 불가능한 에러나 마지막 시도의 에러는 그대로 반환됩니다.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    label: &str,
    mut operation: F,
) -> UpstreamResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = UpstreamResult<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                let delay = config.delay_for(attempt);
                attempt += 1;
                debug!(
                    label = label,
                    attempt = attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying upstream call"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if attempt > 0 {
                    warn!(
                        label = label,
                        attempts = attempt + 1,
                        error = %e,
                        "Upstream call failed after retries"
                    );
                }
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> UpstreamError {
        UpstreamError::Status {
            status: 503,
            message: "unavailable".to_string(),
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let config = RetryConfig::new(5, Duration::from_millis(100)).with_jitter(0.0);

        assert_eq!(config.delay_for(0), Duration::from_millis(100));
        assert_eq!(config.delay_for(1), Duration::from_millis(200));
        assert_eq!(config.delay_for(2), Duration::from_millis(400));
        assert_eq!(config.delay_for(20), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let config = RetryConfig::new(3, Duration::from_millis(1000)).with_jitter(0.2);

        for _ in 0..50 {
            let delay = config.delay_for(0);
            assert!(delay >= Duration::from_millis(799));
            assert!(delay <= Duration::from_millis(1201));
        }
    }

    #[tokio::test]
    async fn test_no_retry_by_default() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: UpstreamResult<()> = with_retry(&RetryConfig::default(), "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_then_succeeds() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let config = RetryConfig::new(3, Duration::from_millis(10));

        let result = with_retry(&config, "test", || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(unavailable())
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let config = RetryConfig::new(3, Duration::from_millis(10));

        let result: UpstreamResult<()> = with_retry(&config, "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError::Status {
                status: 404,
                message: "coin not found".to_string(),
            })
        })
        .await;

        assert_eq!(result.unwrap_err().status_code(), 404);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let config = RetryConfig::new(2, Duration::from_millis(10));

        let result: UpstreamResult<()> = with_retry(&config, "test", || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(unavailable())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
