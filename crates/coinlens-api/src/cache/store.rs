//! TTL 기반 인메모리 응답 캐시.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::CacheKey;

/// 기본 TTL (60초).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// 캐시 항목.
#[derive(Debug, Clone)]
struct CacheEntry {
    /// 업스트림에서 마지막으로 받은 응답 본문
    payload: Value,
    /// 저장 시각
    stored_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// 프록시 응답 캐시.
///
/// 만료되지 않은 항목만 반환합니다. 만료된 항목은 조회 시 삭제하지 않고
/// [`purge_expired`](Self::purge_expired)에서 정리합니다.
///
/// 같은 키에 대한 동시 미스는 병합하지 않으며, 마지막 `set`이 남습니다.
#[derive(Clone)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<CacheKey, CacheEntry>>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 신선한 항목의 본문 반환.
    pub async fn get(&self, key: &CacheKey) -> Option<Value> {
        let entries = self.entries.read().await;
        let now = Instant::now();

        entries
            .get(key)
            .filter(|entry| entry.is_fresh(now, self.ttl))
            .map(|entry| entry.payload.clone())
    }

    /// 항목 저장 (기존 항목은 새 타임스탬프로 덮어씀).
    pub async fn set(&self, key: CacheKey, payload: Value) {
        let entry = CacheEntry {
            payload,
            stored_at: Instant::now(),
        };
        self.entries.write().await.insert(key, entry);
    }

    /// 만료된 항목 삭제. 삭제된 항목 수를 반환합니다.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        let before = entries.len();

        entries.retain(|_, entry| entry.is_fresh(now, self.ttl));
        before - entries.len()
    }

    /// 저장된 항목 수 (만료 항목 포함).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
