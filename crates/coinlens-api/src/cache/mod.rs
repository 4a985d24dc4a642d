//! 프록시 응답 캐시.
//!
//! - [`CacheKey`]: 요청 종류와 파라미터로 구성된 타입 키
//! - [`ResponseCache`]: TTL 기반 인메모리 저장소

mod key;
mod store;

pub use key::CacheKey;
pub use store::{ResponseCache, DEFAULT_CACHE_TTL};
