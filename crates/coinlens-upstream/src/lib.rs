//! 외부 데이터 제공자 연결.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - MarketDataProvider / ContentProvider trait: 업스트림 인터페이스
//! - CoinGecko 시세 클라이언트
//! - Contentful 콘텐츠 클라이언트
//! - 재시도 및 에러 분류

mod http;

pub mod coingecko;
pub mod contentful;
pub mod error;
pub mod retry;
pub mod traits;

pub use coingecko::{CoinGeckoClient, CoinGeckoConfig};
pub use contentful::{AssetContent, ContentfulClient, ContentfulConfig};
pub use error::*;
pub use retry::{with_retry, RetryConfig};
pub use traits::*;
