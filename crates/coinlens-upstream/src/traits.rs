//! 업스트림 제공자 trait.
//!
//! API 서버는 구체 클라이언트가 아닌 이 trait에 의존하므로,
//! 테스트에서 호출 횟수를 세는 mock으로 교체할 수 있습니다.

use async_trait::async_trait;
use serde_json::Value;

use crate::contentful::AssetContent;
use crate::error::UpstreamResult;

/// 시세 데이터 제공자.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 제공자 이름 (로깅 및 메트릭용)
    fn name(&self) -> &str;

    /// 시가총액 내림차순 상위 자산 목록 (페이지 크기 10).
    async fn top_assets(&self) -> UpstreamResult<Value>;

    /// 단일 자산 상세 정보.
    async fn asset_detail(&self, id: &str) -> UpstreamResult<Value>;

    /// 과거 가격 시계열.
    ///
    /// `vs_currency`, `days`는 검증 없이 그대로 전달되며, 없으면 쿼리에서 생략됩니다.
    async fn market_chart(
        &self,
        id: &str,
        vs_currency: Option<&str>,
        days: Option<&str>,
    ) -> UpstreamResult<Value>;
}

/// 자산 설명 및 용어집 콘텐츠 제공자.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// 제공자 이름 (로깅 및 메트릭용)
    fn name(&self) -> &str;

    /// 자산별 설명 콘텐츠. 등록된 항목이 없으면 `None`.
    async fn asset_content(&self, id: &str) -> UpstreamResult<Option<AssetContent>>;

    /// 용어집 항목 (용어 알파벳순).
    async fn glossary_terms(&self) -> UpstreamResult<Vec<Value>>;
}
