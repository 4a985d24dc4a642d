//! 캐시 키.

use std::fmt;

/// 프록시 응답 캐시 키.
///
/// 구조적 동등성으로 비교하므로 서로 다른 파라미터 조합은 충돌하지 않습니다.
/// 누락된 파라미터(`None`)와 빈 문자열(`Some("")`)도 서로 다른 키입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// 시가총액 상위 자산 목록
    TopAssets,
    /// 자산 상세
    AssetDetail { id: String },
    /// 과거 시세
    MarketChart {
        id: String,
        vs_currency: Option<String>,
        days: Option<String>,
    },
    /// 자산 설명 콘텐츠
    AssetContent { id: String },
    /// 용어집
    Glossary,
}

impl CacheKey {
    pub fn asset_detail(id: impl Into<String>) -> Self {
        CacheKey::AssetDetail { id: id.into() }
    }

    pub fn market_chart(
        id: impl Into<String>,
        vs_currency: Option<String>,
        days: Option<String>,
    ) -> Self {
        CacheKey::MarketChart {
            id: id.into(),
            vs_currency,
            days,
        }
    }

    pub fn asset_content(id: impl Into<String>) -> Self {
        CacheKey::AssetContent { id: id.into() }
    }

    /// 메트릭 라벨용 라우트 이름.
    pub fn route(&self) -> &'static str {
        match self {
            CacheKey::TopAssets => "top_assets",
            CacheKey::AssetDetail { .. } => "asset_detail",
            CacheKey::MarketChart { .. } => "market_chart",
            CacheKey::AssetContent { .. } => "asset_content",
            CacheKey::Glossary => "glossary",
        }
    }
}

/// 로그 출력용 문자열 (`top-cryptos`, `crypto-bitcoin`, `market-chart-bitcoin-usd-30`).
///
/// 누락된 값은 `none`으로 표시합니다. 조회에는 사용하지 않습니다.
impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::TopAssets => write!(f, "top-cryptos"),
            CacheKey::AssetDetail { id } => write!(f, "crypto-{}", id),
            CacheKey::MarketChart {
                id,
                vs_currency,
                days,
            } => write!(
                f,
                "market-chart-{}-{}-{}",
                id,
                vs_currency.as_deref().unwrap_or("none"),
                days.as_deref().unwrap_or("none")
            ),
            CacheKey::AssetContent { id } => write!(f, "content-{}", id),
            CacheKey::Glossary => write!(f, "glossary"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_display_format() {
        assert_eq!(CacheKey::TopAssets.to_string(), "top-cryptos");
        assert_eq!(CacheKey::asset_detail("bitcoin").to_string(), "crypto-bitcoin");
        assert_eq!(
            CacheKey::market_chart("bitcoin", Some("usd".into()), Some("30".into())).to_string(),
            "market-chart-bitcoin-usd-30"
        );
        assert_eq!(
            CacheKey::market_chart("bitcoin", None, None).to_string(),
            "market-chart-bitcoin-none-none"
        );
    }

    #[test]
    fn test_ambiguous_strings_do_not_collide() {
        // 문자열 키라면 둘 다 "market-chart-a-b-c-d"
        let a = CacheKey::market_chart("a-b", Some("c".into()), Some("d".into()));
        let b = CacheKey::market_chart("a", Some("b-c".into()), Some("d".into()));

        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a, b);
    }

    #[test]
    fn test_absent_differs_from_empty() {
        let absent = CacheKey::market_chart("bitcoin", None, Some("7".into()));
        let empty = CacheKey::market_chart("bitcoin", Some(String::new()), Some("7".into()));
        assert_ne!(absent, empty);
    }

    #[test]
    fn test_detail_and_content_keys_distinct() {
        assert_ne!(CacheKey::asset_detail("bitcoin"), CacheKey::asset_content("bitcoin"));
        assert_eq!(CacheKey::asset_detail("bitcoin").route(), "asset_detail");
    }

    fn opt_param() -> impl Strategy<Value = Option<String>> {
        prop::option::of("[a-z0-9-]{0,6}")
    }

    proptest! {
        #[test]
        fn prop_market_chart_keys_equal_iff_params_equal(
            id1 in "[a-z-]{1,8}", vs1 in opt_param(), days1 in opt_param(),
            id2 in "[a-z-]{1,8}", vs2 in opt_param(), days2 in opt_param(),
        ) {
            let same_params = id1 == id2 && vs1 == vs2 && days1 == days2;
            let k1 = CacheKey::market_chart(id1, vs1, days1);
            let k2 = CacheKey::market_chart(id2, vs2, days2);
            prop_assert_eq!(k1 == k2, same_params);
        }

        #[test]
        fn prop_identical_requests_produce_equal_keys(
            id in "[a-z-]{1,8}", vs in opt_param(), days in opt_param(),
        ) {
            prop_assert_eq!(
                CacheKey::market_chart(id.clone(), vs.clone(), days.clone()),
                CacheKey::market_chart(id, vs, days)
            );
        }
    }
}
