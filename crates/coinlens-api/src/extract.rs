//! 요청 추출기.
//!
//! axum 기본 추출기의 거절 응답은 `text/plain`이므로, 여기서 [`ApiError`]로
//! 바꿔 다른 실패와 같은 `{error, details}` JSON으로 응답합니다.

use axum::{
    extract::{FromRequestParts, Path, Query},
    http::request::Parts,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::routes::MarketChartQuery;

/// 경로 파라미터 추출기. 디코딩 실패는 400 JSON.
#[derive(Debug, Clone)]
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// 과거 시세 쿼리는 타입 검증 없이 쌍 목록으로 읽습니다.
///
/// 같은 키가 여러 번 오면 처음 값을 사용하고, 그 외 키는 무시합니다.
impl<S> FromRequestParts<S> for MarketChartQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

        Ok(MarketChartQuery::from_pairs(pairs))
    }
}

impl MarketChartQuery {
    /// 쿼리 쌍 목록에서 생성.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = Self::default();

        for (key, value) in pairs {
            let slot = match key.as_str() {
                "vs_currency" => &mut query.vs_currency,
                "days" => &mut query.days,
                _ => continue,
            };
            slot.get_or_insert(value);
        }

        query
    }
}
