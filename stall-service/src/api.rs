use crate::auth::{Caller, JwtVerifier, ADMIN_ROLES, READ_ROLES, WRITE_ROLES};
use crate::domain::{NewStall, Page, PageRequest, Sort, Stall, StallChanges, StallFilter, MAX_PAGE_SIZE};
use crate::error::StallError;
use crate::service::StallService;
use crate::validation::Validator;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRef, Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use bigdecimal::BigDecimal;
use serde::{de, Deserialize, Deserializer};
use serde_json::value::RawValue;
use shared::{StallSize, StallStatus};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub stalls: StallService,
    pub verifier: Arc<JwtVerifier>,
}

impl FromRef<AppState> for Arc<JwtVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateStallRequest {
    pub code: Option<String>,
    pub size: Option<StallSize>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Option<BigDecimal>,
}

impl CreateStallRequest {
    pub fn validate(self) -> Result<NewStall, StallError> {
        let mut validator = Validator::new();
        let code = validator.require("code", self.code);
        let size = validator.require("size", self.size);
        let location = validator.require("location", self.location);
        let price = validator.require("price", self.price);

        if let Some(code) = &code {
            validator.check_code(code);
        }
        if let Some(location) = &location {
            validator.check_location(location);
        }
        if let Some(price) = &price {
            validator.check_price(price);
        }
        validator.finish()?;

        match (code, size, location, price) {
            (Some(code), Some(size), Some(location), Some(price)) => Ok(NewStall {
                code,
                size,
                location,
                price: price.with_scale(2),
            }),
            _ => Err(StallError::MalformedRequest(
                "Incomplete stall payload".to_string(),
            )),
        }
    }
}

/// Partial update; omitted fields keep their stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateStallRequest {
    pub code: Option<String>,
    pub size: Option<StallSize>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "deserialize_price")]
    pub price: Option<BigDecimal>,
}

impl UpdateStallRequest {
    pub fn validate(self) -> Result<StallChanges, StallError> {
        let mut validator = Validator::new();
        if let Some(code) = &self.code {
            validator.check_code(code);
        }
        if let Some(location) = &self.location {
            validator.check_location(location);
        }
        if let Some(price) = &self.price {
            validator.check_price(price);
        }
        validator.finish()?;

        Ok(StallChanges {
            code: self.code,
            size: self.size,
            location: self.location,
            price: self.price.map(|price| price.with_scale(2)),
        })
    }
}

/// Accepts a price as a JSON number or a decimal string. Numbers are read
/// from their raw JSON text so no digits are lost to `f64` before validation.
fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<Box<RawValue>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let text = raw.get().trim();
    let number = if text.starts_with('"') {
        serde_json::from_str::<String>(text).map_err(de::Error::custom)?
    } else {
        text.to_string()
    };
    number
        .trim()
        .parse::<BigDecimal>()
        .map(Some)
        .map_err(|e| {
            de::Error::custom(format!(
                "price must be a number or a decimal string, got {}: {}",
                text, e
            ))
        })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStallsParams {
    pub status: Option<String>,
    pub stall_size: Option<String>,
    pub location: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl ListStallsParams {
    pub fn into_query(self) -> Result<(StallFilter, PageRequest), StallError> {
        let status = non_empty(self.status)
            .map(|status| status.trim().parse::<StallStatus>())
            .transpose()
            .map_err(|e| StallError::MalformedRequest(e.to_string()))?;
        let size = non_empty(self.stall_size)
            .map(|size| size.trim().parse::<StallSize>())
            .transpose()
            .map_err(|e| StallError::MalformedRequest(e.to_string()))?;
        let sort = non_empty(self.sort)
            .map(|sort| sort.parse::<Sort>())
            .transpose()
            .map_err(StallError::MalformedRequest)?
            .unwrap_or_default();

        let mut page = PageRequest {
            sort,
            ..PageRequest::default()
        };
        if let Some(number) = self.page {
            page.page = number;
        }
        if let Some(size) = self.size {
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(StallError::validation(
                    "size",
                    format!("Size must be between 1 and {}", MAX_PAGE_SIZE),
                ));
            }
            page.size = size;
        }

        let filter = StallFilter {
            status,
            size,
            location: self.location,
        };
        Ok((filter, page))
    }
}

fn malformed(rejection: impl std::fmt::Display) -> StallError {
    StallError::MalformedRequest(rejection.to_string())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/stalls", get(list_stalls).post(create_stall))
        .route("/stalls/:id", get(get_stall).put(update_stall))
        .route("/stalls/code/:code", get(get_stall_by_code))
        .route("/stalls/:id/hold", post(hold_stall))
        .route("/stalls/:id/release", post(release_stall))
        .route("/stalls/:id/reserve", post(reserve_stall))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

pub async fn list_stalls(
    caller: Caller,
    State(state): State<AppState>,
    params: Result<Query<ListStallsParams>, QueryRejection>,
) -> Result<Json<Page<Stall>>, StallError> {
    caller.authorize(READ_ROLES)?;
    let Query(params) = params.map_err(malformed)?;
    let (filter, page) = params.into_query()?;
    Ok(Json(state.stalls.list(filter, page).await?))
}

pub async fn get_stall(
    caller: Caller,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Stall>, StallError> {
    caller.authorize(READ_ROLES)?;
    let Path(id) = id.map_err(malformed)?;
    Ok(Json(state.stalls.get(id).await?))
}

pub async fn get_stall_by_code(
    caller: Caller,
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Stall>, StallError> {
    caller.authorize(READ_ROLES)?;
    Ok(Json(state.stalls.get_by_code(&code).await?))
}

pub async fn create_stall(
    caller: Caller,
    State(state): State<AppState>,
    request: Result<Json<CreateStallRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Stall>), StallError> {
    caller.authorize(ADMIN_ROLES)?;
    let Json(request) = request.map_err(malformed)?;
    let stall = state.stalls.create(request.validate()?).await?;
    Ok((StatusCode::CREATED, Json(stall)))
}

pub async fn update_stall(
    caller: Caller,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    request: Result<Json<UpdateStallRequest>, JsonRejection>,
) -> Result<Json<Stall>, StallError> {
    caller.authorize(WRITE_ROLES)?;
    let Path(id) = id.map_err(malformed)?;
    let Json(request) = request.map_err(malformed)?;
    Ok(Json(state.stalls.update(id, request.validate()?).await?))
}

pub async fn hold_stall(
    caller: Caller,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Stall>, StallError> {
    caller.authorize(WRITE_ROLES)?;
    let Path(id) = id.map_err(malformed)?;
    Ok(Json(state.stalls.hold(id).await?))
}

pub async fn release_stall(
    caller: Caller,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Stall>, StallError> {
    caller.authorize(WRITE_ROLES)?;
    let Path(id) = id.map_err(malformed)?;
    Ok(Json(state.stalls.release(id).await?))
}

pub async fn reserve_stall(
    caller: Caller,
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Stall>, StallError> {
    caller.authorize(WRITE_ROLES)?;
    let Path(id) = id.map_err(malformed)?;
    Ok(Json(state.stalls.reserve(id).await?))
}

pub async fn health_check() -> &'static str {
    "OK"
}
