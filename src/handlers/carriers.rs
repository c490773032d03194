use crate::{
    entities::carrier,
    errors::ServiceError,
    services::carriers::{CarrierUpdate, NewCarrier},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "7f0e8400-e29b-41d4-a716-446655440000",
    "name": "TransLog Express",
    "tax_id": "12.345.678/0001-90",
    "email": "operations@translog.example",
    "phone": "+55 11 4002-8922",
    "created_at": "2025-01-15T09:00:00Z"
}))]
pub struct CarrierResponse {
    pub id: Uuid,
    #[schema(example = "TransLog Express")]
    pub name: String,
    #[schema(example = "12.345.678/0001-90")]
    pub tax_id: String,
    #[schema(example = "operations@translog.example")]
    pub email: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<carrier::Model> for CarrierResponse {
    fn from(model: carrier::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            tax_id: model.tax_id,
            email: model.email,
            phone: model.phone,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "TransLog Express",
    "tax_id": "12.345.678/0001-90",
    "email": "operations@translog.example",
    "phone": "+55 11 4002-8922"
}))]
pub struct CreateCarrierRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub tax_id: String,
    #[validate(email)]
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCarrierRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub tax_id: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/carriers",
    responses(
        (status = 200, description = "Carriers listed alphabetically", body = ApiResponse<Vec<CarrierResponse>>)
    ),
    tag = "carriers"
)]
pub async fn list_carriers(State(state): State<AppState>) -> ApiResult<Vec<CarrierResponse>> {
    let carriers = state.carrier_service().list_carriers().await?;
    let items: Vec<CarrierResponse> = carriers.into_iter().map(CarrierResponse::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/carriers/:id",
    params(("id" = Uuid, Path, description = "Carrier ID")),
    responses(
        (status = 200, description = "Carrier fetched", body = ApiResponse<CarrierResponse>),
        (status = 404, description = "Carrier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "carriers"
)]
pub async fn get_carrier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CarrierResponse> {
    let model = state.carrier_service().get_carrier(id).await?;
    Ok(Json(ApiResponse::success(CarrierResponse::from(model))))
}

#[utoipa::path(
    post,
    path = "/api/v1/carriers",
    request_body = CreateCarrierRequest,
    responses(
        (status = 200, description = "Carrier registered", body = ApiResponse<CarrierResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "carriers"
)]
pub async fn create_carrier(
    State(state): State<AppState>,
    Json(payload): Json<CreateCarrierRequest>,
) -> ApiResult<CarrierResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let input = NewCarrier {
        name: payload.name,
        tax_id: payload.tax_id,
        email: payload.email,
        phone: payload.phone,
    };
    let created = state.carrier_service().create_carrier(input).await?;
    Ok(Json(ApiResponse::success(CarrierResponse::from(created))))
}

#[utoipa::path(
    put,
    path = "/api/v1/carriers/:id",
    params(("id" = Uuid, Path, description = "Carrier ID")),
    request_body = UpdateCarrierRequest,
    responses(
        (status = 200, description = "Carrier updated", body = ApiResponse<CarrierResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Carrier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "carriers"
)]
pub async fn update_carrier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCarrierRequest>,
) -> ApiResult<CarrierResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let update = CarrierUpdate {
        name: payload.name,
        tax_id: payload.tax_id,
        email: payload.email,
        phone: payload.phone,
    };
    let updated = state.carrier_service().update_carrier(id, update).await?;
    Ok(Json(ApiResponse::success(CarrierResponse::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/carriers/:id",
    params(("id" = Uuid, Path, description = "Carrier ID")),
    responses(
        (status = 200, description = "Carrier removed", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Carrier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "carriers"
)]
pub async fn delete_carrier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.carrier_service().delete_carrier(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": id,
        "deleted": true
    }))))
}

pub fn carrier_routes() -> Router<AppState> {
    Router::new()
        .route("/carriers", get(list_carriers).post(create_carrier))
        .route(
            "/carriers/:id",
            get(get_carrier).put(update_carrier).delete(delete_carrier),
        )
}
