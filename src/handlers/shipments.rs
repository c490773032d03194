use crate::{
    entities::shipment::{self, LoadingType, ShipmentStatus},
    entities::shipment_history,
    errors::ServiceError,
    services::shipments::{
        CancelledShipment, IdentityEdit, NewShipment, RebillOutcome, ShipmentChange,
        ShipmentListFilter, StatusGroup,
    },
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShipmentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Exact status filter (snake_case label)
    pub status: Option<String>,
    /// Status bucket filter: awaiting, loading, route, cancelled, rebilled
    pub group: Option<String>,
    /// Exact carrier name filter
    pub carrier: Option<String>,
    /// Only shipments with no carrier assigned yet
    pub without_carrier: Option<bool>,
    /// Case-insensitive match on shipment number, invoice number or client
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CancelledListQuery {
    /// First cancellation day included, e.g. 2025-03-01
    pub from: Option<NaiveDate>,
    /// Last cancellation day included
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
#[schema(example = json!({
    "id": "990e8400-e29b-41d4-a716-446655440000",
    "shipment_number": "RM-2045",
    "invoice_number": "NF-88231",
    "client_name": "Acme Distribuidora",
    "carrier_name": "TransLog Express",
    "status": "in_transit",
    "loading_type": "palletized",
    "scheduled_delivery_at": "2025-03-12T18:00:00Z",
    "scheduled_loading_at": "2025-03-10T08:00:00Z",
    "loaded_at": "2025-03-10T08:40:00Z",
    "dispatched_at": "2025-03-10T08:40:00Z",
    "label_created": true,
    "label_created_at": "2025-03-09T15:00:00Z",
    "label_received": false,
    "label_received_at": null,
    "notes": null,
    "late": false,
    "created_at": "2025-03-08T10:30:00Z",
    "updated_at": "2025-03-10T08:40:00Z"
}))]
pub struct ShipmentSummary {
    /// Shipment UUID
    pub id: Uuid,
    /// Business shipment number
    #[schema(example = "RM-2045")]
    pub shipment_number: String,
    /// Invoice/note number
    #[schema(example = "NF-88231")]
    pub invoice_number: String,
    /// Client name
    #[schema(example = "Acme Distribuidora")]
    pub client_name: String,
    /// Assigned carrier name snapshot, null until assigned
    pub carrier_name: Option<String>,
    /// Lifecycle status (awaiting_scheduling, scheduled, awaiting_loading, loaded, in_transit, delivered, cancelled, rebilled)
    #[schema(example = "in_transit")]
    pub status: String,
    /// Loading type (palletized, loose), null until set
    pub loading_type: Option<String>,
    pub scheduled_delivery_at: Option<DateTime<Utc>>,
    pub scheduled_loading_at: Option<DateTime<Utc>>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,
    pub label_created: bool,
    pub label_created_at: Option<DateTime<Utc>>,
    pub label_received: bool,
    pub label_received_at: Option<DateTime<Utc>>,
    /// Free notes; holds the cancellation reason for cancelled shipments
    pub notes: Option<String>,
    /// Delivery date has passed and the shipment is still open
    pub late: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<shipment::Model> for ShipmentSummary {
    fn from(model: shipment::Model) -> Self {
        let late = model.is_late(Utc::now());
        Self {
            id: model.id,
            shipment_number: model.shipment_number,
            invoice_number: model.invoice_number,
            client_name: model.client_name,
            carrier_name: model.carrier_name,
            status: model.status.as_str().to_string(),
            loading_type: model.loading_type.map(|lt| lt.as_str().to_string()),
            scheduled_delivery_at: model.scheduled_delivery_at,
            scheduled_loading_at: model.scheduled_loading_at,
            loaded_at: model.loaded_at,
            dispatched_at: model.dispatched_at,
            label_created: model.label_created,
            label_created_at: model.label_created_at,
            label_received: model.label_received,
            label_received_at: model.label_received_at,
            notes: model.notes,
            late,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A state change plus whether its audit entry made it into the ledger.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShipmentChangeResponse {
    pub shipment: ShipmentSummary,
    /// False when the audit entry could not be written; the change itself
    /// is committed either way
    pub history_recorded: bool,
}

impl From<ShipmentChange> for ShipmentChangeResponse {
    fn from(change: ShipmentChange) -> Self {
        Self {
            shipment: change.shipment.into(),
            history_recorded: change.history_recorded,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RebillResponse {
    pub original: ShipmentSummary,
    pub replacement: ShipmentSummary,
    pub history_recorded: bool,
}

impl From<RebillOutcome> for RebillResponse {
    fn from(outcome: RebillOutcome) -> Self {
        Self {
            original: outcome.original.into(),
            replacement: outcome.replacement.into(),
            history_recorded: outcome.history_recorded,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntryResponse {
    pub id: Uuid,
    /// Event label, either a lifecycle status or a micro-event such as label_created
    #[schema(example = "scheduled")]
    pub status: String,
    #[schema(example = "Delivery scheduled for 2025-03-12 18:00")]
    pub description: String,
    #[schema(example = "maria.santos")]
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl From<shipment_history::Model> for HistoryEntryResponse {
    fn from(model: shipment_history::Model) -> Self {
        Self {
            id: model.id,
            status: model.status,
            description: model.description,
            actor: model.actor,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelledShipmentResponse {
    pub shipment: ShipmentSummary,
    /// When the cancellation was recorded, from the audit ledger
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Who cancelled it, from the audit ledger
    pub cancelled_by: Option<String>,
}

impl From<CancelledShipment> for CancelledShipmentResponse {
    fn from(cancelled: CancelledShipment) -> Self {
        Self {
            shipment: cancelled.shipment.into(),
            cancelled_at: cancelled.cancelled_at,
            cancelled_by: cancelled.cancelled_by,
        }
    }
}

fn default_actor() -> String {
    "system".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "shipment_number": "RM-2045",
    "invoice_number": "NF-88231",
    "client_name": "Acme Distribuidora",
    "carrier_name": "TransLog Express",
    "actor": "maria.santos"
}))]
pub struct CreateShipmentRequest {
    #[validate(length(min = 1, max = 50))]
    pub shipment_number: String,
    #[validate(length(min = 1, max = 50))]
    pub invoice_number: String,
    #[validate(length(min = 1, max = 120))]
    pub client_name: String,
    pub carrier_name: Option<String>,
    /// Who is performing the action; defaults to "system"
    #[serde(default = "default_actor")]
    #[validate(length(min = 1, max = 80))]
    pub actor: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScheduleDeliveryRequest {
    /// Delivery date and time being booked
    pub scheduled_for: DateTime<Utc>,
    #[serde(default = "default_actor")]
    #[validate(length(min = 1, max = 80))]
    pub actor: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScheduleLoadingRequest {
    /// Loading date and time being booked
    pub scheduled_for: DateTime<Utc>,
    #[serde(default = "default_actor")]
    #[validate(length(min = 1, max = 80))]
    pub actor: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CancelShipmentRequest {
    /// Reason stored on the shipment and in the ledger
    #[validate(length(min = 1))]
    pub reason: String,
    #[serde(default = "default_actor")]
    #[validate(length(min = 1, max = 80))]
    pub actor: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RebillShipmentRequest {
    #[validate(length(min = 1, max = 50))]
    pub new_shipment_number: String,
    #[validate(length(min = 1, max = 50))]
    pub new_invoice_number: String,
    #[serde(default = "default_actor")]
    #[validate(length(min = 1, max = 80))]
    pub actor: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignCarrierRequest {
    /// Carrier to snapshot onto the shipment
    pub carrier_id: Uuid,
    #[serde(default = "default_actor")]
    #[validate(length(min = 1, max = 80))]
    pub actor: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SetLoadingTypeRequest {
    /// palletized or loose
    #[validate(length(min = 1))]
    pub loading_type: String,
    #[serde(default = "default_actor")]
    #[validate(length(min = 1, max = 80))]
    pub actor: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateShipmentRequest {
    #[validate(length(min = 1, max = 50))]
    pub shipment_number: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub invoice_number: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub client_name: Option<String>,
    #[serde(default = "default_actor")]
    #[validate(length(min = 1, max = 80))]
    pub actor: String,
}

/// Body for transitions that need nothing but the acting identity.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ActorRequest {
    #[serde(default = "default_actor")]
    #[validate(length(min = 1, max = 80))]
    pub actor: String,
}

/// The body is optional on bare transitions; a missing one acts as "system".
fn actor_from(payload: Option<Json<ActorRequest>>) -> Result<String, ServiceError> {
    match payload {
        Some(Json(request)) => {
            request
                .validate()
                .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
            Ok(request.actor)
        }
        None => Ok(default_actor()),
    }
}

fn parse_status(value: &str) -> Result<ShipmentStatus, ServiceError> {
    let status = match value.to_ascii_lowercase().as_str() {
        "awaiting_scheduling" => ShipmentStatus::AwaitingScheduling,
        "scheduled" => ShipmentStatus::Scheduled,
        "awaiting_loading" => ShipmentStatus::AwaitingLoading,
        "loaded" => ShipmentStatus::Loaded,
        "in_transit" => ShipmentStatus::InTransit,
        "delivered" => ShipmentStatus::Delivered,
        "cancelled" => ShipmentStatus::Cancelled,
        "rebilled" => ShipmentStatus::Rebilled,
        other => {
            return Err(ServiceError::InvalidInput(format!(
                "Unknown status '{}'",
                other
            )))
        }
    };
    Ok(status)
}

fn parse_status_group(value: &str) -> Result<StatusGroup, ServiceError> {
    let group = match value.to_ascii_lowercase().as_str() {
        "awaiting" => StatusGroup::Awaiting,
        "loading" => StatusGroup::Loading,
        "route" => StatusGroup::Route,
        "cancelled" => StatusGroup::Cancelled,
        "rebilled" => StatusGroup::Rebilled,
        other => {
            return Err(ServiceError::InvalidInput(format!(
                "Unknown status group '{}'",
                other
            )))
        }
    };
    Ok(group)
}

fn parse_loading_type(value: &str) -> Result<LoadingType, ServiceError> {
    let loading_type = match value.to_ascii_lowercase().as_str() {
        "palletized" => LoadingType::Palletized,
        "loose" => LoadingType::Loose,
        other => {
            return Err(ServiceError::InvalidInput(format!(
                "Unknown loading type '{}'",
                other
            )))
        }
    };
    Ok(loading_type)
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments",
    params(ShipmentListQuery),
    responses(
        (status = 200, description = "Shipments listed", body = ApiResponse<PaginatedResponse<ShipmentSummary>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    Query(query): Query<ShipmentListQuery>,
) -> ApiResult<PaginatedResponse<ShipmentSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(state.config.api_default_page_size as u64)
        .clamp(1, state.config.api_max_page_size as u64);

    let filter = ShipmentListFilter {
        status: query.status.as_deref().map(parse_status).transpose()?,
        group: query.group.as_deref().map(parse_status_group).transpose()?,
        carrier_name: query.carrier,
        without_carrier: query.without_carrier.unwrap_or(false),
        search: query.search,
    };

    let (records, total) = state
        .shipment_service()
        .list_shipments(&filter, page, limit)
        .await?;
    let items: Vec<ShipmentSummary> = records.into_iter().map(ShipmentSummary::from).collect();
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/cancelled",
    params(CancelledListQuery),
    responses(
        (status = 200, description = "Cancelled shipments listed", body = ApiResponse<Vec<CancelledShipmentResponse>>)
    ),
    tag = "shipments"
)]
pub async fn list_cancelled(
    State(state): State<AppState>,
    Query(query): Query<CancelledListQuery>,
) -> ApiResult<Vec<CancelledShipmentResponse>> {
    let from = query
        .from
        .map(|day| day.and_time(chrono::NaiveTime::MIN).and_utc());
    let to = query
        .to
        .and_then(|day| day.and_hms_opt(23, 59, 59))
        .map(|end| end.and_utc());

    let cancelled = state.shipment_service().list_cancelled(from, to).await?;
    let items: Vec<CancelledShipmentResponse> = cancelled
        .into_iter()
        .map(CancelledShipmentResponse::from)
        .collect();

    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/:id",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment fetched", body = ApiResponse<ShipmentSummary>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<ShipmentSummary> {
    let model = state.shipment_service().get_shipment(id).await?;
    Ok(Json(ApiResponse::success(ShipmentSummary::from(model))))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/:id/history",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "History listed, newest first", body = ApiResponse<Vec<HistoryEntryResponse>>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<HistoryEntryResponse>> {
    let entries = state.shipment_service().get_history(id).await?;
    let items: Vec<HistoryEntryResponse> =
        entries.into_iter().map(HistoryEntryResponse::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments",
    request_body = CreateShipmentRequest,
    responses(
        (status = 200, description = "Shipment created", body = ApiResponse<ShipmentChangeResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    Json(payload): Json<CreateShipmentRequest>,
) -> ApiResult<ShipmentChangeResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let input = NewShipment {
        shipment_number: payload.shipment_number,
        invoice_number: payload.invoice_number,
        client_name: payload.client_name,
        carrier_name: payload.carrier_name,
    };
    let change = state
        .shipment_service()
        .create_shipment(input, &payload.actor)
        .await?;

    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/schedule-delivery",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = ScheduleDeliveryRequest,
    responses(
        (status = 200, description = "Delivery scheduled", body = ApiResponse<ShipmentChangeResponse>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn schedule_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScheduleDeliveryRequest>,
) -> ApiResult<ShipmentChangeResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let change = state
        .shipment_service()
        .schedule_delivery(id, payload.scheduled_for, &payload.actor)
        .await?;
    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/schedule-loading",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = ScheduleLoadingRequest,
    responses(
        (status = 200, description = "Loading scheduled", body = ApiResponse<ShipmentChangeResponse>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn schedule_loading(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ScheduleLoadingRequest>,
) -> ApiResult<ShipmentChangeResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let change = state
        .shipment_service()
        .schedule_loading(id, payload.scheduled_for, &payload.actor)
        .await?;
    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/load",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body(content = ActorRequest, description = "Optional acting identity"),
    responses(
        (status = 200, description = "Shipment loaded and in transit", body = ApiResponse<ShipmentChangeResponse>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn mark_loaded(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ActorRequest>>,
) -> ApiResult<ShipmentChangeResponse> {
    let actor = actor_from(payload)?;
    let change = state.shipment_service().mark_loaded(id, &actor).await?;
    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/deliver",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body(content = ActorRequest, description = "Optional acting identity"),
    responses(
        (status = 200, description = "Delivery confirmed", body = ApiResponse<ShipmentChangeResponse>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn mark_delivered(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ActorRequest>>,
) -> ApiResult<ShipmentChangeResponse> {
    let actor = actor_from(payload)?;
    let change = state.shipment_service().mark_delivered(id, &actor).await?;
    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/cancel",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = CancelShipmentRequest,
    responses(
        (status = 200, description = "Shipment cancelled", body = ApiResponse<ShipmentChangeResponse>),
        (status = 400, description = "Missing reason", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn cancel_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelShipmentRequest>,
) -> ApiResult<ShipmentChangeResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let change = state
        .shipment_service()
        .cancel_shipment(id, &payload.reason, &payload.actor)
        .await?;
    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/restore",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body(content = ActorRequest, description = "Optional acting identity"),
    responses(
        (status = 200, description = "Shipment restored to awaiting_scheduling", body = ApiResponse<ShipmentChangeResponse>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Only cancelled shipments can be restored", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn restore_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ActorRequest>>,
) -> ApiResult<ShipmentChangeResponse> {
    let actor = actor_from(payload)?;
    let change = state.shipment_service().restore_shipment(id, &actor).await?;
    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/rebill",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = RebillShipmentRequest,
    responses(
        (status = 200, description = "Shipment rebilled into a replacement", body = ApiResponse<RebillResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn rebill_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RebillShipmentRequest>,
) -> ApiResult<RebillResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let outcome = state
        .shipment_service()
        .rebill_shipment(
            id,
            &payload.new_shipment_number,
            &payload.new_invoice_number,
            &payload.actor,
        )
        .await?;
    Ok(Json(ApiResponse::success(outcome.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/carrier",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = AssignCarrierRequest,
    responses(
        (status = 200, description = "Carrier assigned", body = ApiResponse<ShipmentChangeResponse>),
        (status = 404, description = "Shipment or carrier not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn assign_carrier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignCarrierRequest>,
) -> ApiResult<ShipmentChangeResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let change = state
        .shipment_service()
        .assign_carrier(id, payload.carrier_id, &payload.actor)
        .await?;
    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/loading-type",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = SetLoadingTypeRequest,
    responses(
        (status = 200, description = "Loading type set", body = ApiResponse<ShipmentChangeResponse>),
        (status = 400, description = "Unknown loading type", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn set_loading_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetLoadingTypeRequest>,
) -> ApiResult<ShipmentChangeResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let loading_type = parse_loading_type(&payload.loading_type)?;
    let change = state
        .shipment_service()
        .set_loading_type(id, loading_type, &payload.actor)
        .await?;
    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/label/created",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body(content = ActorRequest, description = "Optional acting identity"),
    responses(
        (status = 200, description = "Label creation confirmed", body = ApiResponse<ShipmentChangeResponse>),
        (status = 400, description = "Label already confirmed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn confirm_label_created(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ActorRequest>>,
) -> ApiResult<ShipmentChangeResponse> {
    let actor = actor_from(payload)?;
    let change = state
        .shipment_service()
        .confirm_label_created(id, &actor)
        .await?;
    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/label/received",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body(content = ActorRequest, description = "Optional acting identity"),
    responses(
        (status = 200, description = "Label receipt confirmed", body = ApiResponse<ShipmentChangeResponse>),
        (status = 400, description = "Label already confirmed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn confirm_label_received(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<ActorRequest>>,
) -> ApiResult<ShipmentChangeResponse> {
    let actor = actor_from(payload)?;
    let change = state
        .shipment_service()
        .confirm_label_received(id, &actor)
        .await?;
    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    put,
    path = "/api/v1/shipments/:id",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    request_body = UpdateShipmentRequest,
    responses(
        (status = 200, description = "Shipment updated", body = ApiResponse<ShipmentChangeResponse>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Shipment already closed", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn update_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateShipmentRequest>,
) -> ApiResult<ShipmentChangeResponse> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let edit = IdentityEdit {
        shipment_number: payload.shipment_number,
        invoice_number: payload.invoice_number,
        client_name: payload.client_name,
    };
    let change = state
        .shipment_service()
        .update_identity(id, edit, &payload.actor)
        .await?;
    Ok(Json(ApiResponse::success(change.into())))
}

#[utoipa::path(
    delete,
    path = "/api/v1/shipments/:id",
    params(("id" = Uuid, Path, description = "Shipment ID")),
    responses(
        (status = 200, description = "Shipment and its history deleted", body = ApiResponse<serde_json::Value>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn delete_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.shipment_service().delete_shipment(id).await?;
    Ok(Json(ApiResponse::success(json!({
        "id": id,
        "deleted": true
    }))))
}

pub fn shipment_routes() -> Router<AppState> {
    Router::new()
        .route("/shipments", get(list_shipments).post(create_shipment))
        .route("/shipments/cancelled", get(list_cancelled))
        .route(
            "/shipments/:id",
            get(get_shipment).put(update_shipment).delete(delete_shipment),
        )
        .route("/shipments/:id/history", get(get_history))
        .route("/shipments/:id/schedule-delivery", post(schedule_delivery))
        .route("/shipments/:id/schedule-loading", post(schedule_loading))
        .route("/shipments/:id/load", post(mark_loaded))
        .route("/shipments/:id/deliver", post(mark_delivered))
        .route("/shipments/:id/cancel", post(cancel_shipment))
        .route("/shipments/:id/restore", post(restore_shipment))
        .route("/shipments/:id/rebill", post(rebill_shipment))
        .route("/shipments/:id/carrier", post(assign_carrier))
        .route("/shipments/:id/loading-type", post(set_loading_type))
        .route("/shipments/:id/label/created", post(confirm_label_created))
        .route("/shipments/:id/label/received", post(confirm_label_received))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("scheduled", ShipmentStatus::Scheduled)]
    #[case("IN_TRANSIT", ShipmentStatus::InTransit)]
    #[case("rebilled", ShipmentStatus::Rebilled)]
    fn parse_status_accepts_known_labels(#[case] input: &str, #[case] expected: ShipmentStatus) {
        assert_eq!(parse_status(input).unwrap(), expected);
    }

    #[rstest]
    #[case("bogus")]
    #[case("")]
    fn parse_status_rejects_unknown_labels(#[case] input: &str) {
        assert!(matches!(
            parse_status(input),
            Err(ServiceError::InvalidInput(_))
        ));
    }

    #[rstest]
    #[case("awaiting", &[ShipmentStatus::AwaitingScheduling, ShipmentStatus::Scheduled])]
    #[case("loading", &[ShipmentStatus::AwaitingLoading, ShipmentStatus::Loaded])]
    #[case("route", &[ShipmentStatus::InTransit, ShipmentStatus::Delivered])]
    #[case("cancelled", &[ShipmentStatus::Cancelled])]
    #[case("rebilled", &[ShipmentStatus::Rebilled])]
    fn parse_status_group_maps_to_its_statuses(
        #[case] input: &str,
        #[case] expected: &[ShipmentStatus],
    ) {
        assert_eq!(parse_status_group(input).unwrap().statuses(), expected);
    }

    #[test]
    fn parse_loading_type_is_case_insensitive() {
        assert_eq!(
            parse_loading_type("Palletized").unwrap(),
            LoadingType::Palletized
        );
        assert_eq!(parse_loading_type("LOOSE").unwrap(), LoadingType::Loose);
        assert!(parse_loading_type("sideways").is_err());
    }

    #[test]
    fn a_missing_actor_body_falls_back_to_system() {
        assert_eq!(actor_from(None).unwrap(), "system");

        let provided = actor_from(Some(Json(ActorRequest {
            actor: "maria.santos".to_string(),
        })))
        .unwrap();
        assert_eq!(provided, "maria.santos");

        let blank = actor_from(Some(Json(ActorRequest {
            actor: String::new(),
        })));
        assert!(blank.is_err());
    }
}
