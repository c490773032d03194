use crate::{
    errors::ServiceError,
    handlers::shipments::ShipmentSummary,
    services::pendencies::{Pendency, PendencyFilter, PendencyKind, PendencySummary},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PendencyListQuery {
    /// Single pendency kind filter (snake_case label)
    pub kind: Option<String>,
    /// Exact carrier name filter
    pub carrier: Option<String>,
    /// Only shipments with no carrier assigned yet
    pub without_carrier: Option<bool>,
    /// Case-insensitive match on shipment number, invoice number or client
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendencyResponse {
    pub shipment: ShipmentSummary,
    /// Pendency kind (delivery_overdue, loading_overdue, missing_delivery_date, missing_loading_date, missing_scheduling)
    #[schema(example = "delivery_overdue")]
    pub kind: String,
    /// Sort rank, 1 is the most critical
    #[schema(example = 1)]
    pub severity: u8,
    /// Human-readable kind label
    #[schema(example = "Delivery overdue")]
    pub label: String,
}

impl From<Pendency> for PendencyResponse {
    fn from(pendency: Pendency) -> Self {
        Self {
            shipment: pendency.shipment.into(),
            kind: pendency.kind.as_str().to_string(),
            severity: pendency.kind.severity(),
            label: pendency.kind.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendencyCountResponse {
    #[schema(example = "missing_scheduling")]
    pub kind: String,
    pub count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PendencySummaryResponse {
    /// Count per kind, most critical kind first, zeroes included
    pub counts: Vec<PendencyCountResponse>,
    /// Shipments currently carrying the late badge
    pub late_shipments: usize,
}

impl From<PendencySummary> for PendencySummaryResponse {
    fn from(summary: PendencySummary) -> Self {
        Self {
            counts: summary
                .counts
                .into_iter()
                .map(|c| PendencyCountResponse {
                    kind: c.kind.as_str().to_string(),
                    count: c.count,
                })
                .collect(),
            late_shipments: summary.late_shipments,
        }
    }
}

fn parse_pendency_kind(value: &str) -> Result<PendencyKind, ServiceError> {
    let kind = match value.to_ascii_lowercase().as_str() {
        "delivery_overdue" => PendencyKind::DeliveryOverdue,
        "loading_overdue" => PendencyKind::LoadingOverdue,
        "missing_delivery_date" => PendencyKind::MissingDeliveryDate,
        "missing_loading_date" => PendencyKind::MissingLoadingDate,
        "missing_scheduling" => PendencyKind::MissingScheduling,
        other => {
            return Err(ServiceError::InvalidInput(format!(
                "Unknown pendency kind '{}'",
                other
            )))
        }
    };
    Ok(kind)
}

#[utoipa::path(
    get,
    path = "/api/v1/pendencies",
    params(PendencyListQuery),
    responses(
        (status = 200, description = "Pendencies listed, most critical first", body = ApiResponse<Vec<PendencyResponse>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "pendencies"
)]
pub async fn list_pendencies(
    State(state): State<AppState>,
    Query(query): Query<PendencyListQuery>,
) -> ApiResult<Vec<PendencyResponse>> {
    let filter = PendencyFilter {
        kind: query.kind.as_deref().map(parse_pendency_kind).transpose()?,
        carrier_name: query.carrier,
        without_carrier: query.without_carrier.unwrap_or(false),
        search: query.search,
    };

    let pendencies = state.pendency_service().list(&filter).await?;
    let items: Vec<PendencyResponse> =
        pendencies.into_iter().map(PendencyResponse::from).collect();
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/pendencies/summary",
    responses(
        (status = 200, description = "Pendency counts per kind", body = ApiResponse<PendencySummaryResponse>)
    ),
    tag = "pendencies"
)]
pub async fn pendency_summary(
    State(state): State<AppState>,
) -> ApiResult<PendencySummaryResponse> {
    let summary = state.pendency_service().summary().await?;
    Ok(Json(ApiResponse::success(summary.into())))
}

pub fn pendency_routes() -> Router<AppState> {
    Router::new()
        .route("/pendencies", get(list_pendencies))
        .route("/pendencies/summary", get(pendency_summary))
}
