use crate::{
    handlers::shipments::ShipmentSummary,
    services::schedule::{ScheduleAlerts, ScheduleEvent},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ScheduleQuery {
    /// First day included, e.g. 2025-03-01
    pub from: Option<NaiveDate>,
    /// Last day included
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleEventResponse {
    pub shipment: ShipmentSummary,
    /// Event kind: loading or delivery
    #[schema(example = "delivery")]
    pub kind: String,
    pub scheduled_at: DateTime<Utc>,
    /// The shipment was cancelled after this was booked
    pub cancelled: bool,
    /// The scheduled step already happened
    pub completed: bool,
}

impl From<ScheduleEvent> for ScheduleEventResponse {
    fn from(event: ScheduleEvent) -> Self {
        Self {
            shipment: event.shipment.into(),
            kind: event.kind.as_str().to_string(),
            scheduled_at: event.scheduled_at,
            cancelled: event.cancelled,
            completed: event.completed,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ScheduleAlertsResponse {
    /// Loadings booked for today and not done yet
    pub loadings_today: Vec<ShipmentSummary>,
    /// Deliveries booked for today on still-open shipments
    pub deliveries_today: Vec<ShipmentSummary>,
    /// Open shipments whose delivery day has fully passed
    pub overdue_deliveries: Vec<ShipmentSummary>,
}

impl From<ScheduleAlerts> for ScheduleAlertsResponse {
    fn from(alerts: ScheduleAlerts) -> Self {
        Self {
            loadings_today: alerts
                .loadings_today
                .into_iter()
                .map(ShipmentSummary::from)
                .collect(),
            deliveries_today: alerts
                .deliveries_today
                .into_iter()
                .map(ShipmentSummary::from)
                .collect(),
            overdue_deliveries: alerts
                .overdue_deliveries
                .into_iter()
                .map(ShipmentSummary::from)
                .collect(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/schedule/events",
    params(ScheduleQuery),
    responses(
        (status = 200, description = "Calendar events listed in chronological order", body = ApiResponse<Vec<ScheduleEventResponse>>)
    ),
    tag = "schedule"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<ScheduleQuery>,
) -> ApiResult<Vec<ScheduleEventResponse>> {
    let events = state.schedule_service().events(query.from, query.to).await?;
    let items: Vec<ScheduleEventResponse> = events
        .into_iter()
        .map(ScheduleEventResponse::from)
        .collect();
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/v1/schedule/alerts",
    responses(
        (status = 200, description = "Today's workload and missed deliveries", body = ApiResponse<ScheduleAlertsResponse>)
    ),
    tag = "schedule"
)]
pub async fn list_alerts(State(state): State<AppState>) -> ApiResult<ScheduleAlertsResponse> {
    let alerts = state.schedule_service().alerts().await?;
    Ok(Json(ApiResponse::success(alerts.into())))
}

pub fn schedule_routes() -> Router<AppState> {
    Router::new()
        .route("/schedule/events", get(list_events))
        .route("/schedule/alerts", get(list_alerts))
}
