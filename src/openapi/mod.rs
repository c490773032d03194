use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FreightFlow API",
        version = "0.3.0",
        description = r#"
# FreightFlow Shipment Tracking API

An API for tracking freight shipments through their lifecycle, from creation
to delivery, with a full audit ledger per shipment.

## Features

- **Shipment Lifecycle**: awaiting_scheduling, scheduled, awaiting_loading, loaded, in_transit, delivered, with cancellation, restore and rebilling branches
- **Audit Ledger**: every state change appends a timestamped, attributed history entry
- **Pendency Dashboard**: derived detection of missing dates and overdue shipments
- **Logistics Calendar**: loading and delivery dates projected as calendar events
- **Carrier Registry**: reference data with name snapshots on shipments

## Error Handling

The API uses consistent error response formats with appropriate HTTP status codes:

```json
{
  "error": "Conflict",
  "message": "Invalid status transition: cannot cancel a shipment in terminal status 'delivered'",
  "timestamp": "2025-03-01T00:00:00Z"
}
```

## Pagination

The shipment list supports pagination with the following query parameters:
- `page`: Page number (default: 1)
- `limit`: Items per page (default: 20, max: 100)
- `search`: Case-insensitive term matched on shipment number, invoice number and client name
        "#,
        contact(
            name = "FreightFlow Maintainers",
            email = "support@freightflow.example"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "https://api.freightflow.example", description = "Production server"),
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "shipments", description = "Shipment lifecycle and audit ledger endpoints"),
        (name = "carriers", description = "Carrier registry endpoints"),
        (name = "pendencies", description = "Pendency dashboard endpoints"),
        (name = "schedule", description = "Logistics calendar endpoints")
    ),
    paths(
        // Shipments
        crate::handlers::shipments::list_shipments,
        crate::handlers::shipments::list_cancelled,
        crate::handlers::shipments::get_shipment,
        crate::handlers::shipments::get_history,
        crate::handlers::shipments::create_shipment,
        crate::handlers::shipments::schedule_delivery,
        crate::handlers::shipments::schedule_loading,
        crate::handlers::shipments::mark_loaded,
        crate::handlers::shipments::mark_delivered,
        crate::handlers::shipments::cancel_shipment,
        crate::handlers::shipments::restore_shipment,
        crate::handlers::shipments::rebill_shipment,
        crate::handlers::shipments::assign_carrier,
        crate::handlers::shipments::set_loading_type,
        crate::handlers::shipments::confirm_label_created,
        crate::handlers::shipments::confirm_label_received,
        crate::handlers::shipments::update_shipment,
        crate::handlers::shipments::delete_shipment,

        // Carriers
        crate::handlers::carriers::list_carriers,
        crate::handlers::carriers::get_carrier,
        crate::handlers::carriers::create_carrier,
        crate::handlers::carriers::update_carrier,
        crate::handlers::carriers::delete_carrier,

        // Pendencies
        crate::handlers::pendencies::list_pendencies,
        crate::handlers::pendencies::pendency_summary,

        // Schedule
        crate::handlers::schedule::list_events,
        crate::handlers::schedule::list_alerts,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,

            // Shipment types
            crate::handlers::shipments::ShipmentSummary,
            crate::handlers::shipments::ShipmentChangeResponse,
            crate::handlers::shipments::RebillResponse,
            crate::handlers::shipments::HistoryEntryResponse,
            crate::handlers::shipments::CancelledShipmentResponse,
            crate::handlers::shipments::CreateShipmentRequest,
            crate::handlers::shipments::ScheduleDeliveryRequest,
            crate::handlers::shipments::ScheduleLoadingRequest,
            crate::handlers::shipments::CancelShipmentRequest,
            crate::handlers::shipments::RebillShipmentRequest,
            crate::handlers::shipments::AssignCarrierRequest,
            crate::handlers::shipments::SetLoadingTypeRequest,
            crate::handlers::shipments::UpdateShipmentRequest,
            crate::handlers::shipments::ActorRequest,

            // Carrier types
            crate::handlers::carriers::CarrierResponse,
            crate::handlers::carriers::CreateCarrierRequest,
            crate::handlers::carriers::UpdateCarrierRequest,

            // Pendency types
            crate::handlers::pendencies::PendencyResponse,
            crate::handlers::pendencies::PendencyCountResponse,
            crate::handlers::pendencies::PendencySummaryResponse,

            // Schedule types
            crate::handlers::schedule::ScheduleEventResponse,
            crate::handlers::schedule::ScheduleAlertsResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
