use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle status of a shipment.
///
/// `Delivered`, `Cancelled` and `Rebilled` are terminal: once reached, no
/// further mutation is accepted except restoring a cancelled shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "awaiting_scheduling")]
    AwaitingScheduling,
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "awaiting_loading")]
    AwaitingLoading,
    #[sea_orm(string_value = "loaded")]
    Loaded,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "rebilled")]
    Rebilled,
}

impl ShipmentStatus {
    /// Stable snake_case label, identical to the stored value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShipmentStatus::AwaitingScheduling => "awaiting_scheduling",
            ShipmentStatus::Scheduled => "scheduled",
            ShipmentStatus::AwaitingLoading => "awaiting_loading",
            ShipmentStatus::Loaded => "loaded",
            ShipmentStatus::InTransit => "in_transit",
            ShipmentStatus::Delivered => "delivered",
            ShipmentStatus::Cancelled => "cancelled",
            ShipmentStatus::Rebilled => "rebilled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ShipmentStatus::Delivered | ShipmentStatus::Cancelled | ShipmentStatus::Rebilled
        )
    }
}

impl std::fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ShipmentStatus::AwaitingScheduling => "Awaiting scheduling",
            ShipmentStatus::Scheduled => "Scheduled",
            ShipmentStatus::AwaitingLoading => "Awaiting loading",
            ShipmentStatus::Loaded => "Loaded",
            ShipmentStatus::InTransit => "In transit",
            ShipmentStatus::Delivered => "Delivered",
            ShipmentStatus::Cancelled => "Cancelled",
            ShipmentStatus::Rebilled => "Rebilled",
        };
        write!(f, "{}", label)
    }
}

/// How the freight is loaded onto the truck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum LoadingType {
    #[sea_orm(string_value = "palletized")]
    Palletized,
    #[sea_orm(string_value = "loose")]
    Loose,
}

impl LoadingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadingType::Palletized => "palletized",
            LoadingType::Loose => "loose",
        }
    }
}

impl std::fmt::Display for LoadingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            LoadingType::Palletized => "Palletized",
            LoadingType::Loose => "Loose",
        };
        write!(f, "{}", label)
    }
}

/// Rejected state mutations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {operation} a shipment in terminal status '{}'", status.as_str())]
    Terminal {
        operation: &'static str,
        status: ShipmentStatus,
    },

    #[error("only cancelled shipments can be restored, current status is '{}'", status.as_str())]
    NotCancelled { status: ShipmentStatus },

    #[error("label '{label}' was already confirmed")]
    LabelAlreadyConfirmed { label: &'static str },
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Shipment number must be between 1 and 50 characters"
    ))]
    pub shipment_number: String,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Invoice number must be between 1 and 50 characters"
    ))]
    pub invoice_number: String,

    #[validate(length(
        min = 1,
        max = 120,
        message = "Client name must be between 1 and 120 characters"
    ))]
    pub client_name: String,

    /// Name snapshot of the assigned carrier. Deliberately not a foreign key:
    /// later carrier edits must not rewrite what was printed on the paperwork.
    pub carrier_name: Option<String>,

    pub status: ShipmentStatus,
    pub loading_type: Option<LoadingType>,

    pub scheduled_delivery_at: Option<DateTime<Utc>>,
    pub scheduled_loading_at: Option<DateTime<Utc>>,
    pub loaded_at: Option<DateTime<Utc>>,
    pub dispatched_at: Option<DateTime<Utc>>,

    pub label_created: bool,
    pub label_created_at: Option<DateTime<Utc>>,
    pub label_received: bool,
    pub label_received_at: Option<DateTime<Utc>>,

    /// Free text. Cancellation stores its reason here.
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shipment_history::Entity")]
    ShipmentHistory,
}

impl Related<super::shipment_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShipmentHistory.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if insert {
            let needs_id = match &active_model.id {
                ActiveValue::Set(id) | ActiveValue::Unchanged(id) => id.is_nil(),
                ActiveValue::NotSet => true,
            };
            if needs_id {
                active_model.id = Set(Uuid::new_v4());
            }
        }
        Ok(active_model)
    }
}

impl Model {
    /// Builds a fresh shipment in `awaiting_scheduling`.
    pub fn new(
        shipment_number: impl Into<String>,
        invoice_number: impl Into<String>,
        client_name: impl Into<String>,
        carrier_name: Option<String>,
    ) -> Result<Self, validator::ValidationErrors> {
        let shipment = Self {
            id: Uuid::new_v4(),
            shipment_number: shipment_number.into(),
            invoice_number: invoice_number.into(),
            client_name: client_name.into(),
            carrier_name,
            status: ShipmentStatus::AwaitingScheduling,
            loading_type: None,
            scheduled_delivery_at: None,
            scheduled_loading_at: None,
            loaded_at: None,
            dispatched_at: None,
            label_created: false,
            label_created_at: None,
            label_received: false,
            label_received_at: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        shipment.validate()?;
        Ok(shipment)
    }

    fn guard_active(&self, operation: &'static str) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::Terminal {
                operation,
                status: self.status,
            });
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    /// Books the delivery date and moves the shipment to `scheduled`.
    pub fn schedule_delivery(&mut self, when: DateTime<Utc>) -> Result<(), TransitionError> {
        self.guard_active("schedule delivery for")?;
        self.scheduled_delivery_at = Some(when);
        self.status = ShipmentStatus::Scheduled;
        self.touch();
        Ok(())
    }

    /// Books the loading date. The lifecycle status is left untouched.
    pub fn schedule_loading(&mut self, when: DateTime<Utc>) -> Result<(), TransitionError> {
        self.guard_active("schedule loading for")?;
        self.scheduled_loading_at = Some(when);
        self.touch();
        Ok(())
    }

    /// Records the truck as loaded and immediately out for delivery.
    pub fn mark_loaded(&mut self) -> Result<(), TransitionError> {
        self.guard_active("load")?;
        let now = Utc::now();
        self.loaded_at = Some(now);
        self.dispatched_at = Some(now);
        self.status = ShipmentStatus::InTransit;
        self.touch();
        Ok(())
    }

    pub fn mark_delivered(&mut self) -> Result<(), TransitionError> {
        self.guard_active("deliver")?;
        self.status = ShipmentStatus::Delivered;
        self.touch();
        Ok(())
    }

    /// Cancels the shipment, keeping the reason in `notes`.
    pub fn cancel(&mut self, reason: &str) -> Result<(), TransitionError> {
        self.guard_active("cancel")?;
        self.notes = Some(reason.trim().to_string());
        self.status = ShipmentStatus::Cancelled;
        self.touch();
        Ok(())
    }

    /// Closes this shipment as rebilled. The replacement shipment is created
    /// by the caller.
    pub fn mark_rebilled(&mut self) -> Result<(), TransitionError> {
        self.guard_active("rebill")?;
        self.status = ShipmentStatus::Rebilled;
        self.touch();
        Ok(())
    }

    pub fn assign_carrier(&mut self, name: &str) -> Result<(), TransitionError> {
        self.guard_active("assign a carrier to")?;
        self.carrier_name = Some(name.to_string());
        self.touch();
        Ok(())
    }

    pub fn set_loading_type(&mut self, loading_type: LoadingType) -> Result<(), TransitionError> {
        self.guard_active("set the loading type of")?;
        self.loading_type = Some(loading_type);
        self.touch();
        Ok(())
    }

    /// Reopens a cancelled shipment back into `awaiting_scheduling`.
    pub fn restore(&mut self) -> Result<(), TransitionError> {
        if self.status != ShipmentStatus::Cancelled {
            return Err(TransitionError::NotCancelled {
                status: self.status,
            });
        }
        self.status = ShipmentStatus::AwaitingScheduling;
        self.touch();
        Ok(())
    }

    pub fn confirm_label_created(&mut self) -> Result<(), TransitionError> {
        self.guard_active("confirm the label of")?;
        if self.label_created {
            return Err(TransitionError::LabelAlreadyConfirmed { label: "created" });
        }
        self.label_created = true;
        self.label_created_at = Some(Utc::now());
        self.touch();
        Ok(())
    }

    pub fn confirm_label_received(&mut self) -> Result<(), TransitionError> {
        self.guard_active("confirm the label of")?;
        if self.label_received {
            return Err(TransitionError::LabelAlreadyConfirmed { label: "received" });
        }
        self.label_received = true;
        self.label_received_at = Some(Utc::now());
        self.touch();
        Ok(())
    }

    /// Applies edits to the identifying fields and returns one human-readable
    /// diff line per field that actually changed.
    pub fn edit_identity(
        &mut self,
        shipment_number: Option<&str>,
        invoice_number: Option<&str>,
        client_name: Option<&str>,
    ) -> Result<Vec<String>, TransitionError> {
        self.guard_active("edit")?;

        let mut changes = Vec::new();
        if let Some(new) = shipment_number {
            if new != self.shipment_number {
                changes.push(format!("shipment number: {} -> {}", self.shipment_number, new));
                self.shipment_number = new.to_string();
            }
        }
        if let Some(new) = invoice_number {
            if new != self.invoice_number {
                changes.push(format!("invoice number: {} -> {}", self.invoice_number, new));
                self.invoice_number = new.to_string();
            }
        }
        if let Some(new) = client_name {
            if new != self.client_name {
                changes.push(format!("client name: {} -> {}", self.client_name, new));
                self.client_name = new.to_string();
            }
        }

        if !changes.is_empty() {
            self.touch();
        }
        Ok(changes)
    }

    /// A shipment is late when its delivery date has passed and it has not
    /// reached a terminal status. This is the single authoritative rule: the
    /// delay detector and the listing badge both use it.
    pub fn is_late(&self, now: DateTime<Utc>) -> bool {
        match self.scheduled_delivery_at {
            Some(due) => due < now && !self.status.is_terminal(),
            None => false,
        }
    }
}
