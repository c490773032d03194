use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Append-only audit ledger of a shipment.
///
/// `status` is an event label, not a lifecycle status: micro-events such as
/// `label_created` or `carrier_assigned` land here alongside the lifecycle
/// transitions. Entries are never updated; they disappear only when their
/// shipment is deleted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "shipment_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub shipment_id: Uuid,

    #[validate(length(min = 1, max = 64, message = "Status label must not be empty"))]
    pub status: String,

    pub description: String,

    #[validate(length(min = 1, max = 80, message = "Actor must not be empty"))]
    pub actor: String,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shipment::Entity",
        from = "Column::ShipmentId",
        to = "super::shipment::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Shipment,
}

impl Related<super::shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipment.def()
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
