use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A freight carrier. Shipments reference carriers by a name snapshot only,
/// so rows here can be edited or deleted without touching shipment records.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "carriers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 120,
        message = "Carrier name must be between 1 and 120 characters"
    ))]
    pub name: String,

    #[validate(length(
        min = 1,
        max = 32,
        message = "Tax ID must be between 1 and 32 characters"
    ))]
    pub tax_id: String,

    #[validate(email(message = "Contact email must be a valid email address"))]
    pub email: String,

    pub phone: Option<String>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

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
