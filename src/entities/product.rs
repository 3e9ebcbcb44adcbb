use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog product. Pricing carries both the sale price and, when known,
/// the supplier cost used for replenishment estimates.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub sku: String,
    pub name: String,
    pub category: String,
    pub price: Decimal,
    pub cost_price: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::inventory_record::Entity")]
    InventoryRecord,
    #[sea_orm(has_many = "super::supplier_offer::Entity")]
    SupplierOffers,
    #[sea_orm(has_many = "super::purchase_request::Entity")]
    PurchaseRequests,
}

impl Related<super::inventory_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryRecord.def()
    }
}

impl Related<super::supplier_offer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplierOffers.def()
    }
}

impl Related<super::purchase_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
