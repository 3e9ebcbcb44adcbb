use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-product stock position and replenishment thresholds.
///
/// Stock mutation itself (receiving, picking) happens elsewhere; this service
/// only reads quantities and maintains `reorder_point`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub product_id: Uuid,
    pub available_quantity: i32,
    pub min_stock_level: i32,
    pub max_stock_level: Option<i32>,
    pub reorder_point: i32,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Target stock level used when sizing replenishment orders.
    ///
    /// A missing maximum, or one below the reorder point, falls back to
    /// three times the reorder point so suggestions never chase an
    /// unreachable ceiling.
    pub fn effective_max_stock(&self) -> i32 {
        match self.max_stock_level {
            Some(max) if max >= self.reorder_point => max,
            _ => self.reorder_point.saturating_mul(3),
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
