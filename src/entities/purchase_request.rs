use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    #[sea_orm(string_value = "CONVERTED")]
    Converted,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl RequestStatus {
    /// Converted and rejected requests never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Converted | RequestStatus::Rejected)
    }

    /// Statuses that count toward the one-open-request-per-product rule.
    pub fn in_flight() -> [RequestStatus; 2] {
        [RequestStatus::Pending, RequestStatus::Approved]
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Urgency of a replenishment request. Declared most-urgent first so the
/// derived ordering sorts Urgent ahead of Low.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestPriority {
    #[sea_orm(string_value = "URGENT")]
    Urgent,
    #[sea_orm(string_value = "HIGH")]
    High,
    #[sea_orm(string_value = "MEDIUM")]
    Medium,
    #[sea_orm(string_value = "LOW")]
    Low,
}

impl RequestPriority {
    const STOCKOUT_WARNING_DAYS: i64 = 7;

    /// Classifies a suggestion from the stock position and the projected
    /// days until stock-out. First matching rule wins.
    pub fn from_stockout_horizon(
        available: i32,
        min_stock_level: i32,
        days_until_stockout: i64,
    ) -> Self {
        if available <= 0 {
            RequestPriority::Urgent
        } else if available <= min_stock_level {
            RequestPriority::High
        } else if days_until_stockout <= Self::STOCKOUT_WARNING_DAYS {
            RequestPriority::Medium
        } else {
            RequestPriority::Low
        }
    }

    /// Classifies a request from the stock snapshot taken at creation time,
    /// where no stock-out projection exists.
    pub fn from_stock_snapshot(available: i32, min_stock_level: i32, reorder_point: i32) -> Self {
        if available <= 0 {
            RequestPriority::Urgent
        } else if available <= min_stock_level {
            RequestPriority::High
        } else if available <= reorder_point {
            RequestPriority::Medium
        } else {
            RequestPriority::Low
        }
    }
}

impl std::fmt::Display for RequestPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

#[derive(
    Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestSource {
    #[sea_orm(string_value = "SYSTEM")]
    System,
    #[sea_orm(string_value = "MANUAL")]
    Manual,
}

impl std::fmt::Display for RequestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// A replenishment request moving toward a purchase order.
///
/// `current_stock` and `reorder_point` are snapshots taken when the request
/// was created; later inventory changes do not rewrite them.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub request_number: String,
    pub product_id: Uuid,
    pub supplier_id: Option<Uuid>,
    pub requested_qty: i32,
    pub current_stock: i32,
    pub reorder_point: i32,
    pub estimated_cost: Option<Decimal>,
    pub priority: RequestPriority,
    pub source: RequestSource,
    pub status: RequestStatus,
    pub notes: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub purchase_order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::supplier::Entity",
        from = "Column::SupplierId",
        to = "super::supplier::Column::Id"
    )]
    Supplier,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::supplier::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Supplier.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 10, 999 => RequestPriority::Urgent ; "zero stock is urgent")]
    #[test_case(-5, 10, 999 => RequestPriority::Urgent ; "negative stock is urgent")]
    #[test_case(8, 10, 999 => RequestPriority::High ; "at or below minimum is high")]
    #[test_case(10, 10, 999 => RequestPriority::High ; "exactly minimum is high")]
    #[test_case(15, 10, 7 => RequestPriority::Medium ; "stockout inside a week is medium")]
    #[test_case(15, 10, 3 => RequestPriority::Medium ; "stockout in days is medium")]
    #[test_case(15, 10, 8 => RequestPriority::Low ; "stockout beyond a week is low")]
    #[test_case(15, 10, 999 => RequestPriority::Low ; "no sales velocity is low")]
    fn stockout_horizon_priority(available: i32, min: i32, days: i64) -> RequestPriority {
        RequestPriority::from_stockout_horizon(available, min, days)
    }

    #[test_case(0, 10, 20 => RequestPriority::Urgent)]
    #[test_case(5, 10, 20 => RequestPriority::High)]
    #[test_case(15, 10, 20 => RequestPriority::Medium)]
    #[test_case(25, 10, 20 => RequestPriority::Low)]
    fn stock_snapshot_priority(available: i32, min: i32, reorder: i32) -> RequestPriority {
        RequestPriority::from_stock_snapshot(available, min, reorder)
    }

    #[test]
    fn urgent_sorts_before_low() {
        let mut priorities = vec![
            RequestPriority::Low,
            RequestPriority::Urgent,
            RequestPriority::Medium,
            RequestPriority::High,
        ];
        priorities.sort();
        assert_eq!(
            priorities,
            vec![
                RequestPriority::Urgent,
                RequestPriority::High,
                RequestPriority::Medium,
                RequestPriority::Low,
            ]
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(RequestStatus::Converted.is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(!RequestStatus::Approved.is_terminal());
    }
}
