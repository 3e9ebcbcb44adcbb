use crate::{
    db::DbPool,
    entities::{purchase_order, purchase_order_item, supplier},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// One line of a purchase order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// A purchase order with its supplier name and line items.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseOrderDetail {
    pub id: Uuid,
    pub order_number: String,
    pub supplier_id: Uuid,
    pub supplier_name: Option<String>,
    pub status: purchase_order::PurchaseOrderStatus,
    pub order_date: DateTime<Utc>,
    pub total_amount: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub discount_amount: Decimal,
    pub net_amount: Decimal,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<PurchaseOrderLine>,
}

/// Read access to purchase orders produced by request conversion.
#[derive(Clone)]
pub struct PurchaseOrderService {
    db_pool: Arc<DbPool>,
}

impl PurchaseOrderService {
    /// Creates a new purchase order service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Fetches one purchase order with its line items.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<PurchaseOrderDetail, ServiceError> {
        let db = &*self.db_pool;

        let (order, related_supplier) = purchase_order::Entity::find_by_id(order_id)
            .find_also_related(supplier::Entity)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch purchase order");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase order {} not found", order_id))
            })?;

        let items = purchase_order_item::Entity::find()
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(order_id))
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order_id, "Failed to fetch order items");
                ServiceError::DatabaseError(e)
            })?
            .into_iter()
            .map(|item| PurchaseOrderLine {
                id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
                total_price: item.total_price,
            })
            .collect();

        Ok(PurchaseOrderDetail {
            id: order.id,
            order_number: order.order_number,
            supplier_id: order.supplier_id,
            supplier_name: related_supplier.map(|s| s.name),
            status: order.status,
            order_date: order.order_date,
            total_amount: order.total_amount,
            tax_amount: order.tax_amount,
            shipping_amount: order.shipping_amount,
            discount_amount: order.discount_amount,
            net_amount: order.net_amount,
            notes: order.notes,
            created_by: order.created_by,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items,
        })
    }

    /// Lists purchase orders newest first, optionally filtered by status
    /// and supplier.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        status: Option<purchase_order::PurchaseOrderStatus>,
        supplier_id: Option<Uuid>,
    ) -> Result<Vec<purchase_order::Model>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = purchase_order::Entity::find();
        if let Some(status) = status {
            query = query.filter(purchase_order::Column::Status.eq(status));
        }
        if let Some(supplier_id) = supplier_id {
            query = query.filter(purchase_order::Column::SupplierId.eq(supplier_id));
        }

        query
            .order_by_desc(purchase_order::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list purchase orders");
                ServiceError::DatabaseError(e)
            })
    }
}
