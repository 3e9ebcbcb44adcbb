use crate::{
    clock::Clock,
    db::DbPool,
    entities::{product, supplier, supplier_offer},
    errors::ServiceError,
    events::{Event, EventSender},
};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_LEAD_TIME_DAYS: i32 = 3;
const DEFAULT_MIN_ORDER_QTY: i32 = 1;

/// Input for creating or updating a supplier's offer on a product.
///
/// Optional fields left out keep their stored value on update and fall back
/// to catalog defaults on create.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpsertSupplierOfferInput {
    pub supplier_id: Uuid,
    pub product_id: Uuid,
    pub unit_price: Decimal,
    #[validate(range(min = 0))]
    pub lead_time_days: Option<i32>,
    #[validate(range(min = 1))]
    pub min_order_qty: Option<i32>,
    #[validate(range(min = 0.0, max = 5.0))]
    pub rating: Option<f32>,
    pub is_preferred: Option<bool>,
    pub is_active: Option<bool>,
}

/// Maintains the supplier-offer catalog.
#[derive(Clone)]
pub struct SupplierOfferService {
    db_pool: Arc<DbPool>,
    clock: Arc<dyn Clock>,
    event_sender: Option<Arc<EventSender>>,
}

impl SupplierOfferService {
    /// Creates a new supplier offer service instance
    pub fn new(
        db_pool: Arc<DbPool>,
        clock: Arc<dyn Clock>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            clock,
            event_sender,
        }
    }

    /// Creates or updates the offer keyed on supplier and product.
    #[instrument(
        skip(self, input),
        fields(supplier_id = %input.supplier_id, product_id = %input.product_id)
    )]
    pub async fn upsert_offer(
        &self,
        input: UpsertSupplierOfferInput,
    ) -> Result<supplier_offer::Model, ServiceError> {
        if input.unit_price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Unit price must be positive".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let supplier_id = input.supplier_id;
        let product_id = input.product_id;

        supplier::Entity::find_by_id(supplier_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, supplier_id = %supplier_id, "Failed to fetch supplier");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", supplier_id)))?;

        product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to fetch product");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let existing = supplier_offer::Entity::find()
            .filter(supplier_offer::Column::SupplierId.eq(supplier_id))
            .filter(supplier_offer::Column::ProductId.eq(product_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch existing offer");
                ServiceError::DatabaseError(e)
            })?;

        let now = self.clock.now();
        let saved = match existing {
            Some(offer) => {
                let mut active: supplier_offer::ActiveModel = offer.into();
                active.unit_price = Set(input.unit_price);
                if let Some(lead_time_days) = input.lead_time_days {
                    active.lead_time_days = Set(lead_time_days);
                }
                if let Some(min_order_qty) = input.min_order_qty {
                    active.min_order_qty = Set(min_order_qty);
                }
                if let Some(rating) = input.rating {
                    active.rating = Set(rating);
                }
                if let Some(is_preferred) = input.is_preferred {
                    active.is_preferred = Set(is_preferred);
                }
                if let Some(is_active) = input.is_active {
                    active.is_active = Set(is_active);
                }
                active.updated_at = Set(now);
                active.update(db).await.map_err(|e| {
                    error!(error = %e, "Failed to update supplier offer");
                    ServiceError::DatabaseError(e)
                })?
            }
            None => {
                let offer = supplier_offer::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    supplier_id: Set(supplier_id),
                    product_id: Set(product_id),
                    unit_price: Set(input.unit_price),
                    lead_time_days: Set(input.lead_time_days.unwrap_or(DEFAULT_LEAD_TIME_DAYS)),
                    min_order_qty: Set(input.min_order_qty.unwrap_or(DEFAULT_MIN_ORDER_QTY)),
                    rating: Set(input.rating.unwrap_or(0.0)),
                    is_preferred: Set(input.is_preferred.unwrap_or(false)),
                    is_active: Set(input.is_active.unwrap_or(true)),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                offer.insert(db).await.map_err(|e| {
                    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                        ServiceError::Conflict(format!(
                            "Offer already exists for supplier {} and product {}",
                            supplier_id, product_id
                        ))
                    } else {
                        error!(error = %e, "Failed to insert supplier offer");
                        ServiceError::DatabaseError(e)
                    }
                })?
            }
        };

        counter!("restock_offers.upserted", 1);
        info!(offer_id = %saved.id, "Supplier offer upserted");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::SupplierOfferUpserted {
                    supplier_id,
                    product_id,
                })
                .await
            {
                warn!(error = %e, "Failed to send offer upserted event");
            }
        }

        Ok(saved)
    }

    /// Lists catalog offers, preferred and cheapest first. Inactive offers
    /// are hidden unless asked for.
    #[instrument(skip(self))]
    pub async fn list_offers(
        &self,
        supplier_id: Option<Uuid>,
        product_id: Option<Uuid>,
        include_inactive: bool,
    ) -> Result<Vec<supplier_offer::Model>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = supplier_offer::Entity::find();
        if let Some(supplier_id) = supplier_id {
            query = query.filter(supplier_offer::Column::SupplierId.eq(supplier_id));
        }
        if let Some(product_id) = product_id {
            query = query.filter(supplier_offer::Column::ProductId.eq(product_id));
        }
        if !include_inactive {
            query = query.filter(supplier_offer::Column::IsActive.eq(true));
        }

        query
            .order_by_desc(supplier_offer::Column::IsPreferred)
            .order_by_asc(supplier_offer::Column::UnitPrice)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list supplier offers");
                ServiceError::DatabaseError(e)
            })
    }
}
