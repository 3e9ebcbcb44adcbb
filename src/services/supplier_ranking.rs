use crate::{
    clock::Clock,
    db::DbPool,
    entities::{product, supplier, supplier_offer},
    errors::ServiceError,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Quantity used for cost comparison when the caller does not supply one.
pub const DEFAULT_COMPARE_QUANTITY: i32 = 100;

/// A supplier's offer for a product, priced for a concrete quantity.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RankedSupplierOffer {
    pub supplier_id: Uuid,
    pub supplier_name: String,
    pub unit_price: Decimal,
    pub lead_time_days: i32,
    pub min_order_qty: i32,
    pub rating: f32,
    pub is_preferred: bool,
    /// Unit price multiplied by the compared quantity
    pub total_cost: Decimal,
    /// Projected arrival if the order were placed now
    pub delivery_date: DateTime<Utc>,
}

/// Ranks supplier offers for purchasing decisions.
#[derive(Clone)]
pub struct SupplierRankingService {
    db_pool: Arc<DbPool>,
    clock: Arc<dyn Clock>,
}

impl SupplierRankingService {
    /// Creates a new supplier ranking service instance
    pub fn new(db_pool: Arc<DbPool>, clock: Arc<dyn Clock>) -> Self {
        Self { db_pool, clock }
    }

    /// Ranks all eligible offers for a product at the given quantity.
    ///
    /// Preferred suppliers come first, then cheaper total cost, then higher
    /// rating, then shorter lead time. Offers whose minimum order quantity
    /// exceeds the requested quantity are excluded.
    #[instrument(skip(self), fields(product_id = %product_id, quantity))]
    pub async fn compare_suppliers(
        &self,
        product_id: Uuid,
        quantity: Option<i32>,
    ) -> Result<Vec<RankedSupplierOffer>, ServiceError> {
        let quantity = quantity.unwrap_or(DEFAULT_COMPARE_QUANTITY);
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Comparison quantity must be at least 1".to_string(),
            ));
        }

        let db = &*self.db_pool;

        product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to fetch product");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let offers = supplier_offer::Entity::find()
            .filter(supplier_offer::Column::ProductId.eq(product_id))
            .filter(supplier_offer::Column::IsActive.eq(true))
            .find_also_related(supplier::Entity)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to fetch supplier offers");
                ServiceError::DatabaseError(e)
            })?;

        // One shared base so every row in the comparison projects from the
        // same instant.
        let now = self.clock.now();

        let mut ranked: Vec<RankedSupplierOffer> = offers
            .into_iter()
            .filter(|(offer, _)| offer.min_order_qty <= quantity)
            .map(|(offer, related_supplier)| RankedSupplierOffer {
                supplier_id: offer.supplier_id,
                supplier_name: related_supplier.map(|s| s.name).unwrap_or_default(),
                unit_price: offer.unit_price,
                lead_time_days: offer.lead_time_days,
                min_order_qty: offer.min_order_qty,
                rating: offer.rating,
                is_preferred: offer.is_preferred,
                total_cost: offer.unit_price * Decimal::from(quantity),
                delivery_date: now + Duration::days(i64::from(offer.lead_time_days)),
            })
            .collect();

        rank_offers(&mut ranked);

        Ok(ranked)
    }

    /// The single best offer for a product at the given quantity, if any
    /// supplier is eligible.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn best_supplier(
        &self,
        product_id: Uuid,
        quantity: Option<i32>,
    ) -> Result<Option<RankedSupplierOffer>, ServiceError> {
        let ranked = self.compare_suppliers(product_id, quantity).await?;
        Ok(ranked.into_iter().next())
    }
}

/// Stable ordering: preferred first, then total cost ascending, rating
/// descending, lead time ascending. Ties keep their relative input order.
fn rank_offers(offers: &mut [RankedSupplierOffer]) {
    offers.sort_by(|a, b| {
        b.is_preferred
            .cmp(&a.is_preferred)
            .then_with(|| a.total_cost.cmp(&b.total_cost))
            .then_with(|| b.rating.partial_cmp(&a.rating).unwrap_or(Ordering::Equal))
            .then_with(|| a.lead_time_days.cmp(&b.lead_time_days))
    });
}
