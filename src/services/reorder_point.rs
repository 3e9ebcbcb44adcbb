use crate::{
    clock::Clock,
    db::DbPool,
    entities::{inventory_record, product, supplier_offer},
    errors::ServiceError,
    events::{Event, EventSender},
    services::sales_velocity::SalesVelocityService,
};
use futures::stream::{self, StreamExt};
use metrics::counter;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lead time assumed when no preferred supplier offer exists.
pub const DEFAULT_LEAD_TIME_DAYS: i32 = 7;

/// Safety stock as a fraction of lead-time demand.
pub const SAFETY_STOCK_FACTOR: f64 = 0.2;

/// How many products are refreshed concurrently during a batch run.
const REFRESH_CONCURRENCY: usize = 4;

/// Lead-time demand plus the safety margin, rounded up to whole units.
pub fn compute_reorder_point(daily_velocity: f64, lead_time_days: i32) -> i32 {
    let lead_time_demand = daily_velocity * lead_time_days as f64;
    let safety_stock = lead_time_demand * SAFETY_STOCK_FACTOR;
    (lead_time_demand + safety_stock).ceil().max(0.0) as i32
}

/// Outcome of a batch reorder-point refresh.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReorderPointRunSummary {
    /// Active products examined
    pub processed: usize,
    /// Inventory records whose reorder point actually changed
    pub updated: usize,
}

/// Maintains the dynamic reorder point on inventory records.
#[derive(Clone)]
pub struct ReorderPointService {
    db_pool: Arc<DbPool>,
    clock: Arc<dyn Clock>,
    velocity: Arc<SalesVelocityService>,
    event_sender: Option<Arc<EventSender>>,
}

impl ReorderPointService {
    /// Creates a new reorder point service instance
    pub fn new(
        db_pool: Arc<DbPool>,
        clock: Arc<dyn Clock>,
        velocity: Arc<SalesVelocityService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            clock,
            velocity,
            event_sender,
        }
    }

    /// Lead time of the preferred active offer for the product, or the
    /// default when no supplier is preferred.
    async fn preferred_lead_time_days(&self, product_id: Uuid) -> Result<i32, ServiceError> {
        let db = &*self.db_pool;

        let offer = supplier_offer::Entity::find()
            .filter(supplier_offer::Column::ProductId.eq(product_id))
            .filter(supplier_offer::Column::IsPreferred.eq(true))
            .filter(supplier_offer::Column::IsActive.eq(true))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to fetch preferred offer");
                ServiceError::DatabaseError(e)
            })?;

        Ok(offer
            .map(|o| o.lead_time_days)
            .unwrap_or(DEFAULT_LEAD_TIME_DAYS))
    }

    /// Computes the reorder point for one product from current velocity and
    /// the preferred supplier's lead time.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn dynamic_reorder_point(&self, product_id: Uuid) -> Result<i32, ServiceError> {
        let velocity = self.velocity.average_daily_sales(product_id).await?;
        let lead_time_days = self.preferred_lead_time_days(product_id).await?;

        Ok(compute_reorder_point(velocity, lead_time_days))
    }

    /// Recomputes and persists one product's reorder point.
    ///
    /// Returns true when the stored value changed. Products without an
    /// inventory record are left alone.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn refresh_reorder_point(&self, product_id: Uuid) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;

        let record = inventory_record::Entity::find()
            .filter(inventory_record::Column::ProductId.eq(product_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to fetch inventory record");
                ServiceError::DatabaseError(e)
            })?;

        let Some(record) = record else {
            debug!(product_id = %product_id, "No inventory record; skipping reorder point refresh");
            return Ok(false);
        };

        let new_point = self.dynamic_reorder_point(product_id).await?;
        if new_point == record.reorder_point {
            return Ok(false);
        }

        let old_point = record.reorder_point;
        let mut active: inventory_record::ActiveModel = record.into();
        active.reorder_point = Set(new_point);
        active.updated_at = Set(self.clock.now());
        active.update(db).await.map_err(|e| {
            error!(error = %e, product_id = %product_id, "Failed to persist reorder point");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            product_id = %product_id,
            old_point,
            new_point,
            "Reorder point updated"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::ReorderPointChanged {
                    product_id,
                    old_value: old_point,
                    new_value: new_point,
                })
                .await
            {
                warn!(error = %e, product_id = %product_id, "Failed to send reorder point event");
            }
        }

        Ok(true)
    }

    /// Recomputes reorder points for every active product.
    ///
    /// Products are refreshed with bounded concurrency; a failure on one
    /// product is logged and does not abort the run.
    #[instrument(skip(self))]
    pub async fn update_all_reorder_points(
        &self,
    ) -> Result<ReorderPointRunSummary, ServiceError> {
        let db = &*self.db_pool;

        let products = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list active products");
                ServiceError::DatabaseError(e)
            })?;

        let processed = products.len();

        let results = stream::iter(products)
            .map(|product| {
                let service = self.clone();
                let product_id = product.id;
                async move { (product_id, service.refresh_reorder_point(product_id).await) }
            })
            .buffer_unordered(REFRESH_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut updated = 0;
        for (product_id, result) in results {
            match result {
                Ok(true) => updated += 1,
                Ok(false) => {}
                Err(e) => {
                    error!(error = %e, product_id = %product_id, "Reorder point refresh failed");
                }
            }
        }

        counter!("restock_reorder.refreshed", updated as u64);
        info!(processed, updated, "Reorder point refresh finished");

        Ok(ReorderPointRunSummary { processed, updated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(0.0, 7 => 0 ; "no velocity means zero reorder point")]
    #[test_case(0.8, 5 => 5 ; "fractional demand rounds up")]
    #[test_case(2.5, 7 => 21 ; "steady demand with default lead time")]
    #[test_case(5.0, 10 => 60 ; "fast mover with long lead time")]
    #[test_case(1.0, 0 => 0 ; "zero lead time")]
    fn reorder_point_math(velocity: f64, lead_time: i32) -> i32 {
        compute_reorder_point(velocity, lead_time)
    }

    #[test]
    fn safety_stock_is_twenty_percent_of_lead_time_demand() {
        // 10 units/day over 10 days = 100, plus 20 safety
        assert_eq!(compute_reorder_point(10.0, 10), 120);
    }

    proptest! {
        #[test]
        fn reorder_point_is_never_negative(
            velocity in 0.0f64..1_000.0,
            lead_time in 0i32..365,
        ) {
            prop_assert!(compute_reorder_point(velocity, lead_time) >= 0);
        }

        #[test]
        fn reorder_point_grows_with_velocity(
            velocity in 0.0f64..500.0,
            bump in 0.1f64..500.0,
            lead_time in 1i32..90,
        ) {
            let base = compute_reorder_point(velocity, lead_time);
            let faster = compute_reorder_point(velocity + bump, lead_time);
            prop_assert!(faster >= base);
        }

        #[test]
        fn reorder_point_covers_lead_time_demand(
            velocity in 0.0f64..500.0,
            lead_time in 1i32..90,
        ) {
            let point = compute_reorder_point(velocity, lead_time);
            let demand = velocity * lead_time as f64;
            prop_assert!(point as f64 >= demand);
        }
    }
}
