use crate::{
    clock::Clock,
    db::DbPool,
    entities::sales_order::{self, SalesOrderStatus},
    entities::sales_order_item,
    errors::ServiceError,
};
use chrono::Duration;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

/// Trailing window, in days, used for average daily sales.
pub const VELOCITY_WINDOW_DAYS: i64 = 30;

/// Measures demand as average units sold per day over a trailing window.
#[derive(Clone)]
pub struct SalesVelocityService {
    db_pool: Arc<DbPool>,
    clock: Arc<dyn Clock>,
}

impl SalesVelocityService {
    /// Creates a new sales velocity service instance
    pub fn new(db_pool: Arc<DbPool>, clock: Arc<dyn Clock>) -> Self {
        Self { db_pool, clock }
    }

    /// Average units sold per day over the standard trailing window.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn average_daily_sales(&self, product_id: Uuid) -> Result<f64, ServiceError> {
        self.average_daily_sales_over(product_id, VELOCITY_WINDOW_DAYS)
            .await
    }

    /// Average units sold per day over the trailing `window_days`.
    ///
    /// Only orders in a demand-qualifying status count. Days without sales
    /// stay in the denominator, so a product that sold 30 units in one burst
    /// still averages 1.0 over a 30-day window. No qualifying sales yields
    /// 0.0, never an error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn average_daily_sales_over(
        &self,
        product_id: Uuid,
        window_days: i64,
    ) -> Result<f64, ServiceError> {
        if window_days <= 0 {
            return Err(ServiceError::InvalidInput(
                "sales window must cover at least one day".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let now = self.clock.now();
        let window_start = now - Duration::days(window_days);

        let total = sales_order_item::Entity::find()
            .inner_join(sales_order::Entity)
            .filter(sales_order_item::Column::ProductId.eq(product_id))
            .filter(sales_order::Column::Status.is_in(SalesOrderStatus::demand_qualifying()))
            .filter(sales_order::Column::CreatedAt.between(window_start, now))
            .select_only()
            .column_as(
                Expr::col((sales_order_item::Entity, sales_order_item::Column::Quantity)).sum(),
                "total_sold",
            )
            .into_tuple::<Option<i64>>()
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to sum trailing sales");
                ServiceError::DatabaseError(e)
            })?;

        let total_sold = total.flatten().unwrap_or(0);

        Ok(total_sold as f64 / window_days as f64)
    }
}
