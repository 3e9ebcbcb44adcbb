use crate::{
    db::DbPool,
    entities::{inventory_record, product, purchase_request::RequestPriority},
    errors::ServiceError,
    services::sales_velocity::SalesVelocityService,
    services::supplier_ranking::{RankedSupplierOffer, SupplierRankingService},
};
use metrics::gauge;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

/// Days reported when a product has no recent sales at all.
pub const STOCKOUT_SENTINEL_DAYS: i64 = 999;

/// Fraction of the retail price assumed as cost when no cost price is known.
const FALLBACK_COST_RATIO: Decimal = dec!(0.7);

/// A computed restocking recommendation for one product.
///
/// Suggestions are recomputed on every run and never persisted; accepting one
/// turns it into a purchase request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReplenishmentSuggestion {
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub current_stock: i32,
    pub reorder_point: i32,
    pub suggested_qty: i32,
    /// Average units sold per day over the trailing window
    pub daily_velocity: f64,
    /// Projected days until stock reaches zero at current velocity
    pub days_until_stockout: i64,
    pub priority: RequestPriority,
    pub best_supplier: Option<RankedSupplierOffer>,
    pub estimated_cost: Decimal,
}

/// Severity of a low-stock condition, most severe first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertTier {
    Urgent,
    High,
    Normal,
}

/// One row of the low-stock report.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LowStockAlert {
    pub product_id: Uuid,
    pub sku: String,
    pub product_name: String,
    pub available_quantity: i32,
    pub min_stock_level: i32,
    pub suggested_order_qty: i32,
    pub tier: AlertTier,
}

/// Generates replenishment suggestions and low-stock reports.
#[derive(Clone)]
pub struct SuggestionService {
    db_pool: Arc<DbPool>,
    velocity: Arc<SalesVelocityService>,
    ranker: Arc<SupplierRankingService>,
}

impl SuggestionService {
    /// Creates a new suggestion service instance
    pub fn new(
        db_pool: Arc<DbPool>,
        velocity: Arc<SalesVelocityService>,
        ranker: Arc<SupplierRankingService>,
    ) -> Self {
        Self {
            db_pool,
            velocity,
            ranker,
        }
    }

    /// Builds the ranked suggestion list for every active product whose
    /// available stock sits at or below its reorder point.
    #[instrument(skip(self))]
    pub async fn generate(&self) -> Result<Vec<ReplenishmentSuggestion>, ServiceError> {
        let db = &*self.db_pool;

        let rows = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .find_also_related(inventory_record::Entity)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load products with inventory");
                ServiceError::DatabaseError(e)
            })?;

        let mut suggestions = Vec::new();
        for (product, record) in rows {
            let Some(record) = record else { continue };
            if record.available_quantity > record.reorder_point {
                continue;
            }

            let velocity = self.velocity.average_daily_sales(product.id).await?;
            let days_until_stockout = if velocity > 0.0 {
                (record.available_quantity as f64 / velocity).floor() as i64
            } else {
                STOCKOUT_SENTINEL_DAYS
            };

            let suggested_qty =
                (record.effective_max_stock() - record.available_quantity).max(0);
            let priority = RequestPriority::from_stockout_horizon(
                record.available_quantity,
                record.min_stock_level,
                days_until_stockout,
            );

            let best_supplier = if suggested_qty >= 1 {
                self.ranker
                    .best_supplier(product.id, Some(suggested_qty))
                    .await?
            } else {
                None
            };

            let estimated_cost = match &best_supplier {
                Some(offer) => offer.unit_price * Decimal::from(suggested_qty),
                None => fallback_unit_cost(&product) * Decimal::from(suggested_qty),
            };

            suggestions.push(ReplenishmentSuggestion {
                product_id: product.id,
                sku: product.sku,
                product_name: product.name,
                current_stock: record.available_quantity,
                reorder_point: record.reorder_point,
                suggested_qty,
                daily_velocity: velocity,
                days_until_stockout,
                priority,
                best_supplier,
                estimated_cost,
            });
        }

        // Stable sort on priority alone keeps product iteration order for ties.
        suggestions.sort_by(|a, b| a.priority.cmp(&b.priority));

        gauge!("restock_suggestions.open", suggestions.len() as f64);
        info!(count = suggestions.len(), "Generated replenishment suggestions");

        Ok(suggestions)
    }

    /// Lists active products whose stock has fallen to or below the minimum
    /// level, most severe first.
    #[instrument(skip(self))]
    pub async fn low_stock_report(&self) -> Result<Vec<LowStockAlert>, ServiceError> {
        let db = &*self.db_pool;

        let rows = product::Entity::find()
            .filter(product::Column::IsActive.eq(true))
            .find_also_related(inventory_record::Entity)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load products with inventory");
                ServiceError::DatabaseError(e)
            })?;

        let mut alerts: Vec<LowStockAlert> = rows
            .into_iter()
            .filter_map(|(product, record)| {
                let record = record?;
                if record.available_quantity > record.min_stock_level {
                    return None;
                }
                let tier = if record.available_quantity <= 0 {
                    AlertTier::Urgent
                } else if record.available_quantity <= record.min_stock_level / 2 {
                    AlertTier::High
                } else {
                    AlertTier::Normal
                };
                Some(LowStockAlert {
                    product_id: product.id,
                    sku: product.sku,
                    product_name: product.name,
                    available_quantity: record.available_quantity,
                    min_stock_level: record.min_stock_level,
                    suggested_order_qty: (record.effective_max_stock()
                        - record.available_quantity)
                        .max(0),
                    tier,
                })
            })
            .collect();

        alerts.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then_with(|| a.available_quantity.cmp(&b.available_quantity))
        });

        Ok(alerts)
    }
}

/// Estimated unit cost when no supplier offer is available, from the cost
/// price or a fixed fraction of the retail price.
fn fallback_unit_cost(product: &product::Model) -> Decimal {
    product
        .cost_price
        .unwrap_or_else(|| product.price * FALLBACK_COST_RATIO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product_with(price: Decimal, cost_price: Option<Decimal>) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            sku: "CEM-001".to_string(),
            name: "Portland Cement 40kg".to_string(),
            category: "cement".to_string(),
            price,
            cost_price,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unit_cost_prefers_explicit_cost_price() {
        let product = product_with(dec!(100.00), Some(dec!(62.50)));
        assert_eq!(fallback_unit_cost(&product), dec!(62.50));
    }

    #[test]
    fn unit_cost_falls_back_to_fraction_of_price() {
        let product = product_with(dec!(100.00), None);
        assert_eq!(fallback_unit_cost(&product), dec!(70.000));
    }

    #[test]
    fn alert_tiers_order_most_severe_first() {
        assert!(AlertTier::Urgent < AlertTier::High);
        assert!(AlertTier::High < AlertTier::Normal);
    }
}
