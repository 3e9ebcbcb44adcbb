pub mod batch;
pub mod common;
pub mod offers;
pub mod purchase_orders;
pub mod requests;
pub mod suggestions;

use crate::clock::Clock;
use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub reorder: Arc<crate::services::reorder_point::ReorderPointService>,
    pub ranker: Arc<crate::services::supplier_ranking::SupplierRankingService>,
    pub suggestions: Arc<crate::services::suggestions::SuggestionService>,
    pub requests: Arc<crate::services::purchase_requests::PurchaseRequestService>,
    pub purchase_orders: Arc<crate::services::purchase_orders::PurchaseOrderService>,
    pub offers: Arc<crate::services::supplier_offers::SupplierOfferService>,
}

impl AppServices {
    /// Builds the service container, wiring the shared pool, clock, and
    /// event channel through the dependency graph.
    pub fn new(
        db_pool: Arc<DbPool>,
        clock: Arc<dyn Clock>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        let velocity = Arc::new(crate::services::sales_velocity::SalesVelocityService::new(
            db_pool.clone(),
            clock.clone(),
        ));
        let ranker = Arc::new(crate::services::supplier_ranking::SupplierRankingService::new(
            db_pool.clone(),
            clock.clone(),
        ));
        let reorder = Arc::new(crate::services::reorder_point::ReorderPointService::new(
            db_pool.clone(),
            clock.clone(),
            velocity.clone(),
            event_sender.clone(),
        ));
        let suggestions = Arc::new(crate::services::suggestions::SuggestionService::new(
            db_pool.clone(),
            velocity,
            ranker.clone(),
        ));
        let requests = Arc::new(
            crate::services::purchase_requests::PurchaseRequestService::new(
                db_pool.clone(),
                clock.clone(),
                suggestions.clone(),
                event_sender.clone(),
            ),
        );
        let purchase_orders = Arc::new(
            crate::services::purchase_orders::PurchaseOrderService::new(db_pool.clone()),
        );
        let offers = Arc::new(crate::services::supplier_offers::SupplierOfferService::new(
            db_pool,
            clock,
            event_sender,
        ));

        Self {
            reorder,
            ranker,
            suggestions,
            requests,
            purchase_orders,
            offers,
        }
    }
}
