#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use restock_api::{
    clock::{Clock, FixedClock},
    config::AppConfig,
    db,
    entities::{
        inventory_record, product,
        sales_order::{self, SalesOrderStatus},
        sales_order_item, supplier, supplier_offer,
    },
    events,
    handlers::AppServices,
    AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

/// The instant every test clock is pinned to. Seeded sales history is placed
/// relative to this, so velocity math is deterministic regardless of when the
/// suite runs.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// Harness spinning up the full application state over a throwaway SQLite
/// database, with the clock frozen at [`test_now`].
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("restock_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let clock: Arc<dyn Clock> = Arc::new(FixedClock(test_now()));
        let services = AppServices::new(db_arc.clone(), clock, Some(Arc::new(event_sender.clone())));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .nest("/api/v1", restock_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Send a request against the router, with an optional JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Seed an active catalog product.
    pub async fn seed_product(
        &self,
        sku: &str,
        price: Decimal,
        cost_price: Option<Decimal>,
    ) -> product::Model {
        self.seed_product_with_activity(sku, price, cost_price, true)
            .await
    }

    pub async fn seed_product_with_activity(
        &self,
        sku: &str,
        price: Decimal,
        cost_price: Option<Decimal>,
        is_active: bool,
    ) -> product::Model {
        let now = test_now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(sku.to_string()),
            name: Set(format!("Test Product {}", sku)),
            category: Set("building-materials".to_string()),
            price: Set(price),
            cost_price: Set(cost_price),
            is_active: Set(is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed product for tests")
    }

    /// Seed the inventory record for a product.
    pub async fn seed_inventory(
        &self,
        product_id: Uuid,
        available: i32,
        min_stock: i32,
        max_stock: Option<i32>,
        reorder_point: i32,
    ) -> inventory_record::Model {
        inventory_record::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            available_quantity: Set(available),
            min_stock_level: Set(min_stock),
            max_stock_level: Set(max_stock),
            reorder_point: Set(reorder_point),
            updated_at: Set(test_now()),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed inventory record for tests")
    }

    pub async fn seed_supplier(&self, name: &str) -> supplier::Model {
        supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            contact_email: Set(Some(format!(
                "{}@example.com",
                name.to_lowercase().replace(' ', ".")
            ))),
            phone: Set(None),
            is_active: Set(true),
            created_at: Set(test_now()),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed supplier for tests")
    }

    /// Seed one supplier's offer for a product.
    #[allow(clippy::too_many_arguments)]
    pub async fn seed_offer(
        &self,
        supplier_id: Uuid,
        product_id: Uuid,
        unit_price: Decimal,
        lead_time_days: i32,
        min_order_qty: i32,
        rating: f32,
        is_preferred: bool,
    ) -> supplier_offer::Model {
        let now = test_now();
        supplier_offer::ActiveModel {
            id: Set(Uuid::new_v4()),
            supplier_id: Set(supplier_id),
            product_id: Set(product_id),
            unit_price: Set(unit_price),
            lead_time_days: Set(lead_time_days),
            min_order_qty: Set(min_order_qty),
            rating: Set(rating),
            is_preferred: Set(is_preferred),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed supplier offer for tests")
    }

    /// Seed a one-line sales order `days_ago` before the frozen test clock.
    pub async fn seed_sale(
        &self,
        product_id: Uuid,
        quantity: i32,
        days_ago: i64,
        status: SalesOrderStatus,
    ) -> sales_order::Model {
        let order_id = Uuid::new_v4();
        let created_at = test_now() - Duration::days(days_ago);

        let order = sales_order::ActiveModel {
            id: Set(order_id),
            order_number: Set(format!("SO-{}", &order_id.to_string()[..8])),
            status: Set(status),
            created_at: Set(created_at),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed sales order for tests");

        sales_order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            unit_price: Set(Decimal::new(1000, 2)),
        }
        .insert(self.state.db.as_ref())
        .await
        .expect("seed sales order item for tests");

        order
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
