use crate::{
    clock::Clock,
    db::DbPool,
    entities::{
        inventory_record, product, purchase_order, purchase_order_item,
        purchase_request::{self, RequestPriority, RequestSource, RequestStatus},
        supplier, supplier_offer,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::suggestions::SuggestionService,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Input for creating a purchase request, manual or automated.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseRequestInput {
    pub product_id: Uuid,
    #[validate(range(min = 1))]
    pub requested_qty: i32,
    pub supplier_id: Option<Uuid>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// A purchase request joined with product and supplier names for display.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PurchaseRequestDetail {
    pub id: Uuid,
    pub request_number: String,
    pub product_id: Uuid,
    pub product_sku: String,
    pub product_name: String,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
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

/// Outcome of one automated request-generation run.
#[derive(Debug, Serialize, ToSchema)]
pub struct AutoGenerateSummary {
    /// Requests created in this run
    pub created: usize,
    /// Urgent or high suggestions skipped because a request was already open
    pub skipped: usize,
}

/// Owns the purchase request state machine and its conversion into
/// purchase orders.
#[derive(Clone)]
pub struct PurchaseRequestService {
    db_pool: Arc<DbPool>,
    clock: Arc<dyn Clock>,
    suggestions: Arc<SuggestionService>,
    event_sender: Option<Arc<EventSender>>,
}

impl PurchaseRequestService {
    /// Creates a new purchase request service instance
    pub fn new(
        db_pool: Arc<DbPool>,
        clock: Arc<dyn Clock>,
        suggestions: Arc<SuggestionService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            clock,
            suggestions,
            event_sender,
        }
    }

    /// Creates a pending purchase request for a product.
    ///
    /// Snapshots the stock position at creation time and refuses to open a
    /// second request while one is still pending or approved.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, source = %source))]
    pub async fn create_request(
        &self,
        input: CreatePurchaseRequestInput,
        source: RequestSource,
    ) -> Result<purchase_request::Model, ServiceError> {
        if input.requested_qty < 1 {
            return Err(ServiceError::ValidationError(
                "Requested quantity must be at least 1".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let product_id = input.product_id;

        product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to fetch product");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let record = inventory_record::Entity::find()
            .filter(inventory_record::Column::ProductId.eq(product_id))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to fetch inventory record");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No inventory record for product {}", product_id))
            })?;

        if let Some(supplier_id) = input.supplier_id {
            supplier::Entity::find_by_id(supplier_id)
                .one(db)
                .await
                .map_err(|e| {
                    error!(error = %e, supplier_id = %supplier_id, "Failed to fetch supplier");
                    ServiceError::DatabaseError(e)
                })?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Supplier {} not found", supplier_id))
                })?;
        }

        let open = purchase_request::Entity::find()
            .filter(purchase_request::Column::ProductId.eq(product_id))
            .filter(purchase_request::Column::Status.is_in(RequestStatus::in_flight()))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %product_id, "Failed to check open requests");
                ServiceError::DatabaseError(e)
            })?;
        if let Some(open) = open {
            return Err(ServiceError::Conflict(format!(
                "Request {} is already open for product {}",
                open.request_number, product_id
            )));
        }

        let estimated_cost = match input.supplier_id {
            Some(supplier_id) => self
                .catalog_unit_price(supplier_id, product_id)
                .await?
                .map(|unit_price| unit_price * Decimal::from(input.requested_qty)),
            None => None,
        };

        let priority = RequestPriority::from_stock_snapshot(
            record.available_quantity,
            record.min_stock_level,
            record.reorder_point,
        );

        let id = Uuid::new_v4();
        let now = self.clock.now();
        let request = purchase_request::ActiveModel {
            id: Set(id),
            request_number: Set(request_number(id)),
            product_id: Set(product_id),
            supplier_id: Set(input.supplier_id),
            requested_qty: Set(input.requested_qty),
            current_stock: Set(record.available_quantity),
            reorder_point: Set(record.reorder_point),
            estimated_cost: Set(estimated_cost),
            priority: Set(priority.clone()),
            source: Set(source.clone()),
            status: Set(RequestStatus::Pending),
            notes: Set(input.notes),
            approved_by: Set(None),
            approved_at: Set(None),
            purchase_order_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let saved = request.insert(db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::Conflict(format!(
                    "A request is already open for product {}",
                    product_id
                ))
            } else {
                error!(error = %e, product_id = %product_id, "Failed to insert purchase request");
                ServiceError::DatabaseError(e)
            }
        })?;

        counter!("restock_requests.created", 1);
        info!(
            request_id = %saved.id,
            request_number = %saved.request_number,
            priority = %saved.priority,
            "Purchase request created"
        );

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::PurchaseRequestCreated {
                    request_id: saved.id,
                    product_id,
                    priority: saved.priority.to_string(),
                    source: saved.source.to_string(),
                })
                .await
            {
                warn!(error = %e, "Failed to send request created event");
            }
        }

        Ok(saved)
    }

    /// Approves a pending request, stamping the approver and time.
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn approve_request(
        &self,
        request_id: Uuid,
        approved_by: Option<Uuid>,
    ) -> Result<purchase_request::Model, ServiceError> {
        let db = &*self.db_pool;
        let request = self.fetch_request(request_id).await?;

        if request.status != RequestStatus::Pending {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot approve request {} in {} status",
                request.request_number, request.status
            )));
        }

        let mut active: purchase_request::ActiveModel = request.into();
        active.status = Set(RequestStatus::Approved);
        active.approved_by = Set(approved_by);
        active.approved_at = Set(Some(self.clock.now()));
        active.updated_at = Set(self.clock.now());
        let saved = active.update(db).await.map_err(|e| {
            error!(error = %e, request_id = %request_id, "Failed to approve request");
            ServiceError::DatabaseError(e)
        })?;

        info!(request_number = %saved.request_number, "Purchase request approved");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::PurchaseRequestApproved {
                    request_id: saved.id,
                    approved_by,
                })
                .await
            {
                warn!(error = %e, "Failed to send request approved event");
            }
        }

        Ok(saved)
    }

    /// Rejects a request that has not yet been converted.
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn reject_request(
        &self,
        request_id: Uuid,
    ) -> Result<purchase_request::Model, ServiceError> {
        let db = &*self.db_pool;
        let request = self.fetch_request(request_id).await?;

        if request.status.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot reject request {} in {} status",
                request.request_number, request.status
            )));
        }

        let mut active: purchase_request::ActiveModel = request.into();
        active.status = Set(RequestStatus::Rejected);
        active.updated_at = Set(self.clock.now());
        let saved = active.update(db).await.map_err(|e| {
            error!(error = %e, request_id = %request_id, "Failed to reject request");
            ServiceError::DatabaseError(e)
        })?;

        info!(request_number = %saved.request_number, "Purchase request rejected");

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::PurchaseRequestRejected {
                    request_id: saved.id,
                })
                .await
            {
                warn!(error = %e, "Failed to send request rejected event");
            }
        }

        Ok(saved)
    }

    /// Assigns or replaces the supplier on a non-terminal request and
    /// re-estimates its cost from that supplier's catalog price, falling
    /// back to the product's cost price, then its retail price.
    #[instrument(skip(self), fields(request_id = %request_id, supplier_id = %supplier_id))]
    pub async fn assign_supplier(
        &self,
        request_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<purchase_request::Model, ServiceError> {
        let db = &*self.db_pool;
        let request = self.fetch_request(request_id).await?;

        if request.status.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot change supplier on request {} in {} status",
                request.request_number, request.status
            )));
        }

        supplier::Entity::find_by_id(supplier_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, supplier_id = %supplier_id, "Failed to fetch supplier");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", supplier_id)))?;

        let unit_price = match self.catalog_unit_price(supplier_id, request.product_id).await? {
            Some(price) => Some(price),
            None => {
                let product = product::Entity::find_by_id(request.product_id)
                    .one(db)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "Failed to fetch product for cost estimate");
                        ServiceError::DatabaseError(e)
                    })?;
                product.map(|p| p.cost_price.unwrap_or(p.price))
            }
        };
        let estimated_cost =
            unit_price.map(|price| price * Decimal::from(request.requested_qty));

        let mut active: purchase_request::ActiveModel = request.into();
        active.supplier_id = Set(Some(supplier_id));
        active.estimated_cost = Set(estimated_cost);
        active.updated_at = Set(self.clock.now());
        let saved = active.update(db).await.map_err(|e| {
            error!(error = %e, request_id = %request_id, "Failed to assign supplier");
            ServiceError::DatabaseError(e)
        })?;

        info!(request_number = %saved.request_number, "Supplier assigned to request");

        Ok(saved)
    }

    /// Converts an approved request into a draft purchase order.
    ///
    /// The order, its single line item, and the request status change are
    /// committed in one transaction.
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn convert_to_purchase_order(
        &self,
        request_id: Uuid,
    ) -> Result<purchase_order::Model, ServiceError> {
        let db = &*self.db_pool;
        let request = self.fetch_request(request_id).await?;

        if request.status != RequestStatus::Approved {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot convert request {} in {} status",
                request.request_number, request.status
            )));
        }

        let supplier_id = request.supplier_id.ok_or_else(|| {
            ServiceError::MissingSupplier(format!(
                "Request {} has no supplier assigned",
                request.request_number
            ))
        })?;

        let unit_price = match self.catalog_unit_price(supplier_id, request.product_id).await? {
            Some(price) => price,
            None => match request.estimated_cost {
                Some(cost) => cost / Decimal::from(request.requested_qty),
                None => {
                    return Err(ServiceError::ValidationError(format!(
                        "No price basis to convert request {}",
                        request.request_number
                    )))
                }
            },
        };
        let line_total = unit_price * Decimal::from(request.requested_qty);

        let now = self.clock.now();
        let order_id = Uuid::new_v4();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin transaction");
            ServiceError::DatabaseError(e)
        })?;

        let order = purchase_order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number(order_id)),
            supplier_id: Set(supplier_id),
            status: Set(purchase_order::PurchaseOrderStatus::Draft),
            order_date: Set(now),
            total_amount: Set(line_total),
            tax_amount: Set(Decimal::ZERO),
            shipping_amount: Set(Decimal::ZERO),
            discount_amount: Set(Decimal::ZERO),
            net_amount: Set(line_total),
            notes: Set(Some(format!(
                "Converted from purchase request {}",
                request.request_number
            ))),
            created_by: Set(request.approved_by),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let order = order.insert(&txn).await.map_err(|e| {
            error!(error = %e, "Failed to insert purchase order");
            ServiceError::DatabaseError(e)
        })?;

        let item = purchase_order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(order.id),
            product_id: Set(request.product_id),
            quantity: Set(request.requested_qty),
            unit_price: Set(unit_price),
            total_price: Set(line_total),
            created_at: Set(now),
        };
        item.insert(&txn).await.map_err(|e| {
            error!(error = %e, "Failed to insert purchase order item");
            ServiceError::DatabaseError(e)
        })?;

        let request_number = request.request_number.clone();
        let mut active: purchase_request::ActiveModel = request.into();
        active.status = Set(RequestStatus::Converted);
        active.purchase_order_id = Set(Some(order.id));
        active.updated_at = Set(now);
        active.update(&txn).await.map_err(|e| {
            error!(error = %e, request_id = %request_id, "Failed to mark request converted");
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit conversion transaction");
            ServiceError::DatabaseError(e)
        })?;

        counter!("restock_requests.converted", 1);
        info!(
            request_number = %request_number,
            order_number = %order.order_number,
            "Purchase request converted to purchase order"
        );

        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::PurchaseRequestConverted {
                    request_id,
                    purchase_order_id: order.id,
                })
                .await
            {
                warn!(error = %e, "Failed to send request converted event");
            }
            if let Err(e) = sender.send(Event::PurchaseOrderCreated(order.id)).await {
                warn!(error = %e, "Failed to send purchase order created event");
            }
        }

        Ok(order)
    }

    /// Fetches one request with product and supplier names resolved.
    #[instrument(skip(self), fields(request_id = %request_id))]
    pub async fn get_request(
        &self,
        request_id: Uuid,
    ) -> Result<PurchaseRequestDetail, ServiceError> {
        let request = self.fetch_request(request_id).await?;
        let mut enriched = self.enrich_requests(vec![request]).await?;
        enriched.pop().ok_or_else(|| {
            ServiceError::InternalError("Request enrichment produced no row".to_string())
        })
    }

    /// Lists requests most urgent first, newest first within a priority.
    #[instrument(skip(self))]
    pub async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PurchaseRequestDetail>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = purchase_request::Entity::find();
        if let Some(status) = status {
            query = query.filter(purchase_request::Column::Status.eq(status));
        }
        let mut requests = query
            .order_by_desc(purchase_request::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list purchase requests");
                ServiceError::DatabaseError(e)
            })?;

        // Stable sort: priority order first, the created_at DESC from the
        // query survives within each priority.
        requests.sort_by(|a, b| a.priority.cmp(&b.priority));

        self.enrich_requests(requests).await
    }

    /// Turns urgent and high suggestions into system-sourced requests,
    /// skipping products that already have one open.
    #[instrument(skip(self))]
    pub async fn auto_generate(&self) -> Result<AutoGenerateSummary, ServiceError> {
        let suggestions = self.suggestions.generate().await?;

        let mut created = 0;
        let mut skipped = 0;
        for suggestion in suggestions {
            if !matches!(
                suggestion.priority,
                RequestPriority::Urgent | RequestPriority::High
            ) {
                continue;
            }
            if suggestion.suggested_qty < 1 {
                skipped += 1;
                continue;
            }

            let input = CreatePurchaseRequestInput {
                product_id: suggestion.product_id,
                requested_qty: suggestion.suggested_qty,
                supplier_id: suggestion.best_supplier.as_ref().map(|o| o.supplier_id),
                notes: Some(format!(
                    "Auto-generated: stock {} at or below reorder point {}",
                    suggestion.current_stock, suggestion.reorder_point
                )),
            };

            match self.create_request(input, RequestSource::System).await {
                Ok(_) => created += 1,
                Err(ServiceError::Conflict(_)) => skipped += 1,
                Err(e) => {
                    error!(
                        error = %e,
                        product_id = %suggestion.product_id,
                        "Failed to auto-generate purchase request"
                    );
                    skipped += 1;
                }
            }
        }

        counter!("restock_requests.auto_generated", created as u64);
        info!(created, skipped, "Automatic request generation finished");

        Ok(AutoGenerateSummary { created, skipped })
    }

    async fn fetch_request(
        &self,
        request_id: Uuid,
    ) -> Result<purchase_request::Model, ServiceError> {
        let db = &*self.db_pool;
        purchase_request::Entity::find_by_id(request_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, request_id = %request_id, "Failed to fetch purchase request");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Purchase request {} not found", request_id))
            })
    }

    /// Active catalog price of one supplier for one product, if any.
    async fn catalog_unit_price(
        &self,
        supplier_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Decimal>, ServiceError> {
        let db = &*self.db_pool;
        let offer = supplier_offer::Entity::find()
            .filter(supplier_offer::Column::SupplierId.eq(supplier_id))
            .filter(supplier_offer::Column::ProductId.eq(product_id))
            .filter(supplier_offer::Column::IsActive.eq(true))
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch supplier offer");
                ServiceError::DatabaseError(e)
            })?;
        Ok(offer.map(|o| o.unit_price))
    }

    /// Resolves product and supplier names for a batch of requests with two
    /// lookups instead of one pair per row.
    async fn enrich_requests(
        &self,
        requests: Vec<purchase_request::Model>,
    ) -> Result<Vec<PurchaseRequestDetail>, ServiceError> {
        let db = &*self.db_pool;

        let product_ids: Vec<Uuid> = requests.iter().map(|r| r.product_id).collect();
        let supplier_ids: Vec<Uuid> = requests.iter().filter_map(|r| r.supplier_id).collect();

        let products: HashMap<Uuid, product::Model> = product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch products for enrichment");
                ServiceError::DatabaseError(e)
            })?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let suppliers: HashMap<Uuid, supplier::Model> = if supplier_ids.is_empty() {
            HashMap::new()
        } else {
            supplier::Entity::find()
                .filter(supplier::Column::Id.is_in(supplier_ids))
                .all(db)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to fetch suppliers for enrichment");
                    ServiceError::DatabaseError(e)
                })?
                .into_iter()
                .map(|s| (s.id, s))
                .collect()
        };

        Ok(requests
            .into_iter()
            .map(|request| {
                let product = products.get(&request.product_id);
                let supplier_name = request
                    .supplier_id
                    .and_then(|id| suppliers.get(&id))
                    .map(|s| s.name.clone());
                PurchaseRequestDetail {
                    id: request.id,
                    request_number: request.request_number,
                    product_id: request.product_id,
                    product_sku: product.map(|p| p.sku.clone()).unwrap_or_default(),
                    product_name: product.map(|p| p.name.clone()).unwrap_or_default(),
                    supplier_id: request.supplier_id,
                    supplier_name,
                    requested_qty: request.requested_qty,
                    current_stock: request.current_stock,
                    reorder_point: request.reorder_point,
                    estimated_cost: request.estimated_cost,
                    priority: request.priority,
                    source: request.source,
                    status: request.status,
                    notes: request.notes,
                    approved_by: request.approved_by,
                    approved_at: request.approved_at,
                    purchase_order_id: request.purchase_order_id,
                    created_at: request.created_at,
                    updated_at: request.updated_at,
                }
            })
            .collect())
    }
}

fn request_number(id: Uuid) -> String {
    format!("PR-{}", id.to_string()[..8].to_uppercase())
}

fn order_number(id: Uuid) -> String {
    format!("PO-{}", id.to_string()[..8].to_uppercase())
}
