// Demand and replenishment math
pub mod reorder_point;
pub mod sales_velocity;
pub mod suggestions;
pub mod supplier_ranking;

// Purchasing lifecycle
pub mod purchase_orders;
pub mod purchase_requests;
pub mod supplier_offers;
