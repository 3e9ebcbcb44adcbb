pub mod inventory_record;
pub mod product;
pub mod purchase_order;
pub mod purchase_order_item;
pub mod purchase_request;
pub mod sales_order;
pub mod sales_order_item;
pub mod supplier;
pub mod supplier_offer;

pub use inventory_record::Entity as InventoryRecord;
pub use product::Entity as Product;
pub use purchase_order::Entity as PurchaseOrder;
pub use purchase_order_item::Entity as PurchaseOrderItem;
pub use purchase_request::Entity as PurchaseRequest;
pub use sales_order::Entity as SalesOrder;
pub use sales_order_item::Entity as SalesOrderItem;
pub use supplier::Entity as Supplier;
pub use supplier_offer::Entity as SupplierOffer;
