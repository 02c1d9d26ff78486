// =============================================================================
// STORE MODULE
// =============================================================================
// The relational store is the only shared mutable resource of the service.
// Everything that reads or writes it goes through the `Store` trait, so the
// entry point decides which backend the services get.
//
// - `postgres`: the production backend (SQLx connection pool)
// - `memory`:   an in-process backend the test suite runs against
//
// LEARNING NOTE:
// Plain `async fn` in a trait is not object safe, so `Arc<dyn Store>` would
// not compile. `#[async_trait]` rewrites each method to return a boxed
// future, which makes the trait usable behind a pointer.
// =============================================================================

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::catalog::{CollectionRecord, ProductRecord};
use crate::error::{AppError, AppResult};
use crate::models::{
    Collection, CollectionSummary, CollectionWithProducts, DashboardStats, Order, OrderDetails,
    OrderFilter, OrderStatus, Page, PageContent, Product, ProductFilter, ProductWithCollection,
    SiteSetting,
};
use crate::orders::OrderDraft;

pub use postgres::PgStore;

// -----------------------------------------------------------------------------
// SHARED ERRORS
// -----------------------------------------------------------------------------
// Both backends report the same rule violations with the same wording.

pub(crate) fn product_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Product not found: {id}"))
}

pub(crate) fn collection_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Collection not found: {id}"))
}

pub(crate) fn duplicate_slug(kind: &str, slug: &str) -> AppError {
    AppError::BusinessRule(format!("A {kind} with slug '{slug}' already exists"))
}

pub(crate) fn product_has_orders() -> AppError {
    AppError::BusinessRule("Product appears on existing orders and cannot be deleted".to_string())
}

pub(crate) fn collection_has_products() -> AppError {
    AppError::BusinessRule("Collection still has products and cannot be deleted".to_string())
}

pub(crate) fn duplicate_page_key(key: &str) -> AppError {
    AppError::BusinessRule(format!("Page content '{key}' already exists"))
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for logs
    fn backend_tag(&self) -> &'static str;

    async fn health_check(&self) -> bool;

    // -------------------------------------------------------------------------
    // CATALOG READS
    // -------------------------------------------------------------------------
    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Page<ProductWithCollection>>;

    async fn product_by_slug(&self, slug: &str) -> AppResult<Option<ProductWithCollection>>;

    async fn product_by_id(&self, id: Uuid) -> AppResult<Option<Product>>;

    async fn list_collections(&self) -> AppResult<Vec<CollectionSummary>>;

    async fn collection_by_slug(&self, slug: &str) -> AppResult<Option<CollectionWithProducts>>;

    // -------------------------------------------------------------------------
    // CATALOG ADMIN
    // -------------------------------------------------------------------------
    /// Fails with `BusinessRule` on a duplicate slug and `NotFound` when the
    /// referenced collection does not exist.
    async fn create_product(&self, record: &ProductRecord) -> AppResult<Product>;

    async fn update_product(&self, id: Uuid, record: &ProductRecord) -> AppResult<Product>;

    /// Refused while any order item references the product.
    async fn delete_product(&self, id: Uuid) -> AppResult<()>;

    async fn create_collection(&self, record: &CollectionRecord) -> AppResult<Collection>;

    async fn update_collection(&self, id: Uuid, record: &CollectionRecord) -> AppResult<Collection>;

    /// Refused while the collection owns products.
    async fn delete_collection(&self, id: Uuid) -> AppResult<()>;

    async fn dashboard_stats(&self) -> AppResult<DashboardStats>;

    // -------------------------------------------------------------------------
    // ORDERS
    // -------------------------------------------------------------------------
    /// Places an order as one unit of work: resolves every line against the
    /// current stock, inserts the order and its items and decrements stock.
    /// Either all of it persists or none of it does. Concurrent placements
    /// against the same product are serialized by the backend.
    async fn place_order(&self, draft: &OrderDraft) -> AppResult<OrderDetails>;

    async fn order_by_number(&self, order_number: &str) -> AppResult<Option<OrderDetails>>;

    async fn order_by_id(&self, id: Uuid) -> AppResult<Option<OrderDetails>>;

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Page<Order>>;

    /// Sets `to` only if the order is still in status `from`.
    /// `None` means the order is missing or its status moved underneath us.
    async fn update_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> AppResult<Option<Order>>;

    // -------------------------------------------------------------------------
    // CONTENT & SETTINGS
    // -------------------------------------------------------------------------
    async fn list_page_content(&self) -> AppResult<Vec<PageContent>>;

    async fn page_content(&self, key: &str) -> AppResult<Option<PageContent>>;

    /// Fails with `BusinessRule` if the key already exists.
    async fn create_page_content(
        &self,
        key: &str,
        title: &str,
        content: &serde_json::Value,
    ) -> AppResult<PageContent>;

    async fn update_page_content(
        &self,
        key: &str,
        title: &str,
        content: &serde_json::Value,
    ) -> AppResult<Option<PageContent>>;

    async fn list_settings(&self) -> AppResult<Vec<SiteSetting>>;

    async fn upsert_setting(&self, key: &str, value: &str) -> AppResult<SiteSetting>;
}
