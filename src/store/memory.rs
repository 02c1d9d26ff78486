// =============================================================================
// IN-MEMORY STORE
// =============================================================================
// Test backend. A single mutex serializes every operation, which gives the
// same guarantees the Postgres row locks give order placement. Multi-step
// writes run against a copy of the state that replaces the live state only
// when every step succeeded.
// =============================================================================

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    collection_has_products, collection_not_found, duplicate_page_key, duplicate_slug,
    product_has_orders, product_not_found, Store,
};
use crate::catalog::{CollectionRecord, ProductRecord, LOW_STOCK_THRESHOLD};
use crate::error::{AppError, AppResult};
use crate::models::{
    Collection, CollectionSummary, CollectionWithProducts, DashboardStats, Order, OrderDetails,
    OrderFilter, OrderItem, OrderItemDetails, OrderStatus, Page, PageContent, PaymentMethod,
    Product, ProductFilter, ProductWithCollection, SiteSetting, StockStatus,
};
use crate::orders::{resolve_lines, OrderDraft};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    collections: Vec<Collection>,
    products: Vec<Product>,
    orders: Vec<Order>,
    items: Vec<OrderItem>,
    pages: Vec<PageContent>,
    settings: BTreeMap<String, SiteSetting>,
}

/// Injected failures
#[derive(Debug, Default)]
struct Faults {
    failing_stock_updates: HashSet<Uuid>,
    rejected_order_numbers: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    faults: Mutex<Faults>,
}

// -----------------------------------------------------------------------------
// TEST HELPERS
// -----------------------------------------------------------------------------

impl MemoryStore {
    /// Inserts a product row as given, bypassing admin validation.
    pub async fn insert_product(&self, product: Product) -> Product {
        self.state.lock().await.products.push(product.clone());
        product
    }

    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Makes every stock decrement of `product_id` fail with a storage error.
    pub async fn fail_stock_update_for(&self, product_id: Uuid) {
        self.faults
            .lock()
            .await
            .failing_stock_updates
            .insert(product_id);
    }

    /// The next `count` placements fail as if their order number were taken.
    pub async fn reject_next_order_numbers(&self, count: usize) {
        self.faults.lock().await.rejected_order_numbers = count;
    }

    pub async fn set_price(&self, product_id: Uuid, price: i64) {
        let mut state = self.state.lock().await;
        if let Some(product) = state.products.iter_mut().find(|p| p.id == product_id) {
            product.price = price;
            product.updated_at = Utc::now();
        }
    }
}

// -----------------------------------------------------------------------------
// READ HELPERS
// -----------------------------------------------------------------------------

impl MemoryState {
    fn collection(&self, id: Option<Uuid>) -> Option<Collection> {
        let id = id?;
        self.collections.iter().find(|c| c.id == id).cloned()
    }

    fn with_collection(&self, product: &Product) -> ProductWithCollection {
        ProductWithCollection {
            product: product.clone(),
            collection: self.collection(product.collection_id),
        }
    }

    fn details(&self, order: &Order) -> AppResult<OrderDetails> {
        let items = self
            .items
            .iter()
            .filter(|i| i.order_id == order.id)
            .map(|item| {
                let product = self
                    .products
                    .iter()
                    .find(|p| p.id == item.product_id)
                    .ok_or_else(|| product_not_found(item.product_id))?;
                Ok(OrderItemDetails {
                    item: item.clone(),
                    product: self.with_collection(product),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(OrderDetails {
            order: order.clone(),
            items,
        })
    }

    fn slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.products
            .iter()
            .any(|p| p.slug == slug && Some(p.id) != except)
    }

    fn collection_slug_taken(&self, slug: &str, except: Option<Uuid>) -> bool {
        self.collections
            .iter()
            .any(|c| c.slug == slug && Some(c.id) != except)
    }

    fn check_collection_exists(&self, id: Option<Uuid>) -> AppResult<()> {
        match id {
            Some(id) if !self.collections.iter().any(|c| c.id == id) => {
                Err(collection_not_found(id))
            }
            _ => Ok(()),
        }
    }
}

fn paginate<T: Clone>(rows: Vec<T>, limit: i64, offset: i64) -> Page<T> {
    let total = rows.len() as i64;
    let items = rows
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    Page {
        items,
        total,
        limit,
        offset,
    }
}

fn matches_filter(state: &MemoryState, product: &Product, filter: &ProductFilter) -> bool {
    if let Some(slug) = &filter.collection {
        let in_collection = state
            .collection(product.collection_id)
            .map(|c| &c.slug == slug)
            .unwrap_or(false);
        if !in_collection {
            return false;
        }
    }
    if filter.min_price.is_some_and(|min| product.price < min) {
        return false;
    }
    if filter.max_price.is_some_and(|max| product.price > max) {
        return false;
    }
    if filter.stock_status.is_some_and(|s| product.stock_status != s) {
        return false;
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let haystack = format!(
            "{} {} {}",
            product.name,
            product.color,
            product.description.as_deref().unwrap_or("")
        )
        .to_lowercase();
        if !haystack.contains(&needle) {
            return false;
        }
    }
    true
}

// =============================================================================
// STORE IMPLEMENTATION
// =============================================================================

#[async_trait]
impl Store for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn list_products(&self, filter: &ProductFilter) -> AppResult<Page<ProductWithCollection>> {
        let state = self.state.lock().await;
        let mut rows: Vec<&Product> = state
            .products
            .iter()
            .filter(|p| matches_filter(&state, p, filter))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.name.cmp(&b.name)));
        let rows: Vec<ProductWithCollection> =
            rows.into_iter().map(|p| state.with_collection(p)).collect();
        Ok(paginate(rows, filter.limit, filter.offset))
    }

    async fn product_by_slug(&self, slug: &str) -> AppResult<Option<ProductWithCollection>> {
        let state = self.state.lock().await;
        Ok(state
            .products
            .iter()
            .find(|p| p.slug == slug)
            .map(|p| state.with_collection(p)))
    }

    async fn product_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        let state = self.state.lock().await;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_collections(&self) -> AppResult<Vec<CollectionSummary>> {
        let state = self.state.lock().await;
        let mut rows: Vec<CollectionSummary> = state
            .collections
            .iter()
            .map(|c| CollectionSummary {
                collection: c.clone(),
                product_count: state
                    .products
                    .iter()
                    .filter(|p| p.collection_id == Some(c.id))
                    .count() as i64,
            })
            .collect();
        rows.sort_by(|a, b| {
            a.collection
                .sort_order
                .cmp(&b.collection.sort_order)
                .then(a.collection.name.cmp(&b.collection.name))
        });
        Ok(rows)
    }

    async fn collection_by_slug(&self, slug: &str) -> AppResult<Option<CollectionWithProducts>> {
        let state = self.state.lock().await;
        let Some(collection) = state.collections.iter().find(|c| c.slug == slug) else {
            return Ok(None);
        };
        let mut products: Vec<Product> = state
            .products
            .iter()
            .filter(|p| p.collection_id == Some(collection.id))
            .cloned()
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.name.cmp(&b.name)));
        Ok(Some(CollectionWithProducts {
            collection: collection.clone(),
            products,
        }))
    }

    async fn create_product(&self, record: &ProductRecord) -> AppResult<Product> {
        let mut state = self.state.lock().await;
        if state.slug_taken(&record.slug, None) {
            return Err(duplicate_slug("product", &record.slug));
        }
        state.check_collection_exists(record.collection_id)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            collection_id: record.collection_id,
            name: record.name.clone(),
            slug: record.slug.clone(),
            color: record.color.clone(),
            price: record.price,
            pieces: record.pieces.clone(),
            description: record.description.clone(),
            images: record.images.clone(),
            quantity: record.quantity,
            stock_status: StockStatus::from_quantity(record.quantity),
            created_at: now,
            updated_at: now,
        };
        state.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, record: &ProductRecord) -> AppResult<Product> {
        let mut state = self.state.lock().await;
        if state.slug_taken(&record.slug, Some(id)) {
            return Err(duplicate_slug("product", &record.slug));
        }
        state.check_collection_exists(record.collection_id)?;

        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| product_not_found(id))?;
        product.collection_id = record.collection_id;
        product.name = record.name.clone();
        product.slug = record.slug.clone();
        product.color = record.color.clone();
        product.price = record.price;
        product.pieces = record.pieces.clone();
        product.description = record.description.clone();
        product.images = record.images.clone();
        product.quantity = record.quantity;
        product.stock_status = StockStatus::from_quantity(record.quantity);
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if !state.products.iter().any(|p| p.id == id) {
            return Err(product_not_found(id));
        }
        if state.items.iter().any(|i| i.product_id == id) {
            return Err(product_has_orders());
        }
        state.products.retain(|p| p.id != id);
        Ok(())
    }

    async fn create_collection(&self, record: &CollectionRecord) -> AppResult<Collection> {
        let mut state = self.state.lock().await;
        if state.collection_slug_taken(&record.slug, None) {
            return Err(duplicate_slug("collection", &record.slug));
        }
        let now = Utc::now();
        let collection = Collection {
            id: Uuid::new_v4(),
            name: record.name.clone(),
            slug: record.slug.clone(),
            description: record.description.clone(),
            image: record.image.clone(),
            sort_order: record.sort_order,
            created_at: now,
            updated_at: now,
        };
        state.collections.push(collection.clone());
        Ok(collection)
    }

    async fn update_collection(&self, id: Uuid, record: &CollectionRecord) -> AppResult<Collection> {
        let mut state = self.state.lock().await;
        if state.collection_slug_taken(&record.slug, Some(id)) {
            return Err(duplicate_slug("collection", &record.slug));
        }
        let collection = state
            .collections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| collection_not_found(id))?;
        collection.name = record.name.clone();
        collection.slug = record.slug.clone();
        collection.description = record.description.clone();
        collection.image = record.image.clone();
        collection.sort_order = record.sort_order;
        collection.updated_at = Utc::now();
        Ok(collection.clone())
    }

    async fn delete_collection(&self, id: Uuid) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if !state.collections.iter().any(|c| c.id == id) {
            return Err(collection_not_found(id));
        }
        if state.products.iter().any(|p| p.collection_id == Some(id)) {
            return Err(collection_has_products());
        }
        state.collections.retain(|c| c.id != id);
        Ok(())
    }

    async fn dashboard_stats(&self) -> AppResult<DashboardStats> {
        let state = self.state.lock().await;
        let count = |status: OrderStatus| state.orders.iter().filter(|o| o.status == status).count() as i64;
        Ok(DashboardStats {
            total_orders: state.orders.len() as i64,
            pending_orders: count(OrderStatus::Pending),
            confirmed_orders: count(OrderStatus::Confirmed),
            delivered_orders: count(OrderStatus::Delivered),
            cancelled_orders: count(OrderStatus::Cancelled),
            revenue: state
                .orders
                .iter()
                .filter(|o| o.status != OrderStatus::Cancelled)
                .map(|o| o.total_amount)
                .sum(),
            total_products: state.products.len() as i64,
            low_stock_products: state
                .products
                .iter()
                .filter(|p| p.quantity > 0 && p.quantity <= LOW_STOCK_THRESHOLD)
                .count() as i64,
            out_of_stock_products: state.products.iter().filter(|p| p.quantity <= 0).count() as i64,
        })
    }

    // -------------------------------------------------------------------------
    // ORDERS
    // -------------------------------------------------------------------------

    async fn place_order(&self, draft: &OrderDraft) -> AppResult<OrderDetails> {
        let mut state = self.state.lock().await;
        let mut faults = self.faults.lock().await;

        if faults.rejected_order_numbers > 0 {
            faults.rejected_order_numbers -= 1;
            return Err(AppError::OrderNumberTaken);
        }
        if state.orders.iter().any(|o| o.order_number == draft.order_number) {
            return Err(AppError::OrderNumberTaken);
        }

        let stock: HashMap<Uuid, Product> = state
            .products
            .iter()
            .filter(|p| draft.lines.iter().any(|l| l.product_id == p.id))
            .map(|p| (p.id, p.clone()))
            .collect();
        let resolved = resolve_lines(&draft.lines, &stock)?;

        // Work on a copy; it replaces the live state only on success
        let mut tx = state.clone();
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            order_number: draft.order_number.clone(),
            customer_name: draft.customer.name.clone(),
            customer_phone: draft.customer.phone.clone(),
            customer_email: draft.customer.email.clone(),
            delivery_address: draft.customer.delivery_address.clone(),
            city: draft.customer.city.clone(),
            notes: draft.customer.notes.clone(),
            total_amount: resolved.total_amount,
            status: OrderStatus::Pending,
            payment_method: PaymentMethod::CashOnDelivery,
            created_at: now,
            updated_at: now,
        };
        tx.orders.push(order.clone());

        for line in &resolved.lines {
            tx.items.push(OrderItem {
                id: Uuid::new_v4(),
                order_id: order.id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.unit_price,
                created_at: now,
            });
        }

        for line in &resolved.lines {
            if faults.failing_stock_updates.contains(&line.product_id) {
                return Err(AppError::Internal(format!(
                    "stock update failed for product {}",
                    line.product_id
                )));
            }
            let product = tx
                .products
                .iter_mut()
                .find(|p| p.id == line.product_id)
                .ok_or_else(|| product_not_found(line.product_id))?;
            if product.quantity < line.quantity {
                return Err(AppError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.quantity,
                    requested: line.quantity,
                });
            }
            product.quantity -= line.quantity;
            product.stock_status = StockStatus::from_quantity(product.quantity);
            product.updated_at = now;
        }

        let details = tx.details(&order)?;
        *state = tx;
        Ok(details)
    }

    async fn order_by_number(&self, order_number: &str) -> AppResult<Option<OrderDetails>> {
        let state = self.state.lock().await;
        state
            .orders
            .iter()
            .find(|o| o.order_number == order_number)
            .map(|o| state.details(o))
            .transpose()
    }

    async fn order_by_id(&self, id: Uuid) -> AppResult<Option<OrderDetails>> {
        let state = self.state.lock().await;
        state
            .orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| state.details(o))
            .transpose()
    }

    async fn list_orders(&self, filter: &OrderFilter) -> AppResult<Page<Order>> {
        let state = self.state.lock().await;
        let mut rows: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| filter.status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(rows, filter.limit, filter.offset))
    }

    async fn update_order_status(
        &self,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> AppResult<Option<Order>> {
        let mut state = self.state.lock().await;
        Ok(state
            .orders
            .iter_mut()
            .find(|o| o.id == id && o.status == from)
            .map(|order| {
                order.status = to;
                order.updated_at = Utc::now();
                order.clone()
            }))
    }

    // -------------------------------------------------------------------------
    // CONTENT & SETTINGS
    // -------------------------------------------------------------------------

    async fn list_page_content(&self) -> AppResult<Vec<PageContent>> {
        let state = self.state.lock().await;
        let mut pages = state.pages.clone();
        pages.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(pages)
    }

    async fn page_content(&self, key: &str) -> AppResult<Option<PageContent>> {
        let state = self.state.lock().await;
        Ok(state.pages.iter().find(|p| p.key == key).cloned())
    }

    async fn create_page_content(
        &self,
        key: &str,
        title: &str,
        content: &serde_json::Value,
    ) -> AppResult<PageContent> {
        let mut state = self.state.lock().await;
        if state.pages.iter().any(|p| p.key == key) {
            return Err(duplicate_page_key(key));
        }
        let now = Utc::now();
        let page = PageContent {
            id: Uuid::new_v4(),
            key: key.to_string(),
            title: title.to_string(),
            content: content.clone(),
            created_at: now,
            updated_at: now,
        };
        state.pages.push(page.clone());
        Ok(page)
    }

    async fn update_page_content(
        &self,
        key: &str,
        title: &str,
        content: &serde_json::Value,
    ) -> AppResult<Option<PageContent>> {
        let mut state = self.state.lock().await;
        Ok(state.pages.iter_mut().find(|p| p.key == key).map(|page| {
            page.title = title.to_string();
            page.content = content.clone();
            page.updated_at = Utc::now();
            page.clone()
        }))
    }

    async fn list_settings(&self) -> AppResult<Vec<SiteSetting>> {
        let state = self.state.lock().await;
        Ok(state.settings.values().cloned().collect())
    }

    async fn upsert_setting(&self, key: &str, value: &str) -> AppResult<SiteSetting> {
        let mut state = self.state.lock().await;
        let setting = SiteSetting {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now(),
        };
        state.settings.insert(key.to_string(), setting.clone());
        Ok(setting)
    }
}

// =============================================================================
// TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionInput, ProductInput};

    fn product_input(name: &str, price: i64, quantity: i32, collection_id: Option<Uuid>) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            color: "Indigo".to_string(),
            price,
            pieces: None,
            description: None,
            images: Vec::new(),
            quantity,
            collection_id,
        }
    }

    async fn collection(store: &MemoryStore, name: &str) -> Collection {
        let record = CollectionRecord::from_input(CollectionInput {
            name: name.to_string(),
            description: None,
            image: None,
            sort_order: 0,
        })
        .unwrap();
        store.create_collection(&record).await.unwrap()
    }

    #[tokio::test]
    async fn duplicate_product_slug_is_refused() {
        let store = MemoryStore::default();
        let record = ProductRecord::from_input(product_input("Wool Throw", 4800, 2, None)).unwrap();
        store.create_product(&record).await.unwrap();

        let err = store.create_product(&record).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(msg) if msg.contains("wool-throw-indigo")));
    }

    #[tokio::test]
    async fn product_in_missing_collection_is_refused() {
        let store = MemoryStore::default();
        let record =
            ProductRecord::from_input(product_input("Wool Throw", 4800, 2, Some(Uuid::new_v4())))
                .unwrap();
        assert!(matches!(
            store.create_product(&record).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn collection_with_products_cannot_be_deleted() {
        let store = MemoryStore::default();
        let throws = collection(&store, "Throws").await;
        let record =
            ProductRecord::from_input(product_input("Wool Throw", 4800, 2, Some(throws.id))).unwrap();
        let product = store.create_product(&record).await.unwrap();

        assert!(matches!(
            store.delete_collection(throws.id).await,
            Err(AppError::BusinessRule(_))
        ));

        store.delete_product(product.id).await.unwrap();
        store.delete_collection(throws.id).await.unwrap();
        assert!(store.list_collections().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_filters_by_collection_price_and_search() {
        let store = MemoryStore::default();
        let throws = collection(&store, "Throws").await;
        for (name, price, quantity, coll) in [
            ("Wool Throw", 4800, 2, Some(throws.id)),
            ("Linen Throw", 3200, 0, Some(throws.id)),
            ("Cushion Cover", 1200, 5, None),
        ] {
            let record = ProductRecord::from_input(product_input(name, price, quantity, coll)).unwrap();
            store.create_product(&record).await.unwrap();
        }

        let filter = ProductFilter {
            collection: Some("throws".into()),
            limit: 20,
            ..ProductFilter::default()
        };
        assert_eq!(store.list_products(&filter).await.unwrap().total, 2);

        let filter = ProductFilter {
            min_price: Some(1000),
            max_price: Some(4000),
            limit: 20,
            ..ProductFilter::default()
        };
        let page = store.list_products(&filter).await.unwrap();
        assert_eq!(page.total, 2);

        let filter = ProductFilter {
            stock_status: Some(StockStatus::InStock),
            search: Some("throw".into()),
            limit: 20,
            ..ProductFilter::default()
        };
        let page = store.list_products(&filter).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].product.name, "Wool Throw");
        assert_eq!(
            page.items[0].collection.as_ref().map(|c| c.slug.as_str()),
            Some("throws")
        );
    }

    #[tokio::test]
    async fn dashboard_counts_low_and_out_of_stock() {
        let store = MemoryStore::default();
        for (name, quantity) in [("A", 0), ("B", 2), ("C", 3), ("D", 10)] {
            let record = ProductRecord::from_input(product_input(name, 100, quantity, None)).unwrap();
            store.create_product(&record).await.unwrap();
        }
        let stats = store.dashboard_stats().await.unwrap();
        assert_eq!(stats.total_products, 4);
        assert_eq!(stats.low_stock_products, 2);
        assert_eq!(stats.out_of_stock_products, 1);
        assert_eq!(stats.total_orders, 0);
    }

    #[tokio::test]
    async fn page_content_keys_are_unique() {
        let store = MemoryStore::default();
        let body = serde_json::json!({ "heading": "About us" });
        store.create_page_content("about", "About", &body).await.unwrap();
        assert!(matches!(
            store.create_page_content("about", "About", &body).await,
            Err(AppError::BusinessRule(_))
        ));

        let updated = store
            .update_page_content("about", "Our story", &body)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Our story");
        assert!(store
            .update_page_content("missing", "x", &body)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn settings_are_upserted() {
        let store = MemoryStore::default();
        store.upsert_setting("phone", "0550 00 00 00").await.unwrap();
        store.upsert_setting("phone", "0661 11 11 11").await.unwrap();
        let settings = store.list_settings().await.unwrap();
        assert_eq!(settings.len(), 1);
        assert_eq!(settings[0].value, "0661 11 11 11");
    }
}
