// =============================================================================
// MODELS MODULE
// =============================================================================
// Data structures shared by the store, the services and the HTTP layer.
//
// Row types derive `FromRow` so SQLx can map query results onto them.
// Everything that leaves the service serializes in camelCase because the
// storefront and admin single-page apps consume it directly.
// =============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// =============================================================================
// ENUMS
// =============================================================================

/// Derived availability of a product. Always equal to `quantity > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    OutOfStock,
}

impl StockStatus {
    pub fn from_quantity(quantity: i32) -> Self {
        if quantity > 0 {
            StockStatus::InStock
        } else {
            StockStatus::OutOfStock
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::OutOfStock => "out_of_stock",
        }
    }
}

impl TryFrom<String> for StockStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "in_stock" => Ok(StockStatus::InStock),
            "out_of_stock" => Ok(StockStatus::OutOfStock),
            other => Err(format!("unknown stock status: {other}")),
        }
    }
}

/// Lifecycle of an order.
///
/// ```text
/// pending ──► confirmed ──► delivered
///    │            │
///    └────────────┴──► cancelled
/// ```
/// `delivered` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Whether an admin may move an order from `self` to `next`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Delivered) | (Confirmed, Cancelled)
        )
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// The shop only takes cash on delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }
}

impl TryFrom<String> for PaymentMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(format!("unknown payment method: {other}")),
        }
    }
}

// =============================================================================
// CATALOG
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    /// Display rank on the storefront (ascending)
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Collection listing entry with the number of products it owns
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub collection: Collection,
    pub product_count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionWithProducts {
    #[serde(flatten)]
    pub collection: Collection,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub collection_id: Option<Uuid>,
    pub name: String,
    /// Unique, derived from name and color
    pub slug: String,
    pub color: String,
    /// Unit price in the shop currency
    pub price: i64,
    /// Free-form label such as "3 pieces"
    pub pieces: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    /// Authoritative count of sellable units, never negative
    pub quantity: i32,
    #[sqlx(try_from = "String")]
    pub stock_status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithCollection {
    #[serde(flatten)]
    pub product: Product,
    pub collection: Option<Collection>,
}

// =============================================================================
// ORDERS
// =============================================================================

/// Immutable once created, except for `status`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    /// Human-readable reference, e.g. `ZOE-20261018-4821`
    pub order_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub delivery_address: String,
    pub city: String,
    pub notes: Option<String>,
    /// Sum of `price * quantity` over the items, computed server-side
    pub total_amount: i64,
    #[sqlx(try_from = "String")]
    pub status: OrderStatus,
    #[sqlx(try_from = "String")]
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    /// Unit price copied from the product when the order was placed
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDetails {
    #[serde(flatten)]
    pub item: OrderItem,
    pub product: ProductWithCollection,
}

/// An order with its items, their products and those products' collections
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetails>,
}

// =============================================================================
// CONTENT & SETTINGS
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PageContent {
    pub id: Uuid,
    /// Page identifier such as "home" or "about"
    pub key: String,
    pub title: String,
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SiteSetting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// API REQUEST STRUCTURES
// =============================================================================

/// Body of `POST /orders`.
///
/// Required text fields default to empty so a missing field is reported as
/// a field error by validation rather than as a JSON decoding failure.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub customer_name: String,

    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub customer_phone: String,

    #[validate(email(message = "must be a valid email address"))]
    pub customer_email: Option<String>,

    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub delivery_address: String,

    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub city: String,

    pub notes: Option<String>,

    #[serde(default)]
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: Uuid,

    #[serde(default)]
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

/// Body of `POST /admin/products` and `PUT /admin/products/:id`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub name: String,

    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub color: String,

    #[validate(range(min = 0, message = "must not be negative"))]
    pub price: i64,

    pub pieces: Option<String>,
    pub description: Option<String>,

    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub quantity: i32,

    pub collection_id: Option<Uuid>,
}

/// Body of `POST /admin/collections` and `PUT /admin/collections/:id`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInput {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    #[serde(default)]
    pub sort_order: i32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PageContentInput {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub key: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Body of `PUT /admin/content/:key`; the key comes from the path
#[derive(Debug, Clone, Deserialize)]
pub struct PageContentUpdate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingInput {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDescriptionRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GeneratePageRequest {
    #[serde(default)]
    #[validate(custom = "not_blank")]
    pub page: String,
    /// Optional free-text direction for the copywriter
    pub brief: Option<String>,
}

/// Rejects empty and whitespace-only strings.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be empty".into());
        return Err(err);
    }
    Ok(())
}

// =============================================================================
// QUERY FILTERS
// =============================================================================

/// Catalog filter for `GET /products`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
    pub collection: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub stock_status: Option<StockStatus>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub limit: i64,
    pub offset: i64,
}

// =============================================================================
// API RESPONSE STRUCTURES
// =============================================================================

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub confirmed_orders: i64,
    pub delivered_orders: i64,
    pub cancelled_orders: i64,
    /// Sum of totals over orders that were not cancelled
    pub revenue: i64,
    pub total_products: i64,
    pub low_stock_products: i64,
    pub out_of_stock_products: i64,
}

// =============================================================================
// HEALTH CHECK RESPONSES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    pub database: bool,
    /// `None` when no redis is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis: Option<bool>,
}
