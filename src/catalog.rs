// =============================================================================
// CATALOG MODULE
// =============================================================================
// Admin-side catalog rules (slugs, record building) and the query
// parameters of the public listing endpoints.
// =============================================================================

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult, FieldError};
use crate::models::{
    CollectionInput, OrderFilter, OrderStatus, ProductFilter, ProductInput, StockStatus,
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Products at or below this quantity count as low stock on the dashboard
pub const LOW_STOCK_THRESHOLD: i32 = 3;

// -----------------------------------------------------------------------------
// SLUGS
// -----------------------------------------------------------------------------

/// Lower-case ASCII alphanumerics joined by single dashes.
///
/// `slugify(&["Wool Throw", "Deep Indigo"])` → `wool-throw-deep-indigo`
pub fn slugify(parts: &[&str]) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    for c in parts.join(" ").chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn slug_or_fallback(parts: &[&str], kind: &str) -> String {
    let slug = slugify(parts);
    if slug.is_empty() {
        // Names written entirely outside ASCII still need a stable URL
        format!("{kind}-{}", &Uuid::new_v4().simple().to_string()[..8])
    } else {
        slug
    }
}

// -----------------------------------------------------------------------------
// RECORDS
// -----------------------------------------------------------------------------

/// A validated product ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ProductRecord {
    pub name: String,
    pub slug: String,
    pub color: String,
    pub price: i64,
    pub pieces: Option<String>,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub quantity: i32,
    pub collection_id: Option<Uuid>,
}

impl ProductRecord {
    pub fn from_input(input: ProductInput) -> AppResult<Self> {
        input.validate()?;
        let name = input.name.trim().to_string();
        let color = input.color.trim().to_string();
        Ok(Self {
            slug: slug_or_fallback(&[&name, &color], "product"),
            name,
            color,
            price: input.price,
            pieces: non_blank(input.pieces),
            description: non_blank(input.description),
            images: input
                .images
                .into_iter()
                .map(|i| i.trim().to_string())
                .filter(|i| !i.is_empty())
                .collect(),
            quantity: input.quantity,
            collection_id: input.collection_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRecord {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub sort_order: i32,
}

impl CollectionRecord {
    pub fn from_input(input: CollectionInput) -> AppResult<Self> {
        input.validate()?;
        let name = input.name.trim().to_string();
        Ok(Self {
            slug: slug_or_fallback(&[&name], "collection"),
            name,
            description: non_blank(input.description),
            image: non_blank(input.image),
            sort_order: input.sort_order,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// -----------------------------------------------------------------------------
// QUERY PARAMETERS
// -----------------------------------------------------------------------------

/// `GET /products?collection=&minPrice=&maxPrice=&stockStatus=&search=&limit=&offset=`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub collection: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub stock_status: Option<StockStatus>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ProductQuery {
    pub fn into_filter(self) -> AppResult<ProductFilter> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(AppError::Validation(vec![FieldError::new(
                    "minPrice",
                    "must not be greater than maxPrice",
                )]));
            }
        }
        let (limit, offset) = page_bounds(self.limit, self.offset);
        Ok(ProductFilter {
            collection: non_blank(self.collection),
            min_price: self.min_price,
            max_price: self.max_price,
            stock_status: self.stock_status,
            search: non_blank(self.search),
            limit,
            offset,
        })
    }
}

/// `GET /admin/orders?status=&limit=&offset=`
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OrderQuery {
    pub fn into_filter(self) -> OrderFilter {
        let (limit, offset) = page_bounds(self.limit, self.offset);
        OrderFilter {
            status: self.status,
            limit,
            offset,
        }
    }
}

/// Limit clamped to 1..=100 (default 20), offset at least 0
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (
        limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        offset.unwrap_or(0).max(0),
    )
}
