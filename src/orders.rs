// =============================================================================
// ORDERS MODULE
// =============================================================================
// Order placement and the admin status workflow.
//
// PLACEMENT PIPELINE:
//   1. normalize + validate the request (no storage access on failure)
//   2. hand an `OrderDraft` to the store, which inside one transaction
//      locks the products, runs `resolve_lines`, inserts the order and its
//      items and decrements stock
//   3. after commit, queue the confirmation email (best effort)
// =============================================================================

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

use crate::error::{field_errors, AppError, AppResult, FieldError};
use crate::metrics;
use crate::models::{Order, OrderDetails, OrderFilter, OrderStatus, Page, PlaceOrderRequest, Product};
use crate::notify::Notifier;
use crate::store::Store;

/// Prefix of every order number: `ZOE-YYYYMMDD-NNNN`
pub const ORDER_NUMBER_PREFIX: &str = "ZOE";

/// Attempts at finding a free order number before giving up
const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

// =============================================================================
// PLACEMENT TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerDetails {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub delivery_address: String,
    pub city: String,
    pub notes: Option<String>,
}

/// One `(productId, quantity)` pair as submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// A validated order, ready to be persisted
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order_number: String,
    pub customer: CustomerDetails,
    pub lines: Vec<RequestedLine>,
}

/// A line with its unit price frozen at resolution time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrder {
    pub lines: Vec<ResolvedLine>,
    pub total_amount: i64,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Trims text fields and drops blank optionals.
pub fn normalize(mut request: PlaceOrderRequest) -> PlaceOrderRequest {
    fn trimmed(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    request.customer_name = request.customer_name.trim().to_string();
    request.customer_phone = request.customer_phone.trim().to_string();
    request.delivery_address = request.delivery_address.trim().to_string();
    request.city = request.city.trim().to_string();
    request.customer_email = trimmed(request.customer_email);
    request.notes = trimmed(request.notes);
    request
}

/// Checks every field and item, reporting all offending fields at once.
pub fn validate_order_request(request: &PlaceOrderRequest) -> AppResult<()> {
    let mut errors: Vec<FieldError> = match request.validate() {
        Ok(()) => Vec::new(),
        Err(e) => field_errors(&e, ""),
    };

    if request.items.is_empty() {
        errors.push(FieldError::new("items", "at least one item is required"));
    }
    for (index, item) in request.items.iter().enumerate() {
        if let Err(e) = item.validate() {
            errors.extend(field_errors(&e, &format!("items[{index}].")));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

/// Resolves requested lines against current stock, in submission order.
///
/// `stock` must hold the current row of every product the draft references
/// (missing entries mean the product does not exist). When the same product
/// appears on several lines, later lines only see what earlier lines left.
pub fn resolve_lines(
    lines: &[RequestedLine],
    stock: &HashMap<Uuid, Product>,
) -> AppResult<ResolvedOrder> {
    let mut remaining: HashMap<Uuid, i32> = HashMap::new();
    let mut resolved = Vec::with_capacity(lines.len());
    let mut total_amount: i64 = 0;

    for line in lines {
        let product = stock
            .get(&line.product_id)
            .ok_or_else(|| AppError::NotFound(format!("Product not found: {}", line.product_id)))?;

        if product.quantity <= 0 {
            return Err(AppError::OutOfStock {
                product: product.name.clone(),
            });
        }

        let available = remaining.entry(product.id).or_insert(product.quantity);
        if line.quantity > *available {
            return Err(AppError::InsufficientStock {
                product: product.name.clone(),
                available: *available,
                requested: line.quantity,
            });
        }
        *available -= line.quantity;

        total_amount = product
            .price
            .checked_mul(i64::from(line.quantity))
            .and_then(|line_total| total_amount.checked_add(line_total))
            .ok_or_else(|| AppError::BusinessRule("Order total is too large".to_string()))?;

        resolved.push(ResolvedLine {
            product_id: product.id,
            quantity: line.quantity,
            unit_price: product.price,
        });
    }

    Ok(ResolvedOrder {
        lines: resolved,
        total_amount,
    })
}

/// `ZOE-YYYYMMDD-NNNN` with a random four-digit suffix.
///
/// Not unique by construction; the store enforces uniqueness and the service
/// retries with a fresh number on conflict.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(1000..=9999);
    format!("{ORDER_NUMBER_PREFIX}-{}-{suffix}", now.format("%Y%m%d"))
}

// =============================================================================
// ORDER SERVICE
// =============================================================================

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    notifier: Notifier,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Validates and persists an order, then queues its confirmation.
    ///
    /// Totals and unit prices come from the product rows, never from the
    /// client. A failed confirmation never fails the order.
    pub async fn place_order(&self, request: PlaceOrderRequest) -> AppResult<OrderDetails> {
        let request = normalize(request);
        if let Err(e) = validate_order_request(&request) {
            metrics::record_order(e.code());
            return Err(e);
        }

        let customer = CustomerDetails {
            name: request.customer_name,
            phone: request.customer_phone,
            email: request.customer_email,
            delivery_address: request.delivery_address,
            city: request.city,
            notes: request.notes,
        };
        let lines: Vec<RequestedLine> = request
            .items
            .iter()
            .map(|item| RequestedLine {
                product_id: item.product_id,
                quantity: item.quantity,
            })
            .collect();

        let start = Instant::now();
        let mut attempt = 0;
        let details = loop {
            attempt += 1;
            let draft = OrderDraft {
                order_number: generate_order_number(Utc::now()),
                customer: customer.clone(),
                lines: lines.clone(),
            };

            match self.store.place_order(&draft).await {
                Ok(details) => break details,
                Err(AppError::OrderNumberTaken) if attempt < MAX_ORDER_NUMBER_ATTEMPTS => {
                    tracing::warn!(
                        order_number = %draft.order_number,
                        attempt,
                        "Order number collision, retrying"
                    );
                }
                Err(AppError::OrderNumberTaken) => {
                    metrics::record_order("INTERNAL_ERROR");
                    return Err(AppError::Internal(format!(
                        "no free order number after {MAX_ORDER_NUMBER_ATTEMPTS} attempts"
                    )));
                }
                Err(e) => {
                    metrics::record_order(e.code());
                    return Err(e);
                }
            }
        };
        metrics::record_db_transaction("place_order", start.elapsed().as_secs_f64());
        metrics::record_order("placed");
        metrics::record_order_value(details.order.total_amount);
        for item in &details.items {
            let product = &item.product.product;
            metrics::set_stock_level(&product.slug, product.quantity);
        }

        tracing::info!(
            order_number = %details.order.order_number,
            total_amount = details.order.total_amount,
            items = details.items.len(),
            "Order placed"
        );

        self.notifier.order_placed(&details);

        Ok(details)
    }

    pub async fn find_by_number(&self, order_number: &str) -> AppResult<OrderDetails> {
        self.store
            .order_by_number(order_number)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order not found: {order_number}")))
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<OrderDetails> {
        self.store
            .order_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order not found: {id}")))
    }

    pub async fn list(&self, filter: &OrderFilter) -> AppResult<Page<Order>> {
        self.store.list_orders(filter).await
    }

    /// Moves an order along `pending → confirmed → delivered`, or to
    /// `cancelled` from a non-terminal status. Setting the current status
    /// again is a no-op.
    pub async fn update_status(&self, id: Uuid, next: OrderStatus) -> AppResult<Order> {
        let current = self.find_by_id(id).await?.order;

        if current.status == next {
            return Ok(current);
        }
        if !current.status.can_transition_to(next) {
            return Err(AppError::BusinessRule(format!(
                "Cannot change order status from {} to {}",
                current.status.as_str(),
                next.as_str()
            )));
        }

        let updated = self
            .store
            .update_order_status(id, current.status, next)
            .await?
            .ok_or_else(|| {
                AppError::BusinessRule(
                    "Order status was changed by another request, reload and retry".to_string(),
                )
            })?;

        tracing::info!(
            order_number = %updated.order_number,
            from = current.status.as_str(),
            to = next.as_str(),
            "Order status updated"
        );
        Ok(updated)
    }
}
