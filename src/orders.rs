//! Order model and the remote order writer.

use tracing::{error, info};

use crate::appsheet::Backend;

/// A single line item of an order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub product_name: String,
    pub quantity: i64,
    pub unit_value: f64,
    /// `quantity * unit_value`, fixed at the moment the item was added.
    pub line_value: f64,
}

/// The order accumulated over one conversation.
#[derive(Debug, Clone)]
pub struct Order {
    /// Millisecond-epoch id assigned when the session is created.
    pub order_id: String,
    pub customer_name: String,
    pub address: String,
    pub phone: String,
    pub items: Vec<OrderItem>,
    /// Invariant: equals the sum of every item's `line_value`.
    pub total: f64,
    /// Creation date, `YYYY-MM-DD`.
    pub date: String,
}

impl Order {
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        Self {
            order_id: now.timestamp_millis().to_string(),
            customer_name: String::new(),
            address: String::new(),
            phone: String::new(),
            items: Vec::new(),
            total: 0.0,
            date: now.format("%Y-%m-%d").to_string(),
        }
    }

    /// Append a line item and add its value to the running total. Returns
    /// the line value for the confirmation message.
    pub fn add_item(&mut self, product_name: &str, quantity: i64, unit_value: f64) -> f64 {
        let line_value = unit_value * quantity as f64;
        self.items.push(OrderItem {
            product_name: product_name.to_string(),
            quantity,
            unit_value,
            line_value,
        });
        self.total += line_value;
        line_value
    }
}

impl Default for Order {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a currency amount the way the chat messages show it: whole values
/// without decimals, fractional values with two.
pub fn format_money(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Serialize the accumulated order to the two remote tables: detail rows
/// first, then the header row, as two sequential calls.
///
/// Either failure logs and returns `false`. A header is never written after
/// a failed detail write, but detail rows already persisted when the header
/// write fails are left in place: there is no rollback and no retry, so the
/// backend can hold detail rows without a matching header.
pub async fn save_order(backend: &dyn Backend, order: &Order) -> bool {
    if let Err(e) = backend.add_order_details(order).await {
        error!(order_id = %order.order_id, error = %e, "Failed to save order detail rows");
        return false;
    }

    if let Err(e) = backend.add_order_header(order).await {
        error!(order_id = %order.order_id, error = %e, "Failed to save order header");
        return false;
    }

    info!(order_id = %order.order_id, items = order.items.len(), total = order.total, "Order saved");
    true
}
