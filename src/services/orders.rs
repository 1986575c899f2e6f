//! # Order Tracking Handler
//!
//! Lookup cascade over the free-text message:
//!
//! ```text
//! 1. email in text        → latest order for that email
//! 2. else number (2+ dig) → order with that id
//! 3. nothing found yet    → payment reference or email equal to the whole text
//! ```
//!
//! Raw status codes are normalised through a fixed table; unknown codes read
//! as "Processing".

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::catalog::format_money;
use super::{OrderDirectory, ServiceError};

const ASK_FOR_REFERENCE: &str =
    "Please provide your *order number* or *email address* so I can look it up 💅.";
const NOT_FOUND: &str =
    "🤔 I couldn’t find any order with that tracking number or email. Double-check and try again 💅.";

/// Status code → (label, icon).
const STATUS_TABLE: &[(&str, &str, &str)] = &[
    ("pending", "Pending Payment", "🕓"),
    ("processing", "Processing", "🔧"),
    ("shipped", "Shipped", "📦"),
    ("out_for_delivery", "Out for Delivery", "🚚"),
    ("delivered", "Delivered", "✅"),
    ("delayed", "Delayed", "⚠️"),
    ("cancelled", "Cancelled", "❌"),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub customer_name: String,
    pub email: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub total: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn default_currency() -> String {
    "NGN".to_string()
}

/// Order as rendered in the chat widget.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderCard {
    pub id: String,
    pub status: String,
    pub paid: bool,
    pub total: String,
    pub date: String,
    pub address: Option<String>,
    pub tracking: Option<String>,
    pub customer_name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderLookup {
    pub message: String,
    pub order: Option<OrderCard>,
}

fn email_re() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"[\w.-]+@[\w.-]+\.\w+").unwrap())
}

fn order_id_re() -> &'static Regex {
    static ORDER_ID: OnceLock<Regex> = OnceLock::new();
    ORDER_ID.get_or_init(|| Regex::new(r"\b\d{2,}\b").unwrap())
}

/// Human label and icon for a raw status code.
pub fn status_label(raw: &str) -> (&'static str, &'static str) {
    let raw = raw.trim().to_lowercase();
    STATUS_TABLE
        .iter()
        .find(|(code, _, _)| *code == raw)
        .map(|(_, label, icon)| (*label, *icon))
        .unwrap_or(("Processing", "ℹ️"))
}

/// Looks up the order referenced in `query` and renders it.
pub fn track_order(directory: &dyn OrderDirectory, query: &str) -> OrderLookup {
    let query = query.trim();
    if query.is_empty() {
        return OrderLookup {
            message: ASK_FOR_REFERENCE.to_string(),
            order: None,
        };
    }

    match find_order(directory, query) {
        Ok(Some(order)) => render(&order),
        Ok(None) => not_found(),
        Err(e) => {
            tracing::warn!(error = %e, "order lookup failed");
            not_found()
        }
    }
}

fn find_order(directory: &dyn OrderDirectory, query: &str) -> Result<Option<Order>, ServiceError> {
    let mut order = None;

    if let Some(email) = email_re().find(query) {
        tracing::info!(email = email.as_str(), "order lookup by email");
        order = directory.latest_by_email(email.as_str())?;
    } else if let Some(digits) = order_id_re().find(query) {
        match digits.as_str().parse::<u64>() {
            Ok(id) => {
                tracing::info!(order_id = id, "order lookup by id");
                order = directory.by_id(id)?;
            }
            Err(_) => tracing::warn!(value = digits.as_str(), "order id out of range"),
        }
    }

    if order.is_none() {
        tracing::info!("order lookup by reference");
        order = directory.latest_by_reference_or_email(query)?;
    }
    Ok(order)
}

fn not_found() -> OrderLookup {
    OrderLookup {
        message: NOT_FOUND.to_string(),
        order: None,
    }
}

fn render(order: &Order) -> OrderLookup {
    let (label, icon) = status_label(&order.status);
    let total = format_money(&order.currency, order.total);
    let date = order.created_at.format("%b %d, %Y").to_string();
    let paid = if order.paid { "Paid ✅" } else { "Unpaid ❌" };

    let mut message = format!(
        "✨ Order **#{}** for **{}**\n{icon} {label} — {paid}\n💰 Total: {total}\n📅 Date: {date}\n",
        order.id, order.customer_name
    );
    if let Some(address) = order.address.as_deref().filter(|a| !a.is_empty()) {
        message.push_str(&format!("🏠 Shipping to: {address}\n"));
    }
    if let Some(reference) = order.payment_reference.as_deref().filter(|r| !r.is_empty()) {
        message.push_str(&format!("🔖 Tracking ID: {reference}\n"));
    }

    tracing::info!(order_id = order.id, status = label, "order found");
    OrderLookup {
        message: message.trim().to_string(),
        order: Some(OrderCard {
            id: order.id.to_string(),
            status: label.to_string(),
            paid: order.paid,
            total,
            date,
            address: order.address.clone(),
            tracking: order.payment_reference.clone(),
            customer_name: order.customer_name.clone(),
        }),
    }
}
