//! In-process catalog loaded from a JSON export of the shop.
//!
//! ```json
//! { "products": [ { "id": 1, "name": "...", "price": 45000.0, "stock": 3 } ],
//!   "orders":   [ { "id": 41, "customer_name": "...", "email": "...", "created_at": "..." } ] }
//! ```

use serde::Deserialize;

use super::{Order, OrderDirectory, Product, ProductCatalog, ServiceError};
use crate::nlu::extractor::content_terms;

/// Shopping verbs that say nothing about which product is wanted.
const SEARCH_NOISE: &[&str] = &["show", "buy", "price", "find", "looking", "shop", "something", "anything", "cost"];

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct InMemoryCatalog {
    products: Vec<Product>,
    orders: Vec<Order>,
}

impl InMemoryCatalog {
    pub fn new(products: Vec<Product>, orders: Vec<Order>) -> Self {
        Self { products, orders }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

fn product_matches(product: &Product, query: &str, terms: &[String]) -> bool {
    let fields = [
        product.name.to_lowercase(),
        product.description.to_lowercase(),
        product.category.to_lowercase(),
    ];
    fields
        .iter()
        .any(|field| field.contains(query) || terms.iter().any(|t| field.contains(t.as_str())))
}

impl ProductCatalog for InMemoryCatalog {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, ServiceError> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let terms: Vec<String> = content_terms(&query)
            .into_iter()
            .filter(|t| !SEARCH_NOISE.contains(&t.as_str()))
            .collect();

        Ok(self
            .products
            .iter()
            .filter(|p| p.stock > 0)
            .filter(|p| product_matches(p, &query, &terms))
            .take(limit)
            .cloned()
            .collect())
    }
}

fn most_recent<'a>(orders: impl Iterator<Item = &'a Order>) -> Option<Order> {
    orders.max_by_key(|o| (o.created_at, o.id)).cloned()
}

impl OrderDirectory for InMemoryCatalog {
    fn latest_by_email(&self, email: &str) -> Result<Option<Order>, ServiceError> {
        Ok(most_recent(
            self.orders.iter().filter(|o| o.email.eq_ignore_ascii_case(email.trim())),
        ))
    }

    fn by_id(&self, id: u64) -> Result<Option<Order>, ServiceError> {
        Ok(self.orders.iter().find(|o| o.id == id).cloned())
    }

    fn latest_by_reference_or_email(&self, value: &str) -> Result<Option<Order>, ServiceError> {
        let value = value.trim();
        Ok(most_recent(self.orders.iter().filter(|o| {
            o.email.eq_ignore_ascii_case(value)
                || o
                    .payment_reference
                    .as_deref()
                    .is_some_and(|r| r.eq_ignore_ascii_case(value))
        })))
    }
}
