//! # Storefront Collaborators
//!
//! The assistant reads the shop through narrow traits and never touches the
//! catalog, checkout or payment code directly:
//!
//! | Trait | Used by | Default implementation |
//! |-------|---------|------------------------|
//! | [`ProductCatalog`] | product search handler | [`InMemoryCatalog`] |
//! | [`OrderDirectory`] | order tracking handler | [`InMemoryCatalog`] |
//! | [`LeadNotifier`] | lead capture | [`SmtpNotifier`] |
//!
//! The handlers in [`catalog`] and [`orders`] turn collaborator results into
//! chat replies plus structured cards for the widget.

pub mod catalog;
pub mod memory;
pub mod notify;
pub mod orders;

use thiserror::Error;

pub use catalog::{search_products, Product, ProductCard, ProductSearch};
pub use memory::InMemoryCatalog;
pub use notify::{LeadNotifier, NotifyError, SmtpNotifier};
pub use orders::{track_order, Order, OrderCard, OrderLookup};

/// Failure of a product or order collaborator.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Product lookup by free text.
pub trait ProductCatalog: Send + Sync {
    /// At most `limit` in-stock products whose name, description or category
    /// matches `query` (case-insensitive).
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, ServiceError>;
}

/// Order lookup, most recent first wherever several orders match.
pub trait OrderDirectory: Send + Sync {
    fn latest_by_email(&self, email: &str) -> Result<Option<Order>, ServiceError>;

    fn by_id(&self, id: u64) -> Result<Option<Order>, ServiceError>;

    /// Matches `value` against payment references and emails.
    fn latest_by_reference_or_email(&self, value: &str) -> Result<Option<Order>, ServiceError>;
}
