//! Product search handler.

use serde::{Deserialize, Serialize};

use super::ProductCatalog;

/// Maximum number of products shown in one reply.
pub const SEARCH_LIMIT: usize = 5;

const FOUND: &str = "Here are some options I found for you 💁‍♀️✨";
const NOT_FOUND: &str = "I couldn’t find anything matching that 🥺. Try another keyword, maybe?";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub image: Option<String>,
}

fn default_currency() -> String {
    "NGN".to_string()
}

/// Product as rendered in the chat widget.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProductCard {
    pub name: String,
    pub price: String,
    pub image: String,
    pub url: String,
}

impl From<&Product> for ProductCard {
    fn from(p: &Product) -> Self {
        Self {
            name: p.name.clone(),
            price: format_money(&p.currency, p.price),
            image: p.image.clone().unwrap_or_default(),
            url: format!("/product/{}/", p.id),
        }
    }
}

/// Reply text plus the cards to show under it.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductSearch {
    pub message: String,
    pub products: Vec<ProductCard>,
}

/// Runs a catalog search for `query`. Collaborator failures read as "nothing found".
pub fn search_products(catalog: &dyn ProductCatalog, query: &str) -> ProductSearch {
    let query = query.trim().to_lowercase();
    let products = match catalog.search(&query, SEARCH_LIMIT) {
        Ok(products) => products,
        Err(e) => {
            tracing::warn!(error = %e, "product search failed");
            Vec::new()
        }
    };

    if products.is_empty() {
        return ProductSearch {
            message: NOT_FOUND.to_string(),
            products: Vec::new(),
        };
    }
    ProductSearch {
        message: FOUND.to_string(),
        products: products.iter().take(SEARCH_LIMIT).map(ProductCard::from).collect(),
    }
}

/// `NGN 12,500.00`
pub fn format_money(currency: &str, amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{currency} {sign}{grouped}.{frac_part}")
}
