//! Product catalog.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Dispatcher};
use crate::store::SecretStore;

pub const PRODUCT_LIST_PATH: &str = "/api/product/list";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub price: f64,

    #[serde(default)]
    pub sizes: Vec<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub struct Catalog<S: SecretStore = Box<dyn SecretStore>> {
    dispatcher: Arc<Dispatcher<S>>,
}

impl<S: SecretStore> Catalog<S> {
    pub fn new(dispatcher: Arc<Dispatcher<S>>) -> Self {
        Self { dispatcher }
    }

    /// Fetch every listed product. A `null` body is an empty catalog.
    pub async fn list(&self) -> Result<Vec<Product>, ApiError> {
        let response = self.dispatcher.get(PRODUCT_LIST_PATH).await?;
        let products: Option<Vec<Product>> = response.json()?;
        Ok(products.unwrap_or_default())
    }
}

/// Find a product by id.
pub fn find<'a>(products: &'a [Product], id: &str) -> Option<&'a Product> {
    products.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_deserialize() {
        let json = serde_json::json!([
            {"_id": "p1", "name": "Tee", "price": 499.0, "sizes": ["S", "M"], "bestseller": true},
            {"_id": "p2", "name": "Cap", "price": 199}
        ]);

        let products: Vec<Product> = serde_json::from_value(json).unwrap();
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].sizes, vec!["S", "M"]);
        assert!(products[0].extra.contains_key("bestseller"));
        assert_eq!(products[1].price, 199.0);
        assert!(products[1].sizes.is_empty());

        assert_eq!(find(&products, "p2").unwrap().name, "Cap");
        assert!(find(&products, "p3").is_none());
    }
}
