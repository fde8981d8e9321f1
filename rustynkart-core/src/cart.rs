//! Shopping cart.
//!
//! The cart is always updated locally first. It is synchronised with the
//! backend only while the session holds a credential; anonymous carts live
//! in memory.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, Dispatcher};
use crate::catalog::{self, Product};
use crate::store::SecretStore;

pub const CART_GET_PATH: &str = "/api/cart/get";
pub const CART_ADD_PATH: &str = "/api/cart/add";
pub const CART_UPDATE_PATH: &str = "/api/cart/update";

/// Flat delivery fee added to every non-empty order.
pub const DELIVERY_FEE: f64 = 40.0;

/// Quantities keyed by product id, then size.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(BTreeMap<String, BTreeMap<String, u32>>);

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of `item` in `size`. Returns `false` for an empty size.
    pub fn add(&mut self, item: &str, size: &str) -> bool {
        if size.is_empty() {
            return false;
        }
        *self
            .0
            .entry(item.to_string())
            .or_default()
            .entry(size.to_string())
            .or_insert(0) += 1;
        true
    }

    /// Set the quantity of `item` in `size`. Zero keeps the entry at zero.
    pub fn set_quantity(&mut self, item: &str, size: &str, quantity: u32) -> bool {
        if size.is_empty() {
            return false;
        }
        self.0
            .entry(item.to_string())
            .or_default()
            .insert(size.to_string(), quantity);
        true
    }

    pub fn quantity(&self, item: &str, size: &str) -> u32 {
        self.0
            .get(item)
            .and_then(|sizes| sizes.get(size))
            .copied()
            .unwrap_or(0)
    }

    /// Total number of units in the cart.
    pub fn count(&self) -> u32 {
        self.0.values().flat_map(|sizes| sizes.values()).sum()
    }

    /// Total price of the cart. Items missing from `products` are skipped.
    pub fn amount(&self, products: &[Product]) -> f64 {
        self.0
            .iter()
            .filter_map(|(item, sizes)| {
                let product = catalog::find(products, item);
                if product.is_none() {
                    tracing::debug!(item = %item, "Product info not found for cart item");
                }
                product.map(|p| (p, sizes))
            })
            .map(|(product, sizes)| {
                sizes
                    .values()
                    .map(|&quantity| product.price * f64::from(quantity))
                    .sum::<f64>()
            })
            .sum()
    }

    /// Amount plus [`DELIVERY_FEE`]. An order worth nothing has no fee.
    pub fn total(&self, products: &[Product]) -> f64 {
        let amount = self.amount(products);
        if amount == 0.0 { 0.0 } else { amount + DELIVERY_FEE }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Iterate over `(item, size, quantity)` entries with a positive quantity.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, u32)> {
        self.0.iter().flat_map(|(item, sizes)| {
            sizes
                .iter()
                .filter(|(_, quantity)| **quantity > 0)
                .map(move |(size, quantity)| (item.as_str(), size.as_str(), *quantity))
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AddRequest<'a> {
    item_id: &'a str,
    size: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    item_id: &'a str,
    size: &'a str,
    quantity: u32,
}

/// Cart state plus backend synchronisation.
pub struct CartClient<S: SecretStore = Box<dyn SecretStore>> {
    dispatcher: Arc<Dispatcher<S>>,
    cart: RwLock<Cart>,
}

impl<S: SecretStore> CartClient<S> {
    pub fn new(dispatcher: Arc<Dispatcher<S>>) -> Self {
        Self {
            dispatcher,
            cart: RwLock::new(Cart::new()),
        }
    }

    /// A copy of the local cart.
    pub fn snapshot(&self) -> Cart {
        self.cart.read().clone()
    }

    /// Replace the local cart with the server's copy.
    ///
    /// Without a credential the cart is reset and no request is made. On
    /// failure the local cart is reset too.
    pub async fn fetch(&self) -> Result<Cart, ApiError> {
        if !self.dispatcher.session().is_authenticated().await {
            tracing::debug!("No credential available, skipping cart fetch");
            *self.cart.write() = Cart::new();
            return Ok(Cart::new());
        }

        let result = match self.dispatcher.get(CART_GET_PATH).await {
            Ok(response) => response.json::<Option<Cart>>(),
            Err(e) => Err(e),
        };

        match result {
            Ok(cart) => {
                let cart = cart.unwrap_or_default();
                *self.cart.write() = cart.clone();
                Ok(cart)
            }
            Err(e) => {
                *self.cart.write() = Cart::new();
                Err(e)
            }
        }
    }

    /// Add one unit locally, then on the server when signed in.
    ///
    /// Returns whether the server was updated.
    pub async fn add(&self, item: &str, size: &str) -> Result<bool, ApiError> {
        let added = self.cart.write().add(item, size);
        if !added {
            return Err(ApiError::InvalidRequest("select a product size".to_string()));
        }

        if !self.dispatcher.session().is_authenticated().await {
            return Ok(false);
        }

        self.dispatcher
            .post_json(CART_ADD_PATH, &AddRequest { item_id: item, size })
            .await?;
        Ok(true)
    }

    /// Set a quantity locally, then on the server when signed in.
    ///
    /// Returns whether the server was updated.
    pub async fn update(&self, item: &str, size: &str, quantity: u32) -> Result<bool, ApiError> {
        let updated = self.cart.write().set_quantity(item, size, quantity);
        if !updated {
            return Err(ApiError::InvalidRequest("select a product size".to_string()));
        }

        if !self.dispatcher.session().is_authenticated().await {
            return Ok(false);
        }

        self.dispatcher
            .post_json(
                CART_UPDATE_PATH,
                &UpdateRequest {
                    item_id: item,
                    size,
                    quantity,
                },
            )
            .await?;
        Ok(true)
    }
}
