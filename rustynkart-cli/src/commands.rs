//! Subcommand handlers.

use anyhow::{bail, Context, Result};
use rustynkart_core::{AuthOutcome, FederatedIdentity, Storefront};
use serde_json::json;

use crate::Format;

pub async fn login(storefront: &Storefront, email: &str, password: &str, format: Format) -> Result<()> {
    let outcome = storefront
        .auth
        .login(email, password)
        .await
        .context("Login failed")?;
    report_outcome(&outcome, format)
}

pub async fn register(
    storefront: &Storefront,
    name: &str,
    email: &str,
    password: &str,
    format: Format,
) -> Result<()> {
    let outcome = storefront
        .auth
        .register(name, email, password)
        .await
        .context("Registration failed")?;
    report_outcome(&outcome, format)
}

pub async fn federated_login(
    storefront: &Storefront,
    name: String,
    email: String,
    format: Format,
) -> Result<()> {
    let identity = FederatedIdentity { name, email };
    let outcome = storefront
        .auth
        .federated_login(&identity)
        .await
        .context("Federated login failed")?;
    report_outcome(&outcome, format)
}

pub async fn logout(storefront: &Storefront) -> Result<()> {
    storefront.auth.logout().await;
    println!("Signed out");
    Ok(())
}

pub async fn whoami(storefront: &Storefront, format: Format) -> Result<()> {
    let user = storefront
        .users
        .fetch_current_user()
        .await
        .context("Failed to look up current user")?;

    match (format, user) {
        (Format::Json, user) => println!("{}", serde_json::to_string_pretty(&user)?),
        (Format::Text, Some(user)) => {
            println!("{} <{}>", user.name, user.email);
            println!("  id: {}", user.id);
        }
        (Format::Text, None) => println!("Not signed in"),
    }
    Ok(())
}

pub async fn status(storefront: &Storefront, format: Format) -> Result<()> {
    let probe = storefront.auth.probe().await;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&probe)?),
        Format::Text => {
            println!("Store: {:?}", storefront.session.store());
            if probe.authenticated {
                println!("Authenticated");
            } else {
                println!(
                    "Not authenticated: {}",
                    probe.error.as_deref().unwrap_or("unknown reason")
                );
            }
        }
    }
    Ok(())
}

pub async fn products(storefront: &Storefront, format: Format) -> Result<()> {
    let products = storefront
        .catalog
        .list()
        .await
        .context("Failed to fetch products")?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&products)?),
        Format::Text => {
            if products.is_empty() {
                println!("No products listed");
            }
            for product in &products {
                println!("{}  {:>10.2}  {}", product.id, product.price, product.name);
                if !product.sizes.is_empty() {
                    println!("    sizes: {}", product.sizes.join(", "));
                }
            }
        }
    }
    Ok(())
}

pub async fn cart_show(storefront: &Storefront, format: Format) -> Result<()> {
    if !storefront.session.is_authenticated().await {
        bail!("Not signed in; the cart is only kept on the server for signed-in users");
    }

    let cart = storefront.cart.fetch().await.context("Failed to fetch cart")?;

    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&cart)?),
        Format::Text => {
            if cart.is_empty() {
                println!("Cart is empty");
                return Ok(());
            }

            let products = storefront
                .catalog
                .list()
                .await
                .context("Failed to fetch products")?;
            for (item, size, quantity) in cart.entries() {
                println!("{} x{}  {}", item, quantity, size);
            }
            println!("Items: {}", cart.count());
            let subtotal = cart.amount(&products);
            let total = cart.total(&products);
            println!("Subtotal: {:.2}", subtotal);
            println!("Delivery: {:.2}", total - subtotal);
            println!("Total: {:.2}", total);
        }
    }
    Ok(())
}

pub async fn cart_add(storefront: &Storefront, item: &str, size: &str) -> Result<()> {
    let synced = storefront
        .cart
        .add(item, size)
        .await
        .context("Failed to add to cart")?;
    report_cart_change(synced)
}

pub async fn cart_update(storefront: &Storefront, item: &str, size: &str, quantity: u32) -> Result<()> {
    let synced = storefront
        .cart
        .update(item, size, quantity)
        .await
        .context("Failed to update cart")?;
    report_cart_change(synced)
}

fn report_outcome(outcome: &AuthOutcome, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            let value = json!({
                "authenticated": outcome.is_authenticated(),
                "credential_source": outcome.credential_source,
                "user": outcome.user,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        Format::Text => match (&outcome.credential_source, &outcome.user) {
            (Some(_), Some(user)) => println!("Signed in as {} <{}>", user.name, user.email),
            (Some(_), None) => println!("Signed in"),
            (None, _) => bail!("The server did not issue a session"),
        },
    }
    Ok(())
}

fn report_cart_change(synced: bool) -> Result<()> {
    if synced {
        println!("Cart updated");
    } else {
        // Anonymous carts are not stored anywhere between runs
        println!("Not signed in; change kept for this run only");
    }
    Ok(())
}
