//! Rustynkart CLI
//!
//! Command-line storefront client. The session survives between
//! invocations through the configured credential store.
//!
//! # Usage
//!
//! ```bash
//! # Sign in and keep the session (prompts for the password)
//! rustynkart login ada@example.com
//!
//! # Non-interactive sign in
//! RUSTYNKART_PASSWORD=hunter2 rustynkart login ada@example.com
//!
//! # Who am I?
//! rustynkart whoami
//!
//! # Browse and shop
//! rustynkart products
//! rustynkart cart add 6650f1c2 M
//! rustynkart cart show
//!
//! # Forget the session
//! rustynkart logout
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rustynkart_core::config::{load_config, ClientConfig};
use rustynkart_core::{StoreBackend, Storefront};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

/// Environment variable consulted when `--password` is omitted.
const PASSWORD_ENV: &str = "RUSTYNKART_PASSWORD";

#[derive(Parser)]
#[command(name = "rustynkart")]
#[command(about = "Storefront client for the Rustynkart backend")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override where the session is persisted
    #[arg(long, global = true)]
    store: Option<StoreBackend>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        email: String,

        /// Password (visible to other local users; prefer the prompt or RUSTYNKART_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register {
        name: String,

        email: String,

        /// Password (visible to other local users; prefer the prompt or RUSTYNKART_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Exchange an external identity for a session
    GoogleLogin {
        name: String,

        email: String,
    },

    /// Sign out and forget the stored credential
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Check whether the backend accepts the stored credential
    Status,

    /// List the product catalog
    Products,

    /// Inspect or change the cart
    #[command(subcommand)]
    Cart(CartCommand),
}

#[derive(Subcommand)]
enum CartCommand {
    /// Show the server-side cart
    Show,

    /// Add one unit of a product
    Add {
        /// Product id
        item: String,

        /// Product size
        size: String,
    },

    /// Set the quantity of a product size
    Update {
        /// Product id
        item: String,

        /// Product size
        size: String,

        quantity: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(&cli)?;
    init_logging(&config, cli.verbose);

    let storefront = Storefront::from_config(&config).context("Failed to set up storefront")?;
    storefront.start().await;

    match cli.command {
        Commands::Login { email, password } => {
            let password = resolve_password(password, std::env::var(PASSWORD_ENV).ok())?;
            commands::login(&storefront, &email, &password, cli.format).await
        }
        Commands::Register {
            name,
            email,
            password,
        } => {
            let password = resolve_password(password, std::env::var(PASSWORD_ENV).ok())?;
            commands::register(&storefront, &name, &email, &password, cli.format).await
        }
        Commands::GoogleLogin { name, email } => {
            commands::federated_login(&storefront, name, email, cli.format).await
        }
        Commands::Logout => commands::logout(&storefront).await,
        Commands::Whoami => commands::whoami(&storefront, cli.format).await,
        Commands::Status => commands::status(&storefront, cli.format).await,
        Commands::Products => commands::products(&storefront, cli.format).await,
        Commands::Cart(CartCommand::Show) => commands::cart_show(&storefront, cli.format).await,
        Commands::Cart(CartCommand::Add { item, size }) => {
            commands::cart_add(&storefront, &item, &size).await
        }
        Commands::Cart(CartCommand::Update {
            item,
            size,
            quantity,
        }) => commands::cart_update(&storefront, &item, &size, quantity).await,
    }
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(store) = cli.store {
        config.store_backend = store;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Pick the password from the flag, then the environment, then a prompt.
fn resolve_password(flag: Option<String>, env: Option<String>) -> Result<String> {
    if let Some(password) = flag {
        tracing::warn!(
            "Password given on the command line; use the prompt or {} instead",
            PASSWORD_ENV
        );
        return Ok(password);
    }
    if let Some(password) = env.filter(|p| !p.is_empty()) {
        return Ok(password);
    }
    rpassword::prompt_password("Password: ").context("Failed to read password")
}

fn init_logging(config: &ClientConfig, verbose: bool) {
    let fallback = if verbose { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
