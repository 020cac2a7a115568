//! GreenCart CLI - browse the catalog and manage a cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! greencart featured
//! greencart products --category seeds --price 0-50 --sort price-low
//! greencart product 12
//!
//! # Sign in, then shop
//! greencart login --email asha@example.com
//! greencart cart add 12 --quantity 2 --size 500g
//! greencart cart show
//! greencart wishlist add 7
//!
//! # Server-side cart
//! greencart remote-cart count
//! ```
//!
//! Cart, wishlist and session are kept under `GREENCART_STORAGE_DIR`
//! (default `.greencart`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use greencart_core::ProductId;
use greencart_storefront::StorefrontConfig;
use greencart_storefront::catalog::{PriceRange, SortKey};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

mod commands;
mod terminal;

use commands::Shop;

#[derive(Parser)]
#[command(name = "greencart")]
#[command(author, version, about = "GreenCart storefront in the terminal")]
struct Cli {
    /// API base URL (overrides `GREENCART_API_BASE_URL`)
    #[arg(long, global = true)]
    api_url: Option<Url>,

    /// Directory for local state (overrides `GREENCART_STORAGE_DIR`)
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,

        /// Match name, description or category
        #[arg(short, long)]
        search: Option<String>,

        /// Price bucket: 0-50, 50-100, 100-500 or 500+
        #[arg(short, long)]
        price: Option<PriceRange>,

        /// name, price-low, price-high or rating
        #[arg(long, default_value = "name")]
        sort: SortKey,
    },
    /// Show the best-rated featured products
    Featured,
    /// List categories
    Categories,
    /// Show one product
    Product { id: ProductId },
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account and sign in
    Signup {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(long)]
        phone: Option<String>,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and clear local state
    Logout,
    /// Manage the local cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Inspect the server-side cart
    RemoteCart {
        #[command(subcommand)]
        action: RemoteCartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        id: ProductId,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        #[arg(short, long)]
        size: Option<String>,
    },
    /// Remove a line
    Remove {
        id: ProductId,

        #[arg(short, long)]
        size: Option<String>,
    },
    /// Set a line's quantity (0 removes it)
    Update {
        id: ProductId,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,

        #[arg(short, long)]
        size: Option<String>,
    },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Show the wishlist
    Show,
    /// Save a product
    Add { id: ProductId },
    /// Remove a product
    Remove { id: ProductId },
}

#[derive(Subcommand)]
enum RemoteCartAction {
    /// List server-side cart lines
    Show,
    /// Server-side item count
    Count,
    /// Empty the server-side cart
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Warnings and errors become Sentry events, info and debug breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Failures before the renderer exists go straight to stderr.
#[allow(clippy::print_stderr)]
fn startup_error(e: &dyn std::fmt::Display) -> ! {
    eprintln!("greencart: {e}");
    std::process::exit(2);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => startup_error(&e),
    };
    if let Some(url) = cli.api_url.clone() {
        config.api_base_url = url;
    }
    if let Some(dir) = cli.storage_dir.clone() {
        config.storage_dir = dir;
    }

    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr; stdout is the renderer's
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "greencart_storefront=info,greencart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let mut shop = match commands::open(config) {
        Ok(shop) => shop,
        Err(e) => {
            e.report();
            startup_error(&e)
        }
    };

    // Failures were already shown by the renderer
    let result: Result<(), Box<dyn std::error::Error>> = run(cli.command, &mut shop).await;

    if let Err(e) = result {
        tracing::debug!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, shop: &mut Shop) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Products {
            category,
            search,
            price,
            sort,
        } => {
            commands::catalog::products(shop, category, search, price, sort).await?;
        }
        Commands::Featured => commands::catalog::featured(shop).await?,
        Commands::Categories => commands::catalog::categories(shop).await?,
        Commands::Product { id } => commands::catalog::product(shop, id).await?,
        Commands::Login { email, password } => {
            commands::account::login(shop, &email, password).await?;
        }
        Commands::Signup {
            name,
            email,
            phone,
            password,
        } => {
            commands::account::signup(shop, name, &email, phone, password).await?;
        }
        Commands::Logout => shop.logout().await?,
        Commands::Cart { action } => match action {
            CartAction::Show => shop.show_cart(),
            CartAction::Add { id, quantity, size } => {
                shop.add_product_to_cart(id, quantity, size.as_deref())
                    .await?;
            }
            CartAction::Remove { id, size } => {
                shop.remove_from_cart(id, size.as_deref())?;
            }
            CartAction::Update { id, quantity, size } => {
                shop.update_quantity(id, size.as_deref(), quantity)?;
            }
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Show => shop.show_wishlist(),
            WishlistAction::Add { id } => {
                shop.add_product_to_wishlist(id).await?;
            }
            WishlistAction::Remove { id } => {
                shop.remove_from_wishlist(id)?;
            }
        },
        Commands::RemoteCart { action } => match action {
            RemoteCartAction::Show => commands::remote_cart::show(shop).await?,
            RemoteCartAction::Count => commands::remote_cart::count(shop).await?,
            RemoteCartAction::Clear => shop.clear_remote_cart().await?,
        },
    }
    Ok(())
}
