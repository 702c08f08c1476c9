//! Skecho CLI - drive the storefront client against a live backend.
//!
//! # Usage
//!
//! ```bash
//! # Session, profile completion and cart summary
//! skecho status
//!
//! # Route decision for a path
//! skecho guard /dashboard
//!
//! # Cart
//! skecho cart show
//! skecho cart add 42 --quantity 2
//! skecho cart set item-17 3
//! skecho cart remove item-17
//! skecho cart clear
//!
//! # Profile completion
//! skecho profile complete --phone 5551234567 --address "1 Quay St"
//! skecho profile seller --artist-name "Ana Lee"
//! ```
//!
//! The identity comes from `SKECHO_USER_ID` / `SKECHO_ID_TOKEN`; without them
//! every command runs signed out.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use skecho_storefront::Storefront;
use skecho_storefront::config::StorefrontConfig;
use skecho_storefront::identity::StaticIdentityProvider;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "skecho")]
#[command(author, version, about = "Skecho storefront client tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the session, profile completion and cart summary
    Status,
    /// Show the route decision for a path
    Guard {
        /// Path to check, e.g. `/product/42`
        path: String,
    },
    /// Register the signed-in user with the backend
    Register,
    /// Submit profile completion forms
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Submit delivery details
    Complete {
        /// Ten-digit phone number
        #[arg(short, long)]
        phone: String,

        /// Delivery address
        #[arg(short, long)]
        address: String,
    },
    /// Submit the seller profile
    Seller {
        /// Public artist name
        #[arg(short = 'n', long)]
        artist_name: String,

        #[arg(short, long)]
        bio: Option<String>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// List cart lines
    Show,
    /// Add a product
    Add {
        product_id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set the quantity of a cart line
    Set { item_id: String, quantity: u32 },
    /// Remove a cart line
    Remove { item_id: String },
    /// Remove every line
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

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let config = StorefrontConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skecho=info,skecho_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CommandError> {
    let identity = Arc::new(StaticIdentityProvider::from_config(config.identity.as_ref()));
    let storefront = Storefront::connect(config, identity)?;
    let session = storefront.ready().await;

    let result = match cli.command {
        Commands::Status => commands::status::show(&storefront, &session).await,
        Commands::Guard { path } => {
            commands::status::guard(&storefront, &path);
            Ok(())
        }
        Commands::Register => commands::profile::register(&storefront).await,
        Commands::Profile { action } => match action {
            ProfileAction::Complete { phone, address } => {
                commands::profile::complete(&storefront, &phone, &address).await
            }
            ProfileAction::Seller { artist_name, bio } => {
                commands::profile::seller(&storefront, &artist_name, bio.as_deref()).await
            }
        },
        Commands::Cart { action } => {
            commands::cart::load(&storefront, &session).await?;
            match action {
                CartAction::Show => {
                    commands::cart::show(&storefront);
                    Ok(())
                }
                CartAction::Add {
                    product_id,
                    quantity,
                } => commands::cart::add(&storefront, &product_id, quantity).await,
                CartAction::Set { item_id, quantity } => {
                    commands::cart::set(&storefront, &item_id, quantity).await
                }
                CartAction::Remove { item_id } => commands::cart::remove(&storefront, &item_id).await,
                CartAction::Clear => commands::cart::clear(&storefront).await,
            }
        }
    };

    storefront.shutdown();
    result
}
