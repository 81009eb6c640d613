//! Kisan Setu CLI - marketplace, advisory and session tools for the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (demo accounts work offline: admin, farmer1, consumer1)
//! ks-cli login farmer1 --remember-me
//!
//! # Browse and buy
//! ks-cli products --category vegetables --sort price_low
//! ks-cli cart add 2
//! ks-cli checkout --name "Asha" --phone 9876543210
//!
//! # Advisory
//! ks-cli weather Pune
//! ks-cli advice --season monsoon
//! ```
//!
//! State (session, cart, location, order history) is kept under
//! `KISAN_SETU_DATA_DIR`. See `kisan_setu_client::config` for the other
//! environment variables.

#![cfg_attr(not(test), forbid(unsafe_code))]
// Command output is the product of this binary.
#![allow(clippy::print_stdout)]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kisan_setu_client::ClientConfig;
use kisan_setu_core::{Language, PaymentMethod, Role, Season, SortKey};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "ks-cli")]
#[command(author, version, about = "Kisan Setu CLI")]
struct Cli {
    /// Interface language for messages (`en`, `hi`); remembered
    #[arg(long, global = true)]
    lang: Option<Language>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        username: String,

        /// Read from stdin when omitted
        #[arg(short, long)]
        password: Option<String>,

        /// Keep the session for 30 days instead of one
        #[arg(long)]
        remember_me: bool,
    },
    /// Create an account and sign in with it
    Register(RegisterArgs),
    /// Sign out and clear the cart
    Logout,
    /// Show the signed-in user and session
    Whoami,
    /// Show or change the saved location
    Location {
        /// Forget the saved location and detect it again
        #[arg(long, conflicts_with = "set")]
        refresh: bool,

        /// Use a known city (e.g. Pune)
        #[arg(long, value_name = "CITY")]
        set: Option<String>,
    },
    /// List marketplace products
    Products(ProductArgs),
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart
    Checkout(CheckoutArgs),
    /// List past orders
    Orders,
    /// Weather and farming advisory for a city
    Weather {
        /// Defaults to the saved location
        city: Option<String>,
    },
    /// Seasonal crop recommendations
    Advice {
        /// `winter`/`rabi`, `summer`/`zaid`, `monsoon`/`kharif`
        #[arg(short, long)]
        season: Option<Season>,
    },
    /// Analyse a crop photo for disease
    Scan {
        image: PathBuf,

        /// Crop in the photo
        #[arg(short, long)]
        crop: Option<String>,
    },
    /// Show login history on this device
    History {
        /// Only this username
        #[arg(short, long)]
        user: Option<String>,

        /// Show recent crop scans instead
        #[arg(long)]
        scans: bool,
    },
}

#[derive(Args)]
struct RegisterArgs {
    username: String,

    #[arg(short, long)]
    email: String,

    #[arg(short = 'n', long)]
    full_name: String,

    #[arg(long)]
    phone: Option<String>,

    /// `farmer`, `consumer` or `admin`
    #[arg(short, long, default_value = "consumer")]
    role: Role,

    /// Read from stdin when omitted
    #[arg(short, long)]
    password: Option<String>,

    #[arg(long)]
    remember_me: bool,
}

#[derive(Args)]
struct ProductArgs {
    #[arg(short, long)]
    category: Option<String>,

    /// Case-insensitive name search
    #[arg(short, long)]
    search: Option<String>,

    /// `name`, `price_low`, `price_high`, `distance`, `sustainability`, `rating`
    #[arg(long, default_value = "name")]
    sort: SortKey,

    #[arg(long)]
    organic: bool,

    /// Kilometres
    #[arg(long)]
    max_distance: Option<f64>,
}

#[derive(Subcommand)]
enum CartAction {
    /// Add one unit of a product
    Add { product_id: String },
    /// Remove a product's whole line
    Remove { product_id: String },
    /// Show the cart and its price breakdown
    Show,
    /// Empty the cart
    Clear,
}

#[derive(Args)]
struct CheckoutArgs {
    #[arg(short, long)]
    name: String,

    #[arg(short, long)]
    phone: String,

    /// Defaults to the saved location's city and state
    #[arg(short, long)]
    address: Option<String>,

    #[arg(long)]
    notes: Option<String>,

    /// `cod`, `upi` or `card`
    #[arg(long, default_value = "cod")]
    payment: PaymentMethod,
}

/// Route of the screen a command stands in for, as seen by 401 handling.
const fn route_for(command: &Commands) -> &'static str {
    match command {
        Commands::Login { .. } => kisan_setu_client::api::LOGIN_ROUTE,
        Commands::Register(_) => kisan_setu_client::api::REGISTER_ROUTE,
        Commands::Products(_) | Commands::Cart { .. } | Commands::Checkout(_) => "/marketplace",
        Commands::Orders => "/orders",
        Commands::Weather { .. } | Commands::Advice { .. } | Commands::Scan { .. } => "/advisory",
        _ => "/",
    }
}

fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
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

fn init_tracing() {
    // Logs go to stderr so command output stays pipeable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "ks_cli=info,kisan_setu_client=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ctx = Context::open(config, route_for(&cli.command), cli.lang).await?;

    match cli.command {
        Commands::Login {
            username,
            password,
            remember_me,
        } => commands::account::login(&ctx, &username, password, remember_me).await?,
        Commands::Register(args) => commands::account::register(&ctx, args.into()).await?,
        Commands::Logout => commands::account::logout(&ctx).await,
        Commands::Whoami => commands::account::whoami(&ctx).await?,
        Commands::History { user, scans } => {
            if scans {
                commands::advisory::scans(&ctx);
            } else {
                commands::account::history(&ctx, user.as_deref());
            }
        }
        Commands::Location { refresh, set } => {
            commands::place::location(&ctx, refresh, set.as_deref()).await?;
        }
        Commands::Products(args) => commands::market::products(&ctx, &args.into()).await?,
        Commands::Cart { action } => match action {
            CartAction::Add { product_id } => commands::market::cart_add(&ctx, &product_id).await?,
            CartAction::Remove { product_id } => {
                commands::market::cart_remove(&ctx, &product_id).await;
            }
            CartAction::Show => commands::market::cart_show(&ctx).await,
            CartAction::Clear => commands::market::cart_clear(&ctx).await,
        },
        Commands::Checkout(args) => commands::market::checkout(&ctx, args.into()).await?,
        Commands::Orders => commands::market::orders(&ctx).await?,
        Commands::Weather { city } => commands::advisory::weather(&ctx, city.as_deref()).await?,
        Commands::Advice { season } => commands::advisory::advice(&ctx, season).await?,
        Commands::Scan { image, crop } => {
            commands::advisory::scan(&ctx, &image, crop.as_deref()).await?;
        }
    }

    ctx.finish().await;
    Ok(())
}

impl From<RegisterArgs> for commands::account::Registration {
    fn from(args: RegisterArgs) -> Self {
        Self {
            username: args.username,
            email: args.email,
            full_name: args.full_name,
            phone: args.phone,
            role: args.role,
            password: args.password,
            remember_me: args.remember_me,
        }
    }
}

impl From<ProductArgs> for kisan_setu_core::ProductFilter {
    fn from(args: ProductArgs) -> Self {
        Self {
            category: args.category,
            search: args.search,
            organic_only: args.organic,
            max_distance_km: args.max_distance,
            min_sustainability: None,
            sort: args.sort,
        }
    }
}

impl From<CheckoutArgs> for commands::market::Checkout {
    fn from(args: CheckoutArgs) -> Self {
        Self {
            name: args.name,
            phone: args.phone,
            address: args.address,
            notes: args.notes,
            payment_method: args.payment,
        }
    }
}
