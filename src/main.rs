use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use license_hub::config::Config;
use license_hub::db::{AppState, DbPool, create_pool, init_db, queries};
use license_hub::handlers;
use license_hub::models::{CreateBrand, CreateProduct};
use license_hub::service;

#[derive(Parser, Debug)]
#[command(name = "license-hub")]
#[command(about = "License key provisioning and activation for multiple brands")]
struct Cli {
    /// Seed the database with a demo brand and products (dev mode only)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Out-of-band administration. Each runs once and exits without starting the server.
#[derive(Subcommand, Debug)]
enum Command {
    /// Create a brand and print its API key
    CreateBrand { name: String },
    /// Add a product to a brand
    CreateProduct {
        brand: String,
        code: String,
        name: String,
    },
    /// Delete a brand and its license keys (its products must be deleted first)
    DeleteBrand { name: String },
    /// Delete a product that no license references
    DeleteProduct { brand: String, code: String },
    /// List every brand with its API key prefix
    ListBrands,
    /// List a brand's products
    ListProducts { brand: String },
}

const DEMO_BRAND: &str = "demo";

/// Creates a demo brand with `pro` and `addon` products.
/// Only runs in dev mode and when the demo brand does not exist yet.
fn seed_dev_data(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get db connection for seeding");

    if queries::get_brand_by_name(&conn, DEMO_BRAND)
        .expect("Failed to look up demo brand")
        .is_some()
    {
        tracing::info!("Demo brand already exists, skipping seed");
        return;
    }

    tracing::info!("============================================");
    tracing::info!("SEEDING DEV DATA");
    tracing::info!("============================================");

    let created = service::create_brand(
        &mut conn,
        &CreateBrand {
            name: DEMO_BRAND.to_string(),
        },
    )
    .expect("Failed to create demo brand");

    for (code, name) in [("pro", "Demo Pro"), ("addon", "Demo Add-on")] {
        service::create_product(
            &mut conn,
            DEMO_BRAND,
            &CreateProduct {
                code: code.to_string(),
                name: name.to_string(),
            },
        )
        .expect("Failed to create demo product");
    }

    tracing::info!("Brand: {}", created.brand.name);
    tracing::info!("Products: pro, addon");
    tracing::info!("API Key: {}", created.api_key);
    tracing::info!("============================================");
    tracing::info!("SAVE THIS API KEY - IT WILL NOT BE SHOWN AGAIN");
    tracing::info!("============================================");
}

fn run_command(pool: &DbPool, command: Command) -> license_hub::error::Result<()> {
    let mut conn = pool.get()?;
    match command {
        Command::CreateBrand { name } => {
            let created = service::create_brand(&mut conn, &CreateBrand { name })?;
            println!("Created brand '{}'", created.brand.name);
            println!("API key: {}", created.api_key);
            println!("Save this API key - it will not be shown again.");
        }
        Command::CreateProduct { brand, code, name } => {
            let product =
                service::create_product(&mut conn, &brand, &CreateProduct { code, name })?;
            println!("Created product '{}' for brand '{}'", product.code, brand);
        }
        Command::DeleteBrand { name } => {
            service::delete_brand(&mut conn, &name)?;
            println!("Deleted brand '{}'", name);
        }
        Command::DeleteProduct { brand, code } => {
            service::delete_product(&mut conn, &brand, &code)?;
            println!("Deleted product '{}' from brand '{}'", code, brand);
        }
        Command::ListBrands => {
            for brand in service::list_brands(&mut conn)? {
                println!("{}\t{}", brand.name, brand.api_key_prefix);
            }
        }
        Command::ListProducts { brand } => {
            for product in service::list_products(&mut conn, &brand)? {
                println!("{}\t{}", product.code, product.name);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "license_hub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }

    let db_pool = create_pool(
        &config.database_path,
        config.database_pool_size,
        config.database_busy_timeout_ms,
    )
    .expect("Failed to create database pool");

    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    if let Some(command) = cli.command {
        if let Err(e) = run_command(&db_pool, command) {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
        return;
    }

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set LICENSE_HUB_ENV=dev)");
        } else {
            seed_dev_data(&db_pool);
        }
    }

    let state = AppState { db: db_pool };
    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cli.ephemeral && !config.dev_mode {
        tracing::warn!("--ephemeral flag ignored: not in dev mode (set LICENSE_HUB_ENV=dev)");
    }
    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("License Hub listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        // WAL and SHM files may not exist
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
