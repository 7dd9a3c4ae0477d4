use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

use growthpay::repositories::{memory::MemStore, postgres::PgStore, SharedStore};
use growthpay::services;
use growthpay::settings::Settings;
use growthpay::utils;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[arg(short, long)]
    listen: Option<String>,
    #[arg(long, default_value = "log4rs.yaml")]
    log4rs: String,
    /// Run against a volatile in-memory store instead of Postgres.
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logging(&args.log4rs).expect("Failed to initialize logging.");

    let config = Settings::load(&args.config).expect("Could not load config file.");
    log::info!("Device fingerprint: {}", utils::derive_device_id());

    let store: SharedStore = if args.in_memory {
        log::warn!("Using the in-memory store; all data is volatile.");
        Arc::new(MemStore::new())
    } else {
        let conn = PgPoolOptions::new()
            .max_connections(config.postgres.max_connections)
            .connect(&config.postgres.url)
            .await
            .expect("Could not connect to database.");
        Arc::new(PgStore::new(conn))
    };

    let listen = args.listen.unwrap_or(config.http.listen);

    println!("[*] Starting services.");
    services::start_services(store, listen)
        .await
        .expect("Could not start services.");
}

fn init_logging(path: &str) -> Result<(), anyhow::Error> {
    if !Path::new("logs").exists() {
        fs::create_dir("logs")?;
    }

    match log4rs::init_file(path, Default::default()) {
        Ok(_) => {
            println!("[*] Logging initialized successfully.");
            Ok(())
        }
        Err(e) => {
            println!("[ERROR] Failed to initialize logging: {}", e);
            Err(anyhow::anyhow!("Could not initialize logging: {}", e))
        }
    }
}
