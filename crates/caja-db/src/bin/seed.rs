//! # Seed Data Generator
//!
//! Populates a database with a demo catalog, a few customers and sales rung
//! up through the sale engine, so every stock movement is real.
//!
//! ## Usage
//! ```bash
//! # Seed ./caja_dev.db with the full demo catalog
//! cargo run -p caja-db --bin seed
//!
//! # Fewer products, different file
//! cargo run -p caja-db --bin seed -- --count 10 --db ./data/caja.db
//!
//! # Tax rate and walk-in name come from the environment
//! CAJA_TAX_RATE=8 cargo run -p caja-db --bin seed
//! ```
//!
//! `CAJA_DB_PATH` is used when `--db` is not given.

use std::env;

use caja_core::{CartLine, CustomerInput, NewProduct, NewSale, SaleSettings};
use caja_db::{Database, DbConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// (name, price in cents, opening stock, min stock)
const CATALOG: &[(&str, i64, i64, i64)] = &[
    ("Café americano 250g", 8950, 40, 5),
    ("Azúcar estándar 1kg", 3200, 60, 10),
    ("Leche entera 1L", 2650, 48, 12),
    ("Pan de caja grande", 4590, 20, 5),
    ("Huevo blanco 18 pzas", 6400, 30, 6),
    ("Arroz súper extra 1kg", 2890, 50, 10),
    ("Frijol negro 900g", 3750, 35, 8),
    ("Aceite vegetal 1L", 4200, 25, 5),
    ("Tortillas de harina 10 pzas", 2800, 15, 4),
    ("Agua natural 1.5L", 1500, 100, 24),
    ("Refresco de cola 600ml", 1850, 72, 24),
    ("Galletas surtidas 500g", 5600, 18, 4),
];

const CUSTOMERS: &[(&str, Option<&str>)] = &[
    ("Ana López", Some("ana.lopez@example.com")),
    ("Miscelánea La Esquina", Some("compras@laesquina.example.com")),
    ("Jorge Ramírez", None),
];

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caja=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = CATALOG.len();
    let mut db_path = env::var("CAJA_DB_PATH").unwrap_or_else(|_| String::from("./caja_dev.db"));

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(CATALOG.len());
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Caja POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!(
                    "  -c, --count <N>    Number of demo products (default: {})",
                    CATALOG.len()
                );
                println!("  -d, --db <PATH>    Database file path (default: ./caja_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let settings = SaleSettings::from_env()?;
    info!(
        db = %db_path,
        tax_rate_bps = settings.tax_rate.bps(),
        "Seeding database"
    );

    let db = Database::new(DbConfig::new(&db_path).sale_settings(settings)).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    // Products: SKUs left blank so the catalog numbers them
    let mut product_ids = Vec::new();
    for &(name, price_cents, stock, min_stock) in CATALOG.iter().take(count) {
        let product = db
            .products()
            .create(NewProduct {
                name: name.to_string(),
                price_cents,
                stock,
                min_stock,
                ..Default::default()
            })
            .await?;
        product_ids.push(product.id);
    }

    let mut customer_ids = Vec::new();
    for &(name, email) in CUSTOMERS {
        let customer = db
            .customers()
            .create(CustomerInput {
                name: name.to_string(),
                email: email.map(str::to_string),
                phone: None,
            })
            .await?;
        customer_ids.push(customer.id);
    }

    // A handful of sales cycling through products and customers
    let mut folios = Vec::new();
    for n in 0..product_ids.len().min(8) {
        let first = product_ids[n];
        let second = product_ids[(n * 3 + 1) % product_ids.len()];
        let customer_id = if n % 2 == 0 {
            customer_ids.get(n / 2 % customer_ids.len()).copied()
        } else {
            None
        };

        let sale = db
            .sales()
            .create_sale(NewSale {
                customer_id,
                payment_method: (n % 3 == 1).then(|| "TARJETA".to_string()),
                items: vec![
                    CartLine::new(first, (n % 3 + 1) as i64),
                    CartLine::new(second, 1),
                ],
                ..Default::default()
            })
            .await?;
        folios.push(sale.sale.folio.unwrap_or_default());
    }

    let low_stock = db.products().low_stock().await?;
    let summary = serde_json::json!({
        "database": db_path,
        "products": product_ids.len(),
        "customers": customer_ids.len(),
        "sales": folios,
        "low_stock": low_stock.iter().map(|p| &p.sku).collect::<Vec<_>>(),
    });

    info!(summary = %summary, "Seed complete");
    db.close().await;

    Ok(())
}
