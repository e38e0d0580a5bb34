//! # Seed Data Generator
//!
//! Populates the database with a demo tenant for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./ventas_dev.db for tenant "demo"
//! cargo run -p ventas-db --bin seed
//!
//! # Specify database path and tenant
//! cargo run -p ventas-db --bin seed -- --db ./data/ventas.db --tenant acme
//! ```
//!
//! ## Generated Data
//! - Shared units: kg, lb, g, m, ft, unit, box
//! - Tenant conversions: kg→lb, kg→g, m→ft, box→unit
//! - Products priced per base unit, with stock
//! - A client with a credit account (class A, 30 days)
//! - Fiscal document types B01 and B02
//! - An open cash register for user `demo-user`
//!
//! Ids are stable (`kg`, `demo-cement`, `demo-ncf-b02`, ...) so they can be used
//! directly in requests to the `ventas` CLI.

use clap::Parser;

use ventas_core::credit::CreditClassification;
use ventas_core::{Client, FiscalDocumentType, MeasureKind, Money, Product, Quantity, Unit};
use ventas_db::{Database, DbConfig};

const DEMO_USER: &str = "demo-user";

/// (id, name, kind, allows decimals)
const UNITS: &[(&str, &str, MeasureKind, bool)] = &[
    ("kg", "Kilogramo", MeasureKind::Mass, true),
    ("lb", "Libra", MeasureKind::Mass, true),
    ("g", "Gramo", MeasureKind::Mass, true),
    ("m", "Metro", MeasureKind::Length, true),
    ("ft", "Pie", MeasureKind::Length, true),
    ("unit", "Unidad", MeasureKind::Count, false),
    ("box", "Caja", MeasureKind::Count, false),
];

/// 1 from = factor to
const EDGES: &[(&str, &str, f64)] = &[
    ("kg", "lb", 2.20462),
    ("kg", "g", 1000.0),
    ("m", "ft", 3.28084),
    ("box", "unit", 12.0),
];

/// (id suffix, sku, name, base unit, sale unit, price cents, stock milli, taxable, decimals)
#[allow(clippy::type_complexity)]
const PRODUCTS: &[(&str, &str, &str, &str, Option<&str>, i64, i64, bool, bool)] = &[
    ("cement", "CEM-425", "Cemento gris", "kg", Some("lb"), 10000, 50_000, true, true),
    ("rebar", "VAR-38", "Varilla 3/8", "m", None, 2500, 600_000, true, true),
    ("screws", "TOR-112", "Tornillo 1 1/2", "unit", Some("box"), 15, 1_200_000, true, false),
    ("sand", "ARE-01", "Arena lavada", "kg", None, 300, 2_000_000, false, true),
];

#[derive(Parser, Debug)]
#[command(name = "seed", about = "Ventas Seed Data Generator")]
struct Args {
    /// Database file path
    #[arg(long, short, value_name = "PATH", default_value = "./ventas_dev.db")]
    db: String,

    /// Tenant to seed
    #[arg(long, short, value_name = "ID", default_value = "demo")]
    tenant: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Args { db: db_path, tenant } = Args::parse();

    println!("🌱 Ventas Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Tenant:   {}", tenant);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if !db.products().list_active(&tenant, 1).await?.is_empty() {
        println!("⚠ Tenant {} already has products", tenant);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Units are shared; another tenant may have created them already
    let units = db.units();
    for (id, name, kind, decimals) in UNITS {
        if units.get_unit(&tenant, id).await?.is_some() {
            continue;
        }
        units
            .insert_unit(&Unit {
                id: id.to_string(),
                tenant_id: None,
                code: id.to_string(),
                name: name.to_string(),
                abbreviation: id.to_string(),
                measure_kind: *kind,
                allows_decimals: *decimals,
                is_active: true,
            })
            .await?;
    }
    println!("✓ {} units", UNITS.len());

    for (from, to, factor) in EDGES {
        units.upsert_edge(&tenant, from, to, *factor).await?;
    }
    println!("✓ {} conversion edges", EDGES.len());

    for (suffix, sku, name, base, sale, price, stock, taxable, decimals) in PRODUCTS {
        db.products()
            .insert(&Product {
                id: format!("{tenant}-{suffix}"),
                tenant_id: tenant.clone(),
                sku: sku.to_string(),
                name: name.to_string(),
                base_unit_id: base.to_string(),
                sale_unit_id: sale.map(str::to_string),
                price_per_base_unit: Money::from_cents(*price),
                stock: Quantity::from_milli(*stock),
                tax_applicable: *taxable,
                allows_decimals: *decimals,
                is_active: true,
            })
            .await?;
    }
    println!("✓ {} products", PRODUCTS.len());

    let client_id = format!("{tenant}-client");
    db.clients()
        .insert(&Client {
            id: client_id.clone(),
            tenant_id: tenant.clone(),
            name: "Constructora Demo SRL".to_string(),
            document_number: Some("131-00000-2".to_string()),
            total_purchases: Money::zero(),
            purchase_count: 0,
            last_purchase_at: None,
            is_active: true,
        })
        .await?;
    db.credits()
        .open_account(&tenant, &client_id, Money::from_cents(5_000_000), CreditClassification::A, 30)
        .await?;
    println!("✓ Client {} with credit line {}", client_id, Money::from_cents(5_000_000));

    for (code, name) in [("B01", "Crédito fiscal"), ("B02", "Consumidor final")] {
        db.fiscal()
            .insert(&FiscalDocumentType {
                id: format!("{tenant}-ncf-{}", code.to_lowercase()),
                tenant_id: tenant.clone(),
                code: code.to_string(),
                name: name.to_string(),
                prefix: code.to_string(),
                current_sequence: 0,
                sequence_end: 10_000,
                is_active: true,
            })
            .await?;
    }
    println!("✓ Fiscal document types B01, B02");

    let register = db.registers().open(&tenant, DEMO_USER, Money::from_cents(500_000)).await?;
    println!("✓ Cash register {} open for {}", register.id, DEMO_USER);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
