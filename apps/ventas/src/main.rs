//! # ventas CLI
//!
//! Runs one procedure: reads a JSON request on stdin and prints the JSON
//! response on stdout.
//!
//! ## Usage
//! ```bash
//! echo '{"unitFromId":"kg","unitToId":"lb"}' \
//!     | ventas --tenant demo resolve-conversion-factor
//!
//! ventas --tenant demo --user demo-user create-sale < sale.json
//! ```
//!
//! `--tenant` and `--user` fall back to `VENTAS_TENANT_ID` and
//! `VENTAS_USER_ID`. Argument errors and `--help` are handled by clap.
//! Procedure failures print `{"error": {"code": ..., "message": ...}}` and
//! exit with status 1.

use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde::de::DeserializeOwned;

use ventas_app::commands::{conversion, credit, sale};
use ventas_app::error::ApiError;
use ventas_app::state::DbState;
use ventas_core::SaleContext;

#[derive(Parser, Debug)]
#[command(name = "ventas", version, about = "Ventas sales procedures (JSON on stdin, JSON on stdout)")]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, short, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Tenant id
    #[arg(long, short, env = "VENTAS_TENANT_ID", value_name = "ID")]
    tenant: String,

    /// Cashier user id, required by create-sale
    #[arg(long, short, env = "VENTAS_USER_ID", value_name = "ID")]
    user: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Factor between two units: {unitFromId, unitToId}
    ResolveConversionFactor,
    /// Convert a quantity: {quantity, unitFromId, unitToId}
    ConvertQuantity,
    /// Credit decision for a client: {clientId, proposedTotal}
    EvaluateCredit,
    /// Record a sale from a sale request (needs --user)
    CreateSale,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a ApiError,
}

fn read_request<T: DeserializeOwned>() -> Result<T, ApiError> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| ApiError::internal(format!("Cannot read stdin: {}", e)))?;
    serde_json::from_str(&input).map_err(|e| ApiError::validation(format!("Invalid request: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::internal(e.to_string()))
}

/// Cashier for commands that record something.
fn require_user(cli: &Cli) -> Result<&str, ApiError> {
    cli.user
        .as_deref()
        .ok_or_else(|| ApiError::validation("--user is required for create-sale"))
}

async fn dispatch(db: &DbState, cli: &Cli) -> Result<String, ApiError> {
    let tenant = cli.tenant.as_str();

    match cli.command {
        Command::ResolveConversionFactor => {
            let request = read_request()?;
            to_json(&conversion::resolve_conversion_factor(db, tenant, &request).await?)
        }
        Command::ConvertQuantity => {
            let request = read_request()?;
            to_json(&conversion::convert_quantity(db, tenant, &request).await?)
        }
        Command::EvaluateCredit => {
            let request = read_request()?;
            to_json(&credit::evaluate_credit(db, tenant, &request).await?)
        }
        Command::CreateSale => {
            let user = require_user(cli)?;
            let request = read_request()?;
            to_json(&sale::create_sale(db, &SaleContext::new(tenant, user), &request).await?)
        }
    }
}

async fn run(cli: Cli) -> Result<String, ApiError> {
    if cli.command == Command::CreateSale {
        require_user(&cli)?;
    }

    let (_, db) = ventas_app::open(cli.config.as_deref()).await?;
    let output = dispatch(&db, &cli).await;
    db.inner().close().await;
    output
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    ventas_app::init_tracing();

    match run(cli).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(error) => {
            match to_json(&ErrorBody { error: &error }) {
                Ok(body) => println!("{}", body),
                Err(_) => println!("{}", error),
            }
            ExitCode::FAILURE
        }
    }
}
