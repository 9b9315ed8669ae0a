//! Waybill CLI - operational probe for the inventory integration.
//!
//! # Commands
//!
//! - `waybill health` - Breaker state and cache reachability
//! - `waybill product <id>` - Fetch one product
//! - `waybill products` - List products
//! - `waybill reservation <id>` - Fetch one reservation
//! - `waybill reservations` - List reservations
//! - `waybill reserve <product> <quantity>` - Create a reservation
//! - `waybill cancel <id>` - Cancel a reservation
//! - `waybill config` - Show the effective configuration

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::debug;
use waybill_config::{ENV_PREFIX, EnvLoader, IntegrationSettings};
use waybill_core::HealthStatus;
use waybill_inventory::{
    InventoryClient, NewReservation, ProductQuery, ReservationQuery, ReservationStatus,
};

mod error;
mod output;

use error::{CliError, CliResult};

/// Waybill - resilient inventory integration
#[derive(Parser)]
#[command(name = "waybill")]
#[command(version)]
#[command(about = "Probe and operate the inventory service integration")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Emit JSON on stdout and JSON logs on stderr
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read settings from this .env file
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Report breaker state and cache reachability
    Health,

    /// Fetch one product
    Product {
        /// Product id
        id: String,
    },

    /// List products
    Products(ProductArgs),

    /// Fetch one reservation
    Reservation {
        /// Reservation id
        id: String,
    },

    /// List reservations
    Reservations(ReservationArgs),

    /// Reserve stock for a product
    Reserve {
        /// Product id
        product: String,
        /// Units to reserve
        quantity: u64,
        /// External reference such as an order number
        #[arg(long)]
        reference: Option<String>,
    },

    /// Cancel a reservation
    Cancel {
        /// Reservation id
        id: String,
    },

    /// Show the effective configuration (secrets redacted)
    Config,
}

#[derive(Args)]
struct ProductArgs {
    /// Free-text search
    #[arg(long)]
    search: Option<String>,

    /// Category filter
    #[arg(long)]
    category: Option<String>,

    /// Warehouse filter
    #[arg(long)]
    warehouse: Option<String>,

    /// Page number
    #[arg(long)]
    page: Option<u32>,

    /// Page size
    #[arg(long)]
    page_size: Option<u32>,
}

#[derive(Args)]
struct ReservationArgs {
    /// Only reservations of this product
    #[arg(long)]
    product: Option<String>,

    /// Only reservations in this status
    #[arg(long)]
    status: Option<String>,

    /// Only reservations with this reference
    #[arg(long)]
    reference: Option<String>,
}

fn init_tracing(verbose: bool, json: bool) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

fn load_settings(env_file: Option<&str>) -> CliResult<IntegrationSettings> {
    let loader = EnvLoader::with_dotenv(Some(ENV_PREFIX.to_string()), env_file)?;
    Ok(IntegrationSettings::from_env(&loader)?)
}

fn parse_status(status: Option<String>) -> CliResult<Option<ReservationStatus>> {
    match status {
        None => Ok(None),
        Some(raw) => match raw.parse() {
            Ok(ReservationStatus::Unknown) | Err(_) => Err(CliError::InvalidArgument(format!(
                "unknown reservation status '{raw}'"
            ))),
            Ok(status) => Ok(Some(status)),
        },
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let settings = load_settings(cli.env_file.as_deref())?;
    let json = cli.json;

    if let Commands::Config = cli.command {
        if !json {
            output::info(&format!("Upstream: {}", settings.base_url.cyan()));
        }
        return output::json(&settings);
    }

    debug!(base_url = %settings.base_url, "Building inventory client");
    let client = InventoryClient::from_settings(&settings).await?;

    match cli.command {
        Commands::Health => {
            let report = client.health_check().await;
            if json {
                output::json(&report)?;
            } else {
                output::health(&report);
            }
            if report.status == HealthStatus::Down {
                return Err(CliError::Unhealthy);
            }
        }

        Commands::Product { id } => {
            let result = client.get_product(&id).await;
            if json {
                output::outcome_json(&result)?;
            } else {
                output::fallback_note(&result);
                if let Some(product) = result.value() {
                    output::product(product);
                }
            }
        }

        Commands::Products(args) => {
            let query = ProductQuery {
                search: args.search,
                category: args.category,
                warehouse_id: args.warehouse,
                page: args.page,
                page_size: args.page_size,
            };
            let result = client.list_products(&query).await;
            if json {
                output::outcome_json(&result)?;
            } else {
                output::fallback_note(&result);
                let products = result.value().map(Vec::as_slice).unwrap_or_default();
                if products.is_empty() {
                    output::info("No products");
                }
                products.iter().for_each(output::product);
            }
        }

        Commands::Reservation { id } => {
            let result = client.get_reservation(&id).await;
            if json {
                output::outcome_json(&result)?;
            } else {
                output::fallback_note(&result);
                if let Some(reservation) = result.value() {
                    output::reservation(reservation);
                }
            }
        }

        Commands::Reservations(args) => {
            let query = ReservationQuery {
                product_id: args.product,
                status: parse_status(args.status)?,
                reference: args.reference,
            };
            let result = client.list_reservations(&query).await;
            if json {
                output::outcome_json(&result)?;
            } else {
                output::fallback_note(&result);
                let reservations = result.value().map(Vec::as_slice).unwrap_or_default();
                if reservations.is_empty() {
                    output::info("No reservations");
                }
                reservations.iter().for_each(output::reservation);
            }
        }

        Commands::Reserve {
            product,
            quantity,
            reference,
        } => {
            let mut request = NewReservation::new(product, quantity);
            request.reference = reference;
            let result = client.create_reservation(&request).await;
            if json {
                output::outcome_json(&result)?;
            }
            let reservation = result.into_result()?;
            if !json {
                output::success(&format!("Reserved {}", reservation.id));
                output::reservation(&reservation);
            }
        }

        Commands::Cancel { id } => {
            let result = client.cancel_reservation(&id).await;
            if json {
                output::outcome_json(&result)?;
            }
            let reservation = result.into_result()?;
            if !json {
                output::success(&format!("Cancelled {}", reservation.id));
            }
        }

        // Answered before the client is built.
        Commands::Config => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json);

    if let Err(e) = run(cli).await {
        eprintln!("\n  {} {}\n", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["waybill", "products", "--category", "pallets", "--json"])
            .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Products(args) => assert_eq!(args.category.as_deref(), Some("pallets")),
            _ => panic!("expected products"),
        }
    }

    #[test]
    fn test_status_filter_must_be_known() {
        assert_eq!(
            parse_status(Some("Confirmed".into())).unwrap(),
            Some(ReservationStatus::Confirmed)
        );
        assert!(parse_status(Some("bogus".into())).is_err());
        assert!(parse_status(None).unwrap().is_none());
    }
}
