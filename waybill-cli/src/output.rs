//! Human and machine output.

use colored::{ColoredString, Colorize};
use serde::Serialize;
use serde_json::json;
use waybill_core::HealthStatus;
use waybill_inventory::{HealthReport, IntegrationResult, Product, Reservation};

use crate::error::CliResult;

pub fn success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn warn(msg: &str) {
    println!("  {} {}", "⚠".yellow().bold(), msg.yellow());
}

pub fn info(msg: &str) {
    println!("  {} {}", "→".cyan(), msg);
}

/// Print any serializable value as pretty JSON.
pub fn json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Machine form of an outcome: `{"outcome": ..., "value" | "error": ...}`.
pub fn outcome_json<T: Serialize>(result: &IntegrationResult<T>) -> CliResult<()> {
    let value = match result {
        IntegrationResult::Success(v) => json!({"outcome": "success", "value": v}),
        IntegrationResult::Fallback(v) => json!({"outcome": "fallback", "value": v}),
        IntegrationResult::Failure(e) => json!({
            "outcome": "failure",
            "kind": e.kind(),
            "error": e.to_string(),
        }),
    };
    json(&value)
}

fn status(status: HealthStatus) -> ColoredString {
    let text = status.to_string();
    match status {
        HealthStatus::Up => text.green().bold(),
        HealthStatus::Degraded => text.yellow().bold(),
        HealthStatus::Down | HealthStatus::Unknown => text.red().bold(),
    }
}

pub fn health(report: &HealthReport) {
    println!("  {} {}", "Status:".bold(), status(report.status));
    println!(
        "  {} {} ({} consecutive failures)",
        "Breaker:".bold(),
        report.breaker.state.to_string().cyan(),
        report.breaker.failure_count
    );
    if let Some(ms) = report.breaker.last_failure_ms_ago {
        println!("  {} {} ms ago", "Last failure:".bold(), ms);
    }
    let cache = if report.cache_reachable {
        "reachable".green()
    } else {
        "unreachable".red()
    };
    println!("  {} {}", "Cache:".bold(), cache);
}

pub fn product(product: &Product) {
    println!("  {} {} {}", product.id.cyan().bold(), product.sku.dimmed(), product.name);
    println!(
        "    available {}  reserved {}  unit price {:.2}{}",
        product.available_quantity.to_string().green(),
        product.reserved_quantity.to_string().yellow(),
        product.unit_price,
        product
            .warehouse_id
            .as_deref()
            .map(|w| format!("  warehouse {w}"))
            .unwrap_or_default()
    );
}

pub fn reservation(reservation: &Reservation) {
    println!(
        "  {} {} x{} [{}]{}",
        reservation.id.cyan().bold(),
        reservation.product_id,
        reservation.quantity,
        reservation.status.to_string().bold(),
        reservation
            .reference
            .as_deref()
            .map(|r| format!("  ref {r}"))
            .unwrap_or_default()
    );
}

/// Print a note when the value shown is a fallback rather than upstream data.
pub fn fallback_note<T>(result: &IntegrationResult<T>) {
    if result.is_fallback() {
        warn("Inventory service unavailable; showing fallback data");
    }
}
