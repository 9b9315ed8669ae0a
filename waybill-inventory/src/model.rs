//! Domain shapes mapped from the upstream API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stock-keeping product as seen by the inventory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub available_quantity: u64,
    pub reserved_quantity: u64,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<String>,
}

impl Product {
    /// Structurally valid stand-in returned when the upstream cannot answer.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sku: String::new(),
            name: "Unavailable".to_string(),
            available_quantity: 0,
            reserved_quantity: 0,
            unit_price: 0.0,
            warehouse_id: None,
        }
    }
}

/// Lifecycle of a stock reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
    Fulfilled,
    #[default]
    Unknown,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Expired => "expired",
            ReservationStatus::Fulfilled => "fulfilled",
            ReservationStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = std::convert::Infallible;

    /// Lenient parse; anything unrecognized is `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "new" | "requested" => ReservationStatus::Pending,
            "confirmed" | "active" | "held" | "reserved" => ReservationStatus::Confirmed,
            "cancelled" | "canceled" | "released" => ReservationStatus::Cancelled,
            "expired" => ReservationStatus::Expired,
            "fulfilled" | "completed" | "shipped" => ReservationStatus::Fulfilled,
            _ => ReservationStatus::Unknown,
        })
    }
}

/// A hold on product stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub product_id: String,
    pub quantity: u64,
    pub status: ReservationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

impl Reservation {
    /// Stand-in with [`ReservationStatus::Unknown`], returned when the upstream cannot answer.
    pub fn placeholder(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            product_id: String::new(),
            quantity: 0,
            status: ReservationStatus::Unknown,
            reference: None,
            created_at: None,
            expires_at: None,
        }
    }
}

/// Body of a create-reservation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewReservation {
    pub product_id: String,
    pub quantity: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl NewReservation {
    pub fn new(product_id: impl Into<String>, quantity: u64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Partial update of a reservation; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReservationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReservationStatus>,
}

/// Filters for listing products.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub warehouse_id: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ProductQuery {
    /// Query parameters in a fixed order, omitting unset filters.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push(&mut params, "category", self.category.clone());
        push(&mut params, "page", self.page.map(|p| p.to_string()));
        push(&mut params, "page_size", self.page_size.map(|p| p.to_string()));
        push(&mut params, "search", self.search.clone());
        push(&mut params, "warehouse_id", self.warehouse_id.clone());
        params
    }
}

/// Filters for listing reservations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationQuery {
    pub product_id: Option<String>,
    pub status: Option<ReservationStatus>,
    pub reference: Option<String>,
}

impl ReservationQuery {
    /// Query parameters in a fixed order, omitting unset filters.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        push(&mut params, "product_id", self.product_id.clone());
        push(&mut params, "reference", self.reference.clone());
        push(&mut params, "status", self.status.map(|s| s.to_string()));
        params
    }
}

fn push(params: &mut Vec<(&'static str, String)>, name: &'static str, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        params.push((name, value));
    }
}
