//! Tolerant mapping of upstream payloads.
//!
//! The upstream API has renamed fields over time and wraps payloads
//! inconsistently. Each logical attribute is a [`Field`] listing the names it
//! has been published under, probed in order.

use serde_json::{Map, Value};
use tracing::warn;

use crate::model::{Product, Reservation, ReservationStatus};
use crate::result::InventoryError;

/// Keys a single record may be wrapped under.
const OBJECT_ENVELOPES: &[&str] = &["data", "result", "item"];

/// Keys a collection may be wrapped under.
const LIST_ENVELOPES: &[&str] = &["data", "items", "results", "records", "products", "reservations"];

/// Ordered candidate names for one logical attribute.
#[derive(Debug, Clone, Copy)]
pub struct Field(pub &'static [&'static str]);

impl Field {
    fn values<'a>(&self, obj: &'a Map<String, Value>) -> impl Iterator<Item = &'a Value> {
        self.0.iter().filter_map(move |name| obj.get(*name))
    }

    /// First candidate holding a non-empty string or a number.
    pub fn text(&self, obj: &Map<String, Value>) -> Option<String> {
        self.values(obj).find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// First candidate holding a non-negative whole quantity.
    pub fn count(&self, obj: &Map<String, Value>) -> Option<u64> {
        self.values(obj).find_map(|value| match value {
            Value::Number(n) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        })
    }

    /// First candidate holding a finite decimal.
    pub fn decimal(&self, obj: &Map<String, Value>) -> Option<f64> {
        self.values(obj)
            .find_map(|value| match value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            })
            .filter(|f| f.is_finite())
    }
}

pub mod product {
    use super::Field;

    pub const ID: Field = Field(&["id", "product_id", "productId", "_id", "uuid"]);
    pub const SKU: Field = Field(&["sku", "code", "product_code", "productCode", "item_code"]);
    pub const NAME: Field = Field(&["name", "title", "product_name", "productName", "description"]);
    pub const AVAILABLE: Field = Field(&[
        "available_quantity",
        "availableQuantity",
        "available",
        "quantity_available",
        "qty_available",
        "stock",
        "on_hand",
    ]);
    pub const RESERVED: Field = Field(&[
        "reserved_quantity",
        "reservedQuantity",
        "reserved",
        "qty_reserved",
        "allocated",
    ]);
    pub const PRICE: Field = Field(&["unit_price", "unitPrice", "price", "cost"]);
    pub const WAREHOUSE: Field = Field(&[
        "warehouse_id",
        "warehouseId",
        "warehouse",
        "location_id",
        "locationId",
    ]);
}

pub mod reservation {
    use super::Field;

    pub const ID: Field = Field(&["id", "reservation_id", "reservationId", "_id"]);
    pub const PRODUCT_ID: Field = Field(&["product_id", "productId", "product", "item_id"]);
    pub const QUANTITY: Field = Field(&["quantity", "qty", "reserved_quantity", "units"]);
    pub const STATUS: Field = Field(&["status", "state", "reservation_status"]);
    pub const REFERENCE: Field = Field(&[
        "reference",
        "order_id",
        "orderId",
        "external_ref",
        "externalReference",
    ]);
    pub const CREATED_AT: Field = Field(&["created_at", "createdAt", "created"]);
    pub const EXPIRES_AT: Field = Field(&["expires_at", "expiresAt", "expiry", "hold_until"]);
}

/// Locate the record in a possibly wrapped single-object payload.
pub fn unwrap_object(payload: &Value) -> Option<&Map<String, Value>> {
    let mut obj = payload.as_object()?;
    for _ in 0..2 {
        match OBJECT_ENVELOPES
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_object))
        {
            Some(inner) => obj = inner,
            None => break,
        }
    }
    Some(obj)
}

/// Locate the array in a bare or wrapped list payload.
pub fn unwrap_list(payload: &Value) -> Option<&Vec<Value>> {
    fn find(value: &Value, depth: u8) -> Option<&Vec<Value>> {
        match value {
            Value::Array(items) => Some(items),
            Value::Object(obj) if depth > 0 => {
                if let Some(items) = LIST_ENVELOPES
                    .iter()
                    .find_map(|key| obj.get(*key).and_then(Value::as_array))
                {
                    return Some(items);
                }
                OBJECT_ENVELOPES
                    .iter()
                    .filter_map(|key| obj.get(*key))
                    .find_map(|inner| find(inner, depth - 1))
            }
            _ => None,
        }
    }
    find(payload, 2)
}

fn map_product_record(obj: &Map<String, Value>) -> Product {
    Product {
        id: product::ID.text(obj).unwrap_or_default(),
        sku: product::SKU.text(obj).unwrap_or_default(),
        name: product::NAME.text(obj).unwrap_or_default(),
        available_quantity: product::AVAILABLE.count(obj).unwrap_or(0),
        reserved_quantity: product::RESERVED.count(obj).unwrap_or(0),
        unit_price: product::PRICE.decimal(obj).unwrap_or(0.0),
        warehouse_id: product::WAREHOUSE.text(obj),
    }
}

fn map_reservation_record(obj: &Map<String, Value>) -> Reservation {
    Reservation {
        id: reservation::ID.text(obj).unwrap_or_default(),
        product_id: reservation::PRODUCT_ID.text(obj).unwrap_or_default(),
        quantity: reservation::QUANTITY.count(obj).unwrap_or(0),
        status: reservation::STATUS
            .text(obj)
            .and_then(|s| s.parse().ok())
            .unwrap_or(ReservationStatus::Unknown),
        reference: reservation::REFERENCE.text(obj),
        created_at: reservation::CREATED_AT.text(obj),
        expires_at: reservation::EXPIRES_AT.text(obj),
    }
}

/// Map a single product, defaulting a missing id to `requested_id`.
pub fn map_product(payload: &Value, requested_id: Option<&str>) -> Result<Product, InventoryError> {
    let obj = unwrap_object(payload)
        .ok_or_else(|| InventoryError::InvalidResponse("product payload is not an object".into()))?;
    let mut product = map_product_record(obj);
    if product.id.is_empty()
        && let Some(id) = requested_id
    {
        product.id = id.to_string();
    }
    Ok(product)
}

/// Map a single reservation, defaulting a missing id to `requested_id`.
pub fn map_reservation(
    payload: &Value,
    requested_id: Option<&str>,
) -> Result<Reservation, InventoryError> {
    let obj = unwrap_object(payload).ok_or_else(|| {
        InventoryError::InvalidResponse("reservation payload is not an object".into())
    })?;
    let mut reservation = map_reservation_record(obj);
    if reservation.id.is_empty()
        && let Some(id) = requested_id
    {
        reservation.id = id.to_string();
    }
    Ok(reservation)
}

/// Map a product list; entries that are not objects are skipped.
pub fn map_products(payload: &Value) -> Result<Vec<Product>, InventoryError> {
    map_list(payload, "product", map_product_record)
}

/// Map a reservation list; entries that are not objects are skipped.
pub fn map_reservations(payload: &Value) -> Result<Vec<Reservation>, InventoryError> {
    map_list(payload, "reservation", map_reservation_record)
}

fn map_list<T>(
    payload: &Value,
    what: &str,
    map: fn(&Map<String, Value>) -> T,
) -> Result<Vec<T>, InventoryError> {
    let items = unwrap_list(payload)
        .ok_or_else(|| InventoryError::InvalidResponse(format!("{what} list payload has no items")))?;

    let mapped: Vec<T> = items.iter().filter_map(Value::as_object).map(map).collect();
    if mapped.len() < items.len() {
        warn!(
            skipped = items.len() - mapped.len(),
            kind = what,
            "Skipped non-object list entries"
        );
    }
    Ok(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_probes_alternate_names_in_order() {
        let payload = json!({
            "productId": 42,
            "code": "PAL-EU",
            "title": "Euro pallet",
            "qty_available": "17",
            "allocated": 3,
            "price": "12.50",
            "warehouseId": "wh-north",
        });

        let product = map_product(&payload, None).unwrap();

        assert_eq!(product.id, "42");
        assert_eq!(product.sku, "PAL-EU");
        assert_eq!(product.name, "Euro pallet");
        assert_eq!(product.available_quantity, 17);
        assert_eq!(product.reserved_quantity, 3);
        assert_eq!(product.unit_price, 12.5);
        assert_eq!(product.warehouse_id.as_deref(), Some("wh-north"));
    }

    #[test]
    fn test_earlier_candidate_wins() {
        let payload = json!({"available": 1, "available_quantity": 9});
        assert_eq!(product::AVAILABLE.count(payload.as_object().unwrap()), Some(9));
    }

    #[test]
    fn test_unusable_candidate_falls_through() {
        let payload = json!({"name": "", "title": "Crate"});
        assert_eq!(product::NAME.text(payload.as_object().unwrap()).as_deref(), Some("Crate"));
    }

    #[test]
    fn test_missing_fields_default() {
        let product = map_product(&json!({}), Some("p-9")).unwrap();

        assert_eq!(product.id, "p-9");
        assert_eq!(product.sku, "");
        assert_eq!(product.available_quantity, 0);
        assert_eq!(product.unit_price, 0.0);
        assert!(product.warehouse_id.is_none());
    }

    #[test]
    fn test_negative_and_garbage_numbers_default_to_zero() {
        let product = map_product(&json!({"stock": -4, "price": "n/a"}), None).unwrap();

        assert_eq!(product.available_quantity, 0);
        assert_eq!(product.unit_price, 0.0);
    }

    #[test]
    fn test_unwraps_object_envelopes() {
        let payload = json!({"data": {"item": {"reservationId": "r-1", "state": "HELD", "qty": 2}}});

        let reservation = map_reservation(&payload, None).unwrap();

        assert_eq!(reservation.id, "r-1");
        assert_eq!(reservation.status, ReservationStatus::Confirmed);
        assert_eq!(reservation.quantity, 2);
    }

    #[test]
    fn test_non_object_is_invalid() {
        assert!(matches!(
            map_reservation(&json!("oops"), Some("r-1")),
            Err(InventoryError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_list_shapes() {
        let bare = json!([{"id": "a"}, {"id": "b"}]);
        let wrapped = json!({"items": [{"id": "a"}], "total": 1});
        let nested = json!({"data": {"products": [{"id": "a"}, 7]}});

        assert_eq!(map_products(&bare).unwrap().len(), 2);
        assert_eq!(map_products(&wrapped).unwrap().len(), 1);
        assert_eq!(map_products(&nested).unwrap().len(), 1);
        assert!(map_products(&json!({"total": 0})).is_err());
    }

    #[test]
    fn test_reservation_list_wrapped() {
        let payload = json!({"reservations": [
            {"id": 1, "product_id": "p-1", "quantity": 4, "status": "pending", "orderId": "SO-1"}
        ]});

        let reservations = map_reservations(&payload).unwrap();

        assert_eq!(reservations[0].id, "1");
        assert_eq!(reservations[0].status, ReservationStatus::Pending);
        assert_eq!(reservations[0].reference.as_deref(), Some("SO-1"));
    }
}
