//! Cache keys and tags.
//!
//! Keys are derived only from the operation and its parameters, so equal
//! requests always land on the same entry.

use crate::model::{ProductQuery, ReservationQuery};

/// Tag shared by every cached product list view.
pub const PRODUCT_LISTS_TAG: &str = "product-lists";

/// Tag shared by every cached reservation list view.
pub const RESERVATION_LISTS_TAG: &str = "reservation-lists";

pub fn product(id: &str) -> String {
    format!("inventory:product:{}", urlencoding::encode(id))
}

pub fn reservation(id: &str) -> String {
    format!("inventory:reservation:{}", urlencoding::encode(id))
}

pub fn product_list(query: &ProductQuery) -> String {
    list("products", &query.params())
}

pub fn reservation_list(query: &ReservationQuery) -> String {
    list("reservations", &query.params())
}

fn list(resource: &str, params: &[(&'static str, String)]) -> String {
    if params.is_empty() {
        return format!("inventory:{resource}:list");
    }
    let filters: Vec<String> = params
        .iter()
        .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
        .collect();
    format!("inventory:{resource}:list?{}", filters.join("&"))
}
