//! Static product lookup.

use std::sync::Arc;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::any;
use axum::{Json, Router};
use mockserve_core::{Error, Result};
use serde::{Deserialize, Serialize};

use super::error_response;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Product {
    pub id: u32,
    pub name: &'static str,
}

const PRODUCTS: &[Product] = &[
    Product { id: 1, name: "Potato" },
    Product { id: 2, name: "Tomato" },
    Product { id: 3, name: "Onion" },
    Product { id: 4, name: "Carrot" },
    Product { id: 5, name: "Cabbage" },
    Product { id: 6, name: "Broccoli" },
];

#[derive(Debug, Deserialize)]
struct ProductQuery {
    #[serde(default)]
    name: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/products", any(get_product))
}

/// Case-insensitive lookup by product name.
pub fn find_product(name: &str) -> Result<&'static Product> {
    PRODUCTS
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::NotFound(format!("product {:?}", name)))
}

/// ANY /products?name= — canonical product name, or 404.
async fn get_product(Query(query): Query<ProductQuery>) -> impl IntoResponse {
    match find_product(&query.name) {
        Ok(product) => (
            StatusCode::OK,
            Json(serde_json::json!({ "name": product.name })),
        ),
        Err(Error::NotFound(_)) => error_response(StatusCode::NOT_FOUND, "Product not found"),
        Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
    }
}
