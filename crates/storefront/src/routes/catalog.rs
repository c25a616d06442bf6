//! Catalog route handlers: categories, products and search.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::models::{Category, Product};
use crate::search::{FilterState, SearchResults, SortOrder};
use crate::state::AppState;

/// Query parameters for product listing.
#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub category: Option<String>,
}

/// Query parameters for search.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
    #[serde(default)]
    pub in_stock_only: bool,
}

impl SearchQuery {
    /// Build filters, keeping the defaults for anything not given.
    fn filters(&self) -> Result<FilterState> {
        let mut filters = FilterState::default();
        if let Some(min) = &self.min_price {
            filters.min_price = parse_price("min_price", min)?;
        }
        if let Some(max) = &self.max_price {
            filters.max_price = parse_price("max_price", max)?;
        }
        if filters.min_price > filters.max_price {
            return Err(AppError::BadRequest(
                "min_price must not exceed max_price".to_string(),
            ));
        }
        if let Some(sort) = &self.sort {
            filters.sort = SortOrder::parse(sort);
        }
        filters.in_stock_only = self.in_stock_only;
        Ok(filters)
    }
}

fn parse_price(name: &str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim())
        .ok()
        .filter(|d| !d.is_sign_negative())
        .ok_or_else(|| AppError::BadRequest(format!("{name} must be a non-negative amount")))
}

/// All categories.
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.catalog().categories().await?))
}

/// Every product, or those of one category.
pub async fn products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<Vec<Product>>> {
    let Some(handle) = query.category else {
        return Ok(Json(state.catalog().products().await?.to_vec()));
    };

    let (_, products) = state
        .catalog()
        .category_products(&handle)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("category {handle}")))?;
    Ok(Json(products))
}

/// A product page. `favorite` is only present for logged-in shoppers.
#[derive(Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

/// One product by handle.
pub async fn product(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(handle): Path<String>,
) -> Result<Json<ProductDetail>> {
    let product = state
        .catalog()
        .product_by_handle(&handle)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {handle}")))?;

    let favorite = match user {
        Some(user) => Some(state.favorites().contains(user.id, product.id).await?),
        None => None,
    };
    Ok(Json(ProductDetail { product, favorite }))
}

/// Free-text search with price, stock and sort filters.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>> {
    let filters = query.filters()?;
    Ok(Json(state.catalog().search(&query.q, &filters).await?))
}
