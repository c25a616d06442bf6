//! Product search and filtering.
//!
//! The catalog is small enough to scan: a query is a case-insensitive
//! substring match over name, description and category name, followed by a
//! price window, an optional stock filter and a stable price sort.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Product;

/// Default upper bound of the price window.
pub const DEFAULT_MAX_PRICE: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Sort order applied after filtering.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Keep catalog order.
    #[default]
    None,
    PriceLowToHigh,
    PriceHighToLow,
}

impl SortOrder {
    /// Parse from URL parameter value. Unknown values keep catalog order.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "price-ascending" | "price_low_to_high" => Self::PriceLowToHigh,
            "price-descending" | "price_high_to_low" => Self::PriceHighToLow,
            _ => Self::None,
        }
    }

    /// Convert to URL parameter value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::PriceLowToHigh => "price-ascending",
            Self::PriceHighToLow => "price-descending",
        }
    }
}

/// Filter settings. Both price bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub min_price: Decimal,
    pub max_price: Decimal,
    pub sort: SortOrder,
    pub in_stock_only: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            min_price: Decimal::ZERO,
            max_price: DEFAULT_MAX_PRICE,
            sort: SortOrder::None,
            in_stock_only: false,
        }
    }
}

impl FilterState {
    fn admits(&self, product: &Product) -> bool {
        product.price >= self.min_price
            && product.price <= self.max_price
            && (!self.in_stock_only || product.in_stock)
    }
}

/// Whether a product matches a free-text query. A blank query matches all.
#[must_use]
pub fn matches_query(product: &Product, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }

    [
        product.name.as_str(),
        product.description.as_str(),
        product.category_name.as_str(),
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// Apply the price window, stock filter and sort.
///
/// The sort is stable, so applying the same filter twice gives the same
/// list.
#[must_use]
pub fn apply_filters(products: &[Product], filters: &FilterState) -> Vec<Product> {
    let mut kept: Vec<Product> = products
        .iter()
        .filter(|p| filters.admits(p))
        .cloned()
        .collect();

    match filters.sort {
        SortOrder::None => {}
        SortOrder::PriceLowToHigh => kept.sort_by(|a, b| a.price.cmp(&b.price)),
        SortOrder::PriceHighToLow => kept.sort_by(|a, b| b.price.cmp(&a.price)),
    }
    kept
}

/// Search results with facets over everything the query matched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub products: Vec<Product>,
    /// Products matching the query before the filters were applied.
    pub total_count: usize,
    pub in_stock_count: usize,
    pub out_of_stock_count: usize,
    /// Cheapest and dearest matching product, before filtering.
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl SearchResults {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Match `query`, collect facets, then filter and sort.
#[must_use]
pub fn search(products: &[Product], query: &str, filters: &FilterState) -> SearchResults {
    let matched: Vec<Product> = products
        .iter()
        .filter(|p| matches_query(p, query))
        .cloned()
        .collect();

    let in_stock_count = matched.iter().filter(|p| p.in_stock).count();

    SearchResults {
        query: query.trim().to_owned(),
        total_count: matched.len(),
        in_stock_count,
        out_of_stock_count: matched.len() - in_stock_count,
        min_price: matched.iter().map(|p| p.price).min(),
        max_price: matched.iter().map(|p| p.price).max(),
        products: apply_filters(&matched, filters),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use furnish_core::{CategoryId, ProductId};

    use super::*;

    fn product(id: i32, name: &str, category: &str, price: &str, in_stock: bool) -> Product {
        Product {
            id: ProductId::new(id),
            handle: name.to_lowercase().replace(' ', "-"),
            name: name.to_owned(),
            description: format!("The {name}"),
            price: Decimal::from_str(price).unwrap(),
            category_id: CategoryId::new(1),
            category_name: category.to_owned(),
            image: None,
            ar_model: None,
            in_stock,
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product(1, "KLIPPAN Sofa", "Sofas", "349.99", true),
            product(2, "LISABO Table", "Tables", "149.99", true),
            product(3, "POÄNG Chair", "Chairs", "129.99", false),
            product(4, "STRANDMON Chair", "Chairs", "249.00", true),
            product(5, "LACK Table", "Tables", "129.99", true),
            product(6, "SÖDERHAMN Sofa", "Sofas", "1299.00", true),
        ]
    }

    fn ids(products: &[Product]) -> Vec<i32> {
        products.iter().map(|p| p.id.as_i32()).collect()
    }

    #[test]
    fn test_query_is_case_insensitive_substring() {
        let products = catalog();
        assert!(matches_query(&products[0], "sofa"));
        assert!(matches_query(&products[0], "KLIP"));
        assert!(matches_query(&products[2], "chairs"));
        assert!(!matches_query(&products[0], "table"));
    }

    #[test]
    fn test_blank_query_matches_everything() {
        assert!(catalog().iter().all(|p| matches_query(p, "   ")));
    }

    #[test]
    fn test_default_filters_drop_only_expensive() {
        let kept = apply_filters(&catalog(), &FilterState::default());
        assert_eq!(ids(&kept), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_price_bounds_are_inclusive() {
        let filters = FilterState {
            min_price: Decimal::from_str("129.99").unwrap(),
            max_price: Decimal::from_str("149.99").unwrap(),
            ..FilterState::default()
        };
        assert_eq!(ids(&apply_filters(&catalog(), &filters)), vec![2, 3, 5]);
    }

    #[test]
    fn test_in_stock_only() {
        let filters = FilterState {
            in_stock_only: true,
            ..FilterState::default()
        };
        assert!(!ids(&apply_filters(&catalog(), &filters)).contains(&3));
    }

    #[test]
    fn test_sort_is_stable() {
        let filters = FilterState {
            sort: SortOrder::PriceLowToHigh,
            ..FilterState::default()
        };
        // 3 and 5 share a price and keep catalog order.
        assert_eq!(ids(&apply_filters(&catalog(), &filters)), vec![3, 5, 2, 4, 1]);

        let filters = FilterState {
            sort: SortOrder::PriceHighToLow,
            ..FilterState::default()
        };
        assert_eq!(ids(&apply_filters(&catalog(), &filters)), vec![1, 4, 2, 3, 5]);
    }

    #[test]
    fn test_apply_filters_is_idempotent() {
        for sort in [
            SortOrder::None,
            SortOrder::PriceLowToHigh,
            SortOrder::PriceHighToLow,
        ] {
            let filters = FilterState {
                sort,
                in_stock_only: true,
                ..FilterState::default()
            };
            let once = apply_filters(&catalog(), &filters);
            let twice = apply_filters(&once, &filters);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_search_facets() {
        let results = search(&catalog(), "chair", &FilterState::default());
        assert_eq!(results.total_count, 2);
        assert_eq!(results.in_stock_count, 1);
        assert_eq!(results.out_of_stock_count, 1);
        assert_eq!(results.min_price, Some(Decimal::from_str("129.99").unwrap()));
        assert_eq!(results.max_price, Some(Decimal::from_str("249.00").unwrap()));
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("price-ascending"), SortOrder::PriceLowToHigh);
        assert_eq!(SortOrder::parse("price_high_to_low"), SortOrder::PriceHighToLow);
        assert_eq!(SortOrder::parse("bogus"), SortOrder::None);
    }
}
