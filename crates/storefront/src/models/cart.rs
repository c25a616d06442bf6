//! Shopping cart.
//!
//! The stored cart is a map of product to quantity ([`CartLine`]). The
//! [`Cart`] view resolves each line against the catalog.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use furnish_core::ProductId;

use super::Product;

/// A stored cart entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    /// Always positive; a zero quantity removes the line.
    pub quantity: u32,
}

/// A cart line resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
    pub line_total: Decimal,
}

/// A user's cart with totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    /// Sum of quantities across all lines.
    pub item_count: u32,
    pub subtotal: Decimal,
}

impl Cart {
    /// Resolve stored lines against the catalog.
    ///
    /// Lines whose product is no longer in the catalog are skipped.
    #[must_use]
    pub fn resolve(lines: &[CartLine], catalog: &[Product]) -> Self {
        let by_id: HashMap<ProductId, &Product> = catalog.iter().map(|p| (p.id, p)).collect();

        let items: Vec<CartItem> = lines
            .iter()
            .filter_map(|line| {
                let product = by_id.get(&line.product_id)?;
                Some(CartItem {
                    line_total: product.price * Decimal::from(line.quantity),
                    product: (*product).clone(),
                    quantity: line.quantity,
                })
            })
            .collect();

        Self {
            item_count: items.iter().map(|i| i.quantity).sum(),
            subtotal: items.iter().map(|i| i.line_total).sum(),
            items,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use furnish_core::CategoryId;

    use super::*;

    fn product(id: i32, price: &str) -> Product {
        Product {
            id: ProductId::new(id),
            handle: format!("product-{id}"),
            name: format!("Product {id}"),
            description: String::new(),
            price: Decimal::from_str(price).unwrap(),
            category_id: CategoryId::new(1),
            category_name: "Chairs".to_owned(),
            image: None,
            ar_model: None,
            in_stock: true,
        }
    }

    #[test]
    fn test_resolve_totals() {
        let catalog = vec![product(1, "129.99"), product(2, "19.99")];
        let lines = [
            CartLine {
                product_id: ProductId::new(1),
                quantity: 2,
            },
            CartLine {
                product_id: ProductId::new(2),
                quantity: 1,
            },
        ];

        let cart = Cart::resolve(&lines, &catalog);
        assert_eq!(cart.item_count, 3);
        assert_eq!(cart.subtotal, Decimal::from_str("279.97").unwrap());
        assert_eq!(cart.items[0].line_total, Decimal::from_str("259.98").unwrap());
    }

    #[test]
    fn test_resolve_skips_missing_products() {
        let catalog = vec![product(1, "10.00")];
        let lines = [
            CartLine {
                product_id: ProductId::new(1),
                quantity: 1,
            },
            CartLine {
                product_id: ProductId::new(99),
                quantity: 4,
            },
        ];

        let cart = Cart::resolve(&lines, &catalog);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.item_count, 1);
    }

    #[test]
    fn test_empty_cart() {
        let cart = Cart::resolve(&[], &[product(1, "10.00")]);
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal, Decimal::ZERO);
    }
}
