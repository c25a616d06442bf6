//! Orders and pricing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use furnish_core::{OrderId, OrderStatus, PaymentMethodId, Price, ProductId, UserId};

use super::{AddressSnapshot, Cart};

/// Sales tax, applied to the subtotal.
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Subtotals strictly above this ship free.
pub const FREE_SHIPPING_THRESHOLD: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Flat delivery charge below the threshold.
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(999, 0, 0, false, 2);

/// Price breakdown of an order.
///
/// `total == subtotal + tax + shipping - discount` always holds for values
/// built by [`OrderTotals::for_subtotal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Apply the shop's pricing rules to a cart subtotal.
    #[must_use]
    pub fn for_subtotal(subtotal: Decimal) -> Self {
        let tax = Price::round_money(subtotal * TAX_RATE);
        let shipping = if subtotal > FREE_SHIPPING_THRESHOLD {
            Decimal::ZERO
        } else {
            FLAT_SHIPPING
        };
        let discount = Decimal::ZERO;

        Self {
            subtotal,
            tax,
            shipping,
            discount,
            total: subtotal + tax + shipping - discount,
        }
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.total == self.subtotal + self.tax + self.shipping - self.discount
    }
}

/// A purchased line, with the product name frozen at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub image: Option<String>,
}

impl OrderItem {
    /// Freeze every line of a cart.
    #[must_use]
    pub fn from_cart(cart: &Cart) -> Vec<Self> {
        cart.items
            .iter()
            .map(|item| Self {
                product_id: item.product.id,
                product_name: item.product.name.clone(),
                quantity: item.quantity,
                unit_price: item.product.price,
                line_total: item.line_total,
                image: item.product.image.clone(),
            })
            .collect()
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    #[serde(flatten)]
    pub totals: OrderTotals,
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    /// Cleared if the card is later deleted.
    pub payment_method_id: Option<PaymentMethodId>,
    pub payment_last4: String,
    pub placed_at: DateTime<Utc>,
    pub status: OrderStatus,
    pub estimated_delivery: DateTime<Utc>,
    pub tracking_code: String,
    pub notes: Option<String>,
    /// Idempotency key of the checkout that produced this order.
    pub checkout_key: Uuid,
}

/// Everything needed to insert an order.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub checkout_key: Uuid,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    pub payment_method_id: PaymentMethodId,
    pub payment_last4: String,
    pub status: OrderStatus,
    pub placed_at: DateTime<Utc>,
    pub estimated_delivery: DateTime<Utc>,
    pub tracking_code: String,
    pub notes: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_constants() {
        assert_eq!(TAX_RATE, dec("0.08"));
        assert_eq!(FREE_SHIPPING_THRESHOLD, dec("50"));
        assert_eq!(FLAT_SHIPPING, dec("9.99"));
    }

    #[test]
    fn test_small_order_pays_shipping() {
        let totals = OrderTotals::for_subtotal(dec("40.00"));
        assert_eq!(totals.tax, dec("3.20"));
        assert_eq!(totals.shipping, dec("9.99"));
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, dec("53.19"));
    }

    #[test]
    fn test_large_order_ships_free() {
        let totals = OrderTotals::for_subtotal(dec("60.00"));
        assert_eq!(totals.tax, dec("4.80"));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, dec("64.80"));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(OrderTotals::for_subtotal(dec("50.00")).shipping, dec("9.99"));
        assert_eq!(OrderTotals::for_subtotal(dec("50.01")).shipping, Decimal::ZERO);
    }

    #[test]
    fn test_tax_rounds_to_pence() {
        // 8% of 19.99 is 1.5992
        let totals = OrderTotals::for_subtotal(dec("19.99"));
        assert_eq!(totals.tax, dec("1.60"));
        assert!(totals.is_consistent());
    }

    #[test]
    fn test_totals_always_consistent() {
        for subtotal in ["0", "0.01", "49.99", "50", "349.99", "1234.56"] {
            assert!(OrderTotals::for_subtotal(dec(subtotal)).is_consistent());
        }
    }
}
