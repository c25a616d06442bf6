//! Checkout wizard.
//!
//! Five linear steps: Review → Address → Payment → Summary → Confirmation.
//! [`CheckoutWizard`] is the pure state machine; [`CheckoutService`] keeps one
//! wizard per user in an idle-expiring cache and wires it to the cart,
//! address book, saved cards and order services.
//!
//! A wizard carries a checkout key for its whole life, so placing the same
//! checkout twice (a retried request, a double tap) yields one order.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::instrument;
use uuid::Uuid;

use furnish_core::{AddressId, OrderId, PaymentMethodId, UserId};

use super::{
    AddressService, CartService, OrderError, OrderService, PaymentMethodService, PlaceOrder,
    RecordError,
};
use crate::models::{Address, Cart, Order, OrderTotals, PaymentMethod};

/// A step of the wizard, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    Review = 1,
    Address = 2,
    Payment = 3,
    Summary = 4,
    Confirmation = 5,
}

impl CheckoutStep {
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Review => "Review cart",
            Self::Address => "Delivery address",
            Self::Payment => "Payment",
            Self::Summary => "Order summary",
            Self::Confirmation => "Confirmation",
        }
    }

    const fn following(self) -> Self {
        match self {
            Self::Review => Self::Address,
            Self::Address => Self::Payment,
            Self::Payment => Self::Summary,
            Self::Summary | Self::Confirmation => Self::Confirmation,
        }
    }

    const fn preceding(self) -> Self {
        match self {
            Self::Review | Self::Address => Self::Review,
            Self::Payment => Self::Address,
            Self::Summary => Self::Payment,
            Self::Confirmation => Self::Confirmation,
        }
    }
}

/// Reasons a wizard action is refused. The messages are shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Please select a shipping address")]
    AddressRequired,

    #[error("Please select a payment method")]
    PaymentMethodRequired,

    /// `next` from Summary; only placing the order moves on.
    #[error("Place your order to continue")]
    PlaceOrderRequired,

    #[error("Your order can only be placed from the summary step")]
    NotAtSummary,

    #[error("This order has already been placed")]
    AlreadyPlaced,

    #[error("Address not found")]
    AddressNotFound,

    #[error("Payment method not found")]
    PaymentMethodNotFound,

    #[error("Failed to place order")]
    PlacementFailed,

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// What the shopper sees after placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub tracking_code: String,
    pub total: Decimal,
    pub item_count: u32,
    pub estimated_delivery: DateTime<Utc>,
    pub ship_to: String,
}

impl From<&Order> for OrderConfirmation {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            tracking_code: order.tracking_code.clone(),
            total: order.totals.total,
            item_count: order.items.iter().map(|i| i.quantity).sum(),
            estimated_delivery: order.estimated_delivery,
            ship_to: order.shipping_address.one_line(),
        }
    }
}

/// One shopper's progress through checkout.
#[derive(Debug, Clone)]
pub struct CheckoutWizard {
    step: CheckoutStep,
    address_id: Option<AddressId>,
    payment_method_id: Option<PaymentMethodId>,
    checkout_key: Uuid,
    confirmation: Option<OrderConfirmation>,
    error: Option<String>,
}

impl Default for CheckoutWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutWizard {
    /// A fresh wizard at Review with a new checkout key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: CheckoutStep::Review,
            address_id: None,
            payment_method_id: None,
            checkout_key: Uuid::new_v4(),
            confirmation: None,
            error: None,
        }
    }

    #[must_use]
    pub const fn step(&self) -> CheckoutStep {
        self.step
    }

    #[must_use]
    pub const fn address_id(&self) -> Option<AddressId> {
        self.address_id
    }

    #[must_use]
    pub const fn payment_method_id(&self) -> Option<PaymentMethodId> {
        self.payment_method_id
    }

    #[must_use]
    pub const fn checkout_key(&self) -> Uuid {
        self.checkout_key
    }

    #[must_use]
    pub const fn confirmation(&self) -> Option<&OrderConfirmation> {
        self.confirmation.as_ref()
    }

    /// Message from the last refused action, cleared by the next success.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Advance one step if the current step's requirement is met.
    ///
    /// At Confirmation this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the unmet requirement; the step does not change.
    pub fn next(&mut self, cart_is_empty: bool) -> Result<CheckoutStep, CheckoutError> {
        let gate = match self.step {
            CheckoutStep::Review if cart_is_empty => Err(CheckoutError::EmptyCart),
            CheckoutStep::Address if self.address_id.is_none() => {
                Err(CheckoutError::AddressRequired)
            }
            CheckoutStep::Payment if self.payment_method_id.is_none() => {
                Err(CheckoutError::PaymentMethodRequired)
            }
            CheckoutStep::Summary => Err(CheckoutError::PlaceOrderRequired),
            _ => Ok(()),
        };

        match gate {
            Ok(()) => {
                self.step = self.step.following();
                self.error = None;
                Ok(self.step)
            }
            Err(e) => Err(self.refuse(e)),
        }
    }

    /// Go back one step, stopping at Review.
    ///
    /// Once the order is placed there is nothing to go back to, so
    /// Confirmation stays put.
    pub fn previous(&mut self) -> CheckoutStep {
        self.step = self.step.preceding();
        self.error = None;
        self.step
    }

    /// # Errors
    ///
    /// Returns `CheckoutError::AlreadyPlaced` at Confirmation.
    pub fn select_address(&mut self, id: AddressId) -> Result<(), CheckoutError> {
        self.ensure_open()?;
        self.address_id = Some(id);
        self.error = None;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `CheckoutError::AlreadyPlaced` at Confirmation.
    pub fn select_payment_method(&mut self, id: PaymentMethodId) -> Result<(), CheckoutError> {
        self.ensure_open()?;
        self.payment_method_id = Some(id);
        self.error = None;
        Ok(())
    }

    /// Enter Confirmation after a successful placement.
    pub fn confirm(&mut self, confirmation: OrderConfirmation) {
        self.step = CheckoutStep::Confirmation;
        self.confirmation = Some(confirmation);
        self.error = None;
    }

    /// Record a refused action, keeping the current step.
    pub fn refuse(&mut self, error: CheckoutError) -> CheckoutError {
        self.error = Some(error.to_string());
        error
    }

    /// Start over at Review with a new checkout key.
    pub fn finish(&mut self) {
        *self = Self::new();
    }

    fn ensure_open(&mut self) -> Result<(), CheckoutError> {
        if self.step == CheckoutStep::Confirmation {
            return Err(self.refuse(CheckoutError::AlreadyPlaced));
        }
        Ok(())
    }
}

/// Wizard state plus everything needed to render the current step.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    pub step: CheckoutStep,
    pub step_number: u8,
    pub title: &'static str,
    pub cart: Cart,
    pub totals: OrderTotals,
    pub address: Option<Address>,
    pub payment_method: Option<PaymentMethod>,
    pub confirmation: Option<OrderConfirmation>,
    pub error: Option<String>,
}

/// Per-user wizards wired to the other services.
#[derive(Clone)]
pub struct CheckoutService {
    wizards: Cache<UserId, Arc<Mutex<CheckoutWizard>>>,
    cart: CartService,
    addresses: AddressService,
    payment_methods: PaymentMethodService,
    orders: OrderService,
}

impl CheckoutService {
    /// Wizards untouched for `idle_timeout` are dropped; the shopper starts
    /// again at Review.
    #[must_use]
    pub fn new(
        cart: CartService,
        addresses: AddressService,
        payment_methods: PaymentMethodService,
        orders: OrderService,
        idle_timeout: Duration,
    ) -> Self {
        let wizards = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(idle_timeout)
            .build();

        Self {
            wizards,
            cart,
            addresses,
            payment_methods,
            orders,
        }
    }

    async fn wizard(&self, user: UserId) -> Arc<Mutex<CheckoutWizard>> {
        self.wizards
            .get_with(user, async { Arc::new(Mutex::new(CheckoutWizard::new())) })
            .await
    }

    /// Begin a fresh checkout, pre-selecting the default (or first) address
    /// and card.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Record` if a store cannot be read.
    #[instrument(skip(self))]
    pub async fn start(&self, user: UserId) -> Result<CheckoutView, CheckoutError> {
        let wizard = self.wizard(user).await;
        let mut wizard = wizard.lock().await;
        wizard.finish();

        if let Some(address) = self.addresses.preferred(user).await? {
            wizard.select_address(address.id)?;
        }
        if let Some(card) = self.payment_methods.preferred(user).await? {
            wizard.select_payment_method(card.id)?;
        }

        self.render(user, &wizard).await
    }

    /// # Errors
    ///
    /// Returns `CheckoutError::Record` if a store cannot be read.
    pub async fn view(&self, user: UserId) -> Result<CheckoutView, CheckoutError> {
        let wizard = self.wizard(user).await;
        let wizard = wizard.lock().await;
        self.render(user, &wizard).await
    }

    /// # Errors
    ///
    /// Returns the unmet requirement of the current step.
    #[instrument(skip(self))]
    pub async fn next(&self, user: UserId) -> Result<CheckoutView, CheckoutError> {
        let wizard = self.wizard(user).await;
        let mut wizard = wizard.lock().await;
        let cart = self.cart.snapshot(user).await?;
        wizard.next(cart.is_empty())?;
        self.render(user, &wizard).await
    }

    /// # Errors
    ///
    /// Returns `CheckoutError::Record` if a store cannot be read.
    pub async fn previous(&self, user: UserId) -> Result<CheckoutView, CheckoutError> {
        let wizard = self.wizard(user).await;
        let mut wizard = wizard.lock().await;
        wizard.previous();
        self.render(user, &wizard).await
    }

    /// # Errors
    ///
    /// Returns `CheckoutError::AddressNotFound` unless the user owns `id`.
    pub async fn select_address(
        &self,
        user: UserId,
        id: AddressId,
    ) -> Result<CheckoutView, CheckoutError> {
        let wizard = self.wizard(user).await;
        let mut wizard = wizard.lock().await;
        match self.addresses.get(user, id).await {
            Ok(_) => wizard.select_address(id)?,
            Err(RecordError::NotFound) => return Err(wizard.refuse(CheckoutError::AddressNotFound)),
            Err(e) => return Err(e.into()),
        }
        self.render(user, &wizard).await
    }

    /// # Errors
    ///
    /// Returns `CheckoutError::PaymentMethodNotFound` unless the user owns
    /// `id`.
    pub async fn select_payment_method(
        &self,
        user: UserId,
        id: PaymentMethodId,
    ) -> Result<CheckoutView, CheckoutError> {
        let wizard = self.wizard(user).await;
        let mut wizard = wizard.lock().await;
        match self.payment_methods.get(user, id).await {
            Ok(_) => wizard.select_payment_method(id)?,
            Err(RecordError::NotFound) => {
                return Err(wizard.refuse(CheckoutError::PaymentMethodNotFound));
            }
            Err(e) => return Err(e.into()),
        }
        self.render(user, &wizard).await
    }

    /// Place the order from the Summary step.
    ///
    /// On success the wizard enters Confirmation and the cart is cleared. On
    /// failure the wizard stays at Summary with the error recorded.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotAtSummary` from any other step and
    /// `CheckoutError::PlacementFailed` if the order could not be stored. A
    /// store that cannot read the selected address or card returns
    /// `CheckoutError::Record`; only a deleted selection counts as unselected.
    #[instrument(skip(self, notes))]
    pub async fn place_order(
        &self,
        user: UserId,
        notes: Option<String>,
    ) -> Result<CheckoutView, CheckoutError> {
        let wizard = self.wizard(user).await;
        let mut wizard = wizard.lock().await;
        if wizard.step() != CheckoutStep::Summary {
            return Err(wizard.refuse(CheckoutError::NotAtSummary));
        }

        let address = match wizard.address_id() {
            Some(id) => optional(self.addresses.get(user, id).await)?,
            None => None,
        };
        let Some(address) = address else {
            return Err(wizard.refuse(CheckoutError::AddressRequired));
        };
        let card = match wizard.payment_method_id() {
            Some(id) => optional(self.payment_methods.get(user, id).await)?,
            None => None,
        };
        let Some(card) = card else {
            return Err(wizard.refuse(CheckoutError::PaymentMethodRequired));
        };

        let cart = self.cart.snapshot(user).await?;
        let placed = self
            .orders
            .place(PlaceOrder {
                user,
                checkout_key: wizard.checkout_key(),
                cart: &cart,
                address: &address,
                payment: &card,
                notes: notes.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty()),
            })
            .await;

        let order = match placed {
            Ok(order) => order,
            Err(OrderError::EmptyCart) => return Err(wizard.refuse(CheckoutError::EmptyCart)),
            Err(_) => return Err(wizard.refuse(CheckoutError::PlacementFailed)),
        };

        wizard.confirm(OrderConfirmation::from(&order));
        if let Err(e) = self.cart.clear(user).await {
            tracing::warn!(error = %e, order_id = %order.id, "Failed to clear cart after order");
        }

        self.render(user, &wizard).await
    }

    /// Leave checkout and reset the wizard to Review.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Record` if a store cannot be read.
    pub async fn finish(&self, user: UserId) -> Result<CheckoutView, CheckoutError> {
        let wizard = self.wizard(user).await;
        let mut wizard = wizard.lock().await;
        wizard.finish();
        self.render(user, &wizard).await
    }

    async fn render(
        &self,
        user: UserId,
        wizard: &CheckoutWizard,
    ) -> Result<CheckoutView, CheckoutError> {
        let cart = self.cart.snapshot(user).await?;
        let address = match wizard.address_id() {
            Some(id) => optional(self.addresses.get(user, id).await)?,
            None => None,
        };
        let payment_method = match wizard.payment_method_id() {
            Some(id) => optional(self.payment_methods.get(user, id).await)?,
            None => None,
        };

        Ok(CheckoutView {
            step: wizard.step(),
            step_number: wizard.step().number(),
            title: wizard.step().title(),
            totals: OrderTotals::for_subtotal(cart.subtotal),
            cart,
            address,
            payment_method,
            confirmation: wizard.confirmation().cloned(),
            error: wizard.error().map(ToOwned::to_owned),
        })
    }
}

/// A selection that has since been deleted renders as nothing selected.
fn optional<T>(result: Result<T, RecordError>) -> Result<Option<T>, RecordError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RecordError::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_summary() -> CheckoutWizard {
        let mut wizard = CheckoutWizard::new();
        wizard.select_address(AddressId::new(1)).ok();
        wizard.select_payment_method(PaymentMethodId::new(1)).ok();
        for _ in 0..3 {
            wizard.next(false).ok();
        }
        wizard
    }

    #[test]
    fn test_step_numbers() {
        assert_eq!(CheckoutStep::Review.number(), 1);
        assert_eq!(CheckoutStep::Confirmation.number(), 5);
    }

    #[test]
    fn test_empty_cart_blocks_review() {
        let mut wizard = CheckoutWizard::new();
        assert!(matches!(wizard.next(true), Err(CheckoutError::EmptyCart)));
        assert_eq!(wizard.step(), CheckoutStep::Review);
        assert_eq!(wizard.error(), Some("Your cart is empty"));
    }

    #[test]
    fn test_address_and_payment_gates() {
        let mut wizard = CheckoutWizard::new();
        assert_eq!(wizard.next(false).ok(), Some(CheckoutStep::Address));

        assert!(matches!(
            wizard.next(false),
            Err(CheckoutError::AddressRequired)
        ));
        assert_eq!(wizard.error(), Some("Please select a shipping address"));
        wizard.select_address(AddressId::new(3)).ok();
        assert_eq!(wizard.next(false).ok(), Some(CheckoutStep::Payment));
        assert_eq!(wizard.error(), None);

        assert!(matches!(
            wizard.next(false),
            Err(CheckoutError::PaymentMethodRequired)
        ));
        assert_eq!(wizard.error(), Some("Please select a payment method"));
        wizard.select_payment_method(PaymentMethodId::new(4)).ok();
        assert_eq!(wizard.next(false).ok(), Some(CheckoutStep::Summary));
    }

    #[test]
    fn test_summary_requires_placement() {
        let mut wizard = at_summary();
        assert_eq!(wizard.step(), CheckoutStep::Summary);
        assert!(matches!(
            wizard.next(false),
            Err(CheckoutError::PlaceOrderRequired)
        ));
        assert_eq!(wizard.step(), CheckoutStep::Summary);
    }

    #[test]
    fn test_failed_placement_stays_at_summary() {
        let mut wizard = at_summary();
        wizard.refuse(CheckoutError::PlacementFailed);
        assert_eq!(wizard.step(), CheckoutStep::Summary);
        assert_eq!(wizard.error(), Some("Failed to place order"));
    }

    #[test]
    fn test_previous_floors_at_review() {
        let mut wizard = CheckoutWizard::new();
        assert_eq!(wizard.previous(), CheckoutStep::Review);

        let mut wizard = at_summary();
        assert_eq!(wizard.previous(), CheckoutStep::Payment);
        assert_eq!(wizard.previous(), CheckoutStep::Address);
        assert_eq!(wizard.previous(), CheckoutStep::Review);
        assert_eq!(wizard.previous(), CheckoutStep::Review);
    }

    fn confirmation() -> OrderConfirmation {
        OrderConfirmation {
            order_id: OrderId::new(1),
            tracking_code: "TRKABCDEFGHIJKL".to_owned(),
            total: Decimal::new(5319, 2),
            item_count: 2,
            estimated_delivery: Utc::now(),
            ship_to: "1 High Street, London, SW1A 1AA".to_owned(),
        }
    }

    #[test]
    fn test_confirmation_is_terminal_until_finish() {
        let mut wizard = at_summary();
        let key = wizard.checkout_key();
        wizard.confirm(confirmation());

        assert_eq!(wizard.next(false).ok(), Some(CheckoutStep::Confirmation));
        assert_eq!(wizard.previous(), CheckoutStep::Confirmation);
        assert!(matches!(
            wizard.select_address(AddressId::new(9)),
            Err(CheckoutError::AlreadyPlaced)
        ));

        wizard.finish();
        assert_eq!(wizard.step(), CheckoutStep::Review);
        assert!(wizard.confirmation().is_none());
        assert_eq!(wizard.address_id(), None);
        assert_ne!(wizard.checkout_key(), key);
    }

    #[test]
    fn test_checkout_key_survives_navigation() {
        let mut wizard = at_summary();
        let key = wizard.checkout_key();
        wizard.previous();
        wizard.next(false).ok();
        assert_eq!(wizard.checkout_key(), key);
    }
}
