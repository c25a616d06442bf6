//! Checkout wizard end to end against the in-memory store.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use common::{Shop, address, card};
use furnish_core::{AddressId, OrderStatus, UserId};
use furnish_storefront::db::{AddressStore, MemoryStore, RepositoryError};
use furnish_storefront::models::{Address, AddressDraft};
use furnish_storefront::services::{
    AddressService, CheckoutError, CheckoutService, CheckoutStep, PaymentMethodService,
    PlaceOrder, RecordError,
};

/// Address book over the memory store whose reads fail once `broken` is set.
struct UnreliableAddresses {
    store: Arc<MemoryStore>,
    broken: AtomicBool,
}

#[async_trait]
impl AddressStore for UnreliableAddresses {
    async fn list(&self, user: UserId) -> Result<Vec<Address>, RepositoryError> {
        AddressStore::list(self.store.as_ref(), user).await
    }

    async fn get(&self, user: UserId, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(RepositoryError::DataCorruption("connection reset".to_owned()));
        }
        AddressStore::get(self.store.as_ref(), user, id).await
    }

    async fn insert(&self, user: UserId, draft: &AddressDraft) -> Result<Address, RepositoryError> {
        AddressStore::insert(self.store.as_ref(), user, draft).await
    }

    async fn update(
        &self,
        user: UserId,
        id: AddressId,
        draft: &AddressDraft,
    ) -> Result<Address, RepositoryError> {
        AddressStore::update(self.store.as_ref(), user, id, draft).await
    }

    async fn delete(&self, user: UserId, id: AddressId) -> Result<(), RepositoryError> {
        AddressStore::delete(self.store.as_ref(), user, id).await
    }

    async fn set_default(&self, user: UserId, id: AddressId) -> Result<(), RepositoryError> {
        AddressStore::set_default(self.store.as_ref(), user, id).await
    }
}

#[tokio::test]
async fn test_full_checkout_places_one_order() {
    let (shop, catalog) = Shop::new().await;
    let user = shop.user("ada@example.com").await;
    shop.addresses.add(user, address("1 Market St")).await.unwrap();
    shop.payment_methods
        .add(user, card("4111 1111 1111 1111"))
        .await
        .unwrap();
    shop.cart.add(user, catalog.chair, 2).await.unwrap();

    let view = shop.checkout.start(user).await.unwrap();
    assert_eq!(view.step, CheckoutStep::Review);
    assert!(view.address.is_some());
    assert!(view.payment_method.is_some());

    for expected in [CheckoutStep::Address, CheckoutStep::Payment, CheckoutStep::Summary] {
        let view = shop.checkout.next(user).await.unwrap();
        assert_eq!(view.step, expected);
    }

    let view = shop
        .checkout
        .place_order(user, Some("  Leave by the door ".to_owned()))
        .await
        .unwrap();
    assert_eq!(view.step, CheckoutStep::Confirmation);
    assert!(view.cart.is_empty());

    let confirmation = view.confirmation.unwrap();
    assert_eq!(confirmation.item_count, 2);
    assert!(confirmation.tracking_code.starts_with("TRK"));

    let orders = shop.orders.list(user, None).await.unwrap();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.id, confirmation.order_id);
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.notes.as_deref(), Some("Leave by the door"));
    assert_eq!(order.payment_last4, "1111");
    assert_eq!(order.shipping_address, order.billing_address);
    assert_eq!(order.items[0].product_name, "POÄNG Armchair");
}

#[tokio::test]
async fn test_small_order_pays_flat_shipping() {
    let (shop, catalog) = Shop::new().await;
    let user = shop.user("small@example.com").await;
    shop.addresses.add(user, address("1 Market St")).await.unwrap();
    shop.payment_methods
        .add(user, card("5500 0000 0000 0004"))
        .await
        .unwrap();
    shop.cart.add(user, catalog.chair, 2).await.unwrap();

    shop.checkout.start(user).await.unwrap();
    for _ in 0..3 {
        shop.checkout.next(user).await.unwrap();
    }
    let view = shop.checkout.place_order(user, None).await.unwrap();

    // 40.00 + 3.20 tax + 9.99 shipping
    assert_eq!(view.confirmation.unwrap().total, Decimal::new(5319, 2));
    let order = &shop.orders.list(user, None).await.unwrap()[0];
    assert_eq!(order.totals.subtotal, Decimal::new(4000, 2));
    assert_eq!(order.totals.tax, Decimal::new(320, 2));
    assert_eq!(order.totals.shipping, Decimal::new(999, 2));
    assert_eq!(order.totals.discount, Decimal::ZERO);
}

#[tokio::test]
async fn test_large_order_ships_free() {
    let (shop, catalog) = Shop::new().await;
    let user = shop.user("large@example.com").await;
    shop.addresses.add(user, address("1 Market St")).await.unwrap();
    shop.payment_methods
        .add(user, card("4111 1111 1111 1111"))
        .await
        .unwrap();
    shop.cart.add(user, catalog.table, 1).await.unwrap();

    let view = shop.checkout.start(user).await.unwrap();
    assert_eq!(view.totals.shipping, Decimal::ZERO);
    assert_eq!(view.totals.total, Decimal::new(10800, 2));
}

#[tokio::test]
async fn test_exactly_fifty_still_pays_shipping() {
    let (shop, catalog) = Shop::new().await;
    let user = shop.user("fifty@example.com").await;
    shop.cart.add(user, catalog.lamp, 2).await.unwrap();

    let view = shop.checkout.view(user).await.unwrap();
    assert_eq!(view.totals.subtotal, Decimal::new(5000, 2));
    assert_eq!(view.totals.shipping, Decimal::new(999, 2));
}

#[tokio::test]
async fn test_empty_cart_cannot_leave_review() {
    let (shop, _) = Shop::new().await;
    let user = shop.user("empty@example.com").await;

    shop.checkout.start(user).await.unwrap();
    let err = shop.checkout.next(user).await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));

    let view = shop.checkout.view(user).await.unwrap();
    assert_eq!(view.step, CheckoutStep::Review);
    assert_eq!(view.error.as_deref(), Some("Your cart is empty"));
}

#[tokio::test]
async fn test_shipping_requires_an_address() {
    let (shop, catalog) = Shop::new().await;
    let user = shop.user("noaddr@example.com").await;
    shop.cart.add(user, catalog.chair, 1).await.unwrap();

    shop.checkout.start(user).await.unwrap();
    shop.checkout.next(user).await.unwrap();
    let err = shop.checkout.next(user).await.unwrap_err();
    assert!(matches!(err, CheckoutError::AddressRequired));

    let added = shop.addresses.add(user, address("1 Market St")).await.unwrap();
    shop.checkout.select_address(user, added.id).await.unwrap();
    let view = shop.checkout.next(user).await.unwrap();
    assert_eq!(view.step, CheckoutStep::Payment);
    assert!(view.error.is_none());

    let err = shop.checkout.next(user).await.unwrap_err();
    assert!(matches!(err, CheckoutError::PaymentMethodRequired));
}

#[tokio::test]
async fn test_cannot_select_another_users_address() {
    let (shop, _) = Shop::new().await;
    let owner = shop.user("owner@example.com").await;
    let other = shop.user("other@example.com").await;
    let theirs = shop.addresses.add(owner, address("1 Market St")).await.unwrap();

    let err = shop
        .checkout
        .select_address(other, theirs.id)
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::AddressNotFound));
}

#[tokio::test]
async fn test_place_order_only_from_summary() {
    let (shop, catalog) = Shop::new().await;
    let user = shop.user("early@example.com").await;
    shop.cart.add(user, catalog.chair, 1).await.unwrap();
    shop.checkout.start(user).await.unwrap();

    let err = shop.checkout.place_order(user, None).await.unwrap_err();
    assert!(matches!(err, CheckoutError::NotAtSummary));
    assert!(shop.orders.list(user, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_deleted_card_blocks_placement() {
    let (shop, catalog) = Shop::new().await;
    let user = shop.user("deleted@example.com").await;
    shop.addresses.add(user, address("1 Market St")).await.unwrap();
    let saved = shop
        .payment_methods
        .add(user, card("4111 1111 1111 1111"))
        .await
        .unwrap();
    shop.cart.add(user, catalog.chair, 1).await.unwrap();

    shop.checkout.start(user).await.unwrap();
    for _ in 0..3 {
        shop.checkout.next(user).await.unwrap();
    }
    shop.payment_methods.delete(user, saved.id).await.unwrap();

    let view = shop.checkout.view(user).await.unwrap();
    assert!(view.payment_method.is_none());

    let err = shop.checkout.place_order(user, None).await.unwrap_err();
    assert!(matches!(err, CheckoutError::PaymentMethodRequired));
    let view = shop.checkout.view(user).await.unwrap();
    assert_eq!(view.step, CheckoutStep::Summary);
    assert_eq!(view.cart.item_count, 1);
}

#[tokio::test]
async fn test_confirmation_is_terminal_until_finish() {
    let (shop, catalog) = Shop::new().await;
    let user = shop.user("done@example.com").await;
    shop.addresses.add(user, address("1 Market St")).await.unwrap();
    shop.payment_methods
        .add(user, card("4111 1111 1111 1111"))
        .await
        .unwrap();
    shop.cart.add(user, catalog.chair, 1).await.unwrap();

    shop.checkout.start(user).await.unwrap();
    for _ in 0..3 {
        shop.checkout.next(user).await.unwrap();
    }
    shop.checkout.place_order(user, None).await.unwrap();

    let view = shop.checkout.previous(user).await.unwrap();
    assert_eq!(view.step, CheckoutStep::Confirmation);
    let view = shop.checkout.next(user).await.unwrap();
    assert_eq!(view.step, CheckoutStep::Confirmation);

    // A second placement from Confirmation is refused, not duplicated.
    let err = shop.checkout.place_order(user, None).await.unwrap_err();
    assert!(matches!(err, CheckoutError::NotAtSummary));
    assert_eq!(shop.orders.list(user, None).await.unwrap().len(), 1);

    let view = shop.checkout.finish(user).await.unwrap();
    assert_eq!(view.step, CheckoutStep::Review);
    assert!(view.confirmation.is_none());
}

#[tokio::test]
async fn test_orders_are_isolated_per_user() {
    let (shop, catalog) = Shop::new().await;
    let ada = shop.user("ada@example.com").await;
    let bob = shop.user("bob@example.com").await;
    for user in [ada, bob] {
        shop.addresses.add(user, address("1 Market St")).await.unwrap();
        shop.payment_methods
            .add(user, card("4111 1111 1111 1111"))
            .await
            .unwrap();
        shop.cart.add(user, catalog.table, 1).await.unwrap();
        shop.checkout.start(user).await.unwrap();
        for _ in 0..3 {
            shop.checkout.next(user).await.unwrap();
        }
        shop.checkout.place_order(user, None).await.unwrap();
    }

    let ada_orders = shop.orders.list(ada, None).await.unwrap();
    assert_eq!(ada_orders.len(), 1);
    assert!(shop.orders.get(bob, ada_orders[0].id).await.is_err());

    let cancelled = shop.orders.cancel(ada, ada_orders[0].id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(
        shop.orders
            .list(ada, Some(OrderStatus::Processing))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(shop.orders.recent(10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_placing_twice_with_one_key_yields_one_order() {
    let (shop, catalog) = Shop::new().await;
    let user = shop.user("retry@example.com").await;
    let ship_to = shop.addresses.add(user, address("1 Market St")).await.unwrap();
    let paying_with = shop
        .payment_methods
        .add(user, card("4111 1111 1111 1111"))
        .await
        .unwrap();
    shop.cart.add(user, catalog.chair, 1).await.unwrap();
    let cart = shop.cart.snapshot(user).await.unwrap();

    let key = uuid::Uuid::new_v4();
    let request = PlaceOrder {
        user,
        checkout_key: key,
        cart: &cart,
        address: &ship_to,
        payment: &paying_with,
        notes: None,
    };
    let first = shop.orders.place(request.clone()).await.unwrap();
    let second = shop.orders.place(request).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.tracking_code, second.tracking_code);
    assert_eq!(shop.orders.list(user, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_failure_is_not_a_missing_address() {
    let (shop, catalog) = Shop::new().await;
    let user = shop.user("outage@example.com").await;
    shop.addresses.add(user, address("1 Market St")).await.unwrap();
    shop.payment_methods
        .add(user, card("4111 1111 1111 1111"))
        .await
        .unwrap();
    shop.cart.add(user, catalog.chair, 1).await.unwrap();

    let addresses = Arc::new(UnreliableAddresses {
        store: Arc::clone(&shop.store),
        broken: AtomicBool::new(false),
    });
    let checkout = CheckoutService::new(
        shop.cart.clone(),
        AddressService::new(addresses.clone()),
        PaymentMethodService::new(shop.store.clone(), addresses.clone()),
        shop.orders.clone(),
        Duration::from_secs(1800),
    );

    checkout.start(user).await.unwrap();
    for _ in 0..3 {
        checkout.next(user).await.unwrap();
    }

    addresses.broken.store(true, Ordering::SeqCst);
    let err = checkout.place_order(user, None).await.unwrap_err();
    assert!(
        matches!(err, CheckoutError::Record(RecordError::Repository(_))),
        "unexpected error: {err:?}"
    );
    assert!(shop.orders.list(user, None).await.unwrap().is_empty());
    assert_eq!(shop.cart.snapshot(user).await.unwrap().item_count, 1);
}
