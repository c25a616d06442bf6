//! At most one default address and one default card per user.

#![allow(clippy::unwrap_used)]

mod common;

use common::{Shop, address, card};
use furnish_core::UserId;
use furnish_storefront::services::{AddressService, PaymentMethodService, RecordError};

async fn default_addresses(addresses: &AddressService, user: UserId) -> Vec<String> {
    addresses
        .list(user)
        .await
        .unwrap()
        .into_iter()
        .filter(|a| a.is_default)
        .map(|a| a.address_line1)
        .collect()
}

async fn default_cards(cards: &PaymentMethodService, user: UserId) -> Vec<String> {
    cards
        .list(user)
        .await
        .unwrap()
        .into_iter()
        .filter(|c| c.is_default)
        .map(|c| c.last4)
        .collect()
}

#[tokio::test]
async fn test_first_address_becomes_default() {
    let (shop, _) = Shop::new().await;
    let user = shop.user("first@example.com").await;

    let first = shop.addresses.add(user, address("1 Market St")).await.unwrap();
    assert!(first.is_default);
    let second = shop.addresses.add(user, address("2 High St")).await.unwrap();
    assert!(!second.is_default);

    assert_eq!(default_addresses(&shop.addresses, user).await, ["1 Market St"]);
}

#[tokio::test]
async fn test_adding_a_default_address_demotes_the_old_one() {
    let (shop, _) = Shop::new().await;
    let user = shop.user("demote@example.com").await;
    shop.addresses.add(user, address("1 Market St")).await.unwrap();

    let mut form = address("2 High St");
    form.is_default = true;
    shop.addresses.add(user, form).await.unwrap();

    assert_eq!(default_addresses(&shop.addresses, user).await, ["2 High St"]);
}

#[tokio::test]
async fn test_set_default_and_delete_keep_one_default() {
    let (shop, _) = Shop::new().await;
    let user = shop.user("moves@example.com").await;
    let a = shop.addresses.add(user, address("1 Market St")).await.unwrap();
    let b = shop.addresses.add(user, address("2 High St")).await.unwrap();
    let c = shop.addresses.add(user, address("3 Low Rd")).await.unwrap();

    shop.addresses.set_default(user, c.id).await.unwrap();
    assert_eq!(default_addresses(&shop.addresses, user).await, ["3 Low Rd"]);

    shop.addresses.delete(user, c.id).await.unwrap();
    assert_eq!(default_addresses(&shop.addresses, user).await, ["1 Market St"]);

    shop.addresses.delete(user, b.id).await.unwrap();
    shop.addresses.delete(user, a.id).await.unwrap();
    assert!(default_addresses(&shop.addresses, user).await.is_empty());
}

#[tokio::test]
async fn test_defaults_are_per_user() {
    let (shop, _) = Shop::new().await;
    let ada = shop.user("ada@example.com").await;
    let bob = shop.user("bob@example.com").await;

    shop.addresses.add(ada, address("1 Market St")).await.unwrap();
    let bobs = shop.addresses.add(bob, address("9 Elm Rd")).await.unwrap();
    assert!(bobs.is_default);
    assert_eq!(default_addresses(&shop.addresses, ada).await, ["1 Market St"]);

    let err = shop.addresses.set_default(ada, bobs.id).await.unwrap_err();
    assert!(matches!(err, RecordError::NotFound));
    assert_eq!(default_addresses(&shop.addresses, bob).await, ["9 Elm Rd"]);
}

#[tokio::test]
async fn test_invalid_address_is_rejected_without_side_effects() {
    let (shop, _) = Shop::new().await;
    let user = shop.user("invalid@example.com").await;

    let mut form = address("1 Market St");
    form.postcode = "NOT A POSTCODE".to_owned();
    let err = shop.addresses.add(user, form).await.unwrap_err();
    assert!(matches!(err, RecordError::Validation(_)));
    assert!(shop.addresses.list(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_card_defaults_follow_the_same_rules() {
    let (shop, _) = Shop::new().await;
    let user = shop.user("cards@example.com").await;

    let visa = shop
        .payment_methods
        .add(user, card("4111 1111 1111 1111"))
        .await
        .unwrap();
    assert!(visa.is_default);

    let mut form = card("5500 0000 0000 0004");
    form.is_default = true;
    let mastercard = shop.payment_methods.add(user, form).await.unwrap();
    assert_eq!(default_cards(&shop.payment_methods, user).await, ["0004"]);

    shop.payment_methods.delete(user, mastercard.id).await.unwrap();
    assert_eq!(default_cards(&shop.payment_methods, user).await, ["1111"]);
}

#[tokio::test]
async fn test_saved_card_keeps_only_last_four_digits() {
    let (shop, _) = Shop::new().await;
    let user = shop.user("masked@example.com").await;

    let saved = shop
        .payment_methods
        .add(user, card("4111 1111 1111 1111"))
        .await
        .unwrap();
    assert_eq!(saved.last4, "1111");
    assert!(saved.masked_number.ends_with("1111"));

    let json = serde_json::to_string(&saved).unwrap();
    assert!(!json.contains("4111 1111"));
    assert!(!json.contains("737"));
}

#[tokio::test]
async fn test_billing_address_must_belong_to_user() {
    let (shop, _) = Shop::new().await;
    let ada = shop.user("ada@example.com").await;
    let bob = shop.user("bob@example.com").await;
    let bobs = shop.addresses.add(bob, address("9 Elm Rd")).await.unwrap();

    let mut form = card("4111 1111 1111 1111");
    form.billing_address_id = Some(bobs.id);
    let err = shop.payment_methods.add(ada, form).await.unwrap_err();
    assert!(matches!(err, RecordError::Validation(_)));
}

#[tokio::test]
async fn test_address_feed_sees_every_change() {
    let (shop, _) = Shop::new().await;
    let user = shop.user("feed@example.com").await;
    let mut feed = shop.addresses.subscribe(user).await.unwrap();
    assert!(feed.borrow_and_update().is_empty());

    let first = shop.addresses.add(user, address("1 Market St")).await.unwrap();
    feed.changed().await.unwrap();
    assert_eq!(feed.borrow_and_update().len(), 1);

    shop.addresses.add(user, address("2 High St")).await.unwrap();
    shop.addresses.delete(user, first.id).await.unwrap();
    feed.changed().await.unwrap();
    let current = feed.borrow_and_update().clone();
    assert_eq!(current.len(), 1);
    assert!(current[0].is_default);
}
