//! Shared fixtures for the storefront integration tests.
//!
//! Everything runs against `MemoryStore`, so no database is needed.

#![allow(dead_code, clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;

use furnish_core::{Email, ProductId, UserId};
use furnish_storefront::db::{MemoryStore, ProductStore, Stores, UserStore};
use furnish_storefront::models::{AddressInput, NewCategory, NewProduct, PaymentMethodInput};
use furnish_storefront::services::{
    AddressService, CartService, CatalogService, CheckoutService, OrderService,
    PaymentMethodService,
};

/// Services wired over one in-memory store.
pub struct Shop {
    pub store: Arc<MemoryStore>,
    pub catalog: CatalogService,
    pub cart: CartService,
    pub addresses: AddressService,
    pub payment_methods: PaymentMethodService,
    pub orders: OrderService,
    pub checkout: CheckoutService,
}

/// Product ids of the seeded catalog.
pub struct Catalog {
    /// 20.00
    pub chair: ProductId,
    /// 100.00
    pub table: ProductId,
    /// 25.00
    pub lamp: ProductId,
}

impl Shop {
    pub async fn new() -> (Self, Catalog) {
        let store = Arc::new(MemoryStore::new());
        let catalog = seed_catalog(&store).await;
        let stores = Stores::in_memory(Arc::clone(&store));

        let products = CatalogService::new(stores.products);
        let cart = CartService::new(stores.carts, products.clone());
        let addresses = AddressService::new(Arc::clone(&stores.addresses));
        let payment_methods = PaymentMethodService::new(stores.payment_methods, stores.addresses);
        let orders = OrderService::new(stores.orders);
        let checkout = CheckoutService::new(
            cart.clone(),
            addresses.clone(),
            payment_methods.clone(),
            orders.clone(),
            Duration::from_secs(1800),
        );

        let shop = Self {
            store,
            catalog: products,
            cart,
            addresses,
            payment_methods,
            orders,
            checkout,
        };
        (shop, catalog)
    }

    pub async fn user(&self, email: &str) -> UserId {
        self.store
            .create_with_password(&Email::parse(email).unwrap(), "Test Shopper", "hash")
            .await
            .unwrap()
            .id
    }
}

pub async fn seed_catalog(store: &MemoryStore) -> Catalog {
    for (handle, name) in [("chairs", "Chairs"), ("tables", "Tables"), ("lighting", "Lighting")] {
        store
            .upsert_category(&NewCategory {
                handle: handle.to_owned(),
                name: name.to_owned(),
                image: None,
            })
            .await
            .unwrap();
    }

    let mut ids = Vec::new();
    for (handle, name, price, category, in_stock) in [
        ("poang-armchair", "POÄNG Armchair", 2000, "chairs", true),
        ("lisabo-table", "LISABO Table", 10000, "tables", true),
        ("hektar-lamp", "HEKTAR Floor Lamp", 2500, "lighting", false),
    ] {
        let product = store
            .upsert_product(&NewProduct {
                handle: handle.to_owned(),
                name: name.to_owned(),
                description: format!("{name} for the home"),
                price: Decimal::new(price, 2),
                category: category.to_owned(),
                image: None,
                ar_model: None,
                in_stock,
            })
            .await
            .unwrap();
        ids.push(product.id);
    }

    Catalog {
        chair: ids[0],
        table: ids[1],
        lamp: ids[2],
    }
}

pub fn address(line1: &str) -> AddressInput {
    AddressInput {
        full_name: "Ada Lovelace".to_owned(),
        phone_number: "07700 900123".to_owned(),
        address_line1: line1.to_owned(),
        town: "London".to_owned(),
        postcode: "SW1A 1AA".to_owned(),
        ..AddressInput::default()
    }
}

pub fn card(number: &str) -> PaymentMethodInput {
    PaymentMethodInput {
        card_holder_name: "Ada Lovelace".to_owned(),
        card_number: number.to_owned(),
        expiry_date: "12/35".to_owned(),
        cvv: "737".to_owned(),
        ..PaymentMethodInput::default()
    }
}
