//! In-process implementation of every store trait.
//!
//! All collections sit behind one `RwLock`, so each trait method runs as a
//! single critical section. That gives the same atomicity the Postgres
//! stores get from transactions: the default-record invariant can never be
//! observed half-applied.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use furnish_core::{
    AddressId, CategoryId, Email, OrderId, OrderStatus, PaymentMethodId, ProductId, UserId,
};

use super::defaults::{Defaultable, has_default_in, promote_first_in, set_default_in};
use super::{
    AddressStore, CartStore, FavoriteStore, OrderStore, PaymentMethodStore, ProductStore,
    RepositoryError, UserStore,
};
use crate::models::{
    Address, AddressDraft, CartLine, Category, NewCategory, NewOrder, NewProduct, Order,
    PaymentMethod, PaymentMethodDraft, Product, User,
};

impl Defaultable for Address {
    fn owner(&self) -> UserId {
        self.user_id
    }
    fn is_default(&self) -> bool {
        self.is_default
    }
    fn set_default(&mut self, on: bool) {
        self.is_default = on;
    }
}

impl Defaultable for PaymentMethod {
    fn owner(&self) -> UserId {
        self.user_id
    }
    fn is_default(&self) -> bool {
        self.is_default
    }
    fn set_default(&mut self, on: bool) {
        self.is_default = on;
    }
}

/// Serial counters, one per table.
#[derive(Debug, Default)]
struct Sequences {
    users: i32,
    categories: i32,
    products: i32,
    addresses: i32,
    payment_methods: i32,
    orders: i32,
}

fn bump(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct MemoryData {
    seq: Sequences,
    users: BTreeMap<UserId, (User, String)>,
    categories: BTreeMap<CategoryId, Category>,
    products: BTreeMap<ProductId, Product>,
    /// Lines in insertion order.
    carts: HashMap<UserId, Vec<CartLine>>,
    /// Most recent first.
    favorites: HashMap<UserId, Vec<ProductId>>,
    addresses: BTreeMap<AddressId, Address>,
    payment_methods: BTreeMap<PaymentMethodId, PaymentMethod>,
    orders: BTreeMap<OrderId, Order>,
}

impl MemoryData {
    fn require_user(&self, user: UserId) -> Result<(), RepositoryError> {
        if self.users.contains_key(&user) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn require_product(&self, product: ProductId) -> Result<(), RepositoryError> {
        if self.products.contains_key(&product) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn orders_newest_first<'a>(&self, orders: impl Iterator<Item = &'a Order>) -> Vec<Order> {
        let mut out: Vec<Order> = orders.cloned().collect();
        out.sort_by(|a, b| b.placed_at.cmp(&a.placed_at).then(b.id.cmp(&a.id)));
        out
    }
}

/// In-memory store for tests and local development.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn address_from_draft(
    id: AddressId,
    user: UserId,
    draft: &AddressDraft,
    created_at: chrono::DateTime<Utc>,
) -> Address {
    Address {
        id,
        user_id: user,
        full_name: draft.full_name.clone(),
        phone_number: draft.phone_number.clone(),
        address_line1: draft.address_line1.clone(),
        address_line2: draft.address_line2.clone(),
        town: draft.town.clone(),
        county: draft.county.clone(),
        postcode: draft.postcode.clone(),
        country: draft.country.clone(),
        is_default: false,
        label: draft.label,
        created_at,
    }
}

fn payment_method_from_draft(
    id: PaymentMethodId,
    user: UserId,
    draft: &PaymentMethodDraft,
    created_at: chrono::DateTime<Utc>,
) -> PaymentMethod {
    PaymentMethod {
        id,
        user_id: user,
        card_holder_name: draft.card_holder_name.clone(),
        masked_number: PaymentMethod::masked(&draft.last4),
        last4: draft.last4.clone(),
        expiry_date: draft.expiry_date.clone(),
        network: draft.network,
        billing_address_id: draft.billing_address_id,
        is_default: false,
        created_at,
    }
}

// =============================================================================
// Users
// =============================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_with_password(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut data = self.data.write().await;
        if data.users.values().any(|(u, _)| &u.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }

        let user = User {
            id: UserId::new(bump(&mut data.seq.users)),
            email: email.clone(),
            name: name.to_owned(),
            phone: None,
            created_at: Utc::now(),
        };
        data.users
            .insert(user.id, (user.clone(), password_hash.to_owned()));
        Ok(user)
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data.users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .users
            .values()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        phone: Option<&str>,
    ) -> Result<User, RepositoryError> {
        let mut data = self.data.write().await;
        let (user, _) = data.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        name.clone_into(&mut user.name);
        user.phone = phone.map(ToOwned::to_owned);
        Ok(user.clone())
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[async_trait]
impl ProductStore for MemoryStore {
    async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        Ok(self.data.read().await.categories.values().cloned().collect())
    }

    async fn products(&self) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.data.read().await.products.values().cloned().collect())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.data.read().await.products.get(&id).cloned())
    }

    async fn product_by_handle(&self, handle: &str) -> Result<Option<Product>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data.products.values().find(|p| p.handle == handle).cloned())
    }

    async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .products
            .values()
            .filter(|p| p.category_id == category)
            .cloned()
            .collect())
    }

    async fn upsert_category(&self, category: &NewCategory) -> Result<Category, RepositoryError> {
        let mut data = self.data.write().await;
        let existing = data
            .categories
            .values()
            .find(|c| c.handle == category.handle)
            .map(|c| c.id);
        let id = match existing {
            Some(id) => id,
            None => CategoryId::new(bump(&mut data.seq.categories)),
        };

        let stored = Category {
            id,
            handle: category.handle.clone(),
            name: category.name.clone(),
            image: category.image.clone(),
        };
        data.categories.insert(id, stored.clone());
        for product in data.products.values_mut().filter(|p| p.category_id == id) {
            product.category_name.clone_from(&stored.name);
        }
        Ok(stored)
    }

    async fn upsert_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut data = self.data.write().await;
        let category = data
            .categories
            .values()
            .find(|c| c.handle == product.category)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        let existing = data
            .products
            .values()
            .find(|p| p.handle == product.handle)
            .map(|p| p.id);
        let id = match existing {
            Some(id) => id,
            None => ProductId::new(bump(&mut data.seq.products)),
        };

        let stored = Product {
            id,
            handle: product.handle.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            category_id: category.id,
            category_name: category.name,
            image: product.image.clone(),
            ar_model: product.ar_model.clone(),
            in_stock: product.in_stock,
        };
        data.products.insert(id, stored.clone());
        Ok(stored)
    }
}

// =============================================================================
// Cart and favorites
// =============================================================================

#[async_trait]
impl CartStore for MemoryStore {
    async fn lines(&self, user: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data.carts.get(&user).cloned().unwrap_or_default())
    }

    async fn add(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        data.require_user(user)?;
        data.require_product(product)?;

        let lines = data.carts.entry(user).or_default();
        if let Some(line) = lines.iter_mut().find(|l| l.product_id == product) {
            line.quantity = line.quantity.saturating_add(quantity);
        } else {
            lines.push(CartLine {
                product_id: product,
                quantity,
            });
        }
        Ok(())
    }

    async fn set_quantity(
        &self,
        user: UserId,
        product: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        if quantity == 0 {
            return CartStore::remove(self, user, product).await;
        }

        let mut data = self.data.write().await;
        data.require_user(user)?;
        data.require_product(product)?;

        let lines = data.carts.entry(user).or_default();
        if let Some(line) = lines.iter_mut().find(|l| l.product_id == product) {
            line.quantity = quantity;
        } else {
            lines.push(CartLine {
                product_id: product,
                quantity,
            });
        }
        Ok(())
    }

    async fn remove(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        if let Some(lines) = data.carts.get_mut(&user) {
            lines.retain(|l| l.product_id != product);
        }
        Ok(())
    }

    async fn clear(&self, user: UserId) -> Result<(), RepositoryError> {
        self.data.write().await.carts.remove(&user);
        Ok(())
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn product_ids(&self, user: UserId) -> Result<Vec<ProductId>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data.favorites.get(&user).cloned().unwrap_or_default())
    }

    async fn toggle(&self, user: UserId, product: ProductId) -> Result<bool, RepositoryError> {
        let mut data = self.data.write().await;
        let ids = data.favorites.entry(user).or_default();
        if let Some(pos) = ids.iter().position(|id| *id == product) {
            ids.remove(pos);
            return Ok(false);
        }

        data.require_user(user)?;
        data.require_product(product)?;
        data.favorites.entry(user).or_default().insert(0, product);
        Ok(true)
    }

    async fn remove(&self, user: UserId, product: ProductId) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        if let Some(ids) = data.favorites.get_mut(&user) {
            ids.retain(|id| *id != product);
        }
        Ok(())
    }
}

// =============================================================================
// Addresses and payment methods
// =============================================================================

#[async_trait]
impl AddressStore for MemoryStore {
    async fn list(&self, user: UserId) -> Result<Vec<Address>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .addresses
            .values()
            .filter(|a| a.user_id == user)
            .cloned()
            .collect())
    }

    async fn get(&self, user: UserId, id: AddressId) -> Result<Option<Address>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .addresses
            .get(&id)
            .filter(|a| a.user_id == user)
            .cloned())
    }

    async fn insert(&self, user: UserId, draft: &AddressDraft) -> Result<Address, RepositoryError> {
        let mut data = self.data.write().await;
        data.require_user(user)?;

        let make_default = draft.is_default || !has_default_in(&data.addresses, user);
        let id = AddressId::new(bump(&mut data.seq.addresses));
        data.addresses
            .insert(id, address_from_draft(id, user, draft, Utc::now()));
        if make_default {
            set_default_in(&mut data.addresses, user, id);
        }

        data.addresses
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update(
        &self,
        user: UserId,
        id: AddressId,
        draft: &AddressDraft,
    ) -> Result<Address, RepositoryError> {
        let mut data = self.data.write().await;
        let current = data
            .addresses
            .get(&id)
            .filter(|a| a.user_id == user)
            .ok_or(RepositoryError::NotFound)?;

        let was_default = current.is_default;
        let mut updated = address_from_draft(id, user, draft, current.created_at);
        updated.is_default = was_default;
        data.addresses.insert(id, updated);
        if draft.is_default && !was_default {
            set_default_in(&mut data.addresses, user, id);
        }

        data.addresses
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, user: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        if !data.addresses.get(&id).is_some_and(|a| a.user_id == user) {
            return Err(RepositoryError::NotFound);
        }

        let removed = data.addresses.remove(&id).ok_or(RepositoryError::NotFound)?;
        if removed.is_default {
            promote_first_in(&mut data.addresses, user);
        }
        for card in data
            .payment_methods
            .values_mut()
            .filter(|p| p.billing_address_id == Some(id))
        {
            card.billing_address_id = None;
        }
        Ok(())
    }

    async fn set_default(&self, user: UserId, id: AddressId) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        if set_default_in(&mut data.addresses, user, id) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}

#[async_trait]
impl PaymentMethodStore for MemoryStore {
    async fn list(&self, user: UserId) -> Result<Vec<PaymentMethod>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .payment_methods
            .values()
            .filter(|p| p.user_id == user)
            .cloned()
            .collect())
    }

    async fn get(
        &self,
        user: UserId,
        id: PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .payment_methods
            .get(&id)
            .filter(|p| p.user_id == user)
            .cloned())
    }

    async fn insert(
        &self,
        user: UserId,
        draft: &PaymentMethodDraft,
    ) -> Result<PaymentMethod, RepositoryError> {
        let mut data = self.data.write().await;
        data.require_user(user)?;

        let make_default = draft.is_default || !has_default_in(&data.payment_methods, user);
        let id = PaymentMethodId::new(bump(&mut data.seq.payment_methods));
        data.payment_methods
            .insert(id, payment_method_from_draft(id, user, draft, Utc::now()));
        if make_default {
            set_default_in(&mut data.payment_methods, user, id);
        }

        data.payment_methods
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn update(
        &self,
        user: UserId,
        id: PaymentMethodId,
        draft: &PaymentMethodDraft,
    ) -> Result<PaymentMethod, RepositoryError> {
        let mut data = self.data.write().await;
        let current = data
            .payment_methods
            .get(&id)
            .filter(|p| p.user_id == user)
            .ok_or(RepositoryError::NotFound)?;

        let was_default = current.is_default;
        let mut updated = payment_method_from_draft(id, user, draft, current.created_at);
        updated.is_default = was_default;
        data.payment_methods.insert(id, updated);
        if draft.is_default && !was_default {
            set_default_in(&mut data.payment_methods, user, id);
        }

        data.payment_methods
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, user: UserId, id: PaymentMethodId) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        if !data.payment_methods.get(&id).is_some_and(|p| p.user_id == user) {
            return Err(RepositoryError::NotFound);
        }

        let removed = data
            .payment_methods
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        if removed.is_default {
            promote_first_in(&mut data.payment_methods, user);
        }
        for order in data
            .orders
            .values_mut()
            .filter(|o| o.payment_method_id == Some(id))
        {
            order.payment_method_id = None;
        }
        Ok(())
    }

    async fn set_default(&self, user: UserId, id: PaymentMethodId) -> Result<(), RepositoryError> {
        let mut data = self.data.write().await;
        if set_default_in(&mut data.payment_methods, user, id) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}

// =============================================================================
// Orders
// =============================================================================

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut data = self.data.write().await;
        data.require_user(order.user_id)?;

        if let Some(existing) = data
            .orders
            .values()
            .find(|o| o.user_id == order.user_id && o.checkout_key == order.checkout_key)
        {
            return Ok(existing.clone());
        }

        let stored = Order {
            id: OrderId::new(bump(&mut data.seq.orders)),
            user_id: order.user_id,
            items: order.items,
            totals: order.totals,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            payment_method_id: Some(order.payment_method_id),
            payment_last4: order.payment_last4,
            placed_at: order.placed_at,
            status: order.status,
            estimated_delivery: order.estimated_delivery,
            tracking_code: order.tracking_code,
            notes: order.notes,
            checkout_key: order.checkout_key,
        };
        data.orders.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_for_user(
        &self,
        user: UserId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data.orders_newest_first(
            data.orders
                .values()
                .filter(|o| o.user_id == user && status.is_none_or(|s| o.status == s)),
        ))
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.data.read().await.orders.get(&id).cloned())
    }

    async fn find_by_checkout_key(
        &self,
        user: UserId,
        checkout_key: Uuid,
    ) -> Result<Option<Order>, RepositoryError> {
        let data = self.data.read().await;
        Ok(data
            .orders
            .values()
            .find(|o| o.user_id == user && o.checkout_key == checkout_key)
            .cloned())
    }

    async fn update_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut data = self.data.write().await;
        let order = data.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if order.status != from {
            return Err(RepositoryError::Conflict(format!(
                "order {id} is no longer {from}"
            )));
        }
        order.status = to;
        Ok(order.clone())
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Order>, RepositoryError> {
        let data = self.data.read().await;
        let mut orders = data.orders_newest_first(data.orders.values());
        orders.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(orders)
    }
}
