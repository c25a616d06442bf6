//! Catalog repository.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;

use furnish_core::{CategoryId, ProductId};

use super::{ProductStore, RepositoryError};
use crate::models::{ArModel, Category, NewCategory, NewProduct, Product};

const PRODUCT_COLUMNS: &str = r"
    p.id, p.handle, p.name, p.description, p.price, p.category_id,
    c.name AS category_name, p.image, p.ar_model_asset, p.ar_model_scale, p.in_stock
";

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    handle: String,
    name: String,
    image: Option<String>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            handle: row.handle,
            name: row.name,
            image: row.image,
        }
    }
}

/// Row type for `products` joined with its category name.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    handle: String,
    name: String,
    description: String,
    price: Decimal,
    category_id: CategoryId,
    category_name: String,
    image: Option<String>,
    ar_model_asset: Option<String>,
    ar_model_scale: Option<f32>,
    in_stock: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        if row.price.is_sign_negative() {
            return Err(RepositoryError::DataCorruption(format!(
                "negative price for product {}",
                row.id
            )));
        }

        let ar_model = row.ar_model_asset.map(|asset| ArModel {
            asset,
            scale: row.ar_model_scale.unwrap_or(1.0),
        });

        Ok(Self {
            id: row.id,
            handle: row.handle,
            name: row.name,
            description: row.description,
            price: row.price,
            category_id: row.category_id,
            category_name: row.category_name,
            image: row.image,
            ar_model,
            in_stock: row.in_stock,
        })
    }
}

/// `PostgreSQL` catalog store.
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        condition: &str,
        bind: Option<i32>,
    ) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN categories c ON c.id = p.category_id \
             WHERE {condition} ORDER BY p.id"
        );
        let mut query = sqlx::query_as::<_, ProductRow>(&sql);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn fetch_by_handle(&self, handle: &str) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN categories c ON c.id = p.category_id \
             WHERE p.handle = $1"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(handle)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, handle, name, image FROM categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn products(&self) -> Result<Vec<Product>, RepositoryError> {
        self.fetch_where("TRUE", None).await
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self
            .fetch_where("p.id = $1", Some(id.as_i32()))
            .await?
            .into_iter()
            .next())
    }

    async fn product_by_handle(&self, handle: &str) -> Result<Option<Product>, RepositoryError> {
        self.fetch_by_handle(handle).await
    }

    async fn products_in_category(
        &self,
        category: CategoryId,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.fetch_where("p.category_id = $1", Some(category.as_i32()))
            .await
    }

    async fn upsert_category(&self, category: &NewCategory) -> Result<Category, RepositoryError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            r"
            INSERT INTO categories (handle, name, image)
            VALUES ($1, $2, $3)
            ON CONFLICT (handle)
            DO UPDATE SET name = EXCLUDED.name, image = EXCLUDED.image
            RETURNING id, handle, name, image
            ",
        )
        .bind(&category.handle)
        .bind(&category.name)
        .bind(&category.image)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn upsert_product(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let category_id: CategoryId =
            sqlx::query_scalar("SELECT id FROM categories WHERE handle = $1")
                .bind(&product.category)
                .fetch_optional(&self.pool)
                .await?
                .ok_or(RepositoryError::NotFound)?;

        sqlx::query(
            r"
            INSERT INTO products (
                handle, name, description, price, category_id, image,
                ar_model_asset, ar_model_scale, in_stock
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (handle)
            DO UPDATE SET name = EXCLUDED.name, description = EXCLUDED.description,
                          price = EXCLUDED.price, category_id = EXCLUDED.category_id,
                          image = EXCLUDED.image, ar_model_asset = EXCLUDED.ar_model_asset,
                          ar_model_scale = EXCLUDED.ar_model_scale,
                          in_stock = EXCLUDED.in_stock, updated_at = now()
            ",
        )
        .bind(&product.handle)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(category_id)
        .bind(&product.image)
        .bind(product.ar_model.as_ref().map(|m| m.asset.as_str()))
        .bind(product.ar_model.as_ref().map(|m| m.scale))
        .bind(product.in_stock)
        .execute(&self.pool)
        .await?;

        self.fetch_by_handle(&product.handle)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}
