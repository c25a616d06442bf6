//! Seed the catalog from a YAML file.
//!
//! ```bash
//! # Built-in sample catalog
//! furnish seed
//!
//! # Your own file
//! furnish seed --file catalog.yaml
//! ```
//!
//! Categories and products are upserted by handle, so seeding twice is safe.

use std::path::Path;

use serde::Deserialize;
use tracing::info;

use furnish_storefront::db::Stores;
use furnish_storefront::models::{NewCategory, NewProduct};

use super::{CliError, connect};

/// The sample catalog shipped with the CLI.
const SAMPLE_CATALOG: &str = include_str!("../../data/catalog.yaml");

/// Contents of a catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub categories: Vec<NewCategory>,
    #[serde(default)]
    pub products: Vec<NewProduct>,
}

impl CatalogFile {
    /// Products whose category is not defined in the file.
    fn dangling_products(&self) -> Vec<&str> {
        self.products
            .iter()
            .filter(|p| !self.categories.iter().any(|c| c.handle == p.category))
            .map(|p| p.handle.as_str())
            .collect()
    }
}

/// Parse and check a catalog before touching the database.
///
/// # Errors
///
/// Returns `CliError::Catalog` for malformed YAML or products pointing at an
/// unknown category.
pub fn parse(content: &str) -> Result<CatalogFile, CliError> {
    let catalog: CatalogFile = serde_yaml::from_str(content)?;
    let dangling = catalog.dangling_products();
    if !dangling.is_empty() {
        return Err(CliError::Catalog(serde::de::Error::custom(format!(
            "products with unknown category: {}",
            dangling.join(", ")
        ))));
    }
    Ok(catalog)
}

/// Load `file` (or the sample catalog) into the database.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or the database
/// rejects a row.
pub async fn catalog(file: Option<&Path>) -> Result<(), CliError> {
    let content = match file {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog from file");
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| CliError::Io {
                    path: path.display().to_string(),
                    source,
                })?
        }
        None => SAMPLE_CATALOG.to_owned(),
    };
    let catalog = parse(&content)?;
    info!(
        categories = catalog.categories.len(),
        products = catalog.products.len(),
        "Parsed catalog"
    );

    let pool = connect().await?;
    let stores = Stores::postgres(&pool);

    for category in &catalog.categories {
        stores.products.upsert_category(category).await?;
    }
    for product in &catalog.products {
        let saved = stores.products.upsert_product(product).await?;
        info!(id = %saved.id, handle = %saved.handle, "Seeded product");
    }

    info!("Seeding complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_sample_catalog_parses() {
        let catalog = parse(SAMPLE_CATALOG).unwrap();
        assert_eq!(catalog.categories.len(), 6);
        assert_eq!(catalog.products.len(), 7);

        let sofa = catalog.products.first().unwrap();
        assert_eq!(sofa.handle, "klippan-sofa");
        assert_eq!(sofa.price, Decimal::new(34999, 2));
        assert!(sofa.in_stock);
        assert!(catalog.products.iter().any(|p| !p.in_stock));
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let yaml = r#"
categories:
  - handle: sofas
    name: Sofas
products:
  - handle: lamp
    name: Lamp
    description: A lamp
    price: "9.99"
    category: lighting
"#;
        assert!(matches!(parse(yaml), Err(CliError::Catalog(_))));
    }
}
