//! Fixtures
//!
//! Product catalogs described in YAML, used to seed a catalog without a remote store.

use std::{fs, path::Path};

use rustc_hash::FxHashSet;
use serde::Deserialize;
use thiserror::Error;

use crate::products::{Product, ProductRecord, ProductRecordError};

/// Fixture Parsing Errors
#[derive(Debug, Error)]
pub enum FixtureError {
    /// IO error reading fixture files
    #[error("Failed to read fixture file: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_norway::Error),

    /// A product record could not be converted
    #[error("Invalid product: {0}")]
    InvalidProduct(#[from] ProductRecordError),

    /// Two products share an identifier
    #[error("Duplicate product: {0}")]
    DuplicateProduct(String),
}

/// Catalog fixture file.
///
/// ```yaml
/// products:
///   - id: tie-and-dye-brief
///     name: Tie and Dye Brief
///     regularPrice: 599
///     salePrice: 249
///     onSale: true
///     stockCount: 30
///     availableSizes: [S, M, L]
/// ```
#[derive(Debug, Deserialize)]
pub struct CatalogFixture {
    /// Product records, in catalog order
    pub products: Vec<ProductRecord>,
}

impl CatalogFixture {
    /// Parse a fixture from YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed.
    pub fn from_yaml_str(contents: &str) -> Result<Self, FixtureError> {
        Ok(serde_norway::from_str(contents)?)
    }

    /// Read and parse a fixture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, FixtureError> {
        let contents = fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    /// Convert every record into a [`Product`].
    ///
    /// # Errors
    ///
    /// Returns an error if a record is invalid or an identifier repeats.
    pub fn into_products(self) -> Result<Vec<Product>, FixtureError> {
        let mut seen = FxHashSet::default();
        let mut products = Vec::with_capacity(self.products.len());

        for record in self.products {
            if !seen.insert(record.id.clone()) {
                return Err(FixtureError::DuplicateProduct(record.id));
            }

            products.push(Product::try_from(record)?);
        }

        Ok(products)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;
    use testresult::TestResult;

    use super::*;

    const CATALOG: &str = r"
products:
  - id: bumable-brief-cheery-red
    name: Bumable Brief – Cheery Red
    regularPrice: 499
    salePrice: 199
    onSale: true
    stockCount: 50
    availableSizes: [S, M, L]
  - id: solid-trunks-frozen-grey
    name: Solid Trunks – Frozen Grey
    regular_price: 549.50
    in_stock: false
";

    #[test]
    fn parses_both_field_spellings() -> TestResult {
        let products = CatalogFixture::from_yaml_str(CATALOG)?.into_products()?;

        assert_eq!(products.len(), 2);

        let brief = products.first().ok_or("missing brief")?;
        assert_eq!(brief.unit_price(), 199_00);
        assert_eq!(brief.available_sizes, vec!["S", "M", "L"]);

        let trunks = products.get(1).ok_or("missing trunks")?;
        assert_eq!(trunks.regular_price, 549_50);
        assert!(!trunks.in_stock);
        assert_eq!(trunks.stock_count, 0);

        Ok(())
    }

    #[test]
    fn duplicate_ids_are_rejected() -> TestResult {
        let yaml = r"
products:
  - { id: a, name: A, regularPrice: 1 }
  - { id: a, name: A again, regularPrice: 2 }
";

        let result = CatalogFixture::from_yaml_str(yaml)?.into_products();

        assert!(
            matches!(result, Err(FixtureError::DuplicateProduct(ref id)) if id == "a"),
            "expected DuplicateProduct, got {result:?}"
        );

        Ok(())
    }

    #[test]
    fn invalid_records_are_rejected() -> TestResult {
        let yaml = r"
products:
  - { id: a, name: A, regularPrice: -5 }
";

        let result = CatalogFixture::from_yaml_str(yaml)?.into_products();

        assert!(
            matches!(result, Err(FixtureError::InvalidProduct(_))),
            "expected InvalidProduct, got {result:?}"
        );

        Ok(())
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let result = CatalogFixture::from_yaml_str("products: [");

        assert!(
            matches!(result, Err(FixtureError::Yaml(_))),
            "expected Yaml error, got {result:?}"
        );
    }

    #[test]
    fn reads_fixture_file() -> TestResult {
        let mut file = NamedTempFile::new()?;
        file.write_all(CATALOG.as_bytes())?;

        let fixture = CatalogFixture::from_path(file.path())?;

        assert_eq!(fixture.products.len(), 2);

        Ok(())
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = CatalogFixture::from_path("/nonexistent/catalog.yml");

        assert!(
            matches!(result, Err(FixtureError::Io(_))),
            "expected Io error, got {result:?}"
        );
    }
}
