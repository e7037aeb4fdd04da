//! Product catalog loading and validation.
//!
//! Parses the scraped catalog JSON into typed [`Product`] records at the
//! boundary and rejects incomplete records before any embedding work starts.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

/// One catalog item. Price is a display string and is never parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub product_price: String,
    #[serde(default)]
    pub product_description: String,
    #[serde(default)]
    pub product_link: String,
}

/// Display fields carried alongside a vector. Never embedded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentMetadata {
    pub name: String,
    pub price: String,
    pub link: String,
}

/// The embeddable unit derived 1:1 from a [`Product`]: the description is
/// the content, everything else rides along as metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductDocument {
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Product {
    pub fn to_document(&self) -> ProductDocument {
        ProductDocument {
            content: self.product_description.clone(),
            metadata: DocumentMetadata {
                name: self.product_name.clone(),
                price: self.product_price.clone(),
                link: self.product_link.clone(),
            },
        }
    }
}

/// Load products from a JSON array file.
pub fn load_products(path: &Path) -> Result<Vec<Product>, ApiError> {
    if !path.exists() {
        return Err(ApiError::CatalogNotFound(path.display().to_string()));
    }

    let raw = fs::read_to_string(path)
        .map_err(|err| ApiError::CatalogNotFound(format!("{}: {}", path.display(), err)))?;

    serde_json::from_str(&raw).map_err(|err| ApiError::MalformedCatalog(err.to_string()))
}

/// Whole-batch validation: any incomplete record aborts startup instead of
/// being dropped silently.
pub fn validate_products(products: &[Product]) -> Result<(), ApiError> {
    if products.is_empty() {
        return Err(ApiError::EmptyCatalog);
    }

    for (index, product) in products.iter().enumerate() {
        if product.product_name.is_empty() {
            return Err(ApiError::InvalidProduct {
                index,
                field: "product_name",
            });
        }
        if product.product_link.is_empty() {
            return Err(ApiError::InvalidProduct {
                index,
                field: "product_link",
            });
        }
    }

    Ok(())
}

pub fn documents_from_products(products: &[Product]) -> Vec<ProductDocument> {
    products.iter().map(Product::to_document).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_catalog(dir: &tempfile::TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("products.json");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_products_from_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(
            &dir,
            r#"[{"product_name":"Pain Relief X","product_price":"$5","product_description":"for headaches","product_link":"http://x"}]"#,
        );

        let products = load_products(&path).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].product_name, "Pain Relief X");
        assert_eq!(products[0].product_price, "$5");
    }

    #[test]
    fn missing_fields_default_to_empty_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(&dir, r#"[{"product_name":"A"}]"#);

        let products = load_products(&path).unwrap();
        assert_eq!(products[0].product_link, "");
        assert_eq!(products[0].product_description, "");
    }

    #[test]
    fn missing_file_is_catalog_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_products(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, ApiError::CatalogNotFound(_)));
    }

    #[test]
    fn invalid_json_is_malformed_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_catalog(&dir, "{not json");
        let err = load_products(&path).unwrap_err();
        assert!(matches!(err, ApiError::MalformedCatalog(_)));
    }

    #[test]
    fn empty_catalog_fails_validation() {
        let err = validate_products(&[]).unwrap_err();
        assert!(matches!(err, ApiError::EmptyCatalog));
    }

    #[test]
    fn validation_reports_offending_record_index() {
        let products = vec![
            Product {
                product_name: "A".to_string(),
                product_price: "$1".to_string(),
                product_description: "desc".to_string(),
                product_link: "http://a".to_string(),
            },
            Product {
                product_name: "B".to_string(),
                product_price: String::new(),
                product_description: String::new(),
                product_link: String::new(),
            },
        ];

        let err = validate_products(&products).unwrap_err();
        match err {
            ApiError::InvalidProduct { index, field } => {
                assert_eq!(index, 1);
                assert_eq!(field, "product_link");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn document_uses_description_as_content() {
        let product = Product {
            product_name: "A".to_string(),
            product_price: "$1".to_string(),
            product_description: "relieves pain".to_string(),
            product_link: "http://a".to_string(),
        };

        let doc = product.to_document();
        assert_eq!(doc.content, "relieves pain");
        assert_eq!(doc.metadata.name, "A");
        assert_eq!(doc.metadata.price, "$1");
        assert_eq!(doc.metadata.link, "http://a");
    }
}
