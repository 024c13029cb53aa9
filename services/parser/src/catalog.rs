//! Product-name to brand/type classification.

use serde::{Deserialize, Serialize};

use crate::cell::normalize_label;

pub const UNKNOWN: &str = "Unknown";

/// One row of the product reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductEntry {
    pub product_name: String,
    pub brand: String,
    #[serde(default)]
    pub product_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductClass {
    pub brand: String,
    pub product_type: String,
}

impl ProductClass {
    fn unknown() -> Self {
        Self {
            brand: UNKNOWN.to_string(),
            product_type: UNKNOWN.to_string(),
        }
    }

    fn from_entry(entry: &ProductEntry) -> Self {
        Self {
            brand: entry.brand.clone(),
            product_type: entry
                .product_type
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    entries: Vec<(String, ProductEntry)>,
}

impl ProductCatalog {
    pub fn new(entries: Vec<ProductEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (normalize_label(&e.product_name), e))
                .filter(|(norm, _)| !norm.is_empty())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Exact name, then substring either way, then brand name appearing in
    /// the product name. Anything else is `Unknown`; this never fails.
    pub fn classify(&self, product_name: &str) -> ProductClass {
        let name = normalize_label(product_name);
        if name.is_empty() {
            return ProductClass::unknown();
        }

        if let Some((_, e)) = self.entries.iter().find(|(n, _)| *n == name) {
            return ProductClass::from_entry(e);
        }

        if let Some((_, e)) = self
            .entries
            .iter()
            .find(|(n, _)| name.contains(n.as_str()) || n.contains(name.as_str()))
        {
            return ProductClass::from_entry(e);
        }

        let by_brand = self.entries.iter().find(|(_, e)| {
            let brand = normalize_label(&e.brand);
            !brand.is_empty() && name.contains(&brand)
        });
        if let Some((_, e)) = by_brand {
            return ProductClass {
                brand: e.brand.clone(),
                product_type: UNKNOWN.to_string(),
            };
        }

        ProductClass::unknown()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ProductCatalog {
        ProductCatalog::new(vec![
            ProductEntry {
                product_name: "Glow Serum 30ml".to_string(),
                brand: "Lumi".to_string(),
                product_type: Some("Skincare".to_string()),
            },
            ProductEntry {
                product_name: "Kopi Susu Botol".to_string(),
                brand: "Kopiku".to_string(),
                product_type: None,
            },
        ])
    }

    #[test]
    fn test_exact_match() {
        let c = catalog().classify("glow serum 30ML");
        assert_eq!(c.brand, "Lumi");
        assert_eq!(c.product_type, "Skincare");
    }

    #[test]
    fn test_fuzzy_match() {
        let c = catalog().classify("Glow Serum 30ml Bundle 2pcs");
        assert_eq!(c.brand, "Lumi");

        let c = catalog().classify("Kopi Susu");
        assert_eq!(c.brand, "Kopiku");
        assert_eq!(c.product_type, UNKNOWN);
    }

    #[test]
    fn test_brand_keyword_match() {
        let c = catalog().classify("Lumi Night Cream");
        assert_eq!(c.brand, "Lumi");
        assert_eq!(c.product_type, UNKNOWN);
    }

    #[test]
    fn test_unknown_fallback() {
        let c = catalog().classify("Sabun Cuci Piring");
        assert_eq!(c.brand, UNKNOWN);
        assert_eq!(c.product_type, UNKNOWN);
        assert_eq!(ProductCatalog::default().classify(""), ProductClass::unknown());
    }
}
