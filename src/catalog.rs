//! Product catalog
//!
//! The gallery treats products as read-only data: either a JSON list or,
//! when none is configured, one product per canonical image found under the
//! asset root.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::error::{CatalogError, ViewError};

/// Image extensions picked up by a scan
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "webp", "gif"];

/// `apple-640w.jpg` is a derived variant, not a product image
static VARIANT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d+w$").expect("valid variant pattern"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    /// Price in cents
    #[serde(default)]
    pub price_cents: i64,
    /// Canonical image reference, e.g. `/img/apple.jpg`
    #[serde(default)]
    pub image: String,
}

impl Product {
    /// Check the product can be shown
    pub fn validate(&self) -> Result<(), ViewError> {
        if self.name.trim().is_empty() {
            return Err(ViewError::MissingName { id: self.id.clone() });
        }
        if self.price_cents < 0 {
            return Err(ViewError::NegativePrice { id: self.id.clone() });
        }
        Ok(())
    }

    /// `$12.50`
    pub fn price_label(&self) -> String {
        format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }

    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty() || self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Load a JSON array of products
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let products: Vec<Product> = serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("📦 Loaded {} products from {}", products.len(), path.display());
        Ok(Self { products })
    }

    /// Build one product per canonical image under `root`
    pub fn scan(root: &Path) -> Result<Self, CatalogError> {
        if !root.is_dir() {
            return Err(CatalogError::MissingRoot(root.to_path_buf()));
        }

        tracing::info!("🔍 Scanning assets: {}", root.display());

        let mut products = Vec::new();

        // Walk the directory tree recursively
        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let Some(extension) = path.extension() else {
                continue;
            };
            let extension = extension.to_string_lossy().to_lowercase();
            if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
                continue;
            }

            let stem = path.file_stem().unwrap_or_default().to_string_lossy().to_string();
            if VARIANT.is_match(&stem) {
                continue;
            }

            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let reference = format!(
                "/{}",
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            );

            products.push(Product {
                id: reference.clone(),
                name: display_name(&stem),
                price_cents: 0,
                image: reference,
            });
        }

        tracing::info!("✅ Scan complete: {} products", products.len());
        Ok(Self { products })
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// `green_apple-large` → `Green Apple Large`
fn display_name(stem: &str) -> String {
    stem.split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_skips_variants_and_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("img");
        std::fs::create_dir_all(&img).unwrap();
        for name in ["apple.jpg", "apple-320w.jpg", "apple-320w.webp", "green_pear.PNG", "notes.txt"] {
            std::fs::write(img.join(name), b"").unwrap();
        }

        let catalog = Catalog::scan(dir.path()).unwrap();
        let images: Vec<&str> = catalog.products().iter().map(|p| p.image.as_str()).collect();

        assert_eq!(images, vec!["/img/apple.jpg", "/img/green_pear.PNG"]);
        assert_eq!(catalog.products()[1].name, "Green Pear");
    }

    #[test]
    fn test_scan_missing_root() {
        assert!(matches!(
            Catalog::scan(Path::new("/no/such/assets")),
            Err(CatalogError::MissingRoot(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.json");
        std::fs::write(
            &path,
            r#"[{"id": "p1", "name": "Apple", "price_cents": 250, "image": "/img/apple.jpg"},
                {"id": "p2", "name": "Mystery"}]"#,
        )
        .unwrap();

        let catalog = Catalog::from_file(&path).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.products()[0].price_label(), "$2.50");
        assert_eq!(catalog.products()[1].image, "");
    }

    #[test]
    fn test_validate_and_matches() {
        let product = Product {
            id: "p1".into(),
            name: "Red Apple".into(),
            price_cents: 199,
            image: "/img/apple.jpg".into(),
        };
        assert!(product.validate().is_ok());
        assert!(product.matches("apple"));
        assert!(product.matches(""));
        assert!(!product.matches("pear"));

        let nameless = Product { name: " ".into(), ..product.clone() };
        assert_eq!(nameless.validate(), Err(ViewError::MissingName { id: "p1".into() }));

        let negative = Product { price_cents: -1, ..product };
        assert_eq!(negative.validate(), Err(ViewError::NegativePrice { id: "p1".into() }));
    }
}
