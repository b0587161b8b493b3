//! Product catalog: rendered as one knowledge document per product, and
//! queried directly by name, category, colour and size.

use std::collections::HashSet;
use std::path::Path;

use stylebot_core::error::StyleBotError;
use stylebot_core::types::{Product, SourceDocument};
use tracing::info;

use crate::text::tokenize;

#[derive(Debug, Clone, Default)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// Parse a JSON array of product records.
    pub fn from_json(json: &str) -> Result<Self, StyleBotError> {
        let products: Vec<Product> = serde_json::from_str(json)?;
        Ok(Self::new(products))
    }

    /// Load `products.json` from disk.
    pub fn load(path: &Path) -> Result<Self, StyleBotError> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        info!(
            products = catalog.len(),
            path = %path.display(),
            "Product catalog loaded"
        );
        Ok(catalog)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// One knowledge document per product, labelled `products/<id>`.
    pub fn documents(&self) -> Vec<SourceDocument> {
        self.products
            .iter()
            .map(|p| SourceDocument::new(format!("products/{}", p.id), render_product(p)))
            .collect()
    }

    /// Products relevant to a free-text question.
    ///
    /// A product scores two points per query word found in its name or
    /// category, one per matching colour and one per matching size. When any
    /// product matches by name or category, only those are returned.
    /// Results are ordered by score, then catalog order.
    pub fn lookup(&self, query: &str) -> Vec<&Product> {
        let query_lower = query.to_lowercase();
        let query_tokens: HashSet<String> = tokenize(query).into_iter().collect();
        if query_tokens.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(usize, usize, bool)> = Vec::new();
        for (pos, product) in self.products.iter().enumerate() {
            let name_tokens: HashSet<String> =
                tokenize(&format!("{} {}", product.name, product.category))
                    .into_iter()
                    .collect();
            let name_hits = query_tokens.intersection(&name_tokens).count();

            let color_hits = product
                .colors
                .iter()
                .filter(|c| contains_phrase(&query_lower, &c.to_lowercase()))
                .count();

            let size_hits = product
                .sizes
                .iter()
                .filter(|s| s.chars().count() > 1 && query_tokens.contains(&s.to_lowercase()))
                .count();

            let score = name_hits * 2 + color_hits + size_hits;
            if score > 0 {
                scored.push((pos, score, name_hits > 0));
            }
        }

        if scored.iter().any(|(_, _, by_name)| *by_name) {
            scored.retain(|(_, _, by_name)| *by_name);
        }
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        scored
            .into_iter()
            .map(|(pos, _, _)| &self.products[pos])
            .collect()
    }
}

/// Whole-word containment, so "red" does not match "bored".
fn contains_phrase(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(i, _)| {
        let before_ok = haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[i + needle.len()..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// Render a product as a compact plain-text entry for the index.
pub fn render_product(p: &Product) -> String {
    let mut out = format!("{} ({}). Price: ${:.2}.", p.name, p.category, p.price);
    if !p.colors.is_empty() {
        out.push_str(&format!(" Colors: {}.", p.colors.join(", ")));
    }
    if !p.sizes.is_empty() {
        out.push_str(&format!(" Sizes: {}.", p.sizes.join(", ")));
    }
    if !p.material.is_empty() {
        out.push_str(&format!(" Material: {}.", p.material));
    }
    if !p.features.is_empty() {
        out.push_str(&format!(" Features: {}.", p.features.join(", ")));
    }
    if !p.lead_time.is_empty() {
        out.push_str(&format!(" Lead time: {}.", p.lead_time));
    }
    if !p.description.is_empty() {
        out.push(' ');
        out.push_str(&p.description);
    }
    out
}
