//! Knowledge-base directory loading.
//!
//! A knowledge directory holds markdown (or plain text) documents plus an
//! optional `products.json` catalog. Documents are labelled by file name and
//! read in file-name order so index builds are reproducible.

use std::path::Path;

use tracing::{info, warn};

use stylebot_core::error::StyleBotError;
use stylebot_core::types::SourceDocument;

use crate::catalog::ProductCatalog;

/// File name of the product catalog inside a knowledge directory.
pub const CATALOG_FILE: &str = "products.json";

const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Everything read from one knowledge directory.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    /// Text documents followed by one document per product.
    pub documents: Vec<SourceDocument>,
    pub catalog: ProductCatalog,
}

impl KnowledgeBase {
    /// Read every document and the catalog under `dir`.
    ///
    /// A missing directory yields an empty knowledge base. Unreadable files
    /// and a malformed catalog are errors.
    pub fn load_dir(dir: &Path) -> Result<Self, StyleBotError> {
        if !dir.is_dir() {
            warn!(path = %dir.display(), "Knowledge directory not found, starting empty");
            return Ok(Self {
                documents: Vec::new(),
                catalog: ProductCatalog::new(Vec::new()),
            });
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_document = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| DOCUMENT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_document {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            let raw_text = std::fs::read_to_string(path)?;
            let label = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            documents.push(SourceDocument::new(label, raw_text));
        }

        let catalog_path = dir.join(CATALOG_FILE);
        let catalog = if catalog_path.is_file() {
            ProductCatalog::load(&catalog_path)?
        } else {
            ProductCatalog::new(Vec::new())
        };
        documents.extend(catalog.documents());

        info!(
            path = %dir.display(),
            documents = paths.len(),
            products = catalog.len(),
            "Knowledge base loaded"
        );
        Ok(Self { documents, catalog })
    }
}
