//! Promotion catalog loaded at startup.
//!
//! The file is a JSON object with optional `vouchers` and `flash_sales`
//! arrays. Entries are validated the same way as programmatic issuance, so a
//! bad file stops the server instead of serving broken promotions.

use std::path::{Path, PathBuf};

use domain::{FlashSale, FlashSaleCatalog, FlashSaleError, Voucher, VoucherCatalog, VoucherIssueError};
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading the promotion catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed catalog: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid voucher: {0}")]
    Voucher(#[from] VoucherIssueError),

    #[error("Invalid flash sale: {0}")]
    FlashSale(#[from] FlashSaleError),
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    vouchers: Vec<Voucher>,
    #[serde(default)]
    flash_sales: Vec<FlashSale>,
}

/// Issued vouchers and scheduled flash sales.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub vouchers: VoucherCatalog,
    pub flash_sales: FlashSaleCatalog,
}

impl Catalog {
    /// A catalog with no promotions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses and validates a catalog document.
    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        Ok(Self {
            vouchers: VoucherCatalog::from_vouchers(file.vouchers)?,
            flash_sales: FlashSaleCatalog::from_sales(file.flash_sales)?,
        })
    }

    /// Reads a catalog file from disk.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_json(&raw)?;
        tracing::info!(
            path = %path.display(),
            vouchers = catalog.vouchers.len(),
            flash_sales = catalog.flash_sales.len(),
            "Loaded promotion catalog"
        );
        Ok(catalog)
    }
}
