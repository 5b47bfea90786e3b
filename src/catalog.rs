use crate::error::{LinkerError, Result};
use sku_image_common::{decode_xml, parse_catalog, Catalog};
use std::path::Path;

/// 商品カタログXMLを読み込む
pub fn load_products(path: &Path, record_element: &str) -> Result<Catalog> {
    if !path.exists() {
        return Err(LinkerError::FileNotFound(path.display().to_string()));
    }

    // 文字コードは BOM / XML宣言から判定する
    let bytes = std::fs::read(path)?;
    let catalog = decode_xml(&bytes)
        .and_then(|xml| parse_catalog(&xml, record_element))
        .map_err(|e| LinkerError::parse(&path.display().to_string(), e))?;

    tracing::info!(path = %path.display(), products = catalog.len(), "loaded catalog");
    Ok(catalog)
}
