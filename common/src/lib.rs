//! SKU Image Linker Common Library
//!
//! カタログ・サイトマップのパースとSKU/EAN照合ロジック（I/Oなし）

pub mod error;
pub mod matching;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use matching::{is_match, match_products, MatchMode};
pub use parser::{decode_xml, parse_catalog, parse_sitemap_images, DEFAULT_RECORD_ELEMENT};
pub use types::{Catalog, MatchRecord, ProductRecord, ResourceEntry};
