//! 照合処理の型定義
//!
//! CLIとテストで共有される型:
//! - ProductRecord / Catalog: 商品カタログ（SKU → EAN）
//! - ResourceEntry: 画像ソースから列挙した画像リソース
//! - MatchRecord: 照合結果（CSVの1行）

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 商品レコード（SKUとEANはどちらも空でない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub sku: String,
    pub ean: String,
}

/// 商品カタログ
///
/// SKUをキーとする挿入順マップ。同じSKUを再挿入するとEANだけが上書きされ、
/// 並び順は最初に挿入した位置のまま。
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<ProductRecord>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 商品を追加（既存SKUならEANを上書き）
    pub fn insert(&mut self, sku: impl Into<String>, ean: impl Into<String>) {
        let sku = sku.into();
        let ean = ean.into();
        match self.index.get(&sku) {
            Some(&pos) => self.records[pos].ean = ean,
            None => {
                self.index.insert(sku.clone(), self.records.len());
                self.records.push(ProductRecord { sku, ean });
            }
        }
    }

    /// SKUからEANを取得
    pub fn get(&self, sku: &str) -> Option<&str> {
        self.index
            .get(sku)
            .map(|&pos| self.records[pos].ean.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<S: Into<String>, E: Into<String>> FromIterator<(S, E)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (S, E)>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for (sku, ean) in iter {
            catalog.insert(sku, ean);
        }
        catalog
    }
}

/// 画像リソース
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// 照合対象の文字列（Driveのファイル名 / サイトマップの画像URL）
    pub label: String,

    /// 画像のダウンロードURL
    pub url: String,

    /// 親ページのURL（サイトマップの <loc>）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl ResourceEntry {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
            parent: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// 照合に使う文字列（label、あれば parent）
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.label.as_str()).chain(self.parent.as_deref())
    }
}

/// 照合結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub sku: String,
    pub ean: String,
    /// 画像URL（公開時はホスティングURLに置き換わる）
    pub link: String,
}
